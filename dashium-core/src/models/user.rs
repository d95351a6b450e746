// Dashium - A self-hosted monitoring dashboard built with Rust
// Copyright (C) 2025 Dashium Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use serde::Serialize;

/// A dashboard operator. Created from configuration at startup.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    /// Create a new user with a hashed password
    pub fn new(username: impl Into<String>, password: &str) -> Result<Self> {
        let username = username.into();
        Self::validate_username(&username)
            .map_err(|e| anyhow::anyhow!("Invalid username: {}", e))?;

        let password_hash = Self::hash_password(password)?;

        Ok(Self {
            username,
            password_hash,
        })
    }

    /// Hash a password using Argon2
    pub fn hash_password(password: &str) -> Result<String> {
        use argon2::password_hash::rand_core::OsRng;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against the stored hash.
    ///
    /// A mismatch is `Ok(false)`; an unreadable stored hash is an error.
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        use argon2::password_hash::{PasswordHash, PasswordVerifier};

        let parsed_hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
        }
    }

    /// Compare an already-hashed credential with the stored hash
    pub fn matches_hash(&self, password_hash: &str) -> bool {
        !password_hash.is_empty() && self.password_hash == password_hash
    }

    /// Any non-empty name is accepted, including spaces and non-ASCII text.
    pub fn validate_username(username: &str) -> Result<(), String> {
        if username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_hashes_password() {
        let user = User::new("admin", "password123").unwrap();

        assert_eq!(user.username, "admin");
        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let user = User::new("operator", "correct horse").unwrap();

        assert!(user.verify_password("correct horse").unwrap());
        assert!(!user.verify_password("wrong").unwrap());
        assert!(!user.verify_password("").unwrap());
    }

    #[test]
    fn test_same_password_different_salt() {
        let a = User::hash_password("same").unwrap();
        let b = User::hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_with_corrupt_hash_is_error() {
        let user = User {
            username: "broken".to_string(),
            password_hash: "not-a-phc-string".to_string(),
        };
        assert!(user.verify_password("anything").is_err());
    }

    #[test]
    fn test_matches_hash() {
        let user = User::new("admin", "pw").unwrap();
        let stored = user.password_hash.clone();

        assert!(user.matches_hash(&stored));
        assert!(!user.matches_hash("pw"));
        assert!(!user.matches_hash(""));
    }

    #[test]
    fn test_validate_username() {
        assert!(User::validate_username("admin").is_ok());
        assert!(User::validate_username("john smith").is_ok());
        assert!(User::validate_username("josé").is_ok());
        assert!(User::validate_username(&"x".repeat(200)).is_ok());

        assert!(User::validate_username("").is_err());
    }

    #[test]
    fn test_serialization_omits_hash() {
        let user = User::new("admin", "pw").unwrap();
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["username"], "admin");
        assert!(json.get("password_hash").is_none());
    }
}
