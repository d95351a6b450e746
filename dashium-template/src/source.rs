use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Component, Path, PathBuf},
};

use crate::error::{Result, TemplateError};

/// Where template text comes from
pub trait TemplateSource: Send + Sync + fmt::Debug {
    fn load(&self, name: &str) -> Result<String>;
}

/// Reject names that could escape the template root
pub fn validate_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let valid = !name.is_empty()
        && !name.contains('\0')
        && !name.starts_with('\\')
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

    if valid {
        Ok(())
    } else {
        Err(TemplateError::InvalidName(name.to_string()))
    }
}

/// Templates read from a directory on disk
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirectorySource {
    fn load(&self, name: &str) -> Result<String> {
        validate_name(name)?;

        let path = self.root.join(name);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TemplateError::TemplateNotFound(name.to_string()),
            _ => TemplateError::Io {
                name: name.to_string(),
                source: e,
            },
        })
    }
}

/// Templates held in memory, mostly for tests and embedded defaults
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }
}

impl TemplateSource for MemorySource {
    fn load(&self, name: &str) -> Result<String> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("base.html").is_ok());
        assert!(validate_name("partials/nav.html").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name("../secret").is_err());
        assert!(validate_name("a/../../b").is_err());
        assert!(validate_name("/etc/passwd").is_err());
        assert!(validate_name("\\windows").is_err());
    }

    #[test]
    fn test_directory_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), "<p>hi</p>").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.load("page.html").unwrap(), "<p>hi</p>");
        assert!(matches!(
            source.load("missing.html"),
            Err(TemplateError::TemplateNotFound(_))
        ));
        assert!(matches!(
            source.load("../page.html"),
            Err(TemplateError::InvalidName(_))
        ));
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with("a.html", "A");
        assert_eq!(source.load("a.html").unwrap(), "A");
        assert!(source.load("b.html").is_err());
    }
}
