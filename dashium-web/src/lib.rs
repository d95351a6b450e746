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

pub mod api_registry;
pub mod api_stats;
pub mod auth;
pub mod auth_gate;
pub mod builtin_views;
pub mod cleanup;
pub mod configuration;
pub mod error;
pub mod handlers;
pub mod request_logging;
pub mod routes;
pub mod state;
pub mod templates;
pub mod tls;
pub mod view_registry;

#[cfg(test)]
pub mod test_helpers;

pub use configuration::Configuration;
pub use state::AppState;
