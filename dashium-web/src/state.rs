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

use anyhow::{Context as _, Result};
use dashium_core::AuthManager;
use dashium_template::TemplateEngine;
use std::sync::Arc;

use crate::{
    api_registry::ApiRegistry, api_stats::ApiStats, builtin_views::register_builtin_views,
    configuration::Configuration, view_registry::ViewRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Configuration>,
    /// `None` when authentication is disabled
    pub auth: Option<Arc<AuthManager>>,
    pub templates: Arc<TemplateEngine>,
    pub views: Arc<ViewRegistry>,
    pub apis: Arc<ApiRegistry>,
    pub api_stats: Arc<ApiStats>,
}

impl AppState {
    pub fn new(
        config: Configuration,
        auth: Option<Arc<AuthManager>>,
        templates: TemplateEngine,
        views: ViewRegistry,
        apis: ApiRegistry,
        api_stats: Arc<ApiStats>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            auth,
            templates: Arc::new(templates),
            views: Arc::new(views),
            apis: Arc::new(apis),
            api_stats,
        }
    }

    /// Compose the application: auth manager with configured users, built-in views
    /// and endpoints, plus whatever `register` adds on top.
    pub fn bootstrap<F>(config: Configuration, templates: TemplateEngine, register: F) -> Result<Self>
    where
        F: FnOnce(&mut ViewRegistry, &mut ApiRegistry) -> Result<()>,
    {
        let auth = if config.auth.enabled {
            let manager = AuthManager::new(config.auth_settings());
            for credentials in &config.auth.users {
                let created = manager
                    .create_user(&credentials.username, &credentials.password)
                    .with_context(|| format!("Failed to create user {:?}", credentials.username))?;
                if !created {
                    tracing::warn!(username = %credentials.username, "Duplicate user in configuration ignored");
                }
            }
            if manager.user_count() == 0 {
                tracing::warn!("Authentication is enabled but no users are configured");
            }
            Some(Arc::new(manager))
        } else {
            tracing::warn!("Authentication is disabled; all pages are public");
            None
        };

        let api_stats = Arc::new(ApiStats::new());
        let mut views = ViewRegistry::new();
        let mut apis = ApiRegistry::new();

        register_builtin_views(&mut views, &mut apis, &config, auth.clone(), api_stats.clone())?;
        register(&mut views, &mut apis)?;

        Ok(Self::new(config, auth, templates, views, apis, api_stats))
    }
}
