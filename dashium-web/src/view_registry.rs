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

use anyhow::{bail, Result};
use dashium_template::Context;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

/// Decoded query string, sorted by key
pub type QueryParams = BTreeMap<String, String>;

/// Per-request enrichment of a view's context: `(context, path, query)`
pub type ContextProcessor =
    Arc<dyn Fn(&mut Context, &str, &QueryParams) -> Result<()> + Send + Sync>;

/// A page: the paths it answers, its template and the data it starts from
#[derive(Clone)]
pub struct View {
    pub paths: Vec<String>,
    pub template: String,
    pub seed: Context,
    pub processor: Option<ContextProcessor>,
}

impl View {
    pub fn new<I, P>(paths: I, template: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            template: template.into(),
            seed: Context::new(),
            processor: None,
        }
    }

    pub fn with_seed(mut self, seed: Context) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_value<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.seed.insert(key, value);
        self
    }

    pub fn with_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(&mut Context, &str, &QueryParams) -> Result<()> + Send + Sync + 'static,
    {
        self.processor = Some(Arc::new(processor));
        self
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("paths", &self.paths)
            .field("template", &self.template)
            .field("seed", &self.seed)
            .field("processor", &self.processor.is_some())
            .finish()
    }
}

/// Views keyed by exact request path
#[derive(Debug, Default)]
pub struct ViewRegistry {
    by_path: HashMap<String, Arc<View>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view under each of its paths. A path claimed twice is an error.
    pub fn register(&mut self, view: View) -> Result<()> {
        if let Some(taken) = view.paths.iter().find(|p| self.by_path.contains_key(*p)) {
            bail!("View path {:?} is already registered", taken);
        }

        let view = Arc::new(view);
        for path in &view.paths {
            self.by_path.insert(path.clone(), view.clone());
        }
        tracing::debug!(template = %view.template, paths = ?view.paths, "Registered view");
        Ok(())
    }

    pub fn find(&self, path: &str) -> Option<Arc<View>> {
        self.by_path.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
