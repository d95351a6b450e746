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
use axum::http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};

use crate::view_registry::QueryParams;

/// What an endpoint callback hands back: a JSON payload and its status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub payload: Value,
    pub status: StatusCode,
}

impl ApiReply {
    pub fn ok(payload: Value) -> Self {
        Self::with_status(payload, StatusCode::OK)
    }

    pub fn with_status(payload: Value, status: StatusCode) -> Self {
        Self { payload, status }
    }
}

pub type GetCallback = Arc<dyn Fn(&QueryParams) -> Result<ApiReply> + Send + Sync>;
pub type PostCallback = Arc<dyn Fn(Value, &HeaderMap) -> Result<ApiReply> + Send + Sync>;

/// JSON endpoints keyed by full request path (e.g. `/api/status`)
#[derive(Default)]
pub struct ApiRegistry {
    get: HashMap<String, GetCallback>,
    post: HashMap<String, PostCallback>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_get<I, P, F>(&mut self, paths: I, callback: F) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
        F: Fn(&QueryParams) -> Result<ApiReply> + Send + Sync + 'static,
    {
        let callback: GetCallback = Arc::new(callback);
        insert_all(&mut self.get, paths, callback, "GET")
    }

    pub fn register_post<I, P, F>(&mut self, paths: I, callback: F) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
        F: Fn(Value, &HeaderMap) -> Result<ApiReply> + Send + Sync + 'static,
    {
        let callback: PostCallback = Arc::new(callback);
        insert_all(&mut self.post, paths, callback, "POST")
    }

    pub fn get_endpoint(&self, path: &str) -> Option<GetCallback> {
        self.get.get(path).cloned()
    }

    pub fn post_endpoint(&self, path: &str) -> Option<PostCallback> {
        self.post.get(path).cloned()
    }
}

fn insert_all<C: Clone, I, P>(
    table: &mut HashMap<String, C>,
    paths: I,
    callback: C,
    method: &str,
) -> Result<()>
where
    I: IntoIterator<Item = P>,
    P: Into<String>,
{
    let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
    if let Some(taken) = paths.iter().find(|p| table.contains_key(*p)) {
        bail!("{} endpoint {:?} is already registered", method, taken);
    }
    for path in paths {
        tracing::debug!("Registered {} endpoint {}", method, path);
        table.insert(path, callback.clone());
    }
    Ok(())
}

impl fmt::Debug for ApiRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut get: Vec<_> = self.get.keys().collect();
        let mut post: Vec<_> = self.post.keys().collect();
        get.sort();
        post.sort();
        f.debug_struct("ApiRegistry")
            .field("get", &get)
            .field("post", &post)
            .finish()
    }
}
