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

use dashium_core::AuthManager;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

/// Run [`AuthManager::cleanup`] every `period` until the task is aborted
pub fn spawn_session_cleanup(auth: Arc<AuthManager>, period: Duration) -> JoinHandle<()> {
    tracing::info!(interval_secs = period.as_secs(), "Session cleanup scheduled");

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let sweeper = auth.clone();
            match tokio::task::spawn_blocking(move || sweeper.cleanup()).await {
                Ok(removed) => {
                    tracing::debug!(removed, "Session cleanup pass finished");
                }
                Err(e) => tracing::error!("Session cleanup pass failed: {}", e),
            }
        }
    })
}
