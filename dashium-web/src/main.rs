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
use dashium_web::{
    cleanup::spawn_session_cleanup,
    configuration::Configuration,
    routes,
    state::AppState,
    templates::init_templates,
    tls::{self, TlsListener},
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dashium_web=debug,dashium_core=info,dashium_template=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Configuration::load()?;
    info!("Starting {}", config.web_views.server_info);
    if config.development_mode {
        info!("Development mode enabled");
    }

    // Initialize templates
    info!("Loading templates from: {}", config.paths.templates);
    let templates = init_templates(&config.paths.templates, config.development_mode)?;
    info!("Serving static files from: {}", config.paths.static_files);

    let cleanup_interval = config.session.cleanup_interval();
    let bind_addr = config.bind_addr();
    let tls_acceptor = if config.tls.enable_https {
        Some(tls::acceptor(&config.tls)?)
    } else {
        None
    };

    // Create application state
    let state = AppState::bootstrap(config, templates, |_, _| Ok(()))?;

    let cleanup = state
        .auth
        .clone()
        .map(|auth| spawn_session_cleanup(auth, cleanup_interval));

    // Create router
    let app = routes::create_router(state);

    // Start server
    let listener = TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;

    match tls_acceptor {
        Some(acceptor) => {
            info!("Listening on https://{}", local_addr);
            axum::serve(TlsListener::new(listener, acceptor), app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        None => {
            info!("Listening on http://{}", local_addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
