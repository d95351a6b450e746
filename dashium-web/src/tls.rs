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

//! HTTPS serving over rustls

use crate::configuration::TlsConfig;
use anyhow::{anyhow, Context, Result};
use axum::serve::Listener;
use rustls_pki_types::{pem::PemObject, CertificateDer, PrivateKeyDer};
use std::{io, net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{server::TlsStream, TlsAcceptor};
use tracing::{debug, info, warn};

fn read_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("Failed to read certificate file: {}", path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("Invalid PEM in certificate file: {}", path.display()))?;

    if certs.is_empty() {
        anyhow::bail!("No certificates found in {}", path.display());
    }
    Ok(certs)
}

/// Build a rustls acceptor from the configured certificate, key and optional chain
pub fn acceptor(config: &TlsConfig) -> Result<TlsAcceptor> {
    let (Some(cert_file), Some(key_file)) = (&config.cert_file, &config.key_file) else {
        anyhow::bail!("HTTPS requires both tls.cert_file and tls.key_file");
    };

    let mut certs = read_certificates(Path::new(cert_file))?;
    if let Some(chain_file) = &config.cert_chain_file {
        certs.extend(read_certificates(Path::new(chain_file))?);
    }

    let key = PrivateKeyDer::from_pem_file(key_file)
        .map_err(|e| anyhow!("{}", e))
        .with_context(|| format!("Failed to read private key: {}", key_file))?;

    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Certificate and private key do not form a valid pair")?;

    info!("Loaded TLS certificate {} with key {}", cert_file, key_file);
    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

/// TCP listener that completes the TLS handshake before handing connections to axum
pub struct TlsListener {
    tcp: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    pub fn new(tcp: TcpListener, acceptor: TlsAcceptor) -> Self {
        Self { tcp, acceptor }
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, addr) = match self.tcp.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            match self.acceptor.accept(stream).await {
                Ok(tls) => return (tls, addr),
                Err(e) => debug!(peer = %addr, "TLS handshake failed: {}", e),
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.tcp.local_addr()
    }
}
