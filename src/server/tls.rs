//! Secure channel setup.
//!
//! The acceptor only needs to turn an accepted socket into a byte stream;
//! [`Handshake`] is that seam. Production uses rustls, tests can use
//! [`Plaintext`].

use std::fs::File;
use std::future::Future;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

/// Establishes the channel a session runs over.
pub trait Handshake: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn handshake(&self, socket: TcpStream) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

impl Handshake for TlsAcceptor {
    type Stream = tokio_rustls::server::TlsStream<TcpStream>;

    fn handshake(&self, socket: TcpStream) -> impl Future<Output = io::Result<Self::Stream>> + Send {
        self.accept(socket)
    }
}

/// No encryption; the socket is used as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plaintext;

impl Handshake for Plaintext {
    type Stream = TcpStream;

    async fn handshake(&self, socket: TcpStream) -> io::Result<TcpStream> {
        Ok(socket)
    }
}

/// Load a TLS acceptor from a PEM certificate chain and private key.
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("TLS certificate and key do not form a valid server identity")?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("Certificate file not found: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to parse certificates in {}", path.display()))?;

    if certs.is_empty() {
        anyhow::bail!("No certificates found in {}", path.display());
    }

    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .with_context(|| format!("Private key file not found: {}", path.display()))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .with_context(|| format!("Failed to parse private key in {}", path.display()))?
        .with_context(|| format!("No private key found in {}", path.display()))
}
