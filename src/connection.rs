//! Transport establishment and line-oriented I/O.
//!
//! A [`Connection`] is either a plain TCP stream, its TLS-wrapped upgrade,
//! or the scripted mock used in test mode. The protocol engine only ever
//! speaks whole CRLF-terminated lines to it.

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufStream},
    net::TcpStream,
};
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use crate::{
    config::Config,
    error::{Error, Result},
    mock::MockSession,
};

/// A bidirectional line-oriented SMTP transport.
pub(crate) enum Connection {
    Plain(BufStream<TcpStream>),
    Tls(BufStream<TlsStream<TcpStream>>),
    Mock(MockSession),
}

/// Dials `domain:port` for each configured port in order and returns the
/// first connection that succeeds; in test mode, binds the scripted mock
/// without touching the network.
///
/// # Errors
///
/// Returns [`Error::Connection`] when no configured port accepts within the
/// configured timeout.
pub(crate) async fn connect(config: &Config) -> Result<Connection> {
    if config.test_mode {
        tracing::debug!("test mode enabled, binding scripted mock transport");
        return Ok(Connection::Mock(MockSession::new()));
    }

    if config.ports.is_empty() {
        return Err(Error::Connection("no ports configured".to_string()));
    }

    for port in &config.ports {
        let addr = format!("{}:{port}", config.domain);
        match tokio::time::timeout(config.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                tracing::debug!(%addr, "connected");
                return Ok(Connection::Plain(BufStream::new(stream)));
            }
            Ok(Err(err)) => tracing::debug!(%addr, %err, "connection attempt failed"),
            Err(_) => tracing::debug!(%addr, "connection attempt timed out"),
        }
    }

    Err(Error::Connection(format!(
        "could not reach {} on any of ports {:?}",
        config.domain, config.ports
    )))
}

impl Connection {
    /// Whether the transport is (or simulates being) TLS-wrapped.
    pub(crate) fn is_tls(&self) -> bool {
        match self {
            Self::Plain(_) => false,
            Self::Tls(_) => true,
            Self::Mock(mock) => mock.tls_active,
        }
    }

    /// Writes one line, CRLF-terminated, and flushes it.
    pub(crate) async fn write_line(&mut self, line: &str) -> Result<()> {
        match self {
            Self::Plain(stream) => write_crlf_line(stream, line).await,
            Self::Tls(stream) => write_crlf_line(stream, line).await,
            Self::Mock(mock) => {
                mock.write_line(line);
                Ok(())
            }
        }
    }

    /// Reads one line, stripped of its CRLF, failing with
    /// [`Error::Timeout`] when the server stays silent too long.
    pub(crate) async fn read_line(&mut self, timeout: Duration) -> Result<String> {
        match self {
            Self::Plain(stream) => read_crlf_line(stream, timeout).await,
            Self::Tls(stream) => read_crlf_line(stream, timeout).await,
            Self::Mock(mock) => mock.read_line().ok_or(Error::ConnectionClosed),
        }
    }

    /// Upgrades a plain connection to TLS in place; the mock flips its
    /// simulated-TLS flag instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the handshake fails or the connection is
    /// already TLS.
    pub(crate) async fn upgrade_tls(self, domain: &str, timeout: Duration) -> Result<Self> {
        match self {
            Self::Plain(stream) => {
                let connector = TlsConnector::from(Arc::new(tls_client_config()?));
                let server_name = ServerName::try_from(domain.to_string())
                    .map_err(|err| Error::Tls(format!("invalid server name '{domain}': {err}")))?;

                let handshake = connector.connect(server_name, stream.into_inner());
                let tls = tokio::time::timeout(timeout, handshake)
                    .await
                    .map_err(|_| Error::Timeout("TLS handshake"))?
                    .map_err(|err| Error::Tls(err.to_string()))?;

                Ok(Self::Tls(BufStream::new(tls)))
            }
            Self::Mock(mut mock) => {
                mock.tls_active = true;
                Ok(Self::Mock(mock))
            }
            Self::Tls(_) => Err(Error::Tls("connection is already TLS".to_string())),
        }
    }
}

async fn write_crlf_line<S>(stream: &mut S, line: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await?;
    Ok(())
}

async fn read_crlf_line<S>(stream: &mut S, timeout: Duration) -> Result<String>
where
    S: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let read = tokio::time::timeout(timeout, stream.read_line(&mut line))
        .await
        .map_err(|_| Error::Timeout("read"))??;

    if read == 0 {
        return Err(Error::ConnectionClosed);
    }

    line.truncate(line.trim_end_matches(['\r', '\n']).len());
    Ok(line)
}

/// Client TLS configuration trusting the platform's native roots.
fn tls_client_config() -> Result<ClientConfig> {
    let mut root_store = RootCertStore::empty();

    let certs = rustls_native_certs::load_native_certs();
    for cert in certs.certs {
        root_store
            .add(cert)
            .map_err(|err| Error::Tls(format!("failed to add certificate: {err}")))?;
    }
    if !certs.errors.is_empty() {
        tracing::warn!(?certs.errors, "some native certificates could not be loaded");
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mode_binds_the_mock() {
        let config = Config::new("unreachable.invalid").enable_test_mode(true);
        let mut connection = connect(&config).await.unwrap();

        assert!(!connection.is_tls());
        let greeting = connection
            .read_line(Duration::from_secs(1))
            .await
            .unwrap();
        assert!(greeting.starts_with("220"));
    }

    #[tokio::test]
    async fn no_ports_is_a_connection_error() {
        let config = Config::new("example.com").ports(Vec::new());
        let err = connect(&config).await.err().expect("connect should fail");
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn mock_upgrade_flips_the_tls_flag() {
        let config = Config::new("example.com").enable_test_mode(true);
        let connection = connect(&config).await.unwrap();

        let upgraded = connection
            .upgrade_tls("example.com", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(upgraded.is_tls());
    }
}
