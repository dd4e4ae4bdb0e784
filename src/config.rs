//! Mailer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`Mailer`](crate::Mailer) or
/// [`AsyncMailer`](crate::AsyncMailer).
///
/// The `domain` names the server to dial and doubles as the EHLO argument.
/// Every send dials `domain:port` for each entry of `ports` in order and
/// keeps the first connection that succeeds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Server to dial, and the domain announced in EHLO.
    pub domain: String,
    /// Timeout applied to the connect and to each individual read.
    pub timeout: Duration,
    /// Upgrade to TLS via STARTTLS when the server advertises it.
    pub use_tls: bool,
    /// Candidate ports, tried in order.
    pub ports: Vec<u16>,
    /// Credentials for AUTH LOGIN, when set.
    pub auth: Option<Auth>,
    /// Bind sends to the scripted mock transport instead of the network.
    pub test_mode: bool,
}

/// AUTH LOGIN credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Auth {
    /// Username, base64-encoded on the wire.
    pub username: String,
    /// Password, base64-encoded on the wire.
    pub password: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: "localhost".to_string(),
            timeout: Duration::from_secs(30),
            use_tls: true,
            ports: vec![25, 587, 465, 2525],
            auth: None,
            test_mode: false,
        }
    }
}

impl Config {
    /// Creates a configuration for the given server domain, with defaults
    /// for everything else.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether to upgrade via STARTTLS when available.
    #[must_use]
    pub const fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Sets the candidate ports, tried in order.
    #[must_use]
    pub fn ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = ports;
        self
    }

    /// Sets the AUTH LOGIN credentials.
    #[must_use]
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Auth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Enables or disables test mode. In test mode no network connection is
    /// ever made; sends run against a deterministic mock server.
    #[must_use]
    pub const fn enable_test_mode(mut self, enable: bool) -> Self {
        self.test_mode = enable;
        self
    }

    /// The configured server domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new("example.com");
        assert_eq!(config.domain(), "example.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.use_tls);
        assert_eq!(config.ports, vec![25, 587, 465, 2525]);
        assert!(config.auth.is_none());
        assert!(!config.test_mode);
    }

    #[test]
    fn builder_chain() {
        let config = Config::new("example.com")
            .timeout(Duration::from_secs(60))
            .use_tls(false)
            .ports(vec![25, 587])
            .auth("username", "password")
            .enable_test_mode(true);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.use_tls);
        assert_eq!(config.ports, vec![25, 587]);
        let auth = config.auth.as_ref().unwrap();
        assert_eq!(auth.username, "username");
        assert_eq!(auth.password, "password");
        assert!(config.test_mode);
    }
}
