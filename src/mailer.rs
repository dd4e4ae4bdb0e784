//! Mailer handles: the blocking and async entry points.
//!
//! Both handle types bind one configuration to one shared transcript and
//! run the same protocol engine; they differ only in scheduling. Cloning a
//! handle never copies state: clones send through the same configuration
//! and append to the same transcript.

use std::sync::Arc;

use crate::{
    config::Config, error::Result, message::Mail, transaction::Transaction,
    transcript::Transcript,
};

/// A blocking SMTP mailer.
///
/// Each [`send`](Self::send) drives a complete session over a fresh
/// connection and blocks until it finishes or fails.
#[derive(Clone)]
pub struct Mailer {
    config: Arc<Config>,
    transcript: Transcript,
}

impl Mailer {
    /// Creates a mailer for the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            transcript: Transcript::new(),
        }
    }

    /// Sends a message, blocking until the session completes.
    ///
    /// # Errors
    ///
    /// Transport failures (unreachable server, timeout, TLS trouble) and
    /// server rejections ([`Error::Smtp`](crate::Error::Smtp)) both abort
    /// the session; the transcript keeps whatever was exchanged first.
    pub fn send(&self, mail: &Mail) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(Transaction::new(&self.config, &self.transcript).run(mail))
    }

    /// A snapshot of every protocol line exchanged so far, in order.
    #[must_use]
    pub fn get_log(&self) -> Vec<String> {
        self.transcript.snapshot()
    }

    /// Empties the shared transcript, for this handle and every clone.
    pub fn clear_log(&self) {
        self.transcript.clear();
    }

    /// The configuration this mailer was created from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// The async counterpart of [`Mailer`].
///
/// [`send`](Self::send) suspends at I/O boundaries instead of blocking a
/// thread, and may be called from any number of tasks holding clones of one
/// handle; their transcript lines interleave but are never lost.
#[derive(Clone)]
pub struct AsyncMailer {
    config: Arc<Config>,
    transcript: Transcript,
}

impl AsyncMailer {
    /// Creates an async mailer for the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            transcript: Transcript::new(),
        }
    }

    /// Sends a message, suspending at connect, read, write, and TLS
    /// handshake boundaries.
    ///
    /// # Errors
    ///
    /// Same contract as [`Mailer::send`].
    pub async fn send(&self, mail: &Mail) -> Result<()> {
        Transaction::new(&self.config, &self.transcript)
            .run(mail)
            .await
    }

    /// A snapshot of every protocol line exchanged so far, in order.
    #[must_use]
    pub fn get_log(&self) -> Vec<String> {
        self.transcript.snapshot()
    }

    /// Empties the shared transcript, for this handle and every clone.
    pub fn clear_log(&self) {
        self.transcript.clear();
    }

    /// The configuration this mailer was created from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl From<Mailer> for AsyncMailer {
    /// Rebinds a blocking handle as an async one, still sharing the same
    /// configuration and transcript.
    fn from(mailer: Mailer) -> Self {
        Self {
            config: mailer.config,
            transcript: mailer.transcript,
        }
    }
}

impl From<AsyncMailer> for Mailer {
    /// Rebinds an async handle as a blocking one, still sharing the same
    /// configuration and transcript.
    fn from(mailer: AsyncMailer) -> Self {
        Self {
            config: mailer.config,
            transcript: mailer.transcript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_transcript() {
        let mailer = Mailer::new(Config::new("example.com"));
        let clone = mailer.clone();

        mailer.transcript.push("220 hello");
        assert_eq!(clone.get_log(), vec!["220 hello"]);

        clone.clear_log();
        assert!(mailer.get_log().is_empty());
    }

    #[test]
    fn conversions_keep_the_transcript() {
        let mailer = Mailer::new(Config::new("example.com"));
        mailer.transcript.push("220 hello");

        let async_mailer = AsyncMailer::from(mailer.clone());
        assert_eq!(async_mailer.get_log(), vec!["220 hello"]);

        async_mailer.clear_log();
        assert!(mailer.get_log().is_empty());
    }
}
