//! Mail message construction and rendering.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An email message.
///
/// Fields may be filled in any order; nothing is validated until the message
/// is handed to a send, where a missing or unaddressed from/to fails with
/// [`Error::InvalidMail`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Mail {
    /// Envelope sender address.
    pub from: String,
    /// Envelope recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body, treated as opaque text.
    pub body: String,
    /// Content type header value.
    pub content_type: String,
    /// Additional headers. Keys are unique; ordering is irrelevant.
    pub headers: HashMap<String, String>,
    /// Message-ID header value; generated at render time when unset.
    pub message_id: Option<String>,
}

impl Default for Mail {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            subject: String::new(),
            body: String::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
            headers: HashMap::new(),
            message_id: None,
        }
    }
}

impl Mail {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Adds a custom header, replacing any previous value for the name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets an explicit Message-ID.
    #[must_use]
    pub fn message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// A view of the custom headers.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Checks that the envelope is complete enough to send.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMail`] when from or to is unset or is not an
    /// address.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("from", &self.from), ("to", &self.to)] {
            if value.is_empty() {
                return Err(Error::InvalidMail(format!("{field} address is not set")));
            }
            if value.matches('@').count() != 1 {
                return Err(Error::InvalidMail(format!(
                    "{field} address '{value}' is not a valid email address"
                )));
            }
        }
        Ok(())
    }

    /// Renders the message as RFC 5322 text with CRLF line endings: the
    /// standard headers, a Date and Message-ID (generated when absent), the
    /// custom headers, a blank line, then the body.
    #[must_use]
    pub fn render(&self, origin_domain: &str) -> String {
        let mut out = String::new();

        out.push_str(&format!("From: {}\r\n", self.from));
        out.push_str(&format!("To: {}\r\n", self.to));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str(&format!("Date: {}\r\n", Utc::now().to_rfc2822()));

        let message_id = self
            .message_id
            .clone()
            .unwrap_or_else(|| generate_message_id(origin_domain));
        out.push_str(&format!("Message-ID: {message_id}\r\n"));

        out.push_str(&format!("Content-Type: {}\r\n", self.content_type));

        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }

        out.push_str("\r\n");
        out.push_str(&ensure_crlf(&self.body));
        out
    }
}

/// Generates a unique Message-ID under the given domain.
fn generate_message_id(domain: &str) -> String {
    format!(
        "<{}.{:016x}@{}>",
        Utc::now().timestamp(),
        rand::random::<u64>(),
        domain
    )
}

/// Normalizes bare LF line endings to CRLF.
fn ensure_crlf(s: &str) -> String {
    if s.contains("\r\n") {
        s.to_string()
    } else {
        s.replace('\n', "\r\n")
    }
}
