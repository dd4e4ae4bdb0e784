//! # postrider
//!
//! An SMTP client engine. Given a [`Mail`] and a [`Config`], it drives the
//! full SMTP session (connection, greeting, EHLO, optional STARTTLS
//! upgrade, optional AUTH LOGIN, envelope exchange, message transmission,
//! QUIT) while recording every protocol line exchanged in a transcript
//! shared across cloned handles.
//!
//! Two entry points share one protocol engine: [`Mailer::send`] blocks the
//! calling thread, [`AsyncMailer::send`] suspends at I/O boundaries.
//! Enabling test mode on the configuration binds a deterministic scripted
//! server instead of the network, so the complete engine path can be
//! exercised without any connectivity.
//!
//! ```
//! use postrider::{Config, Mail, Mailer};
//!
//! let config = Config::new("mail.example.com").enable_test_mode(true);
//! let mailer = Mailer::new(config);
//!
//! let mail = Mail::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Hello")
//!     .body("Delivered by postrider");
//!
//! mailer.send(&mail).unwrap();
//! assert!(mailer.get_log().first().unwrap().starts_with("220"));
//! ```

mod config;
mod connection;
mod error;
mod mailer;
mod message;
mod mock;
mod reply;
mod transaction;
mod transcript;

pub use config::{Auth, Config};
pub use error::{Error, Result};
pub use mailer::{AsyncMailer, Mailer};
pub use message::Mail;
pub use reply::{Reply, ReplyLine};
