//! The SMTP protocol engine.
//!
//! One [`Transaction`] drives one complete session for one message:
//! greeting, EHLO, optional STARTTLS upgrade with a fresh EHLO, optional
//! AUTH LOGIN, envelope exchange, DATA transmission with dot-stuffing, and
//! QUIT. Every line sent or received is appended to the shared transcript
//! before it is acted on, so the transcript is a complete ordered record of
//! the dialogue whatever the outcome.

use std::borrow::Cow;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::{
    config::Config,
    connection::{self, Connection},
    error::{Error, Result},
    message::Mail,
    reply::{Reply, ReplyLine},
    transcript::Transcript,
};

pub(crate) struct Transaction<'a> {
    config: &'a Config,
    transcript: &'a Transcript,
}

impl<'a> Transaction<'a> {
    pub(crate) const fn new(config: &'a Config, transcript: &'a Transcript) -> Self {
        Self { config, transcript }
    }

    /// Runs the full session. The connection is dropped, and with it
    /// closed, on every exit path.
    pub(crate) async fn run(&self, mail: &Mail) -> Result<()> {
        mail.validate()?;

        let connection = connection::connect(self.config).await?;
        let result = self.drive(connection, mail).await;
        if let Err(err) = &result {
            tracing::debug!(%err, "SMTP session aborted");
        }
        result
    }

    async fn drive(&self, mut connection: Connection, mail: &Mail) -> Result<()> {
        let greeting = self.read_reply(&mut connection).await?;
        self.expect(&greeting, &[220], "greeting")?;

        let mut hello = self.hello(&mut connection).await?;

        if self.config.use_tls && hello.advertises("STARTTLS") {
            let reply = self.command(&mut connection, "STARTTLS").await?;
            self.expect(&reply, &[220], "STARTTLS")?;

            connection = connection
                .upgrade_tls(&self.config.domain, self.config.timeout)
                .await?;

            // STARTTLS resets the negotiated state (RFC 3207), so the
            // capability list must be fetched again
            hello = self.hello(&mut connection).await?;
        }

        tracing::debug!(extensions = ?hello.extensions(), tls = connection.is_tls(), "session established");

        if let Some(auth) = &self.config.auth {
            self.authenticate(&mut connection, &auth.username, &auth.password)
                .await?;
        }

        self.envelope(&mut connection, mail).await?;
        self.transmit(&mut connection, mail).await?;
        self.quit(&mut connection).await;

        Ok(())
    }

    /// EHLO, falling back to HELO for pre-ESMTP servers that reject it.
    async fn hello(&self, connection: &mut Connection) -> Result<Reply> {
        let reply = self
            .command(connection, &format!("EHLO {}", self.config.domain))
            .await?;
        if reply.is_success() {
            return Ok(reply);
        }

        let reply = self
            .command(connection, &format!("HELO {}", self.config.domain))
            .await?;
        self.expect(&reply, &[250], "HELO")?;
        Ok(reply)
    }

    async fn authenticate(
        &self,
        connection: &mut Connection,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let reply = self.command(connection, "AUTH LOGIN").await?;
        self.expect(&reply, &[334], "AUTH LOGIN")?;

        let reply = self.command(connection, &BASE64.encode(username)).await?;
        self.expect(&reply, &[334], "AUTH LOGIN")?;

        let reply = self.command(connection, &BASE64.encode(password)).await?;
        self.expect(&reply, &[235], "AUTH LOGIN")?;

        Ok(())
    }

    async fn envelope(&self, connection: &mut Connection, mail: &Mail) -> Result<()> {
        let reply = self
            .command(connection, &format!("MAIL FROM:<{}>", mail.from))
            .await?;
        self.expect(&reply, &[250], "MAIL FROM")?;

        let reply = self
            .command(connection, &format!("RCPT TO:<{}>", mail.to))
            .await?;
        self.expect(&reply, &[250, 251], "RCPT TO")?;

        Ok(())
    }

    async fn transmit(&self, connection: &mut Connection, mail: &Mail) -> Result<()> {
        let reply = self.command(connection, "DATA").await?;
        self.expect(&reply, &[354], "DATA")?;

        let rendered = mail.render(&self.config.domain);
        for line in rendered.split("\r\n") {
            self.send_line(connection, &dot_stuff(line)).await?;
        }

        let reply = self.command(connection, ".").await?;
        self.expect(&reply, &[250], "DATA")?;

        Ok(())
    }

    /// QUIT is best effort: the message is already accepted, so a server
    /// misbehaving here only draws a warning.
    async fn quit(&self, connection: &mut Connection) {
        match self.command(connection, "QUIT").await {
            Ok(reply) if reply.code == 221 => {}
            Ok(reply) => tracing::warn!(code = reply.code, "unexpected reply to QUIT"),
            Err(err) => tracing::warn!(%err, "QUIT failed"),
        }
    }

    async fn command(&self, connection: &mut Connection, line: &str) -> Result<Reply> {
        self.send_line(connection, line).await?;
        self.read_reply(connection).await
    }

    async fn send_line(&self, connection: &mut Connection, line: &str) -> Result<()> {
        self.transcript.push(line);
        connection.write_line(line).await
    }

    /// Reads one complete reply, following continuation lines until the
    /// final one.
    async fn read_reply(&self, connection: &mut Connection) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let raw = connection.read_line(self.config.timeout).await?;
            self.transcript.push(raw.clone());

            let line = ReplyLine::parse(&raw)?;
            let is_last = line.is_last;
            lines.push(line);
            if is_last {
                break;
            }
        }
        Reply::assemble(lines)
    }

    fn expect(&self, reply: &Reply, accepted: &[u16], step: &str) -> Result<()> {
        if accepted.contains(&reply.code) {
            return Ok(());
        }
        Err(Error::Smtp {
            code: reply.code,
            message: format!("{step} failed: {}", reply.message()),
        })
    }
}

/// RFC 5321 section 4.5.2: a data line beginning with a dot gets one more,
/// so the lone-dot terminator stays unambiguous.
fn dot_stuff(line: &str) -> Cow<'_, str> {
    if line.starts_with('.') {
        Cow::Owned(format!(".{line}"))
    } else {
        Cow::Borrowed(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_stuffing() {
        assert_eq!(dot_stuff("hello"), "hello");
        assert_eq!(dot_stuff(""), "");
        assert_eq!(dot_stuff("."), "..");
        assert_eq!(dot_stuff(".hidden"), "..hidden");
        assert_eq!(dot_stuff("..already"), "...already");
    }

    #[test]
    fn expect_wraps_the_step_context() {
        let config = Config::new("example.com");
        let transcript = Transcript::new();
        let transaction = Transaction::new(&config, &transcript);

        let reply = Reply {
            code: 550,
            lines: vec!["5.1.1 No such user here".to_string()],
        };
        let err = transaction
            .expect(&reply, &[250], "MAIL FROM")
            .expect_err("550 must not pass for MAIL FROM");

        match err {
            Error::Smtp { code, message } => {
                assert_eq!(code, 550);
                assert!(message.contains("MAIL FROM failed"));
                assert!(message.contains("No such user"));
            }
            other => panic!("expected an SMTP error, got {other:?}"),
        }
    }

    #[test]
    fn expect_accepts_any_listed_code() {
        let config = Config::new("example.com");
        let transcript = Transcript::new();
        let transaction = Transaction::new(&config, &transcript);

        let reply = Reply {
            code: 251,
            lines: vec!["User not local; will forward".to_string()],
        };
        assert!(transaction.expect(&reply, &[250, 251], "RCPT TO").is_ok());
    }
}
