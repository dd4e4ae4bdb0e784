//! SMTP reply parsing and classification.

use crate::error::{Error, Result};

/// A single line of a server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    /// The three-digit reply code.
    pub code: u16,
    /// Whether this line ends the reply (space separator) or continues it
    /// (dash separator).
    pub is_last: bool,
    /// The text following the separator.
    pub text: String,
}

impl ReplyLine {
    /// Parses one raw reply line of the form `<code><space|dash><text>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the line does not match the reply
    /// grammar.
    pub fn parse(line: &str) -> Result<Self> {
        if line.len() < 3 || !line.is_char_boundary(3) {
            return Err(Error::Parse(format!("reply line too short: '{line}'")));
        }

        let code = line[..3]
            .parse::<u16>()
            .map_err(|_| Error::Parse(format!("invalid reply code in '{line}'")))?;

        let is_last = match line.as_bytes().get(3).copied() {
            Some(b' ') | None => true,
            Some(b'-') => false,
            Some(c) => {
                return Err(Error::Parse(format!(
                    "invalid separator '{}' in '{line}'",
                    c as char
                )));
            }
        };

        let text = if line.len() > 4 {
            line[4..].to_string()
        } else {
            String::new()
        };

        Ok(Self {
            code,
            is_last,
            text,
        })
    }
}

/// A complete server reply, possibly spanning multiple lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The reply code shared by every line.
    pub code: u16,
    /// The text of each line, in order.
    pub lines: Vec<String>,
}

impl Reply {
    /// Collects a reply from already-parsed lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when the lines disagree on the reply code,
    /// or when no lines were supplied at all.
    pub fn assemble(lines: Vec<ReplyLine>) -> Result<Self> {
        let code = lines.first().map_or_else(
            || Err(Error::Parse("empty reply".to_string())),
            |first| Ok(first.code),
        )?;

        if let Some(stray) = lines.iter().find(|l| l.code != code) {
            return Err(Error::Parse(format!(
                "reply code changed mid-reply: {code} then {}",
                stray.code
            )));
        }

        Ok(Self {
            code,
            lines: lines.into_iter().map(|l| l.text).collect(),
        })
    }

    /// The reply text with lines joined by newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// `true` for 2xx replies.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// `true` for 5xx replies.
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        self.code >= 500 && self.code < 600
    }

    /// Extension keywords advertised in an EHLO reply: the first token of
    /// every line after the server's greeting line, uppercased.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        self.lines
            .iter()
            .skip(1)
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_uppercase)
            .collect()
    }

    /// Whether the given extension keyword was advertised.
    #[must_use]
    pub fn advertises(&self, keyword: &str) -> bool {
        self.extensions().iter().any(|ext| ext == keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_final_line() {
        let line = ReplyLine::parse("220 mail.example.com ESMTP ready").unwrap();
        assert_eq!(line.code, 220);
        assert!(line.is_last);
        assert_eq!(line.text, "mail.example.com ESMTP ready");
    }

    #[test]
    fn parse_continuation_line() {
        let line = ReplyLine::parse("250-STARTTLS").unwrap();
        assert_eq!(line.code, 250);
        assert!(!line.is_last);
        assert_eq!(line.text, "STARTTLS");
    }

    #[test]
    fn parse_bare_code() {
        let line = ReplyLine::parse("354").unwrap();
        assert_eq!(line.code, 354);
        assert!(line.is_last);
        assert!(line.text.is_empty());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ReplyLine::parse("ok").is_err());
        assert!(ReplyLine::parse("2x0 hello").is_err());
        assert!(ReplyLine::parse("250_hello").is_err());
    }

    #[test]
    fn assemble_multi_line() {
        let reply = Reply::assemble(vec![
            ReplyLine::parse("250-mail.example.com greets client").unwrap(),
            ReplyLine::parse("250-STARTTLS").unwrap(),
            ReplyLine::parse("250-AUTH LOGIN PLAIN").unwrap(),
            ReplyLine::parse("250 OK").unwrap(),
        ])
        .unwrap();

        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines.len(), 4);
        assert!(reply.advertises("STARTTLS"));
        assert!(reply.advertises("AUTH"));
        assert!(!reply.advertises("SIZE"));
    }

    #[test]
    fn assemble_rejects_mismatched_codes() {
        let lines = vec![
            ReplyLine::parse("250-one").unwrap(),
            ReplyLine::parse("251 two").unwrap(),
        ];
        assert!(Reply::assemble(lines).is_err());
    }

    #[test]
    fn codes_compare_numerically() {
        let reply = Reply::assemble(vec![ReplyLine::parse("250 OK").unwrap()]).unwrap();
        assert!(reply.is_success());
        assert!(!reply.is_permanent_error());

        let reply = Reply::assemble(vec![ReplyLine::parse("550 no").unwrap()]).unwrap();
        assert!(reply.is_permanent_error());
    }
}
