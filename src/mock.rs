//! Scripted mock SMTP server bound in place of the network in test mode.

use std::collections::VecDeque;

/// Hostname the mock announces about itself.
const MOCK_HOST: &str = "postrider.test";

/// Envelope stage a [`RejectRule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    MailFrom,
    RcptTo,
}

/// A scripted rejection: at `stage`, an address whose local part begins
/// with `marker` draws `code` and `text` instead of the normal acceptance.
struct RejectRule {
    stage: Stage,
    marker: &'static str,
    code: u16,
    text: &'static str,
}

/// Recognized trigger addresses, checked by local-part prefix.
const REJECT_RULES: &[RejectRule] = &[
    RejectRule {
        stage: Stage::MailFrom,
        marker: "fail-from",
        code: 550,
        text: "5.1.1 No such user here",
    },
    RejectRule {
        stage: Stage::RcptTo,
        marker: "fail-to",
        code: 551,
        text: "5.1.6 User not local; please try forwarding",
    },
    RejectRule {
        stage: Stage::RcptTo,
        marker: "fail-quota",
        code: 552,
        text: "5.2.2 Requested mail action aborted: exceeded storage allocation",
    },
];

/// Where the mock is in the session. Advances monotonically through the
/// same step sequence the engine drives; commands arriving out of order are
/// answered with 503 and do not move the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Greeting queued, awaiting EHLO/HELO.
    Hello,
    /// Hello done, awaiting STARTTLS, AUTH, or MAIL FROM.
    Ready,
    /// AUTH LOGIN issued, awaiting the username line.
    AuthUsername,
    /// Username consumed, awaiting the password line.
    AuthPassword,
    /// MAIL FROM accepted, awaiting RCPT TO.
    RcptTo,
    /// At least one recipient accepted, awaiting DATA (or more RCPT TO).
    Data,
    /// 354 issued, consuming message lines until the lone dot.
    Body,
    /// QUIT answered; nothing further is accepted.
    Done,
}

/// A deterministic in-memory SMTP server.
///
/// Commands written to it queue canned, RFC-plausible reply lines that are
/// then read back one at a time, so the protocol engine runs its full
/// course without any network access.
#[derive(Debug)]
pub(crate) struct MockSession {
    state: State,
    /// Set by the simulated STARTTLS upgrade; drops the STARTTLS
    /// advertisement from subsequent EHLO replies.
    pub(crate) tls_active: bool,
    replies: VecDeque<String>,
}

impl MockSession {
    pub(crate) fn new() -> Self {
        let mut session = Self {
            state: State::Hello,
            tls_active: false,
            replies: VecDeque::new(),
        };
        session.push(format!("220 {MOCK_HOST} ESMTP ready"));
        session
    }

    /// Pops the next queued reply line, if any.
    pub(crate) fn read_line(&mut self) -> Option<String> {
        self.replies.pop_front()
    }

    /// Feeds one client line into the session, advancing the state machine
    /// and queueing the reply.
    pub(crate) fn write_line(&mut self, line: &str) {
        match self.state {
            State::Body => {
                if line == "." {
                    self.push("250 2.0.0 Ok: message accepted");
                    self.state = State::Ready;
                }
                // message lines are swallowed without a reply
                return;
            }
            State::AuthUsername => {
                // base64 "Password:"
                self.push("334 UGFzc3dvcmQ6");
                self.state = State::AuthPassword;
                return;
            }
            State::AuthPassword => {
                self.push("235 2.7.0 Authentication successful");
                self.state = State::Ready;
                return;
            }
            _ => {}
        }

        let upper = line.to_uppercase();
        let verb = upper.split_whitespace().next().unwrap_or("");

        match verb {
            "QUIT" => {
                self.push(format!("221 2.0.0 {MOCK_HOST} closing connection"));
                self.state = State::Done;
            }
            "EHLO" | "HELO" if matches!(self.state, State::Hello | State::Ready) => {
                let client = line.split_whitespace().nth(1).unwrap_or("client");
                if verb == "EHLO" {
                    self.push(format!("250-{MOCK_HOST} greets {client}"));
                    if !self.tls_active {
                        self.push("250-STARTTLS");
                    }
                    self.push("250-AUTH LOGIN PLAIN");
                    self.push("250 OK");
                } else {
                    self.push(format!("250 {MOCK_HOST}"));
                }
                self.state = State::Ready;
            }
            "STARTTLS" if self.state == State::Ready && !self.tls_active => {
                // negotiated state resets; the client must hello again
                self.push("220 2.0.0 Ready to start TLS");
                self.state = State::Hello;
            }
            "AUTH" if self.state == State::Ready => {
                // base64 "Username:"
                self.push("334 VXNlcm5hbWU6");
                self.state = State::AuthUsername;
            }
            "MAIL" if self.state == State::Ready => match reject_for(Stage::MailFrom, line) {
                Some(rule) => self.push(format!("{} {}", rule.code, rule.text)),
                None => {
                    self.push("250 2.1.0 Ok");
                    self.state = State::RcptTo;
                }
            },
            "RCPT" if matches!(self.state, State::RcptTo | State::Data) => {
                match reject_for(Stage::RcptTo, line) {
                    Some(rule) => self.push(format!("{} {}", rule.code, rule.text)),
                    None => {
                        self.push("250 2.1.5 Ok");
                        self.state = State::Data;
                    }
                }
            }
            "DATA" if self.state == State::Data => {
                self.push("354 End data with <CR><LF>.<CR><LF>");
                self.state = State::Body;
            }
            "EHLO" | "HELO" | "STARTTLS" | "AUTH" | "MAIL" | "RCPT" | "DATA" => {
                self.push("503 5.5.1 Bad sequence of commands");
            }
            _ => self.push("500 5.5.2 Error: command not recognized"),
        }
    }

    fn push(&mut self, reply: impl Into<String>) {
        self.replies.push_back(reply.into());
    }
}

/// Looks up the reject rule matching the address in a MAIL FROM / RCPT TO
/// command line, if any.
fn reject_for(stage: Stage, line: &str) -> Option<&'static RejectRule> {
    let address = line
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(address, _)| address)?;

    REJECT_RULES
        .iter()
        .filter(|rule| rule.stage == stage)
        .find(|rule| address.starts_with(rule.marker))
}
