//! Email binding (spec §4.3): persists sent emails and parses forwarded
//! RFC-5322 messages for the `email` handler.

use crate::db::Db;
use crate::error::StorageError;
use forge_core::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Sent,
    Forwarded,
    Rejected,
}

forge_core::simple_display! {
    EmailStatus {
        Sent => "sent",
        Forwarded => "forwarded",
        Rejected => "rejected",
    }
}

#[derive(Clone)]
pub struct EmailBinding<C: Clock> {
    db: Db,
    name: String,
    allowed_destinations: Vec<String>,
    clock: C,
}

impl<C: Clock> EmailBinding<C> {
    pub fn new(db: Db, name: impl Into<String>, allowed_destinations: Vec<String>, clock: C) -> Self {
        Self { db, name: name.into(), allowed_destinations, clock }
    }

    /// `send_email(message)` — enforces the destination allow-list.
    pub fn send(&self, from: &str, to: &str, raw: &[u8]) -> Result<(), StorageError> {
        let (status, reason) = if self.allowed_destinations.is_empty()
            || self.allowed_destinations.iter().any(|d| d.eq_ignore_ascii_case(to))
        {
            (EmailStatus::Sent, None)
        } else {
            (EmailStatus::Rejected, Some(format!("destination {to} not in allow-list")))
        };
        self.record(from, to, raw, status, reason)?;
        if status == EmailStatus::Rejected {
            return Err(StorageError::InvalidInput(format!("destination {to} not allowed")));
        }
        Ok(())
    }

    fn record(
        &self,
        from: &str,
        to: &str,
        raw: &[u8],
        status: EmailStatus,
        reason: Option<String>,
    ) -> Result<(), StorageError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = self.clock.epoch_ms();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO email_messages (id, binding, sender, recipient, raw, status, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![id, self.name, from, to, raw, status.to_string(), reason, now],
            )?;
            Ok(())
        })
    }
}

/// A forwardable message handed to the `email` handler: parses RFC-5322
/// headers, including folded continuation lines, leaving the body raw.
#[derive(Debug, Clone)]
pub struct ForwardableMessage {
    pub from: String,
    pub to: String,
    pub headers: Vec<(String, String)>,
    pub raw: Vec<u8>,
}

impl ForwardableMessage {
    pub fn parse(from: &str, to: &str, raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut headers = Vec::new();
        let mut lines = text.lines().peekable();
        while let Some(line) = lines.next() {
            if line.is_empty() {
                break; // blank line ends the header block
            }
            let Some((name, value)) = line.split_once(':') else { continue };
            let mut value = value.trim_start().to_string();
            while let Some(next) = lines.peek() {
                if next.starts_with(' ') || next.starts_with('\t') {
                    value.push(' ');
                    value.push_str(next.trim());
                    lines.next();
                } else {
                    break;
                }
            }
            headers.push((name.trim().to_string(), value));
        }
        Self { from: from.to_string(), to: to.to_string(), headers, raw: raw.to_vec() }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
#[path = "email_tests.rs"]
mod tests;
