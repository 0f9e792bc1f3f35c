//! Cache binding (spec §4.3): maps `(cacheName, requestURL)` to a stored
//! response.

use crate::db::Db;
use crate::error::StorageError;
use forge_core::Clock;

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct Cache<C: Clock> {
    db: Db,
    name: String,
    clock: C,
}

impl<C: Clock> Cache<C> {
    pub fn new(db: Db, name: impl Into<String>, clock: C) -> Self {
        Self { db, name: name.into(), clock }
    }

    pub fn put(&self, url: &str, response: &CachedResponse) -> Result<(), StorageError> {
        let expires_at = expiration_from_headers(&response.headers, self.clock.epoch_secs());
        let headers = serde_json::to_string(&response.headers)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cache_entries (cache_name, url, status, headers, body, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(cache_name, url) DO UPDATE SET
                    status = excluded.status, headers = excluded.headers,
                    body = excluded.body, expires_at = excluded.expires_at",
                rusqlite::params![self.name, url, response.status as i64, headers, response.body, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, url: &str) -> Result<Option<CachedResponse>, StorageError> {
        let now = self.clock.epoch_secs();
        self.db.with_conn(|conn| {
            let row: Option<(i64, String, Vec<u8>, Option<i64>)> = conn
                .query_row(
                    "SELECT status, headers, body, expires_at FROM cache_entries WHERE cache_name = ?1 AND url = ?2",
                    rusqlite::params![self.name, url],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
                )
                .ok();
            let Some((status, headers, body, expires_at)) = row else { return Ok(None) };
            if expires_at.is_some_and(|exp| exp <= now) {
                return Ok(None);
            }
            let headers = serde_json::from_str(&headers).unwrap_or_default();
            Ok(Some(CachedResponse { status: status as u16, headers, body }))
        })
    }

    pub fn delete(&self, url: &str) -> Result<bool, StorageError> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM cache_entries WHERE cache_name = ?1 AND url = ?2",
                rusqlite::params![self.name, url],
            )?;
            Ok(n > 0)
        })
    }
}

/// Derive an absolute expiration (epoch seconds) from `Cache-Control:
/// max-age` or `Expires`, whichever is present (max-age preferred).
fn expiration_from_headers(headers: &[(String, String)], now: i64) -> Option<i64> {
    for (key, value) in headers {
        if key.eq_ignore_ascii_case("cache-control") {
            for directive in value.split(',') {
                let directive = directive.trim();
                if let Some(seconds) = directive.strip_prefix("max-age=") {
                    if let Ok(seconds) = seconds.parse::<i64>() {
                        return Some(now + seconds);
                    }
                }
            }
        }
    }
    for (key, value) in headers {
        if key.eq_ignore_ascii_case("expires") {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(value) {
                return Some(dt.timestamp());
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
