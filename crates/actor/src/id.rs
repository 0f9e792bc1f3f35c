//! Durable actor identity (spec §4.5.1).

use md5::{Digest, Md5};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorId {
    raw: String,
    name: Option<String>,
}

impl ActorId {
    /// `newUniqueId()` — random, unnamed.
    pub fn new_unique() -> Self {
        Self { raw: uuid::Uuid::new_v4().simple().to_string(), name: None }
    }

    /// `idFromName(name)` — deterministic hash of `name`, retaining it.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        Self { raw: hex::encode(digest), name: Some(name.to_string()) }
    }

    /// `idFromString(raw)` — identity; the raw id is taken as-is.
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self { raw: raw.into(), name: None }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
