//! WebSocket hibernation surface (spec §4.5.5): the accepted-socket
//! registry, tags, serialized attachments, and auto-response fast path.
//!
//! Generic over the socket handle type `S` so this crate stays decoupled
//! from the concrete transport (an `axum` WebSocket sink lives in
//! `forge-runtime`); `S` just needs to be a cheap, hashable handle.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::ActorError;

pub const MAX_SOCKETS: usize = 32_768;
pub const MAX_TAGS_PER_SOCKET: usize = 10;
pub const MAX_TAG_BYTES: usize = 256;

#[derive(Default)]
struct SocketEntry {
    tags: HashSet<String>,
    attachment: Option<Vec<u8>>,
    auto_response_timestamp: Option<i64>,
}

#[derive(Default)]
pub struct WebSocketRegistry<S: Clone + Eq + Hash> {
    sockets: HashMap<S, SocketEntry>,
    auto_response: Option<(Vec<u8>, Vec<u8>)>,
}

impl<S: Clone + Eq + Hash> WebSocketRegistry<S> {
    pub fn new() -> Self {
        Self { sockets: HashMap::new(), auto_response: None }
    }

    /// `state.acceptWebSocket(ws, tags?)`.
    pub fn accept(&mut self, socket: S, tags: Vec<String>) -> Result<(), ActorError> {
        if self.sockets.len() >= MAX_SOCKETS && !self.sockets.contains_key(&socket) {
            return Err(ActorError::LimitExceeded { what: "concurrent websockets", count: self.sockets.len() + 1, limit: MAX_SOCKETS });
        }
        if tags.len() > MAX_TAGS_PER_SOCKET {
            return Err(ActorError::LimitExceeded { what: "tags per socket", count: tags.len(), limit: MAX_TAGS_PER_SOCKET });
        }
        for tag in &tags {
            if tag.len() > MAX_TAG_BYTES {
                return Err(ActorError::LimitExceeded { what: "tag bytes", count: tag.len(), limit: MAX_TAG_BYTES });
            }
        }
        self.sockets.entry(socket).or_default().tags = tags.into_iter().collect();
        Ok(())
    }

    /// Closed sockets are removed from the accepted set (spec §4.5.5).
    pub fn remove(&mut self, socket: &S) {
        self.sockets.remove(socket);
    }

    pub fn get_websockets(&self, tag: Option<&str>) -> Vec<S> {
        self.sockets
            .iter()
            .filter(|(_, entry)| tag.map_or(true, |t| entry.tags.contains(t)))
            .map(|(socket, _)| socket.clone())
            .collect()
    }

    pub fn get_tags(&self, socket: &S) -> Vec<String> {
        self.sockets.get(socket).map(|e| e.tags.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn serialize_attachment(&mut self, socket: &S, bytes: Vec<u8>) {
        if let Some(entry) = self.sockets.get_mut(socket) {
            entry.attachment = Some(bytes);
        }
    }

    pub fn deserialize_attachment(&self, socket: &S) -> Option<Vec<u8>> {
        self.sockets.get(socket).and_then(|e| e.attachment.clone())
    }

    pub fn active_count(&self) -> usize {
        self.sockets.len()
    }

    /// `setWebSocketAutoResponse({request, response})`.
    pub fn set_auto_response(&mut self, request: Vec<u8>, response: Vec<u8>) {
        self.auto_response = Some((request, response));
    }

    pub fn clear_auto_response(&mut self) {
        self.auto_response = None;
    }

    /// Returns the fast-path response when `message` byte-exactly matches
    /// the registered auto-response request; records the timestamp without
    /// invoking the user handler (spec §4.5.5).
    pub fn try_auto_respond(&mut self, socket: &S, message: &[u8], now_ms: i64) -> Option<Vec<u8>> {
        let (request, response) = self.auto_response.as_ref()?;
        if request.as_slice() != message {
            return None;
        }
        let response = response.clone();
        if let Some(entry) = self.sockets.get_mut(socket) {
            entry.auto_response_timestamp = Some(now_ms);
        }
        Some(response)
    }

    pub fn auto_response_timestamp(&self, socket: &S) -> Option<i64> {
        self.sockets.get(socket).and_then(|e| e.auto_response_timestamp)
    }
}

#[cfg(test)]
#[path = "hibernation_tests.rs"]
mod tests;
