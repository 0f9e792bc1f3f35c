//! `_redirects` parsing and matching (spec §4.2 step 2).

use crate::error::AssetsError;
use crate::pattern::{substitute, CompiledPattern};

pub const DEFAULT_MAX_STATIC_REDIRECTS: usize = 2000;
pub const DEFAULT_MAX_DYNAMIC_REDIRECTS: usize = 100;
const VALID_STATUSES: [u16; 6] = [301, 302, 303, 307, 308, 200];

#[derive(Debug, Clone)]
pub struct RedirectRule {
    pattern: CompiledPattern,
    to: String,
    pub status: u16,
}

pub struct RedirectRules {
    rules: Vec<RedirectRule>,
}

/// Outcome of matching the request path against the redirect rule set.
pub enum RedirectMatch {
    /// A 3xx: caller should respond with `Location` and this status.
    Redirect { location: String, status: u16 },
    /// A 200 rule: internal rewrite, continue resolution with this path.
    Rewrite { path: String },
}

impl RedirectRules {
    pub fn parse(
        content: &str,
        max_static: usize,
        max_dynamic: usize,
    ) -> Result<Self, AssetsError> {
        let mut rules = Vec::new();
        let mut static_count = 0usize;
        let mut dynamic_count = 0usize;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
                continue;
            };
            let status = match parts.next() {
                Some(s) => s.parse::<u16>().unwrap_or(302),
                None => 302,
            };
            if !VALID_STATUSES.contains(&status) {
                continue;
            }
            let pattern = CompiledPattern::compile(from, "_redirects")?;
            if pattern.is_static() {
                static_count += 1;
            } else {
                dynamic_count += 1;
            }
            rules.push(RedirectRule { pattern, to: to.to_string(), status });
        }
        if static_count > max_static {
            return Err(AssetsError::TooManyRules {
                file: "_redirects",
                kind: "static",
                count: static_count,
                limit: max_static,
            });
        }
        if dynamic_count > max_dynamic {
            return Err(AssetsError::TooManyRules {
                file: "_redirects",
                kind: "dynamic",
                count: dynamic_count,
                limit: max_dynamic,
            });
        }
        Ok(Self { rules })
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// First matching rule wins (spec §4.2 step 2).
    pub fn matches(&self, path: &str, query: &str) -> Option<RedirectMatch> {
        for rule in &self.rules {
            let Some(captures) = rule.pattern.captures(path) else { continue };
            let target = substitute(&rule.to, &captures);
            if rule.status == 200 {
                return Some(RedirectMatch::Rewrite { path: target });
            }
            let location = if query.is_empty() { target } else { format!("{target}?{query}") };
            return Some(RedirectMatch::Redirect { location, status: rule.status });
        }
        None
    }
}

#[cfg(test)]
#[path = "redirects_tests.rs"]
mod tests;
