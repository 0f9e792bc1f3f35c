//! Shared pattern syntax for `_redirects` and `_headers` (spec §4.2): literal
//! path segments, a `*` splat capturing the remainder, and `:name` named
//! placeholders matching exactly one segment.

use regex::Regex;

use crate::error::AssetsError;

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    names: Vec<String>,
}

/// Characters a literal segment may contain unescaped. Anything outside this
/// set is a regex metacharacter that must have been escaped with `\`;
/// reaching one bare is a config error (spec §4.2: "Pattern compilation fails
/// ... if a literal regex metacharacter is reached with no escape").
fn is_safe_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '~' | '%')
}

impl CompiledPattern {
    pub fn compile(pattern: &str, file: &'static str) -> Result<Self, AssetsError> {
        let mut names = Vec::new();
        let mut regex_src = String::from("^");
        let segments: Vec<&str> = pattern.split('/').collect();
        for (i, seg) in segments.iter().enumerate() {
            if i > 0 {
                regex_src.push('/');
            }
            if *seg == "*" {
                names.push("splat".to_string());
                regex_src.push_str("(.*)");
            } else if let Some(name) = seg.strip_prefix(':') {
                if name.is_empty() {
                    return Err(AssetsError::InvalidConfig {
                        file,
                        reason: format!("empty placeholder name in {pattern:?}"),
                    });
                }
                names.push(name.to_string());
                regex_src.push_str("([^/]+)");
            } else {
                let mut chars = seg.chars().peekable();
                while let Some(c) = chars.next() {
                    if c == '\\' {
                        match chars.next() {
                            Some(escaped) => {
                                regex_src.push_str(&regex::escape(&escaped.to_string()));
                            }
                            None => {
                                return Err(AssetsError::InvalidConfig {
                                    file,
                                    reason: format!("trailing escape in {pattern:?}"),
                                });
                            }
                        }
                    } else if is_safe_literal_char(c) {
                        regex_src.push_str(&regex::escape(&c.to_string()));
                    } else {
                        return Err(AssetsError::InvalidConfig {
                            file,
                            reason: format!(
                                "unescaped metacharacter '{c}' in {pattern:?}"
                            ),
                        });
                    }
                }
            }
        }
        regex_src.push('$');
        let regex = Regex::new(&regex_src).map_err(|e| AssetsError::InvalidConfig {
            file,
            reason: e.to_string(),
        })?;
        Ok(Self { regex, names })
    }

    /// True when the pattern contains no splat/placeholder — spec's
    /// "static" vs "dynamic" redirect-rule distinction for limit counting.
    pub fn is_static(&self) -> bool {
        self.names.is_empty()
    }

    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), caps.get(i + 1).map(|m| m.as_str()).unwrap_or("").to_string()))
                .collect(),
        )
    }
}

/// Substitute `:name`/`:splat` tokens in a redirect/header target with the
/// values captured from the matching pattern.
pub fn substitute(template: &str, captures: &[(String, String)]) -> String {
    let mut out = template.to_string();
    for (name, value) in captures {
        out = out.replace(&format!(":{name}"), value);
    }
    out
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
