//! `_headers` parsing and application (spec §4.2, final paragraph).

use crate::error::AssetsError;
use crate::pattern::CompiledPattern;

pub const DEFAULT_MAX_RULES: usize = 100;
pub const DEFAULT_MAX_LINE_BYTES: usize = 2000;

enum Directive {
    Set(String, String),
    Remove(String),
}

struct HeaderBlock {
    pattern: CompiledPattern,
    directives: Vec<Directive>,
}

pub struct HeaderRules {
    blocks: Vec<HeaderBlock>,
}

impl HeaderRules {
    pub fn parse(content: &str, max_rules: usize, max_line_bytes: usize) -> Result<Self, AssetsError> {
        let mut blocks: Vec<HeaderBlock> = Vec::new();
        for line in content.lines() {
            if line.len() > max_line_bytes {
                return Err(AssetsError::InvalidConfig {
                    file: "_headers",
                    reason: format!("line exceeds {max_line_bytes} bytes"),
                });
            }
            if line.trim().is_empty() {
                continue;
            }
            if !line.starts_with(' ') && !line.starts_with('\t') {
                let pattern = CompiledPattern::compile(line.trim(), "_headers")?;
                blocks.push(HeaderBlock { pattern, directives: Vec::new() });
                continue;
            }
            let Some(block) = blocks.last_mut() else { continue };
            let body = line.trim();
            if let Some(name) = body.strip_prefix('!') {
                block.directives.push(Directive::Remove(name.trim().to_string()));
            } else if let Some((name, value)) = body.split_once(':') {
                block
                    .directives
                    .push(Directive::Set(name.trim().to_string(), value.trim().to_string()));
            }
        }
        if blocks.len() > max_rules {
            return Err(AssetsError::TooManyRules {
                file: "_headers",
                kind: "rule",
                count: blocks.len(),
                limit: max_rules,
            });
        }
        Ok(Self { blocks })
    }

    pub fn empty() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Applies every matching block's directives, in file order, on top of
    /// `headers` (spec: "apply every rule whose pattern matches ... in file
    /// order").
    pub fn apply(&self, path: &str, headers: &mut Vec<(String, String)>) {
        for block in &self.blocks {
            if block.pattern.captures(path).is_none() {
                continue;
            }
            for directive in &block.directives {
                match directive {
                    Directive::Set(name, value) => {
                        headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
                        headers.push((name.clone(), value.clone()));
                    }
                    Directive::Remove(name) => {
                        headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "headers_tests.rs"]
mod tests;
