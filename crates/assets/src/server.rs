//! The static-asset request pipeline (spec §4.2): traversal guard, redirects,
//! trailing-slash policy, resolution order, not-found handling, ETag/headers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use percent_encoding::percent_decode_str;

use crate::error::AssetsError;
use crate::headers::{HeaderRules, DEFAULT_MAX_LINE_BYTES, DEFAULT_MAX_RULES};
use crate::redirects::{RedirectMatch, RedirectRules, DEFAULT_MAX_DYNAMIC_REDIRECTS, DEFAULT_MAX_STATIC_REDIRECTS};
use forge_core::config::{HtmlHandling, NotFoundHandling};

#[derive(Debug, Clone)]
pub enum AssetBody {
    File(PathBuf),
    Empty,
}

#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: AssetBody,
}

impl AssetResponse {
    fn plain(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: AssetBody::Empty }
    }
}

pub struct AssetServer {
    root: PathBuf,
    html_handling: HtmlHandling,
    not_found_handling: NotFoundHandling,
    redirects: RedirectRules,
    headers: HeaderRules,
}

impl AssetServer {
    pub fn open(
        root: impl Into<PathBuf>,
        html_handling: HtmlHandling,
        not_found_handling: NotFoundHandling,
    ) -> Result<Self, AssetsError> {
        let root = root.into();
        let redirects = match fs::read_to_string(root.join("_redirects")) {
            Ok(content) => RedirectRules::parse(
                &content,
                DEFAULT_MAX_STATIC_REDIRECTS,
                DEFAULT_MAX_DYNAMIC_REDIRECTS,
            )?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RedirectRules::empty(),
            Err(e) => return Err(e.into()),
        };
        let headers = match fs::read_to_string(root.join("_headers")) {
            Ok(content) => HeaderRules::parse(&content, DEFAULT_MAX_RULES, DEFAULT_MAX_LINE_BYTES)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HeaderRules::empty(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { root, html_handling, not_found_handling, redirects, headers })
    }

    /// Runs the full pipeline from spec §4.2 for one request.
    pub fn resolve(
        &self,
        raw_path: &str,
        query: &str,
        if_none_match: Option<&str>,
    ) -> Result<AssetResponse, AssetsError> {
        let decoded = percent_decode_str(raw_path)
            .decode_utf8()
            .map_err(|_| AssetsError::InvalidPath)?
            .into_owned();
        if decoded.contains("..") {
            return Ok(AssetResponse::plain(400));
        }
        let mut path = decoded;
        if !path.starts_with('/') {
            return Ok(AssetResponse::plain(400));
        }

        if let Some(m) = self.redirects.matches(&path, query) {
            match m {
                RedirectMatch::Redirect { location, status } => {
                    return Ok(AssetResponse {
                        status,
                        headers: vec![("Location".to_string(), location)],
                        body: AssetBody::Empty,
                    });
                }
                RedirectMatch::Rewrite { path: rewritten } => path = rewritten,
            }
        }

        let has_extension = Path::new(&path).extension().is_some();
        match self.html_handling {
            HtmlHandling::ForceTrailingSlash if !has_extension && !path.ends_with('/') => {
                return Ok(AssetResponse {
                    status: 307,
                    headers: vec![("Location".to_string(), format!("{path}/"))],
                    body: AssetBody::Empty,
                });
            }
            HtmlHandling::DropTrailingSlash if path.ends_with('/') && path != "/" => {
                return Ok(AssetResponse {
                    status: 307,
                    headers: vec![("Location".to_string(), path.trim_end_matches('/').to_string())],
                    body: AssetBody::Empty,
                });
            }
            _ => {}
        }

        if let Some(file) = self.resolve_file(&path)? {
            return self.decorate(file, if_none_match);
        }

        self.not_found(&path)
    }

    fn resolve_file(&self, path: &str) -> Result<Option<PathBuf>, AssetsError> {
        let candidate = self.join_safe(path)?;
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        if path == "/" {
            let index = self.join_safe("/index.html")?;
            if index.is_file() {
                return Ok(Some(index));
            }
            return Ok(None);
        }
        if self.html_handling != HtmlHandling::None {
            let with_index = self.join_safe(&format!("{}/index.html", path.trim_end_matches('/')))?;
            if with_index.is_file() {
                return Ok(Some(with_index));
            }
            let with_ext = self.join_safe(&format!("{}.html", path.trim_end_matches('/')))?;
            if with_ext.is_file() {
                return Ok(Some(with_ext));
            }
        }
        Ok(None)
    }

    fn join_safe(&self, path: &str) -> Result<PathBuf, AssetsError> {
        let relative = path.trim_start_matches('/');
        let candidate = self.root.join(relative);
        let canonical_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        if let Ok(canonical) = candidate.canonicalize() {
            if !canonical.starts_with(&canonical_root) {
                return Err(AssetsError::PathTraversal);
            }
        }
        Ok(candidate)
    }

    fn not_found(&self, path: &str) -> Result<AssetResponse, AssetsError> {
        match self.not_found_handling {
            NotFoundHandling::None => Ok(AssetResponse::plain(404)),
            NotFoundHandling::SinglePageApplication => {
                let has_extension = Path::new(path).extension().is_some();
                if has_extension {
                    return Ok(AssetResponse::plain(404));
                }
                let index = self.root.join("index.html");
                if index.is_file() {
                    return self.decorate(index, None).map(|mut r| {
                        r.status = 200;
                        r
                    });
                }
                Ok(AssetResponse::plain(404))
            }
            NotFoundHandling::NotFoundPage => {
                let mut dir = self.root.join(path.trim_start_matches('/'));
                if dir.is_file() {
                    dir = dir.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                }
                loop {
                    let candidate = dir.join("404.html");
                    if candidate.is_file() {
                        return self.decorate(candidate, None).map(|mut r| {
                            r.status = 404;
                            r
                        });
                    }
                    if dir == self.root {
                        break;
                    }
                    match dir.parent() {
                        Some(parent) if parent.starts_with(&self.root) || parent == self.root => {
                            dir = parent.to_path_buf();
                        }
                        _ => break,
                    }
                }
                Ok(AssetResponse::plain(404))
            }
        }
    }

    fn decorate(&self, file: PathBuf, if_none_match: Option<&str>) -> Result<AssetResponse, AssetsError> {
        let meta = fs::metadata(&file)?;
        let mtime_ms = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let etag = format!(
            "\"{}-{}\"",
            to_base36(mtime_ms as u128),
            to_base36(meta.len() as u128)
        );

        if if_none_match == Some(etag.as_str()) {
            return Ok(AssetResponse {
                status: 304,
                headers: vec![("ETag".to_string(), etag)],
                body: AssetBody::Empty,
            });
        }

        let content_type = mime_guess::from_path(&file).first_or_octet_stream().to_string();
        let mut headers = vec![
            ("ETag".to_string(), etag),
            ("Content-Type".to_string(), content_type),
            ("Cache-Control".to_string(), "public, max-age=0, must-revalidate".to_string()),
        ];

        let request_path = format!(
            "/{}",
            file.strip_prefix(&self.root).unwrap_or(&file).to_string_lossy()
        );
        self.headers.apply(&request_path, &mut headers);

        Ok(AssetResponse { status: 200, headers, body: AssetBody::File(file) })
    }
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
