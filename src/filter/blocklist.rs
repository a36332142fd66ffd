//! Blocklist of denied domain names.
//!
//! Loaded once at startup from a newline-delimited file and only read
//! afterwards. Matching is exact: no case folding, no trailing-dot
//! normalization, no parent-domain matching.

use rustc_hash::FxHashSet;
use std::borrow::Cow;
use std::io;
use std::path::Path;

use tracing::{info, warn};

/// A set of blocked domain names.
#[derive(Debug, Default)]
pub struct Blocklist {
    domains: FxHashSet<String>,
}

impl Blocklist {
    /// An empty blocklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a blocklist from newline-delimited text.
    ///
    /// Blank lines and `#` comments are skipped; surrounding whitespace
    /// (including a Windows `\r`) is trimmed.
    pub fn from_lines(text: &str) -> Self {
        let domains = text
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                Some(line.to_string())
            })
            .collect();

        Self { domains }
    }

    /// Load the blocklist at `path`.
    ///
    /// A missing file is not an error: it yields an empty blocklist. Bytes
    /// that are not UTF-8 are replaced, so only the affected lines are lost.
    pub fn load(path: &Path) -> io::Result<Self> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                if let Cow::Owned(_) = text {
                    warn!(path = %path.display(), "blocklist contains invalid UTF-8");
                }
                let blocklist = Self::from_lines(&text);
                info!(path = %path.display(), domains = blocklist.len(), "blocklist loaded");
                Ok(blocklist)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no blocklist found, nothing will be blocked");
                Ok(Self::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Check if a domain is blocked.
    pub fn is_blocked(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    /// Returns the number of domains in the blocklist.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
