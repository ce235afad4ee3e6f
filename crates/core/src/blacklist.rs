//! Case-insensitive substring blacklist, loaded once and cached for the
//! process lifetime (§3, §5). Read-many, written once on first access.

use crate::error::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    /// Lowercased substrings.
    terms: Arc<Vec<String>>,
}

impl Blacklist {
    /// Load a newline-separated blacklist file. `#`-prefixed lines are NOT
    /// treated as comments (§6): every non-empty line is a substring.
    pub fn load(path: &str) -> Result<Self> {
        let terms = match std::fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| l.to_lowercase())
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            terms: Arc::new(terms),
        })
    }

    /// True if `title` (case-insensitively) contains any blacklisted term.
    pub fn is_blacklisted(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.terms.iter().any(|term| lower.contains(term.as_str()))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// One-shot cache around `Blacklist::load`, so every caller within the
/// process shares a single parse of the file (§5).
#[derive(Debug, Default)]
pub struct BlacklistCache {
    cell: OnceCell<Blacklist>,
}

impl BlacklistCache {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub async fn get_or_load(&self, path: &str) -> Result<Blacklist> {
        self.cell
            .get_or_try_init(|| async { Blacklist::load(path) })
            .await
            .cloned()
    }
}
