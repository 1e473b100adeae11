//! The verification result cache: a primary in-memory map, with an optional
//! SQLite-backed persistence layer for callers that configure
//! [`crate::config::Config::cache_path`].
//!
//! No persistence by default (§6): a fresh [`Cache::new`] is pure memory and
//! vanishes with the process, matching the original engine's bare dict.

use std::path::Path;
use std::sync::Mutex;

use dashmap::DashMap;
use rusqlite::Connection;

use crate::model::{ParsedReference, VerificationResult};

/// Derive the cache key for a parsed reference (§4.3): the `|`-joined first
/// non-empty of `doi:<doi>`, `pmid:<pmid>`, `title:<first 50 chars>`,
/// `year:<year>`; if every field is empty, the first 100 characters of
/// `raw_text`.
pub fn cache_key(r: &ParsedReference) -> String {
    let mut parts = Vec::new();
    if let Some(doi) = &r.doi
        && !doi.is_empty()
    {
        parts.push(format!("doi:{doi}"));
    }
    if let Some(pmid) = &r.pmid
        && !pmid.is_empty()
    {
        parts.push(format!("pmid:{pmid}"));
    }
    if let Some(title) = &r.title
        && !title.is_empty()
    {
        let truncated: String = title.chars().take(50).collect();
        parts.push(format!("title:{truncated}"));
    }
    if let Some(year) = r.year {
        parts.push(format!("year:{year}"));
    }

    if parts.is_empty() {
        r.raw_text.chars().take(100).collect()
    } else {
        parts.join("|")
    }
}

/// The verification result cache. Thread-safe: the in-memory layer is a
/// [`DashMap`]; the optional SQLite layer serialises access behind a mutex.
pub struct Cache {
    memory: DashMap<String, VerificationResult>,
    sqlite: Option<Mutex<Connection>>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("memory_len", &self.memory.len())
            .field("persistent", &self.sqlite.is_some())
            .finish()
    }
}

impl Cache {
    /// An in-memory-only cache: the default, matching §6 ("no persistence
    /// by default").
    pub fn new() -> Self {
        Self {
            memory: DashMap::new(),
            sqlite: None,
        }
    }

    /// An in-memory cache layered over a SQLite file at `path`. Entries
    /// found on disk are not eagerly loaded; `get` falls through to SQLite
    /// only on a memory miss, and `insert` writes through to both layers.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS verification_cache (
                cache_key TEXT PRIMARY KEY,
                result_json TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            memory: DashMap::new(),
            sqlite: Some(Mutex::new(conn)),
        })
    }

    /// Look up a cached result. Per §5, cache insertion only ever happens
    /// after a result is fully assembled, so a hit is always a complete,
    /// previously-returned `VerificationResult`.
    pub fn get(&self, key: &str) -> Option<VerificationResult> {
        if let Some(v) = self.memory.get(key) {
            return Some(v.clone());
        }

        let sqlite = self.sqlite.as_ref()?;
        let conn = sqlite.lock().ok()?;
        let json: String = conn
            .query_row(
                "SELECT result_json FROM verification_cache WHERE cache_key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .ok()?;
        drop(conn);
        let result: VerificationResult = serde_json::from_str(&json).ok()?;
        self.memory.insert(key.to_string(), result.clone());
        Some(result)
    }

    /// Insert a fully-assembled result. Never called with a placeholder;
    /// no partial state is ever visible to a concurrent `get`.
    pub fn insert(&self, key: &str, result: VerificationResult) {
        if let Some(sqlite) = &self.sqlite
            && let Ok(conn) = sqlite.lock()
            && let Ok(json) = serde_json::to_string(&result)
        {
            let _ = conn.execute(
                "INSERT OR REPLACE INTO verification_cache (cache_key, result_json) VALUES (?1, ?2)",
                rusqlite::params![key, json],
            );
        }
        self.memory.insert(key.to_string(), result);
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VerificationStatus;
    use tempfile::NamedTempFile;

    fn sample_reference() -> ParsedReference {
        let mut r = ParsedReference::new("Smith, J. (2020). A paper.", 1);
        r.doi = Some("10.1000/xyz".to_string());
        r.pmid = Some("12345".to_string());
        r.title = Some("A paper about something long enough to truncate maybe".to_string());
        r.year = Some(2020);
        r
    }

    #[test]
    fn cache_key_concatenates_all_present_fields() {
        let r = sample_reference();
        assert_eq!(
            cache_key(&r),
            "doi:10.1000/xyz|pmid:12345|title:A paper about something long enough to truncate ma|year:2020"
        );
    }

    #[test]
    fn cache_key_with_only_doi() {
        let mut r = sample_reference();
        r.pmid = None;
        r.title = None;
        r.year = None;
        assert_eq!(cache_key(&r), "doi:10.1000/xyz");
    }

    #[test]
    fn cache_key_falls_back_to_pmid() {
        let mut r = sample_reference();
        r.doi = None;
        assert_eq!(cache_key(&r), "pmid:12345");
    }

    #[test]
    fn cache_key_falls_back_to_title() {
        let mut r = sample_reference();
        r.doi = None;
        r.pmid = None;
        assert!(cache_key(&r).starts_with("title:"));
    }

    #[test]
    fn cache_key_falls_back_to_raw_text() {
        let r = ParsedReference::new("Some unparseable blob of text", 1);
        assert_eq!(cache_key(&r), "Some unparseable blob of text");
    }

    #[test]
    fn memory_roundtrip() {
        let cache = Cache::new();
        let result = VerificationResult::unparseable();
        cache.insert("key1", result);
        assert!(cache.get("key1").is_some());
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn sqlite_persists_across_cache_instances() {
        let f = NamedTempFile::new().unwrap();
        {
            let cache = Cache::open(f.path()).unwrap();
            let mut result = VerificationResult::unparseable();
            result.status = VerificationStatus::Verified;
            result.confidence = 0.9;
            cache.insert("persisted", result);
        }
        let cache2 = Cache::open(f.path()).unwrap();
        let got = cache2.get("persisted").unwrap();
        assert_eq!(got.status, VerificationStatus::Verified);
    }
}
