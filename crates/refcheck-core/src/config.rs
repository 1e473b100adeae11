use std::path::PathBuf;

/// Runtime configuration for the verification engine. Every field has a
/// sensible default; callers typically start from [`Config::default`] and
/// override individual fields, or load a [`crate::config_file::ConfigFile`]
/// and call [`Config::from_file`].
#[derive(Clone)]
pub struct Config {
    /// Contact address advertised in the User-Agent for API polite pools.
    pub email: Option<String>,
    /// Maximum number of references verified concurrently by `verify_batch`.
    pub max_concurrent: usize,
    /// Timeout for ordinary adapter HTTP calls.
    pub http_timeout_secs: u64,
    /// Timeout for DOI resolver HEAD requests.
    pub doi_timeout_secs: u64,
    /// Minimum title similarity to accept any search-based match.
    pub title_match_floor: f64,
    /// Confidence at or above which a reference is `VERIFIED`.
    pub verified_threshold: f64,
    /// Confidence at or above which a reference is `SUSPICIOUS`.
    pub suspicious_threshold: f64,
    /// Window, in months, within which a publication year counts as "recent".
    pub recent_window_months: i64,
    /// Optional path to a persistent SQLite cache. `None` means in-memory only.
    pub cache_path: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("email", &self.email)
            .field("max_concurrent", &self.max_concurrent)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("doi_timeout_secs", &self.doi_timeout_secs)
            .field("title_match_floor", &self.title_match_floor)
            .field("verified_threshold", &self.verified_threshold)
            .field("suspicious_threshold", &self.suspicious_threshold)
            .field("recent_window_months", &self.recent_window_months)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: None,
            max_concurrent: 5,
            http_timeout_secs: 30,
            doi_timeout_secs: 10,
            title_match_floor: 0.60,
            verified_threshold: 0.80,
            suspicious_threshold: 0.50,
            recent_window_months: 18,
            cache_path: None,
        }
    }
}

impl Config {
    /// Overlay values recognised in an on-disk [`crate::config_file::ConfigFile`].
    pub fn from_file(file: &crate::config_file::ConfigFile) -> Self {
        let mut cfg = Self::default();
        if let Some(net) = &file.network {
            if let Some(v) = &net.email {
                cfg.email = Some(v.clone());
            }
            if let Some(v) = net.max_concurrent {
                cfg.max_concurrent = v;
            }
            if let Some(v) = net.http_timeout_secs {
                cfg.http_timeout_secs = v;
            }
            if let Some(v) = net.doi_timeout_secs {
                cfg.doi_timeout_secs = v;
            }
        }
        if let Some(thr) = &file.thresholds {
            if let Some(v) = thr.title_match_floor {
                cfg.title_match_floor = v;
            }
            if let Some(v) = thr.verified_threshold {
                cfg.verified_threshold = v;
            }
            if let Some(v) = thr.suspicious_threshold {
                cfg.suspicious_threshold = v;
            }
            if let Some(v) = thr.recent_window_months {
                cfg.recent_window_months = v;
            }
        }
        if let Some(cache) = &file.cache {
            cfg.cache_path = cache.path.as_ref().map(PathBuf::from);
        }
        cfg
    }
}
