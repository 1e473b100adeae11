//! On-disk TOML configuration, cascading a platform config directory under
//! a CWD override.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub network: Option<NetworkConfig>,
    pub thresholds: Option<ThresholdsConfig>,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub email: Option<String>,
    pub max_concurrent: Option<usize>,
    pub http_timeout_secs: Option<u64>,
    pub doi_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub title_match_floor: Option<f64>,
    pub verified_threshold: Option<f64>,
    pub suspicious_threshold: Option<f64>,
    pub recent_window_months: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<String>,
}

/// Platform config directory path: `<config_dir>/refcheck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("refcheck").join("config.toml"))
}

/// Load config by cascading CWD `.refcheck.toml` over the platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".refcheck.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        network: Some(NetworkConfig {
            email: overlay
                .network
                .as_ref()
                .and_then(|n| n.email.clone())
                .or_else(|| base.network.as_ref().and_then(|n| n.email.clone())),
            max_concurrent: overlay
                .network
                .as_ref()
                .and_then(|n| n.max_concurrent)
                .or_else(|| base.network.as_ref().and_then(|n| n.max_concurrent)),
            http_timeout_secs: overlay
                .network
                .as_ref()
                .and_then(|n| n.http_timeout_secs)
                .or_else(|| base.network.as_ref().and_then(|n| n.http_timeout_secs)),
            doi_timeout_secs: overlay
                .network
                .as_ref()
                .and_then(|n| n.doi_timeout_secs)
                .or_else(|| base.network.as_ref().and_then(|n| n.doi_timeout_secs)),
        }),
        thresholds: Some(ThresholdsConfig {
            title_match_floor: overlay
                .thresholds
                .as_ref()
                .and_then(|t| t.title_match_floor)
                .or_else(|| base.thresholds.as_ref().and_then(|t| t.title_match_floor)),
            verified_threshold: overlay
                .thresholds
                .as_ref()
                .and_then(|t| t.verified_threshold)
                .or_else(|| {
                    base.thresholds
                        .as_ref()
                        .and_then(|t| t.verified_threshold)
                }),
            suspicious_threshold: overlay
                .thresholds
                .as_ref()
                .and_then(|t| t.suspicious_threshold)
                .or_else(|| {
                    base.thresholds
                        .as_ref()
                        .and_then(|t| t.suspicious_threshold)
                }),
            recent_window_months: overlay
                .thresholds
                .as_ref()
                .and_then(|t| t.recent_window_months)
                .or_else(|| {
                    base.thresholds
                        .as_ref()
                        .and_then(|t| t.recent_window_months)
                }),
        }),
        cache: Some(CacheConfig {
            path: overlay
                .cache
                .as_ref()
                .and_then(|c| c.path.clone())
                .or_else(|| base.cache.as_ref().and_then(|c| c.path.clone())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_path_round_trip_toml() {
        let config = ConfigFile {
            cache: Some(CacheConfig {
                path: Some("/tmp/test_cache.db".to_string()),
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cache.unwrap().path.unwrap(), "/tmp/test_cache.db");
    }

    #[test]
    fn merge_cache_path_overlay_wins() {
        let base = ConfigFile {
            cache: Some(CacheConfig {
                path: Some("/base/cache.db".to_string()),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            cache: Some(CacheConfig {
                path: Some("/overlay/cache.db".to_string()),
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.cache.unwrap().path.unwrap(), "/overlay/cache.db");
    }

    #[test]
    fn merge_preserves_base_when_overlay_absent() {
        let base = ConfigFile {
            thresholds: Some(ThresholdsConfig {
                title_match_floor: Some(0.55),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(
            merged.thresholds.unwrap().title_match_floor.unwrap(),
            0.55
        );
    }
}
