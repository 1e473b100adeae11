//! DOI normalisation, truncated-DOI fake detection, and the DOI resolver's
//! HEAD-with-retry validation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

use crate::matching::title_similarity;

/// Patterns matching a DOI that has been truncated by a line-wrap or
/// citation-manager bug — these never resolve and must never hit the
/// network; they are a fake indicator on their own.
static TRUNCATED_DOI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^10\.\d{4}/[a-z]$",
        r"^10\.\d{4}/[a-z]{1,2}$",
        r"^10\.\d{4}$",
        r"^10\.\d{4}/[a-z]\.$",
        r"^10\.\d{4,}/978-$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Three accepted DOI shapes, tried in order, after normalisation.
static DOI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(?:https?://)?(?:dx\.)?doi\.org/(10\.\d{4,9}/[^\s]+)").unwrap(),
        Regex::new(r"(?i)doi:\s*(10\.\d{4,9}/[^\s]+)").unwrap(),
        Regex::new(r"(?i)doi\s*[=:]\s*(10\.\d{4,9}/[^\s]+)").unwrap(),
    ]
});

/// `true` if `doi` matches one of the known truncated-DOI shapes and must
/// therefore be treated as a fake indicator rather than resolved.
pub fn is_truncated_doi(doi: &str) -> bool {
    let doi = doi.trim();
    TRUNCATED_DOI_PATTERNS.iter().any(|re| re.is_match(doi))
}

/// Repair line-wrap artefacts in a DOI-bearing span before regex
/// extraction: strip soft hyphens, rejoin hyphen-newline breaks, collapse
/// partial-DOI newline continuations, and drop an intra-DOI space that
/// follows a trailing `-` and precedes a digit.
pub fn normalize_doi_text(text: &str) -> String {
    static SOFT_HYPHEN: &str = "\u{ad}";
    static HYPHEN_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\n\s*").unwrap());
    static PARTIAL_NEWLINE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(10\.\d{4,9}/[^\s]*)\n\s*([^\s]+)").unwrap());
    static INTRA_DOI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\s+(\d)").unwrap());

    let text = text.replace(SOFT_HYPHEN, "");
    let text = HYPHEN_NEWLINE.replace_all(&text, "-").to_string();
    let text = PARTIAL_NEWLINE.replace_all(&text, "$1$2").to_string();
    INTRA_DOI_SPACE.replace_all(&text, "-$1").to_string()
}

/// Extract the first DOI found in `text`, after normalisation, trimming
/// trailing punctuation.
pub fn extract_doi(text: &str) -> Option<String> {
    let normalized = normalize_doi_text(text);
    for pattern in DOI_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&normalized) {
            let doi = caps.get(1).unwrap().as_str();
            let trimmed = doi.trim_end_matches(['.', ',', ';', ')', ']', '"']);
            return Some(trimmed.to_string());
        }
    }
    None
}

/// Metadata recovered from a DOI resolver / registration-agency lookup.
#[derive(Debug, Clone)]
pub struct DoiMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
}

/// Outcome of resolving a DOI via `https://doi.org/<doi>`.
#[derive(Debug, Clone)]
pub enum DoiResolution {
    /// HEAD returned 200: the DOI is registered and resolves.
    Valid,
    /// HEAD returned 404: the DOI is not registered.
    Invalid,
    /// Every retry hit a network error or timeout: neither valid nor
    /// invalid, must not demote a citation on its own.
    Indeterminate,
}

/// HEAD the DOI resolver with follow-redirects, retrying up to 3 times
/// with 1, 2, 3 s backoff on network errors, per a 10 s per-request
/// timeout.
pub async fn resolve_doi(
    client: &reqwest::Client,
    doi: &str,
    timeout: Duration,
    email: Option<&str>,
) -> DoiResolution {
    let url = format!("https://doi.org/{}", urlencoding::encode(doi));
    let backoffs = [1u64, 2, 3];

    for (attempt, backoff) in backoffs.iter().enumerate() {
        let mut req = client.head(&url).timeout(timeout);
        if let Some(email) = email {
            req = req.header("User-Agent", format!("refcheck/0.1 (mailto:{email})"));
        }
        match req.send().await {
            Ok(resp) if resp.status().is_success() => return DoiResolution::Valid,
            Ok(resp) if resp.status().as_u16() == 404 => return DoiResolution::Invalid,
            Ok(_) | Err(_) => {
                if attempt + 1 < backoffs.len() {
                    tokio::time::sleep(Duration::from_secs(*backoff)).await;
                }
            }
        }
    }
    DoiResolution::Indeterminate
}

/// Fetch CSL-JSON metadata for `doi` from the DOI content negotiation
/// endpoint, used both for Frankenstein detection and as a verification
/// fallback when the resolver itself returns 404.
pub async fn fetch_doi_metadata(
    client: &reqwest::Client,
    doi: &str,
    timeout: Duration,
) -> Option<DoiMetadata> {
    let url = format!("https://doi.org/{}", urlencoding::encode(doi));
    let resp = client
        .get(&url)
        .header("Accept", "application/vnd.citationstyles.csl+json")
        .timeout(timeout)
        .send()
        .await
        .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let data: serde_json::Value = resp.json().await.ok()?;

    let title = match &data["title"] {
        serde_json::Value::Array(arr) => arr.first().and_then(|v| v.as_str()).map(String::from),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    };

    let authors: Vec<String> = data["author"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| {
                    if let Some(family) = a["family"].as_str() {
                        let given = a["given"].as_str().unwrap_or("");
                        Some(format!("{given} {family}").trim().to_string())
                    } else {
                        a["literal"].as_str().map(String::from)
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    Some(DoiMetadata { title, authors })
}

/// `true` if the DOI's actual title diverges sharply (similarity < 0.30)
/// from the reference's cited title — the signature of a "Frankenstein
/// citation": a real DOI stitched onto a fabricated title/author set.
pub fn is_frankenstein(cited_title: Option<&str>, doi_title: Option<&str>) -> bool {
    match (cited_title, doi_title) {
        (Some(_), Some(_)) => title_similarity(cited_title, doi_title) < 0.30,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_doi_single_letter() {
        assert!(is_truncated_doi("10.1186/s"));
    }

    #[test]
    fn test_truncated_doi_bare_prefix() {
        assert!(is_truncated_doi("10.1002"));
    }

    #[test]
    fn test_truncated_doi_isbn_prefix() {
        assert!(is_truncated_doi("10.1007/978-"));
    }

    #[test]
    fn test_not_truncated() {
        assert!(!is_truncated_doi("10.1002/jclp.23456"));
    }

    #[test]
    fn test_extract_doi_plain() {
        assert_eq!(
            extract_doi("see https://doi.org/10.1002/jclp.23456 for details"),
            Some("10.1002/jclp.23456".to_string())
        );
    }

    #[test]
    fn test_extract_doi_prefix_form() {
        assert_eq!(
            extract_doi("doi: 10.1080/1364557032000119616."),
            Some("10.1080/1364557032000119616".to_string())
        );
    }

    #[test]
    fn test_normalize_doi_hyphen_newline_continuation() {
        let input = "https://doi.org/10.1186/s12909-\n024-05678-9";
        let normalized = normalize_doi_text(input);
        assert!(normalized.contains("10.1186/s12909-024-05678-9"));
    }

    #[test]
    fn test_idempotent_normalization() {
        let once = normalize_doi_text("10.1002/jclp.23456");
        let twice = normalize_doi_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_frankenstein_detection() {
        assert!(is_frankenstein(
            Some("Effects of yoga on anxiety: A meta-analysis"),
            Some("A survey of distributed systems scheduling")
        ));
        assert!(!is_frankenstein(
            Some("Effects of yoga on anxiety: A meta-analysis"),
            Some("Effects of yoga on anxiety: a meta-analysis")
        ));
    }

    #[test]
    fn test_frankenstein_missing_title_is_not_flagged() {
        assert!(!is_frankenstein(None, Some("Something")));
    }
}
