//! Field extraction (§4.1): pull structured fields out of one validated
//! citation string and compute its parse confidence.

use once_cell::sync::Lazy;
use regex::Regex;

use refcheck_core::doi;
use refcheck_core::model::ParsedReference;

static PMID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:PMID:\s*|PubMed\s+ID:\s*|pubmed\.ncbi\.nlm\.nih\.gov/)(\d+)").unwrap()
});

static YEAR_PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((1[9]\d{2}|20\d{2})[a-z]?\)").unwrap());
static YEAR_BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[9]\d{2}|20\d{2})\b").unwrap());

static AUTHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][\p{L}'-]+),\s*((?:[A-Z]\.\s*)+|[A-Z][\p{L}'-]+)").unwrap());

static QUOTED_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]{8,300})""#).unwrap());

static JOURNAL_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][\p{L} ,&-]{2,80}),?\s*(\d{1,4})(?:\((\d{1,4})\))?,?\s*(?:pp\.\s*)?(\d{1,5}(?:[-–]\d{1,5})?)")
        .unwrap()
});

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

/// Extract a [`ParsedReference`] from one validated citation string.
/// `reference_number` is the 1-based position in the reference list.
pub fn extract(raw_text: &str, reference_number: usize) -> ParsedReference {
    let mut reference = ParsedReference::new(raw_text, reference_number);
    let mut scores = Vec::new();
    let mut any_field = false;

    if let Some(doi) = doi::extract_doi(raw_text) {
        reference.doi = Some(doi);
        scores.push(1.0);
        any_field = true;
    }

    if let Some(caps) = PMID_RE.captures(raw_text) {
        reference.pmid = Some(caps.get(1).unwrap().as_str().to_string());
        scores.push(1.0);
        any_field = true;
    }

    let year = YEAR_PAREN_RE
        .captures(raw_text)
        .or_else(|| YEAR_BARE_RE.captures(raw_text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok());
    if let Some(year) = year {
        reference.year = Some(year);
        scores.push(0.9);
        any_field = true;
    }

    let year_pos = YEAR_PAREN_RE.find(raw_text).map(|m| m.start());
    let author_span = year_pos.map(|p| &raw_text[..p]).unwrap_or(raw_text);
    let authors: Vec<String> = AUTHOR_RE
        .captures_iter(author_span)
        .take(20)
        .map(|c| format!("{}, {}", &c[1], c[2].trim()))
        .collect();
    if !authors.is_empty() {
        reference.authors = authors;
        scores.push(0.8);
        any_field = true;
    }

    if let Some(title) = extract_title(raw_text) {
        reference.title = Some(title);
        scores.push(0.7);
        any_field = true;
    }

    if let Some(caps) = JOURNAL_BLOCK_RE.captures(raw_text) {
        reference.journal = Some(caps[1].trim().trim_end_matches(',').to_string());
        reference.volume = Some(caps[2].to_string());
        reference.issue = caps.get(3).map(|m| m.as_str().to_string());
        reference.pages = Some(caps[4].to_string());
        scores.push(0.6);
        any_field = true;
    }

    if let Some(m) = URL_RE
        .find_iter(raw_text)
        .find(|m| !m.as_str().contains("doi.org"))
    {
        reference.url = Some(m.as_str().trim_end_matches(['.', ',', ')']).to_string());
    }

    if !any_field {
        reference.parse_confidence = 0.1;
        reference
            .parse_warnings
            .push("no structured fields recovered from citation text".to_string());
    } else {
        reference.parse_confidence = scores.iter().sum::<f64>() / scores.len() as f64;
    }

    reference
}

/// Title is the span between a `(YYYY).` year marker and the next
/// journal-block sentence; fall back to the first quoted span.
fn extract_title(text: &str) -> Option<String> {
    if let Some(year_m) = YEAR_PAREN_RE.find(text) {
        let after = &text[year_m.end()..];
        let after = after.trim_start().trim_start_matches('.').trim_start();
        if let Some(journal_m) = JOURNAL_BLOCK_RE.find(after) {
            let title = after[..journal_m.start()].trim().trim_end_matches('.');
            if title.len() >= 8 {
                return Some(title.to_string());
            }
        }
        // No recognisable journal block: take up to the next period-delimited
        // sentence as a best-effort title.
        if let Some(end) = after.find(". ") {
            let title = after[..end].trim();
            if title.len() >= 8 {
                return Some(title.to_string());
            }
        }
    }

    QUOTED_TITLE_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_doi_year_authors_title() {
        let text = "Smith, J., & Doe, A. (2019). A study of reference verification methods. \
                    Journal of Testing, 12(3), 45-67. https://doi.org/10.1234/abcd.5678";
        let r = extract(text, 1);
        assert_eq!(r.doi.as_deref(), Some("10.1234/abcd.5678"));
        assert_eq!(r.year, Some(2019));
        assert!(r.authors.iter().any(|a| a.contains("Smith")));
        assert_eq!(r.journal.as_deref(), Some("Journal of Testing"));
        assert_eq!(r.volume.as_deref(), Some("12"));
        assert_eq!(r.issue.as_deref(), Some("3"));
        assert!(r.parse_confidence > 0.5);
    }

    #[test]
    fn extracts_pmid() {
        let text = "Roe, K. (2020). Something. PMID: 12345678";
        let r = extract(text, 2);
        assert_eq!(r.pmid.as_deref(), Some("12345678"));
    }

    #[test]
    fn falls_back_to_low_confidence_when_nothing_recovered() {
        let r = extract("asdkjashdkjashd kjashdkj ahsdkjhaskjdh askjdh", 3);
        assert_eq!(r.parse_confidence, 0.1);
        assert!(!r.parse_warnings.is_empty());
    }
}
