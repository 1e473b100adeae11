//! PDF-extraction noise cleanup, run before segmentation: strips lines
//! that are artefacts of PDF-to-text conversion rather than citation
//! content, and rejoins hyphenation splits. Distinct from (and run before)
//! the DOI-specific normalisation in `refcheck_core::doi`.

use once_cell::sync::Lazy;
use regex::Regex;

static NOISE_LINE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^\s*downloaded\s+from\s+.*$").unwrap(),
        Regex::new(r"(?i)^\s*available\s+at\s+.*$").unwrap(),
        Regex::new(r"(?i)^\s*access\s+provided\s+by\s+.*$").unwrap(),
        Regex::new(r"(?i)^\s*(?:©|copyright)\s*\d{0,4}.*$").unwrap(),
        Regex::new(r"(?i)^\s*all\s+rights\s+reserved\.?\s*$").unwrap(),
        Regex::new(r"(?i)^\s*vol(?:ume)?\.?\s*\d+.*$").unwrap(),
        Regex::new(r"(?i)^\s*this\s+article\s+.*$").unwrap(),
        Regex::new(r"(?i)^\s*author\s+manuscript.*$").unwrap(),
        Regex::new(r"(?i)^\s*funding\b.*$").unwrap(),
        Regex::new(r"(?i)^\s*conflict\s+of\s+interest.*$").unwrap(),
        Regex::new(r"^\s*\d{1,4}\s*$").unwrap(),
        Regex::new(r"^\s*https?://\S+\s*$").unwrap(),
    ]
});

static HYPHEN_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\n\s*(\w)").unwrap());

/// Strip PDF-extraction noise lines and rejoin hyphenation splits.
pub fn clean_pdf_noise(text: &str) -> String {
    let joined = HYPHEN_BREAK_RE.replace_all(text, "$1$2").to_string();

    joined
        .lines()
        .filter(|line| !NOISE_LINE_RES.iter().any(|re| re.is_match(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_downloaded_from_and_page_number_lines() {
        let text = "Downloaded from https://journals.example.com on 2020-01-01\n\
                     [1] Real citation text here.\n\
                     42\n\
                     [2] Another real citation.\n";
        let cleaned = clean_pdf_noise(text);
        assert!(!cleaned.contains("Downloaded from"));
        assert!(!cleaned.lines().any(|l| l.trim() == "42"));
        assert!(cleaned.contains("Real citation"));
    }

    #[test]
    fn rejoins_hyphenated_line_breaks() {
        let text = "This is a hyphen-\nated word.";
        assert_eq!(clean_pdf_noise(text), "This is a hyphenated word.");
    }

    #[test]
    fn strips_copyright_and_rights_reserved() {
        let text = "\u{a9} 2021 Example Press. All rights reserved.\n[1] A real citation.";
        let cleaned = clean_pdf_noise(text);
        assert!(!cleaned.contains("rights reserved"));
        assert!(cleaned.contains("A real citation"));
    }
}
