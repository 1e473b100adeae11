//! Validity predicate (§4.1): decides whether a segmented block of text is
//! plausibly a citation, or whether it is "filtered table content" —
//! a stray row of a results table that a numbered-list segmentation
//! strategy happened to sweep up along with the real references.

use once_cell::sync::Lazy;
use regex::Regex;

static FOUR_DIGIT_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[9]\d{2}|20\d{2})\b").unwrap());

static AUTHOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([A-Z][\p{L}'-]+,\s*[A-Z]\.|[A-Z][\p{L}'-]+\s+[A-Z]\.|et al\.)").unwrap()
});

/// Bare numerics, percentages, p-values, sample sizes, effect sizes, CI
/// ranges, yes/no/N/A/NR cells, dash/bullet-only rows, and single-word
/// column headers — the shapes a results-table row or header takes.
static TABLE_NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\s*[\d.,%\s-]+\s*$").unwrap(),
        Regex::new(r"(?i)^\s*p\s*[<>=]\s*0?\.\d+\s*$").unwrap(),
        Regex::new(r"(?i)\bn\s*=\s*\d+\b").unwrap(),
        Regex::new(r"(?i)\b(OR|RR|HR|SMD|MD|NNT)\s*[:=]?\s*-?\d").unwrap(),
        Regex::new(r"(?i)\b(95%\s*CI|CI\s*[:=]?)\s*[-\d.,\[\]() ]+$").unwrap(),
        Regex::new(r"(?i)^\s*(yes|no|n/?a|nr)\s*$").unwrap(),
        Regex::new(r"^\s*[-–—•*]+\s*$").unwrap(),
        Regex::new(r"(?i)^\s*(study|author|authors?|year|title|journal|n|sample size|outcome|result)\s*$").unwrap(),
    ]
});

/// True when `text` looks like table noise rather than prose.
pub fn is_table_noise(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    if TABLE_NOISE_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return true;
    }

    let total = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return true;
    }
    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    let alpha = trimmed.chars().filter(|c| c.is_alphabetic()).count();
    let digit_ratio = digits as f64 / total as f64;
    let alpha_ratio = alpha as f64 / total as f64;
    digit_ratio > 0.5 || alpha_ratio < 0.3
}

/// §4.1's validity predicate: a citation must satisfy all of length, a
/// plausible publication year, an author-like pattern, and not be table
/// noise.
pub fn is_plausible_entry(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 40 {
        return false;
    }
    if trimmed.split_whitespace().count() < 6 {
        return false;
    }
    if !FOUR_DIGIT_YEAR.is_match(trimmed) {
        return false;
    }
    if !AUTHOR_PATTERN.is_match(trimmed) {
        return false;
    }
    if is_table_noise(trimmed) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_normal_citation() {
        let text = "Smith, J., & Doe, A. (2019). A study of reference verification methods. Journal of Testing, 12(3), 45-67.";
        assert!(is_plausible_entry(text));
    }

    #[test]
    fn rejects_short_fragments() {
        assert!(!is_plausible_entry("Smith 2019."));
    }

    #[test]
    fn rejects_missing_year() {
        let text = "Smith, J., & Doe, A. A study with no year at all present in this sentence whatsoever.";
        assert!(!is_plausible_entry(text));
    }

    #[test]
    fn rejects_table_rows() {
        assert!(is_table_noise("12.4%"));
        assert!(is_table_noise("p < 0.001"));
        assert!(is_table_noise("OR: 1.45"));
        assert!(is_table_noise("95% CI 1.02-1.88"));
        assert!(is_table_noise("N/A"));
        assert!(is_table_noise("---"));
        assert!(is_table_noise("Study"));
    }

    #[test]
    fn long_numeric_row_rejected_by_digit_ratio() {
        let text = "1 2019 45 67 12 0.45 1.02 1.88 0.001 33 102 88 14 2 0.9";
        assert!(is_table_noise(text));
    }
}
