//! Fuzzy string matching between a parsed reference and a candidate source
//! match: title normalization, string similarity, author similarity, and
//! year similarity. Each returns a score in `[0.0, 1.0]`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

use crate::authors::surname_set;

/// Mapping of (diacritic, letter) pairs to precomposed characters.
/// Used to fix separated diacritics from PDF extraction.
static DIACRITIC_COMPOSITIONS: Lazy<HashMap<(&str, &str), &str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // Umlaut/diaeresis (¨)
    m.insert(("\u{a8}", "A"), "Ä");
    m.insert(("\u{a8}", "a"), "ä");
    m.insert(("\u{a8}", "E"), "Ë");
    m.insert(("\u{a8}", "e"), "ë");
    m.insert(("\u{a8}", "I"), "Ï");
    m.insert(("\u{a8}", "i"), "ï");
    m.insert(("\u{a8}", "O"), "Ö");
    m.insert(("\u{a8}", "o"), "ö");
    m.insert(("\u{a8}", "U"), "Ü");
    m.insert(("\u{a8}", "u"), "ü");
    m.insert(("\u{a8}", "Y"), "Ÿ");
    m.insert(("\u{a8}", "y"), "ÿ");
    // Acute accent (´)
    m.insert(("\u{b4}", "A"), "Á");
    m.insert(("\u{b4}", "a"), "á");
    m.insert(("\u{b4}", "E"), "É");
    m.insert(("\u{b4}", "e"), "é");
    m.insert(("\u{b4}", "I"), "Í");
    m.insert(("\u{b4}", "i"), "í");
    m.insert(("\u{b4}", "O"), "Ó");
    m.insert(("\u{b4}", "o"), "ó");
    m.insert(("\u{b4}", "U"), "Ú");
    m.insert(("\u{b4}", "u"), "ú");
    m.insert(("\u{b4}", "N"), "Ń");
    m.insert(("\u{b4}", "n"), "ń");
    m.insert(("\u{b4}", "C"), "Ć");
    m.insert(("\u{b4}", "c"), "ć");
    m.insert(("\u{b4}", "S"), "Ś");
    m.insert(("\u{b4}", "s"), "ś");
    m.insert(("\u{b4}", "Z"), "Ź");
    m.insert(("\u{b4}", "z"), "ź");
    m.insert(("\u{b4}", "Y"), "Ý");
    m.insert(("\u{b4}", "y"), "ý");
    // Grave accent (`)
    m.insert(("`", "A"), "À");
    m.insert(("`", "a"), "à");
    m.insert(("`", "E"), "È");
    m.insert(("`", "e"), "è");
    m.insert(("`", "I"), "Ì");
    m.insert(("`", "i"), "ì");
    m.insert(("`", "O"), "Ò");
    m.insert(("`", "o"), "ò");
    m.insert(("`", "U"), "Ù");
    m.insert(("`", "u"), "ù");
    // Tilde (~ and ˜)
    m.insert(("~", "A"), "Ã");
    m.insert(("~", "a"), "ã");
    m.insert(("\u{2dc}", "A"), "Ã");
    m.insert(("\u{2dc}", "a"), "ã");
    m.insert(("~", "N"), "Ñ");
    m.insert(("~", "n"), "ñ");
    m.insert(("\u{2dc}", "N"), "Ñ");
    m.insert(("\u{2dc}", "n"), "ñ");
    m.insert(("~", "O"), "Õ");
    m.insert(("~", "o"), "õ");
    m.insert(("\u{2dc}", "O"), "Õ");
    m.insert(("\u{2dc}", "o"), "õ");
    // Caron/háček (ˇ)
    m.insert(("\u{2c7}", "C"), "Č");
    m.insert(("\u{2c7}", "c"), "č");
    m.insert(("\u{2c7}", "S"), "Š");
    m.insert(("\u{2c7}", "s"), "š");
    m.insert(("\u{2c7}", "Z"), "Ž");
    m.insert(("\u{2c7}", "z"), "ž");
    m.insert(("\u{2c7}", "E"), "Ě");
    m.insert(("\u{2c7}", "e"), "ě");
    m.insert(("\u{2c7}", "R"), "Ř");
    m.insert(("\u{2c7}", "r"), "ř");
    m.insert(("\u{2c7}", "N"), "Ň");
    m.insert(("\u{2c7}", "n"), "ň");
    // Circumflex (^)
    m.insert(("^", "A"), "Â");
    m.insert(("^", "a"), "â");
    m.insert(("^", "E"), "Ê");
    m.insert(("^", "e"), "ê");
    m.insert(("^", "I"), "Î");
    m.insert(("^", "i"), "î");
    m.insert(("^", "O"), "Ô");
    m.insert(("^", "o"), "ô");
    m.insert(("^", "U"), "Û");
    m.insert(("^", "u"), "û");
    m
});

/// Regex: letter followed by space(s) then a diacritic mark (e.g., "B ¨")
static SPACE_BEFORE_DIACRITIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])\s+([\u{a8}\u{b4}`~\u{2dc}\u{2c7}\^])").unwrap());

/// Regex: diacritic mark followed by optional space then a letter (e.g., "¨U")
static SEPARATED_DIACRITIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\u{a8}\u{b4}`~\u{2dc}\u{2c7}\^])\s*([A-Za-z])").unwrap());

/// Fix separated diacritics from PDF extraction.
///
/// Converts patterns like `"B ¨UNZ"` → `"BÜNZ"` and `"R´enyi"` → `"Rényi"`.
fn fix_separated_diacritics(title: &str) -> String {
    let title = SPACE_BEFORE_DIACRITIC_RE.replace_all(title, "$1$2");

    SEPARATED_DIACRITIC_RE
        .replace_all(&title, |caps: &regex::Captures| {
            let diacritic = caps.get(1).unwrap().as_str();
            let letter = caps.get(2).unwrap().as_str();
            DIACRITIC_COMPOSITIONS
                .get(&(diacritic, letter))
                .map(|s| s.to_string())
                .unwrap_or_else(|| letter.to_string())
        })
        .to_string()
}

/// Normalize title for comparison — strips to lowercase alphanumeric only.
///
/// Steps (order matters):
/// 1. Unescape HTML entities
/// 2. Fix separated diacritics from PDF extraction (e.g., "B ¨UNZ" → "BÜNZ")
/// 3. Transliterate Greek letters (e.g., "αdiff" → "alphadiff")
/// 4. Replace math symbols (e.g., "√n" → "sqrtn", "∞" → "infinity")
/// 5. Unicode NFKD normalization (decomposes accents)
/// 6. Strip to ASCII
/// 7. Keep only `[a-zA-Z0-9]`
/// 8. Lowercase
pub fn normalize_title(title: &str) -> String {
    let title = title
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    let title = fix_separated_diacritics(&title);

    let title = title
        .replace(['α', 'Α'], "alpha")
        .replace(['β', 'Β'], "beta")
        .replace(['γ', 'Γ'], "gamma")
        .replace(['δ', 'Δ'], "delta")
        .replace(['ε', 'Ε'], "epsilon")
        .replace(['ζ', 'Ζ'], "zeta")
        .replace(['η', 'Η'], "eta")
        .replace(['θ', 'Θ'], "theta")
        .replace(['ι', 'Ι'], "iota")
        .replace(['κ', 'Κ'], "kappa")
        .replace(['λ', 'Λ'], "lambda")
        .replace(['μ', 'Μ'], "mu")
        .replace(['ν', 'Ν'], "nu")
        .replace(['ξ', 'Ξ'], "xi")
        .replace(['ο', 'Ο'], "o")
        .replace(['π', 'Π'], "pi")
        .replace(['ρ', 'Ρ'], "rho")
        .replace(['σ', 'ς', 'Σ'], "sigma")
        .replace(['τ', 'Τ'], "tau")
        .replace(['υ', 'Υ'], "upsilon")
        .replace(['φ', 'Φ'], "phi")
        .replace(['χ', 'Χ'], "chi")
        .replace(['ψ', 'Ψ'], "psi")
        .replace(['ω', 'Ω'], "omega");

    let title = title
        .replace('∞', "infinity")
        .replace('√', "sqrt")
        .replace('≤', "leq")
        .replace('≥', "geq")
        .replace('≠', "neq")
        .replace('±', "pm")
        .replace('×', "times")
        .replace('÷', "div")
        .replace('∑', "sum")
        .replace('∏', "prod")
        .replace('∫', "int")
        .replace('∂', "partial")
        .replace('∇', "nabla")
        .replace('∈', "in")
        .replace('∉', "notin")
        .replace('⊂', "subset")
        .replace('⊃', "supset")
        .replace('∪', "cup")
        .replace('∩', "cap")
        .replace('∧', "and")
        .replace('∨', "or")
        .replace('¬', "not")
        .replace('→', "to")
        .replace('←', "from")
        .replace('↔', "iff")
        .replace('⇒', "implies")
        .replace('⇐', "impliedby")
        .replace('⇔', "iff");

    let normalized: String = title.nfkd().filter(|c| c.is_ascii()).collect();

    static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());
    NON_ALNUM.replace_all(&normalized, "").to_lowercase()
}

/// Check if two titles match using fuzzy comparison (95% threshold), used by
/// the source adapters to decide whether a candidate record names the same
/// paper at all before scoring confidence.
///
/// Includes conservative prefix matching: if a shorter title is a prefix of a
/// longer one but they differ on subtitle presence (text after `?` or `!`),
/// the match is rejected unless there is ≥70% length coverage.
pub fn titles_match(title_a: &str, title_b: &str) -> bool {
    let norm_a = normalize_title(title_a);
    let norm_b = normalize_title(title_b);

    if norm_a.is_empty() || norm_b.is_empty() {
        return false;
    }

    let score = rapidfuzz::fuzz::ratio(norm_a.chars(), norm_b.chars());
    if score >= 0.95 {
        return true;
    }

    let (shorter, longer) = if norm_a.len() <= norm_b.len() {
        (&norm_a, &norm_b)
    } else {
        (&norm_b, &norm_a)
    };

    if shorter.len() < 30 {
        return false;
    }

    if !longer.starts_with(shorter.as_str()) {
        return false;
    }

    let has_subtitle = |t: &str| {
        let lower = t.to_lowercase();
        if let Some(pos) = lower.rfind(['?', '!']) {
            lower[pos + 1..].chars().any(|c| c.is_alphanumeric())
        } else {
            false
        }
    };

    let a_has_subtitle = has_subtitle(title_a);
    let b_has_subtitle = has_subtitle(title_b);

    if a_has_subtitle != b_has_subtitle {
        let coverage = shorter.len() as f64 / longer.len() as f64;
        return coverage >= 0.70;
    }

    true
}

/// Named fallback strategy: Jaccard similarity over whitespace-split word
/// tokens of the normalized titles. Kept alongside the rapidfuzz-based
/// primary strategy so a future source that returns already-tokenized
/// titles (no punctuation to lose) can switch strategies without touching
/// call sites.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> {
        s.split_whitespace()
            .map(|w| normalize_title(w))
            .filter(|w| !w.is_empty())
            .collect()
    };
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() && tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// String similarity in `[0.0, 1.0]`. Primary strategy is rapidfuzz's
/// token-set ratio over the raw strings, which tolerates reordered words and
/// differing punctuation density better than a plain edit-distance ratio;
/// [`jaccard_similarity`] is available as a named fallback strategy for
/// callers that want a cheaper, order-insensitive estimate instead.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    rapidfuzz::fuzz::token_set_ratio(a.chars(), b.chars())
}

/// Title similarity for verification scoring: normalizes both titles first,
/// then applies [`string_similarity`]. Returns `0.0` if either title is
/// missing.
pub fn title_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            let norm_a = normalize_title(a);
            let norm_b = normalize_title(b);
            if norm_a.is_empty() || norm_b.is_empty() {
                0.0
            } else {
                string_similarity(&norm_a, &norm_b)
            }
        }
        _ => 0.0,
    }
}

/// Author similarity: `0.6 * first_author_match + 0.4 * jaccard(surnames)`.
/// `first_author_match` is `1.0` when the first authors' surnames are equal,
/// `0.5` otherwise (partial credit — author lists are frequently truncated
/// or reordered by the source database). Returns `0.0` if either list is
/// empty.
pub fn author_similarity(parsed: &[String], candidate: &[String]) -> f64 {
    if parsed.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let parsed_surnames = surname_set(parsed);
    let candidate_surnames = surname_set(candidate);

    let first_author_match = match (parsed_surnames.first(), candidate_surnames.first()) {
        (Some(a), Some(b)) if a == b => 1.0,
        _ => 0.5,
    };

    let a: HashSet<&String> = parsed_surnames.iter().collect();
    let b: HashSet<&String> = candidate_surnames.iter().collect();
    let union = a.union(&b).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        a.intersection(&b).count() as f64 / union as f64
    };

    0.6 * first_author_match + 0.4 * jaccard
}

/// Per-source confidence for a search-based match (PubMed, CrossRef):
/// `0.6*title_sim + 0.25*author_sim + 0.15*year_sim`, short-circuiting to
/// `0.0` if `title_sim` is below `floor` (the title-match floor prevents
/// "author matches but paper is wrong" false positives).
pub fn search_confidence(title_sim: f64, author_sim: f64, year_sim: f64, floor: f64) -> f64 {
    if title_sim < floor {
        return 0.0;
    }
    (0.6 * title_sim + 0.25 * author_sim + 0.15 * year_sim).clamp(0.0, 1.0)
}

/// Per-source confidence for a text-search match (Europe PMC, OpenAlex):
/// `0.8 * title_sim`, subject to the same title floor.
pub fn text_search_confidence(title_sim: f64, floor: f64) -> f64 {
    if title_sim < floor {
        return 0.0;
    }
    (0.8 * title_sim).clamp(0.0, 1.0)
}

/// Year similarity, allowing for "Online First" publication-date drift:
/// `1.0` exact, `0.9` at `±1`, `0.5` at `±2`, `0.0` beyond that or if either
/// year is missing.
pub fn year_similarity(parsed: Option<i32>, candidate: Option<i32>) -> f64 {
    match (parsed, candidate) {
        (Some(a), Some(b)) => match (a - b).abs() {
            0 => 1.0,
            1 => 0.9,
            2 => 0.5,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Basic normalization
    // =========================================================================

    #[test]
    fn test_normalize_title_basic() {
        assert_eq!(normalize_title("Hello, World! 123"), "helloworld123");
    }

    #[test]
    fn test_normalize_title_html_entities() {
        assert_eq!(normalize_title("Foo &amp; Bar"), "foobar");
    }

    #[test]
    fn test_normalize_title_unicode() {
        assert_eq!(normalize_title("résumé"), "resume");
    }

    #[test]
    fn test_titles_match_exact() {
        assert!(titles_match(
            "Detecting Hallucinated References",
            "Detecting Hallucinated References"
        ));
    }

    #[test]
    fn test_titles_match_minor_difference() {
        assert!(titles_match(
            "Detecting Hallucinated References in Academic Papers",
            "Detecting Hallucinated References in Academic Paper"
        ));
    }

    #[test]
    fn test_titles_no_match() {
        assert!(!titles_match(
            "Detecting Hallucinated References",
            "Completely Different Title About Cats"
        ));
    }

    #[test]
    fn test_titles_match_empty() {
        assert!(!titles_match("", "Something"));
        assert!(!titles_match("Something", ""));
    }

    // =========================================================================
    // Greek letter transliteration
    // =========================================================================

    #[test]
    fn test_greek_epsilon() {
        assert_eq!(
            normalize_title("εpsolute: Efficiently querying databases"),
            "epsilonpsoluteefficientlyqueryingdatabases"
        );
    }

    #[test]
    fn test_greek_alpha() {
        assert_eq!(
            normalize_title("αdiff: Cross-version binary code similarity"),
            "alphadiffcrossversionbinarycodesimilarity"
        );
    }

    // =========================================================================
    // Separated diacritics from PDF extraction
    // =========================================================================

    #[test]
    fn test_diacritic_umlaut_space() {
        assert_eq!(normalize_title("B \u{a8}UNZ"), "bunz");
    }

    // =========================================================================
    // Scoring formulas
    // =========================================================================

    #[test]
    fn test_title_similarity_missing() {
        assert_eq!(title_similarity(None, Some("Foo")), 0.0);
        assert_eq!(title_similarity(Some("Foo"), None), 0.0);
    }

    #[test]
    fn test_title_similarity_identical() {
        assert_eq!(
            title_similarity(Some("Attention Is All You Need"), Some("Attention Is All You Need")),
            1.0
        );
    }

    #[test]
    fn test_author_similarity_exact_first_author() {
        let parsed = vec!["Smith, J.".to_string(), "Doe, A.".to_string()];
        let candidate = vec!["Smith, John".to_string(), "Doe, Anne".to_string()];
        let score = author_similarity(&parsed, &candidate);
        assert!(score > 0.9, "expected high similarity, got {score}");
    }

    #[test]
    fn test_author_similarity_different_first_author() {
        let parsed = vec!["Smith, J.".to_string()];
        let candidate = vec!["Jones, K.".to_string()];
        let score = author_similarity(&parsed, &candidate);
        assert_eq!(score, 0.5 * 0.6);
    }

    #[test]
    fn test_author_similarity_empty() {
        assert_eq!(author_similarity(&[], &["Smith".to_string()]), 0.0);
    }

    #[test]
    fn test_year_similarity_exact() {
        assert_eq!(year_similarity(Some(2020), Some(2020)), 1.0);
    }

    #[test]
    fn test_year_similarity_off_by_one() {
        assert_eq!(year_similarity(Some(2020), Some(2021)), 0.9);
    }

    #[test]
    fn test_year_similarity_off_by_two() {
        assert_eq!(year_similarity(Some(2020), Some(2022)), 0.5);
    }

    #[test]
    fn test_year_similarity_far_apart() {
        assert_eq!(year_similarity(Some(2020), Some(2030)), 0.0);
    }

    #[test]
    fn test_year_similarity_missing() {
        assert_eq!(year_similarity(None, Some(2020)), 0.0);
    }

    #[test]
    fn test_search_confidence_below_floor_is_zero() {
        assert_eq!(search_confidence(0.59, 1.0, 1.0, 0.60), 0.0);
    }

    #[test]
    fn test_search_confidence_formula() {
        let score = search_confidence(1.0, 1.0, 1.0, 0.60);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_search_confidence_formula() {
        assert_eq!(text_search_confidence(0.75, 0.60), 0.8 * 0.75);
    }

    #[test]
    fn test_jaccard_similarity_basic() {
        let score = jaccard_similarity("deep learning methods", "deep learning techniques");
        assert!(score > 0.0 && score < 1.0);
    }
}
