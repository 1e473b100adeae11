use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Common surname prefixes (case-insensitive).
static SURNAME_PREFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "van", "von", "de", "del", "della", "di", "da", "al", "el", "la", "le", "ben", "ibn",
        "mac", "mc", "o",
    ]
    .into_iter()
    .collect()
});

/// Name suffixes to strip.
static NAME_SUFFIXES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["jr", "sr", "ii", "iii", "iv", "v"].into_iter().collect());

/// Extract surname from name parts, handling multi-word surnames and suffixes.
fn get_surname_from_parts(parts: &[&str]) -> String {
    if parts.is_empty() {
        return String::new();
    }

    // Strip name suffixes
    let mut parts = parts.to_vec();
    while parts.len() >= 2
        && NAME_SUFFIXES.contains(parts.last().unwrap().to_lowercase().trim_end_matches('.'))
    {
        parts.pop();
    }

    if parts.is_empty() {
        return String::new();
    }

    // Check for three-part surnames like "De La Cruz"
    if parts.len() >= 3
        && SURNAME_PREFIXES.contains(parts[parts.len() - 3].to_lowercase().trim_end_matches('.'))
    {
        return parts[parts.len() - 3..].join(" ");
    }

    // Check for two-part surnames like "Van Bavel"
    if parts.len() >= 2
        && SURNAME_PREFIXES.contains(parts[parts.len() - 2].to_lowercase().trim_end_matches('.'))
    {
        return parts[parts.len() - 2..].join(" ");
    }

    parts.last().unwrap().to_string()
}

/// Surnames of every named author, in order, lowercased and with prefixes
/// folded in (e.g. "van Bavel"). Used by [`crate::matching::author_similarity`]
/// for its jaccard-of-surnames term and to identify the first author.
pub fn surname_set(authors: &[String]) -> Vec<String> {
    authors
        .iter()
        .map(|a| get_last_name(a))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get the last name from an author name string.
fn get_last_name(name: &str) -> String {
    let name = name.trim();

    // AAAI "Surname, Initials" format
    if name.contains(',') {
        return name.split(',').next().unwrap().trim().to_lowercase();
    }

    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.is_empty() {
        return String::new();
    }

    get_surname_from_parts(&parts).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_last_name_multi_word() {
        assert_eq!(get_last_name("Jay Van Bavel"), "van bavel");
    }

    #[test]
    fn test_get_last_name_aaai_format() {
        assert_eq!(get_last_name("Bail, C. A."), "bail");
    }

    #[test]
    fn test_get_last_name_suffix_stripped() {
        assert_eq!(get_last_name("John Smith Jr."), "smith");
    }

    #[test]
    fn test_surname_set_filters_empty() {
        assert_eq!(
            surname_set(&["Jay Van Bavel".to_string(), "".to_string()]),
            vec!["van bavel".to_string()]
        );
    }
}
