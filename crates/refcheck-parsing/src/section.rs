//! Segmentation strategies: split the text of a references section into
//! individual citation strings (§4.1). Strategies are tried in priority
//! order; the first to clear its threshold of plausible entries wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validity::is_plausible_entry;

/// Which splitting strategy produced a [`SegmentationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentationStrategy {
    BracketedNumeral,
    NumberedPeriod,
    ParenthesisedNumeral,
    LineStartAuthor,
    BlankLineBlocks,
    ApaFallback,
}

/// Raw segmentation output: the winning strategy plus its candidate blocks
/// (not yet filtered for validity).
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    pub strategy: SegmentationStrategy,
    pub entries: Vec<String>,
}

/// Split `section_text` into candidate citation strings, trying each
/// strategy in §4.1's priority order and keeping the first whose count of
/// plausible entries exceeds its threshold.
pub fn segment(section_text: &str) -> SegmentationResult {
    if let Some(entries) = try_bracketed_numeral(section_text) {
        if plausible_count(&entries) > 5 {
            return SegmentationResult { strategy: SegmentationStrategy::BracketedNumeral, entries };
        }
    }
    if let Some(entries) = try_numbered_period(section_text) {
        if plausible_count(&entries) > 5 {
            return SegmentationResult { strategy: SegmentationStrategy::NumberedPeriod, entries };
        }
    }
    if let Some(entries) = try_parenthesised_numeral(section_text) {
        if plausible_count(&entries) > 10 {
            return SegmentationResult { strategy: SegmentationStrategy::ParenthesisedNumeral, entries };
        }
    }
    if let Some(entries) = try_line_start_author(section_text) {
        if plausible_count(&entries) > 3 {
            return SegmentationResult { strategy: SegmentationStrategy::LineStartAuthor, entries };
        }
    }
    if let Some(entries) = try_blank_line_blocks(section_text) {
        if plausible_count(&entries) > 3 {
            return SegmentationResult { strategy: SegmentationStrategy::BlankLineBlocks, entries };
        }
    }
    SegmentationResult { strategy: SegmentationStrategy::ApaFallback, entries: apa_fallback(section_text) }
}

fn plausible_count(entries: &[String]) -> usize {
    entries.iter().filter(|e| is_plausible_entry(e)).count()
}

fn split_at_sequential_markers(text: &str, re: &Regex, first_must_be_one: bool) -> Option<Vec<String>> {
    let matches: Vec<_> = re.find_iter(text).collect();
    if matches.len() < 2 {
        return None;
    }

    let caps: Vec<_> = re.captures_iter(text).collect();
    let nums: Vec<i64> = caps
        .iter()
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect();
    if nums.is_empty() || (first_must_be_one && nums[0] != 1) {
        return None;
    }
    let sequential = nums.windows(2).all(|w| w[1] == w[0] + 1);
    if !sequential {
        return None;
    }

    let mut entries = Vec::with_capacity(matches.len());
    for i in 0..matches.len() {
        let start = matches[i].end();
        let end = matches.get(i + 1).map(|m| m.start()).unwrap_or(text.len());
        let content = text[start..end].trim();
        if !content.is_empty() {
            entries.push(content.to_string());
        }
    }
    Some(entries)
}

/// Priority 1: `[n]` bracketed numerals, threshold >5.
fn try_bracketed_numeral(text: &str) -> Option<Vec<String>> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)(?:^|\n|[.\]0-9])\s*\[(\d+)\]\s*").unwrap());
    split_at_sequential_markers(text, &RE, true)
}

/// Priority 2: `n.` numerals followed by a space, threshold >5.
fn try_numbered_period(text: &str) -> Option<Vec<String>> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)(?:^|\n)\s*(\d{1,3})\.\s+").unwrap());
    split_at_sequential_markers(text, &RE, true)
}

/// Priority 3: `(n)` parenthesised numerals, threshold >10.
fn try_parenthesised_numeral(text: &str) -> Option<Vec<String>> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)(?:^|\n)\s*\((\d{1,3})\)\s*").unwrap());
    split_at_sequential_markers(text, &RE, true)
}

/// Priority 4: a citation list whose entries each begin a line with
/// `Surname, I.` — the common APA/Chicago reference-list layout.
fn try_line_start_author(text: &str) -> Option<Vec<String>> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*([A-Z][\p{L}'-]+,\s+[A-Z]\.(?:\s*[A-Z]\.)?)").unwrap());

    let matches: Vec<_> = RE.find_iter(text).collect();
    if matches.len() < 2 {
        return None;
    }

    let mut entries = Vec::with_capacity(matches.len());
    for i in 0..matches.len() {
        let start = matches[i].start();
        let end = matches.get(i + 1).map(|m| m.start()).unwrap_or(text.len());
        let content = text[start..end].trim();
        if !content.is_empty() {
            entries.push(content.to_string());
        }
    }
    Some(entries)
}

/// Priority 5: entries separated by at least one blank line.
fn try_blank_line_blocks(text: &str) -> Option<Vec<String>> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
    let entries: Vec<String> = RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if entries.len() < 2 {
        None
    } else {
        Some(entries)
    }
}

/// Priority 6, always succeeds: split on author-lookahead boundaries —
/// a sentence-ending period followed by a capitalised `Surname,`/`Surname
/// and` run, the shape a packed APA list takes once blank lines and
/// numbering are both gone.
fn apa_fallback(text: &str) -> Vec<String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(\.\s)(?=[A-Z][\p{L}'-]+,\s+(?:[A-Z]\.|[A-Z][\p{L}'-]+)(?:,|\s+and\s+|\s*&\s*))")
            .unwrap()
    });

    let mut entries = Vec::new();
    let mut last = 0;
    for m in RE.find_iter(text) {
        let boundary = m.end();
        let chunk = text[last..boundary].trim();
        if !chunk.is_empty() {
            entries.push(chunk.to_string());
        }
        last = boundary;
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        entries.push(tail.to_string());
    }
    if entries.is_empty() {
        let whole = text.trim();
        if !whole.is_empty() {
            entries.push(whole.to_string());
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_numeral_wins_when_present() {
        let text: String = (1..=7)
            .map(|n| format!("[{n}] Smith, J. ({}). A long enough title about reference segmentation here. Journal of Testing.\n", 2000 + n))
            .collect();
        let result = segment(&text);
        assert_eq!(result.strategy, SegmentationStrategy::BracketedNumeral);
        assert_eq!(result.entries.len(), 7);
    }

    #[test]
    fn numbered_period_wins_without_brackets() {
        let text: String = (1..=6)
            .map(|n| format!("{n}. Doe, A. ({}). Another sufficiently long citation title for testing. Review of Things.\n", 2010 + n))
            .collect();
        let result = segment(&text);
        assert_eq!(result.strategy, SegmentationStrategy::NumberedPeriod);
        assert_eq!(result.entries.len(), 6);
    }

    #[test]
    fn blank_line_blocks_used_as_last_resort_structure() {
        let text = (1..=4)
            .map(|n| format!("Roe, K. ({}). A sufficiently long blank-line separated citation entry. Journal X.", 2012 + n))
            .collect::<Vec<_>>()
            .join("\n\n");
        let result = segment(&text);
        assert_eq!(result.strategy, SegmentationStrategy::BlankLineBlocks);
        assert_eq!(result.entries.len(), 4);
    }

    #[test]
    fn apa_fallback_never_returns_empty_for_nonempty_input() {
        let text = "Totally unstructured blob of text with no numbering markers at all present here whatsoever.";
        let result = segment(text);
        assert_eq!(result.strategy, SegmentationStrategy::ApaFallback);
        assert!(!result.entries.is_empty());
    }
}
