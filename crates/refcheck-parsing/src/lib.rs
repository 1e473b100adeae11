//! Reference parser (§4.1): segments the text of a references section into
//! individual citation strings and extracts structured fields from each.

pub mod clean;
pub mod extractor;
pub mod section;
pub mod validity;

pub use section::{SegmentationResult, SegmentationStrategy};

use refcheck_core::model::ParsedReference;
use tracing::debug;

/// Parse the text of a references section into an ordered list of
/// [`ParsedReference`] values. Entries that fail the validity predicate
/// (filtered table content) are dropped, not returned.
pub fn parse_references(section_text: &str) -> Vec<ParsedReference> {
    let cleaned = clean::clean_pdf_noise(section_text);
    let segmentation = section::segment(&cleaned);

    let mut filtered = 0usize;
    let mut references = Vec::with_capacity(segmentation.entries.len());
    let mut number = 1;
    for entry in &segmentation.entries {
        if !validity::is_plausible_entry(entry) {
            filtered += 1;
            continue;
        }
        references.push(extractor::extract(entry, number));
        number += 1;
    }

    debug!(
        strategy = ?segmentation.strategy,
        kept = references.len(),
        filtered,
        "segmented references section"
    );

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bracketed_list_end_to_end() {
        let text: String = (1..=6)
            .map(|n| {
                format!(
                    "[{n}] Smith, J. ({}). A reasonably long citation title for end to end testing. Journal of Things, {n}(1), 1-10.\n",
                    2015 + n
                )
            })
            .collect();
        let refs = parse_references(&text);
        assert_eq!(refs.len(), 6);
        assert_eq!(refs[0].reference_number, 1);
        assert!(refs[0].year.is_some());
    }

    #[test]
    fn drops_table_noise_rows_mixed_into_a_numbered_list() {
        let mut text = String::new();
        for n in 1..=6 {
            text.push_str(&format!(
                "{n}. Doe, A. ({}). A sufficiently long reference title used for testing here. Review of Things, {n}(2), 5-9.\n",
                2010 + n
            ));
        }
        text.push_str("7. 12.4%\n");
        let refs = parse_references(&text);
        assert!(refs.iter().all(|r| r.raw_text != "12.4%"));
    }

    #[test]
    fn empty_section_yields_no_references() {
        assert!(parse_references("").is_empty());
    }
}
