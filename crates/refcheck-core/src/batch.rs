//! Batch analyzer: per-document meta-analysis over a set of
//! [`VerificationResult`]s, producing one [`BatchDiagnosis`] (§4.6).

use std::collections::HashMap;

use tracing::info;

use crate::model::{BatchDiagnosis, VerificationResult, VerificationStatus};

/// Analyze one document's worth of verification results.
pub struct BatchAnalyzer;

impl BatchAnalyzer {
    /// Build the histogram, failure rate, and a recommendation from the
    /// first matching rule in §4.6's priority order.
    pub fn analyze(results: &[VerificationResult]) -> BatchDiagnosis {
        let total = results.len();
        if total == 0 {
            return BatchDiagnosis {
                likely_layout_issue: false,
                failure_rate: 0.0,
                status_histogram: HashMap::new(),
                recommendation: "No references to analyze.".to_string(),
            };
        }

        let mut histogram: HashMap<String, usize> = HashMap::new();
        for r in results {
            *histogram.entry(r.status.as_str().to_string()).or_insert(0) += 1;
        }

        let count = |status: VerificationStatus| {
            *histogram.get(status.as_str()).unwrap_or(&0)
        };

        let not_found = count(VerificationStatus::NotFound);
        let suspicious = count(VerificationStatus::Suspicious);
        let definite_fake = count(VerificationStatus::DefiniteFake);
        let grey_literature = count(VerificationStatus::GreyLiterature);
        let verified = count(VerificationStatus::Verified) + count(VerificationStatus::VerifiedLegacyDoi);

        let failure_rate = (not_found + suspicious) as f64 / total as f64;
        let total_f = total as f64;

        let (likely_layout_issue, recommendation) = if failure_rate >= 0.70 && definite_fake == 0 {
            (
                true,
                "A very high fraction of references could not be verified, with no fabrication \
                 indicators. This usually means the document's text extraction mangled the \
                 reference list — check for PDF column-order confusion or broken hyphenation \
                 artefacts and consider re-extracting with a different PDF parser."
                    .to_string(),
            )
        } else if failure_rate >= 0.50 && grey_literature as f64 >= 0.30 * total_f {
            (
                false,
                "Many references are grey literature (reports, guidelines, policy documents) \
                 that simply are not indexed by PubMed or CrossRef. Low verification rates here \
                 do not indicate fabrication."
                    .to_string(),
            )
        } else if definite_fake as f64 >= 0.30 * total_f {
            (
                false,
                "A substantial fraction of references show strong fabrication indicators \
                 (unresolvable DOIs, title/metadata mismatches). This pattern is consistent \
                 with AI-hallucinated citations and warrants manual review."
                    .to_string(),
            )
        } else if verified as f64 >= 0.80 * total_f {
            (
                false,
                "The large majority of references verified cleanly against external \
                 bibliographic sources."
                    .to_string(),
            )
        } else {
            (
                false,
                "Mixed verification results; no single dominant pattern. Review flagged \
                 references individually."
                    .to_string(),
            )
        };

        info!(failure_rate, likely_layout_issue, %recommendation, "batch diagnosis");

        BatchDiagnosis {
            likely_layout_issue,
            failure_rate,
            status_histogram: histogram,
            recommendation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: VerificationStatus) -> VerificationResult {
        let mut r = VerificationResult::unparseable();
        r.status = status;
        r
    }

    #[test]
    fn empty_batch() {
        let d = BatchAnalyzer::analyze(&[]);
        assert_eq!(d.failure_rate, 0.0);
        assert!(!d.likely_layout_issue);
    }

    #[test]
    fn layout_issue_detected() {
        let results: Vec<_> = (0..10).map(|_| result(VerificationStatus::NotFound)).collect();
        let d = BatchAnalyzer::analyze(&results);
        assert!(d.likely_layout_issue);
        assert_eq!(d.failure_rate, 1.0);
    }

    #[test]
    fn layout_issue_suppressed_by_fakes() {
        let mut results: Vec<_> = (0..8).map(|_| result(VerificationStatus::NotFound)).collect();
        results.extend((0..2).map(|_| result(VerificationStatus::DefiniteFake)));
        let d = BatchAnalyzer::analyze(&results);
        assert!(!d.likely_layout_issue);
    }

    #[test]
    fn grey_heavy() {
        let mut results: Vec<_> = (0..5).map(|_| result(VerificationStatus::NotFound)).collect();
        results.extend((0..4).map(|_| result(VerificationStatus::GreyLiterature)));
        results.push(result(VerificationStatus::Verified));
        let d = BatchAnalyzer::analyze(&results);
        assert!(d.recommendation.contains("grey literature"));
    }

    #[test]
    fn fake_heavy() {
        let mut results: Vec<_> = (0..3).map(|_| result(VerificationStatus::DefiniteFake)).collect();
        results.extend((0..7).map(|_| result(VerificationStatus::Verified)));
        let d = BatchAnalyzer::analyze(&results);
        assert!(d.recommendation.contains("hallucinated"));
    }

    #[test]
    fn verified_heavy() {
        let results: Vec<_> = (0..9)
            .map(|_| result(VerificationStatus::Verified))
            .chain(std::iter::once(result(VerificationStatus::NotFound)))
            .collect();
        let d = BatchAnalyzer::analyze(&results);
        assert!(d.recommendation.contains("verified cleanly"));
    }

    #[test]
    fn neutral_mixed() {
        let results = vec![
            result(VerificationStatus::Verified),
            result(VerificationStatus::Suspicious),
            result(VerificationStatus::LikelyValid),
        ];
        let d = BatchAnalyzer::analyze(&results);
        assert!(d.recommendation.contains("Mixed"));
    }
}
