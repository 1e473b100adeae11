//! The classifier: a pure function from accumulated engine signals to one
//! of the eight terminal [`VerificationStatus`] tags (plus the two
//! orthogonal `Unparseable`/`Error` statuses, assigned directly by the
//! engine rather than through [`classify`]).
//!
//! Priority order matters: the first matching rule wins, so a citation
//! with both a fake indicator and a false-positive warning is not
//! automatically `DEFINITE_FAKE` — Rule 1 requires the *absence* of a
//! false-positive warning.

use crate::model::VerificationStatus;

/// The inputs the classifier needs, gathered by the engine over the
/// course of the verification cascade.
#[derive(Debug, Clone, Default)]
pub struct ClassificationInputs {
    pub confidence: f64,
    pub has_fake_indicator: bool,
    pub has_false_positive_warning: bool,
    pub has_future_date_indicator: bool,
    pub has_field_difference_doi_mismatch: bool,
    pub has_frankenstein_indicator: bool,
    pub cited_doi_present: bool,
    pub doi_valid: Option<bool>,
    pub pubmed_match_present: bool,
    pub low_quality_source_probe: bool,
    pub grey_literature_probe: bool,
    pub book_software_probe: bool,
    pub recent_paper_probe: bool,
}

/// Assign a terminal status from the first matching rule in §4.5's
/// priority order.
pub fn classify(inputs: &ClassificationInputs) -> VerificationStatus {
    // Rule 1: DEFINITE_FAKE
    if inputs.has_fake_indicator
        && !inputs.has_false_positive_warning
        && ((inputs.has_future_date_indicator && inputs.confidence < 0.50)
            || inputs.has_field_difference_doi_mismatch
            || inputs.has_frankenstein_indicator)
    {
        return VerificationStatus::DefiniteFake;
    }

    // Rule 2: VERIFIED_LEGACY_DOI
    if inputs.confidence >= 0.80
        && inputs.cited_doi_present
        && inputs.doi_valid == Some(false)
        && inputs.pubmed_match_present
    {
        return VerificationStatus::VerifiedLegacyDoi;
    }

    // Rule 3: VERIFIED
    if inputs.confidence >= 0.80 {
        return VerificationStatus::Verified;
    }

    // Rule 4: LOW_QUALITY_SOURCE
    if inputs.low_quality_source_probe && inputs.confidence >= 0.30 {
        return VerificationStatus::LowQualitySource;
    }

    // Rule 5: GREY_LITERATURE
    if (inputs.grey_literature_probe || inputs.book_software_probe) && inputs.confidence < 0.80 {
        return VerificationStatus::GreyLiterature;
    }

    // Rule 6: SUSPICIOUS
    if inputs.confidence >= 0.50 {
        return VerificationStatus::Suspicious;
    }

    // Rule 7: LIKELY_VALID
    if (inputs.has_false_positive_warning && inputs.confidence >= 0.30)
        || (inputs.recent_paper_probe && inputs.confidence < 0.50)
    {
        return VerificationStatus::LikelyValid;
    }

    // Rule 8: NOT_FOUND
    VerificationStatus::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ClassificationInputs {
        ClassificationInputs::default()
    }

    #[test]
    fn definite_fake_future_date_low_confidence() {
        let mut i = base();
        i.has_fake_indicator = true;
        i.has_future_date_indicator = true;
        i.confidence = 0.2;
        assert_eq!(classify(&i), VerificationStatus::DefiniteFake);
    }

    #[test]
    fn fake_indicator_suppressed_by_false_positive_warning() {
        let mut i = base();
        i.has_fake_indicator = true;
        i.has_future_date_indicator = true;
        i.confidence = 0.2;
        i.has_false_positive_warning = true;
        assert_ne!(classify(&i), VerificationStatus::DefiniteFake);
    }

    #[test]
    fn frankenstein_always_fake_regardless_of_confidence() {
        let mut i = base();
        i.has_fake_indicator = true;
        i.has_frankenstein_indicator = true;
        i.confidence = 0.95;
        assert_eq!(classify(&i), VerificationStatus::DefiniteFake);
    }

    #[test]
    fn verified_legacy_doi() {
        let mut i = base();
        i.confidence = 0.85;
        i.cited_doi_present = true;
        i.doi_valid = Some(false);
        i.pubmed_match_present = true;
        assert_eq!(classify(&i), VerificationStatus::VerifiedLegacyDoi);
    }

    #[test]
    fn verified_plain() {
        let mut i = base();
        i.confidence = 0.9;
        assert_eq!(classify(&i), VerificationStatus::Verified);
    }

    #[test]
    fn low_quality_source() {
        let mut i = base();
        i.confidence = 0.4;
        i.low_quality_source_probe = true;
        assert_eq!(classify(&i), VerificationStatus::LowQualitySource);
    }

    #[test]
    fn grey_literature() {
        let mut i = base();
        i.confidence = 0.6;
        i.grey_literature_probe = true;
        assert_eq!(classify(&i), VerificationStatus::GreyLiterature);
    }

    #[test]
    fn suspicious() {
        let mut i = base();
        i.confidence = 0.55;
        assert_eq!(classify(&i), VerificationStatus::Suspicious);
    }

    #[test]
    fn likely_valid_false_positive_warning() {
        let mut i = base();
        i.confidence = 0.35;
        i.has_false_positive_warning = true;
        assert_eq!(classify(&i), VerificationStatus::LikelyValid);
    }

    #[test]
    fn likely_valid_recent_paper() {
        let mut i = base();
        i.confidence = 0.2;
        i.recent_paper_probe = true;
        assert_eq!(classify(&i), VerificationStatus::LikelyValid);
    }

    #[test]
    fn not_found_fallback() {
        let i = base();
        assert_eq!(classify(&i), VerificationStatus::NotFound);
    }

    #[test]
    fn boundary_confidence_080_is_verified() {
        let mut i = base();
        i.confidence = 0.80;
        assert_eq!(classify(&i), VerificationStatus::Verified);
    }

    #[test]
    fn boundary_confidence_050_is_suspicious() {
        let mut i = base();
        i.confidence = 0.50;
        assert_eq!(classify(&i), VerificationStatus::Suspicious);
    }
}
