//! Core data model: the structured forms that flow between the parser,
//! the verification engine, and the batch analyzer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The structured form of one citation, produced once by the parser and
/// immutable thereafter. `raw_text` and `reference_number` are always
/// present; every other field is recovered on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReference {
    pub raw_text: String,
    pub reference_number: usize,

    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub url: Option<String>,

    pub parse_confidence: f64,
    pub parse_warnings: Vec<String>,
}

impl ParsedReference {
    /// A bare, unparsed reference: used when the validity predicate rejects
    /// an entry but its text still needs to flow through for bookkeeping.
    pub fn new(raw_text: impl Into<String>, reference_number: usize) -> Self {
        Self {
            raw_text: raw_text.into(),
            reference_number,
            authors: Vec::new(),
            year: None,
            title: None,
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            doi: None,
            pmid: None,
            url: None,
            parse_confidence: 0.0,
            parse_warnings: Vec::new(),
        }
    }
}

/// Fields common to every source match, regardless of which database
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFields {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub confidence: f64,
}

/// A hit from one external bibliographic source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceMatch {
    PubMed { fields: MatchFields, pmid: String },
    CrossRef(MatchFields),
    OpenAlex(MatchFields),
    EuropePmc(MatchFields),
}

impl SourceMatch {
    pub fn fields(&self) -> &MatchFields {
        match self {
            SourceMatch::PubMed { fields, .. } => fields,
            SourceMatch::CrossRef(f) => f,
            SourceMatch::OpenAlex(f) => f,
            SourceMatch::EuropePmc(f) => f,
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            SourceMatch::PubMed { .. } => "PubMed",
            SourceMatch::CrossRef(_) => "CrossRef",
            SourceMatch::OpenAlex(_) => "OpenAlex",
            SourceMatch::EuropePmc(_) => "Europe PMC",
        }
    }

    pub fn confidence(&self) -> f64 {
        self.fields().confidence
    }
}

/// Tri-state DOI resolution outcome: a network error is neither "valid"
/// nor "invalid" and must not, on its own, demote a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoiValidity {
    Valid,
    Invalid,
    Indeterminate,
}

/// The eight terminal verification tiers (priority order, highest first),
/// plus the two orthogonal statuses `Unparseable` and `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    DefiniteFake,
    VerifiedLegacyDoi,
    Verified,
    LowQualitySource,
    GreyLiterature,
    Suspicious,
    LikelyValid,
    NotFound,
    Unparseable,
    Error,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::DefiniteFake => "DEFINITE_FAKE",
            VerificationStatus::VerifiedLegacyDoi => "VERIFIED_LEGACY_DOI",
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::LowQualitySource => "LOW_QUALITY_SOURCE",
            VerificationStatus::GreyLiterature => "GREY_LITERATURE",
            VerificationStatus::Suspicious => "SUSPICIOUS",
            VerificationStatus::LikelyValid => "LIKELY_VALID",
            VerificationStatus::NotFound => "NOT_FOUND",
            VerificationStatus::Unparseable => "UNPARSEABLE",
            VerificationStatus::Error => "ERROR",
        }
    }
}

/// The output of verifying a single reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub confidence: f64,

    pub pubmed_match: Option<SourceMatch>,
    pub crossref_match: Option<SourceMatch>,
    pub openalex_match: Option<SourceMatch>,
    pub europe_pmc_match: Option<SourceMatch>,
    pub doi_valid: Option<DoiValidity>,

    pub discrepancies: Vec<String>,
    pub fake_indicators: Vec<String>,
    pub false_positive_warnings: Vec<String>,
    pub manual_verify_links: HashMap<String, String>,
    pub verification_sources: Vec<String>,
    pub error_message: Option<String>,
}

impl VerificationResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Error,
            confidence: 0.0,
            pubmed_match: None,
            crossref_match: None,
            openalex_match: None,
            europe_pmc_match: None,
            doi_valid: None,
            discrepancies: Vec::new(),
            fake_indicators: Vec::new(),
            false_positive_warnings: Vec::new(),
            manual_verify_links: HashMap::new(),
            verification_sources: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    pub fn unparseable() -> Self {
        Self {
            status: VerificationStatus::Unparseable,
            confidence: 0.0,
            pubmed_match: None,
            crossref_match: None,
            openalex_match: None,
            europe_pmc_match: None,
            doi_valid: None,
            discrepancies: Vec::new(),
            fake_indicators: Vec::new(),
            false_positive_warnings: Vec::new(),
            manual_verify_links: HashMap::new(),
            verification_sources: Vec::new(),
            error_message: None,
        }
    }
}

/// Per-document meta-analysis over a batch of [`VerificationResult`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDiagnosis {
    pub likely_layout_issue: bool,
    pub failure_rate: f64,
    pub status_histogram: HashMap<String, usize>,
    pub recommendation: String,
}
