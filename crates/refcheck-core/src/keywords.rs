//! Hand-curated keyword sets for the classifier's heuristic probes.
//!
//! Kept together in one module so domain experts can revise the lists
//! without touching engine logic.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Journal-name keywords suggesting biomedical scope.
pub static MEDICAL_JOURNAL_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "medicine", "medical", "clinical", "health", "disease", "therapy", "therapeutic",
        "pharmaceutical", "drug", "cancer", "cardiology", "neurology", "surgery", "nursing",
        "psychiatry", "psychology", "pediatric", "lancet", "bmj", "jama", "nejm", "annals",
        "archives", "biochem", "molecular", "cell", "genetics", "immunology", "infection",
        "virus", "pathology", "pharmacology", "toxicology", "epidemiology", "public health",
        "nutrition", "obesity", "diabetes", "heart", "lung", "kidney", "liver", "brain",
        "blood", "bone", "skin", "eye", "ear", "dental", "oral", "rehabilitation", "radiology",
        "imaging", "ultrasound", "mri", "oncology", "hospice", "palliative",
    ]
    .into_iter()
    .collect()
});

/// Journal-name keywords suggesting a field outside PubMed's usual coverage.
pub static NON_MEDICAL_INDICATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "computer", "computing", "software", "information system", "artificial intelligence",
        "machine learning", "data science", "engineering", "physics", "chemistry", "materials",
        "education", "educational", "learning", "teaching", "pedagogy", "curriculum",
        "business", "management", "economics", "finance", "marketing", "organization",
        "social", "sociology", "anthropology", "political", "law", "legal", "humanities",
        "philosophy", "ethics", "literature", "linguistics", "history", "art", "music",
        "environment", "ecology", "sustainability", "energy", "renewable", "climate",
        "expert systems", "decision support", "automation", "robotics", "ieee", "acm",
    ]
    .into_iter()
    .collect()
});

/// Keywords marking grey literature: reports, guidelines, and policy documents.
pub static GREY_LITERATURE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "who", "world health organization", "cdc", "nhs", "nice", "cochrane", "prisma",
        "icd-10", "icd-11", "guideline", "policy brief", "white paper", "technical report",
        "working paper", "government report",
    ]
    .into_iter()
    .collect()
});

/// Keywords marking books, handbooks, and software documentation.
pub static BOOK_SOFTWARE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "handbook", "textbook", "edition", "chapter", "publisher", "spss", "stata",
        "r core team", "sas institute",
    ]
    .into_iter()
    .collect()
});

/// Keywords marking preprints and low-quality or unreviewed sources.
pub static LOW_QUALITY_SOURCE_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "arxiv", "biorxiv", "medrxiv", "ssrn", "researchgate", "academia.edu", "wikipedia",
        "blog", "blogspot", "medium.com", "news",
    ]
    .into_iter()
    .collect()
});

/// Markers suggesting a citation refers to a web resource rather than an
/// indexed academic paper.
pub static WEB_RESOURCE_MARKERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "retrieved from",
        "accessed",
        "http://",
        "https://",
        ".gov",
        ".org/report",
    ]
    .into_iter()
    .collect()
});

pub fn journal_is_medical(journal: &str) -> bool {
    let lower = journal.to_lowercase();
    MEDICAL_JOURNAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub fn journal_is_non_medical(journal: &str) -> bool {
    let lower = journal.to_lowercase();
    if journal_is_medical(journal) {
        return false;
    }
    NON_MEDICAL_INDICATORS.iter().any(|kw| lower.contains(kw))
}

pub fn contains_any(text: &str, keywords: &HashSet<&'static str>) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw))
}
