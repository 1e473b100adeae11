//! The verification engine: runs the eight-step cascade of §4.4 over one
//! [`ParsedReference`] and orchestrates concurrent verification of a batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::{Cache, cache_key};
use crate::classifier::{self, ClassificationInputs};
use crate::config::Config;
use crate::db::SourceAdapter;
use crate::db::crossref::CrossRef;
use crate::db::europe_pmc::EuropePmc;
use crate::db::openalex::OpenAlex;
use crate::db::pubmed::PubMed;
use crate::doi;
use crate::keywords;
use crate::matching::title_similarity;
use crate::model::{DoiValidity, MatchFields, ParsedReference, SourceMatch, VerificationResult};

/// Wires up the shared HTTP client, cache, and source adapters, and runs
/// the verification cascade.
pub struct Engine {
    config: Config,
    client: reqwest::Client,
    cache: Cache,
    pubmed: PubMed,
    crossref: CrossRef,
    openalex: OpenAlex,
    europe_pmc: EuropePmc,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("reqwest client with default TLS backend");
        let cache = match &config.cache_path {
            Some(path) => Cache::open(path).unwrap_or_else(|e| {
                warn!("failed to open persistent cache at {path:?}: {e}; falling back to memory-only");
                Cache::new()
            }),
            None => Cache::new(),
        };
        Self {
            pubmed: PubMed::new(config.email.clone(), config.title_match_floor),
            crossref: CrossRef { email: config.email.clone(), title_match_floor: config.title_match_floor },
            openalex: OpenAlex { email: config.email.clone(), title_match_floor: config.title_match_floor },
            europe_pmc: EuropePmc { title_match_floor: config.title_match_floor },
            client,
            cache,
            config,
        }
    }

    fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.config.http_timeout_secs)
    }

    fn doi_timeout(&self) -> Duration {
        Duration::from_secs(self.config.doi_timeout_secs)
    }

    /// Verify a single reference, consulting and updating the cache.
    pub async fn verify(&self, reference: &ParsedReference) -> VerificationResult {
        if reference.title.is_none()
            && reference.doi.is_none()
            && reference.authors.is_empty()
            && reference.parse_confidence <= 0.0
        {
            return VerificationResult::unparseable();
        }

        let key = cache_key(reference);
        if let Some(cached) = self.cache.get(&key) {
            debug!(%key, "cache hit");
            return cached;
        }
        debug!(%key, "cache miss");

        let result = self.run_cascade(reference).await;
        self.cache.insert(&key, result.clone());
        result
    }

    /// Verify a batch of references, bounded to `max_concurrent` in-flight
    /// at once, returning results in input order regardless of completion
    /// order.
    pub async fn verify_batch(&self, references: &[ParsedReference]) -> Vec<VerificationResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let futures = references.iter().map(|reference| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                self.verify(reference).await
            }
        });
        futures_util::future::join_all(futures).await
    }

    async fn run_cascade(&self, reference: &ParsedReference) -> VerificationResult {
        let mut confidence: f64 = 0.0;
        let mut fake_indicators: Vec<String> = Vec::new();
        let mut false_positive_warnings: Vec<String> = Vec::new();
        let mut discrepancies: Vec<String> = Vec::new();
        let mut doi_valid: Option<DoiValidity> = None;
        let mut pubmed_match: Option<SourceMatch> = None;
        let mut crossref_match: Option<SourceMatch> = None;
        let mut openalex_match: Option<SourceMatch> = None;
        let mut europe_pmc_match: Option<SourceMatch> = None;
        let mut verification_sources: Vec<String> = Vec::new();
        let mut any_network_success = false;

        let (current_year, _current_month) = now_year_month();

        // --- Step 0: pre-network fake checks -------------------------------
        let mut usable_doi = reference.doi.clone().filter(|d| !d.is_empty());
        let mut has_future_date_indicator = false;
        if let Some(d) = &usable_doi
            && doi::is_truncated_doi(d)
        {
            fake_indicators.push(format!("Truncated DOI cannot be resolved: {d}"));
            usable_doi = None;
        }
        if let Some(year) = reference.year
            && year > current_year
        {
            fake_indicators.push(format!("Future publication date: {year}"));
            has_future_date_indicator = true;
        }

        // --- Step 1: DOI resolution (multi-source) --------------------------
        let mut has_frankenstein_indicator = false;
        if let Some(d) = &usable_doi {
            let resolution = doi::resolve_doi(&self.client, d, self.doi_timeout(), self.config.email.as_deref()).await;
            any_network_success = true;

            let mut doi_metadata_title: Option<String> = None;

            match resolution {
                doi::DoiResolution::Valid => {
                    doi_valid = Some(DoiValidity::Valid);
                    confidence = confidence.max(0.90);

                    let (cr, oa) = tokio::join!(
                        self.crossref.lookup_by_doi(d, &self.client, self.http_timeout()),
                        self.openalex.lookup_by_doi(d, &self.client, self.http_timeout()),
                    );
                    let cr = cr.ok().flatten();
                    let oa = oa.ok().flatten();
                    doi_metadata_title = cr.as_ref().and_then(|m| m.fields().title.clone())
                        .or_else(|| oa.as_ref().and_then(|m| m.fields().title.clone()));
                    if let Some(m) = cr {
                        verification_sources.push(m.source_name().to_string());
                        crossref_match = Some(m);
                    }
                    if let Some(m) = oa {
                        verification_sources.push(m.source_name().to_string());
                        openalex_match = Some(m);
                    }
                }
                doi::DoiResolution::Invalid => {
                    doi_valid = Some(DoiValidity::Invalid);
                    let (cr, oa) = tokio::join!(
                        self.crossref.lookup_by_doi(d, &self.client, self.http_timeout()),
                        self.openalex.lookup_by_doi(d, &self.client, self.http_timeout()),
                    );
                    let cr = cr.ok().flatten();
                    let oa = oa.ok().flatten();
                    let salvaged = cr.is_some() || oa.is_some();
                    doi_metadata_title = cr.as_ref().and_then(|m| m.fields().title.clone())
                        .or_else(|| oa.as_ref().and_then(|m| m.fields().title.clone()));
                    if let Some(m) = cr {
                        verification_sources.push(m.source_name().to_string());
                        crossref_match = Some(m);
                    }
                    if let Some(m) = oa {
                        verification_sources.push(m.source_name().to_string());
                        openalex_match = Some(m);
                    }
                    if salvaged {
                        confidence = confidence.max(0.85);
                    } else {
                        discrepancies.push(format!("DOI does not resolve: {d}"));
                    }
                }
                doi::DoiResolution::Indeterminate => {
                    doi_valid = Some(DoiValidity::Indeterminate);
                    let (cr, oa) = tokio::join!(
                        self.crossref.lookup_by_doi(d, &self.client, self.http_timeout()),
                        self.openalex.lookup_by_doi(d, &self.client, self.http_timeout()),
                    );
                    let cr = cr.ok().flatten();
                    let oa = oa.ok().flatten();
                    doi_metadata_title = cr.as_ref().and_then(|m| m.fields().title.clone())
                        .or_else(|| oa.as_ref().and_then(|m| m.fields().title.clone()));
                    if cr.is_some() || oa.is_some() {
                        confidence = confidence.max(0.85);
                    }
                    if let Some(m) = cr {
                        verification_sources.push(m.source_name().to_string());
                        crossref_match = Some(m);
                    }
                    if let Some(m) = oa {
                        verification_sources.push(m.source_name().to_string());
                        openalex_match = Some(m);
                    }
                }
            }

            if doi_metadata_title.is_none() {
                if let Some(meta) = doi::fetch_doi_metadata(&self.client, d, self.doi_timeout()).await {
                    doi_metadata_title = meta.title;
                }
            }

            if reference.title.is_some() && doi::is_frankenstein(reference.title.as_deref(), doi_metadata_title.as_deref()) {
                fake_indicators.push(format!(
                    "FRANKENSTEIN CITATION: DOI resolves to an unrelated work (\"{}\")",
                    doi_metadata_title.as_deref().unwrap_or("").chars().take(120).collect::<String>()
                ));
                has_frankenstein_indicator = true;
            }
        }

        // --- Step 2: PubMed search (always) ---------------------------------
        let mut has_field_difference_doi_mismatch = false;
        match self.pubmed.search(reference, &self.client, self.http_timeout()).await {
            Ok(Some(m)) => {
                any_network_success = true;
                verification_sources.push(m.source_name().to_string());
                confidence = confidence.max(m.confidence());
                record_discrepancies(&mut discrepancies, reference, m.fields());

                if let (Some(cited), Some(found)) = (&reference.doi, &m.fields().doi)
                    && !cited.eq_ignore_ascii_case(found)
                {
                    let cited_medical = reference.journal.as_deref().map(keywords::journal_is_medical).unwrap_or(false);
                    let found_medical = m.fields().journal.as_deref().map(keywords::journal_is_medical).unwrap_or(false);
                    if cited_medical != found_medical {
                        fake_indicators.push("DOI mismatch with field difference between cited and matched record".to_string());
                        has_field_difference_doi_mismatch = true;
                    }
                }
                pubmed_match = Some(m);
            }
            Ok(None) => {
                any_network_success = true;
            }
            Err(e) => {
                warn!(adapter = "PubMed", error = %e, "adapter search failed");
            }
        }

        // --- Step 3: CrossRef search (only while below verified threshold) --
        if confidence < self.config.verified_threshold && crossref_match.is_none() {
            match self.crossref.search(reference, &self.client, self.http_timeout()).await {
                Ok(Some(m)) => {
                    any_network_success = true;
                    verification_sources.push(m.source_name().to_string());
                    confidence = confidence.max(m.confidence());
                    record_discrepancies(&mut discrepancies, reference, m.fields());
                    if pubmed_match.is_none()
                        && m.confidence() >= self.config.verified_threshold
                        && m.fields().journal.as_deref().map(keywords::journal_is_non_medical).unwrap_or(false)
                    {
                        false_positive_warnings.push(
                            "Verified via CrossRef but journal is outside PubMed's scope; absence from PubMed is expected.".to_string(),
                        );
                    }
                    crossref_match = Some(m);
                }
                Ok(None) => any_network_success = true,
                Err(e) => warn!(adapter = "CrossRef", error = %e, "adapter search failed"),
            }
        }

        // --- Step 4: Europe PMC fallback -------------------------------------
        if confidence < self.config.verified_threshold {
            match self.europe_pmc.search(reference, &self.client, self.http_timeout()).await {
                Ok(Some(m)) => {
                    any_network_success = true;
                    verification_sources.push(m.source_name().to_string());
                    confidence = confidence.max(m.confidence());
                    record_discrepancies(&mut discrepancies, reference, m.fields());
                    if pubmed_match.is_none()
                        && m.confidence() >= self.config.verified_threshold
                        && m.fields().journal.as_deref().map(keywords::journal_is_non_medical).unwrap_or(false)
                    {
                        false_positive_warnings.push(
                            "Verified via Europe PMC but journal is outside PubMed's scope; absence from PubMed is expected.".to_string(),
                        );
                    }
                    europe_pmc_match = Some(m);
                }
                Ok(None) => any_network_success = true,
                Err(e) => warn!(adapter = "Europe PMC", error = %e, "adapter search failed"),
            }
        }

        // --- Step 5: OpenAlex text search (last resort) ----------------------
        if confidence < self.config.verified_threshold && openalex_match.is_none() {
            match self.openalex.search(reference, &self.client, self.http_timeout()).await {
                Ok(Some(m)) => {
                    any_network_success = true;
                    verification_sources.push(m.source_name().to_string());
                    confidence = confidence.max(m.confidence());
                    record_discrepancies(&mut discrepancies, reference, m.fields());
                    openalex_match = Some(m);
                }
                Ok(None) => any_network_success = true,
                Err(e) => warn!(adapter = "OpenAlex", error = %e, "adapter search failed"),
            }
        }

        // --- Step 6: false-positive heuristics --------------------------------
        let any_db_year = [&pubmed_match, &crossref_match, &openalex_match, &europe_pmc_match]
            .iter()
            .filter_map(|m| m.as_ref().and_then(|m| m.fields().year))
            .max();
        if let (Some(cited_year), Some(db_year)) = (reference.year, any_db_year)
            && cited_year < 1980
            && db_year > 2000
        {
            false_positive_warnings.push(
                "Cited year predates 1980 but the matched record is from after 2000; likely a modern edition or reprint.".to_string(),
            );
        }

        if contains_web_resource_marker(&reference.raw_text) && confidence < self.config.suspicious_threshold {
            false_positive_warnings.push("Citation text resembles a web resource; likely grey literature rather than a fabrication.".to_string());
        }

        let journal_non_medical = reference.journal.as_deref().map(keywords::journal_is_non_medical).unwrap_or(false);
        if journal_non_medical && pubmed_match.is_none() {
            false_positive_warnings.push("Journal appears to be outside PubMed's scope; this is an expected coverage gap.".to_string());
        }

        // --- Step 7: source-type probes ----------------------------------------
        let grey_literature_probe = keywords::contains_any(&reference.raw_text, &keywords::GREY_LITERATURE_KEYWORDS);
        let book_software_probe = keywords::contains_any(&reference.raw_text, &keywords::BOOK_SOFTWARE_KEYWORDS);
        let low_quality_source_probe = keywords::contains_any(&reference.raw_text, &keywords::LOW_QUALITY_SOURCE_KEYWORDS);
        let recent_paper_probe = reference
            .year
            .map(|y| (current_year - y) as f64 <= self.config.recent_window_months as f64 / 12.0)
            .unwrap_or(false);

        // --- Manual-verify links -------------------------------------------------
        let mut manual_verify_links = HashMap::new();
        if let Some(title) = &reference.title {
            let fragment: String = title.chars().take(100).collect();
            let encoded = urlencoding::encode(&fragment);
            manual_verify_links.insert(
                "google_scholar".to_string(),
                format!("https://scholar.google.com/scholar?q={encoded}"),
            );
            manual_verify_links.insert(
                "crossref".to_string(),
                format!("https://search.crossref.org/?q={encoded}"),
            );
        }
        if let Some(d) = &reference.doi {
            manual_verify_links.insert("doi_resolver".to_string(), format!("https://doi.org/{}", urlencoding::encode(d)));
        }

        if !any_network_success {
            return VerificationResult::error("no source adapter returned a usable response");
        }

        // VERIFIED_LEGACY_DOI requires doi_valid = false specifically; an
        // indeterminate (network-failure) result must not count as either.
        let classifier_doi_valid = match doi_valid {
            Some(DoiValidity::Valid) => Some(true),
            Some(DoiValidity::Invalid) => Some(false),
            Some(DoiValidity::Indeterminate) | None => None,
        };

        let inputs = ClassificationInputs {
            confidence,
            has_fake_indicator: !fake_indicators.is_empty(),
            has_false_positive_warning: !false_positive_warnings.is_empty(),
            has_future_date_indicator,
            has_field_difference_doi_mismatch,
            has_frankenstein_indicator,
            cited_doi_present: reference.doi.as_ref().map(|d| !d.is_empty()).unwrap_or(false),
            doi_valid: classifier_doi_valid,
            pubmed_match_present: pubmed_match.is_some(),
            low_quality_source_probe,
            grey_literature_probe,
            book_software_probe,
            recent_paper_probe,
        };

        let status = classifier::classify(&inputs);

        VerificationResult {
            status,
            confidence,
            pubmed_match,
            crossref_match,
            openalex_match,
            europe_pmc_match,
            doi_valid,
            discrepancies,
            fake_indicators,
            false_positive_warnings,
            manual_verify_links,
            verification_sources,
            error_message: None,
        }
    }
}

/// Compare a parsed reference against a matched record and append any
/// discrepancies found, per §4.4's discrepancy rules.
fn record_discrepancies(discrepancies: &mut Vec<String>, reference: &ParsedReference, matched: &MatchFields) {
    if let (Some(cited), Some(found)) = (reference.year, matched.year)
        && (cited - found).abs() > 1
    {
        discrepancies.push(format!("Year mismatch: cited {cited}, matched {found}"));
    }

    let title_sim = title_similarity(reference.title.as_deref(), matched.title.as_deref());
    if reference.title.is_some() && matched.title.is_some() && title_sim < 0.5 {
        discrepancies.push(format!("Title mismatch (similarity {title_sim:.2})"));
    }

    if let (Some(cited), Some(found)) = (&reference.doi, &matched.doi)
        && !cited.eq_ignore_ascii_case(found)
    {
        discrepancies.push(format!("DOI mismatch: cited {cited}, matched {found}"));
    }

    let year_delta = match (reference.year, matched.year) {
        (Some(a), Some(b)) => (a - b).abs(),
        _ => 0,
    };
    if reference.title.is_some() && matched.title.is_some() && (title_sim < 0.30 || (title_sim < 0.5 && year_delta > 5)) {
        discrepancies.push(format!("Metadata mismatch: title similarity {title_sim:.2}, year delta {year_delta}"));
    }
}

fn contains_web_resource_marker(text: &str) -> bool {
    keywords::contains_any(text, &keywords::WEB_RESOURCE_MARKERS)
}

/// Civil (year, month) for the current day, computed from the Unix epoch
/// with Howard Hinnant's `civil_from_days` algorithm — no calendar crate is
/// pulled in just for this.
fn now_year_month() -> (i32, u32) {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = (secs / 86_400) as i64;

    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as i64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year as i32, m as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_year_month_is_plausible() {
        let (year, month) = now_year_month();
        assert!((2024..=2100).contains(&year));
        assert!((1..=12).contains(&month));
    }

    #[test]
    fn record_discrepancies_flags_year_and_title() {
        let mut r = ParsedReference::new("x", 1);
        r.year = Some(2020);
        r.title = Some("Effects of yoga on anxiety".to_string());

        let matched = MatchFields {
            title: Some("A completely unrelated paper about distributed databases".to_string()),
            authors: vec![],
            year: Some(2010),
            journal: None,
            doi: None,
            confidence: 0.5,
        };

        let mut discrepancies = Vec::new();
        record_discrepancies(&mut discrepancies, &r, &matched);
        assert!(discrepancies.iter().any(|d| d.contains("Year mismatch")));
        assert!(discrepancies.iter().any(|d| d.contains("Title mismatch")));
        assert!(discrepancies.iter().any(|d| d.contains("Metadata mismatch")));
    }

    #[test]
    fn record_discrepancies_silent_on_good_match() {
        let mut r = ParsedReference::new("x", 1);
        r.year = Some(2020);
        r.title = Some("Effects of yoga on anxiety".to_string());
        r.doi = Some("10.1/abc".to_string());

        let matched = MatchFields {
            title: Some("Effects of yoga on anxiety".to_string()),
            authors: vec![],
            year: Some(2020),
            journal: None,
            doi: Some("10.1/abc".to_string()),
            confidence: 0.9,
        };

        let mut discrepancies = Vec::new();
        record_discrepancies(&mut discrepancies, &r, &matched);
        assert!(discrepancies.is_empty());
    }
}
