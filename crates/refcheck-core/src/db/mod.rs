//! Source adapters: thin wrappers over the five external bibliographic
//! endpoints in §4.2, sharing a single HTTP client.

pub mod crossref;
pub mod europe_pmc;
pub mod openalex;
pub mod pubmed;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::model::{ParsedReference, SourceMatch};
use crate::rate_limit::DbQueryError;

pub type AdapterFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<Option<T>, DbQueryError>> + Send + 'a>>;

/// A bibliographic source that can be looked up by DOI and/or searched by
/// title/author/year. Adapters return `Ok(None)` for an ordinary "not
/// found" and reserve `Err` for a request that never got an answer at all
/// (the engine maps that to `ERROR` only if every other source also fails).
pub trait SourceAdapter: Send + Sync {
    /// The canonical name reported in `verification_sources`.
    fn name(&self) -> &'static str;

    /// Direct DOI lookup. Default: unsupported.
    fn lookup_by_doi<'a>(
        &'a self,
        _doi: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> AdapterFuture<'a, SourceMatch> {
        Box::pin(async { Ok(None) })
    }

    /// Title/author/year search.
    fn search<'a>(
        &'a self,
        reference: &'a ParsedReference,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> AdapterFuture<'a, SourceMatch>;
}

/// Build the User-Agent string adapters send to the polite pools: the
/// caller's contact email if configured, else a bare identifier.
pub fn user_agent(email: Option<&str>) -> String {
    match email {
        Some(email) => format!("refcheck/0.1 (mailto:{email})"),
        None => "refcheck/0.1".to_string(),
    }
}
