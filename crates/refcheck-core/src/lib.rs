//! Core data model, fuzzy matcher, source adapters, cache, verification
//! engine, classifier, and batch analyzer for the academic reference
//! verification engine.

pub mod authors;
pub mod batch;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod config_file;
pub mod db;
pub mod doi;
pub mod engine;
pub mod error;
pub mod keywords;
pub mod matching;
pub mod model;
pub mod rate_limit;

pub use batch::BatchAnalyzer;
pub use config::Config;
pub use engine::Engine;
pub use error::CoreError;
pub use model::{
    BatchDiagnosis, DoiValidity, MatchFields, ParsedReference, SourceMatch, VerificationResult,
    VerificationStatus,
};

/// Verify a single parsed reference, building a one-shot [`Engine`] from
/// `config`. Callers verifying many references should construct an
/// [`Engine`] once and call [`Engine::verify`]/[`Engine::verify_batch`]
/// directly, so the cache and HTTP connection pool are shared.
pub async fn verify(reference: &ParsedReference, config: Config) -> VerificationResult {
    Engine::new(config).verify(reference).await
}

/// Verify a batch of parsed references, building a one-shot [`Engine`].
pub async fn verify_batch(references: &[ParsedReference], config: Config) -> Vec<VerificationResult> {
    Engine::new(config).verify_batch(references).await
}
