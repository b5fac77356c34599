//! Clinical research aggregation engine.
//!
//! Answers a medical query by consulting a literature index, a clinical
//! trial registry and embedded knowledge tables, either one source at a time
//! or all at once through [`ResearchEngine::comprehensive_research`].
//! Upstream failures degrade to empty results instead of failing the call.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod resilience;

pub use client::{
    ClinicalTrialItem, ClinicalTrialsProvider, LiteratureItem, LiteratureSource, PubMedProvider,
    SortMode, TrialRegistry,
};
pub use config::{Config, ConfigOverrides, LogFormat};
pub use engine::{
    AggregateResult, ComprehensiveRequest, DrugInteraction, ResearchEngine, ResearchResponse,
    Severity,
};
pub use error::{Error, ErrorCategory, Result};
pub use knowledge::{KnowledgeSource, StaticKnowledgeSource};
