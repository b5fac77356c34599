//! # Research Engine
//!
//! Caller-facing operations over the knowledge sources. Every single-source
//! operation is an adapter: anticipated failures (network errors, non-2xx
//! responses, timeouts, unknown conditions) are logged and turned into an
//! empty list or `None`. Only unexpected internal failures propagate.
//!
//! [`ResearchEngine::comprehensive_research`] fans out to all sources at
//! once; see [`orchestrator`].

pub mod interactions;
pub mod orchestrator;
pub mod relevance;
pub mod response;
pub mod validation;

pub use interactions::{DrugInteraction, InteractionChecker, Severity};
pub use orchestrator::{AggregateResult, ComprehensiveRequest};
pub use relevance::{relevance_score, ScoringInput};
pub use response::{require_found, ResearchResponse};
pub use validation::{validate_medications, validate_query};

use crate::client::{
    ClinicalTrialItem, ClinicalTrialsProvider, LiteratureItem, LiteratureQuery, LiteratureSource,
    PubMedProvider, SortMode, TrialQuery, TrialRegistry,
};
use crate::config::Config;
use crate::knowledge::{
    CalculatorDescriptor, DiagnosticCriteria, Icd10Entry, KnowledgeSource, PatientContext,
    StaticKnowledgeSource, TreatmentGuideline,
};
use crate::resilience::with_timeout;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Stateless research engine. Cloning is cheap; build one at startup and
/// share it.
#[derive(Clone)]
pub struct ResearchEngine {
    literature: Arc<dyn LiteratureSource>,
    trials: Arc<dyn TrialRegistry>,
    knowledge: Arc<dyn KnowledgeSource>,
    interactions: Arc<InteractionChecker>,
    config: Arc<Config>,
}

impl std::fmt::Debug for ResearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchEngine")
            .field("literature", &self.literature.name())
            .field("trials", &self.trials.name())
            .field("knowledge", &self.knowledge.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResearchEngine {
    /// Assemble an engine from explicit sources
    pub fn new(
        literature: Arc<dyn LiteratureSource>,
        trials: Arc<dyn TrialRegistry>,
        knowledge: Arc<dyn KnowledgeSource>,
        config: Config,
    ) -> Self {
        Self {
            literature,
            trials,
            knowledge,
            interactions: Arc::new(InteractionChecker::new()),
            config: Arc::new(config),
        }
    }

    /// Build the production engine: PubMed, the trial registry and the
    /// embedded knowledge tables
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let literature = PubMedProvider::new(&config)
            .map_err(|e| Error::from_provider("pubmed", e))?;
        let trials = ClinicalTrialsProvider::new(&config)
            .map_err(|e| Error::from_provider("clinical_trials", e))?;

        info!(
            "Initialized research engine (literature: {}, trials: {}, branch deadline: {:?})",
            config.literature.base_url,
            config.trials.base_url,
            config.engine.branch_timeout()
        );

        Ok(Self::new(
            Arc::new(literature),
            Arc::new(trials),
            Arc::new(StaticKnowledgeSource::new()),
            config,
        ))
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn effective_limit(requested: Option<u32>, default_limit: u32, max_limit: u32) -> u32 {
        match requested {
            None | Some(0) => default_limit,
            Some(limit) => limit.min(max_limit),
        }
    }

    /// Search the literature index and score each record against `query`
    #[instrument(skip(self))]
    pub async fn search_literature(
        &self,
        query: &str,
        limit: Option<u32>,
        sort: SortMode,
    ) -> Result<Vec<LiteratureItem>> {
        let request = LiteratureQuery {
            query: query.trim().to_string(),
            limit: Self::effective_limit(
                limit,
                self.config.literature.default_limit,
                self.config.literature.max_limit,
            ),
            sort,
        };

        let source = self.literature.name();
        let result = self
            .literature
            .search(&request)
            .await
            .map_err(|e| Error::from_provider(source, e));

        let mut items = neutralize(source, "literature search", result, Vec::new())?;
        for item in &mut items {
            item.relevance_score = relevance_score(&ScoringInput::from(&*item), query);
        }

        info!("Literature search returned {} records", items.len());
        Ok(items)
    }

    /// Search the trial registry for a condition
    #[instrument(skip(self))]
    pub async fn search_trials(
        &self,
        condition: &str,
        limit: Option<u32>,
    ) -> Result<Vec<ClinicalTrialItem>> {
        let request = TrialQuery {
            condition: condition.trim().to_string(),
            limit: Self::effective_limit(
                limit,
                self.config.trials.default_limit,
                self.config.trials.max_limit,
            ),
        };

        let source = self.trials.name();
        let result = self
            .trials
            .search(&request)
            .await
            .map_err(|e| Error::from_provider(source, e));

        let trials = neutralize(source, "trial search", result, Vec::new())?;
        info!("Trial search returned {} trials", trials.len());
        Ok(trials)
    }

    #[instrument(skip(self))]
    pub async fn diagnostic_criteria(&self, condition: &str) -> Result<Option<DiagnosticCriteria>> {
        let result = self.knowledge.diagnostic_criteria(condition).await;
        neutralize(self.knowledge.name(), "diagnostic criteria lookup", result, None)
    }

    #[instrument(skip(self, patient_context))]
    pub async fn treatment_guidelines(
        &self,
        condition: &str,
        patient_context: Option<&PatientContext>,
    ) -> Result<Option<TreatmentGuideline>> {
        let result = self
            .knowledge
            .treatment_guidelines(condition, patient_context)
            .await;
        neutralize(self.knowledge.name(), "treatment guideline lookup", result, None)
    }

    #[instrument(skip(self))]
    pub async fn icd10(&self, condition: &str) -> Result<Option<Icd10Entry>> {
        let result = self.knowledge.icd10(condition).await;
        neutralize(self.knowledge.name(), "ICD-10 lookup", result, None)
    }

    #[instrument(skip(self, patient_data))]
    pub async fn calculators(
        &self,
        condition: &str,
        patient_data: Option<&PatientContext>,
    ) -> Result<Vec<CalculatorDescriptor>> {
        let result = self.knowledge.calculators(condition, patient_data).await;
        neutralize(self.knowledge.name(), "calculator lookup", result, Vec::new())
    }

    /// Pairwise interaction check. Never fails.
    pub fn check_interactions<S: AsRef<str>>(&self, medications: &[S]) -> Vec<DrugInteraction> {
        self.interactions.check(medications)
    }

    /// Probe the network sources concurrently. Never fails; an unreachable
    /// or slow source reports `false`.
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let deadline = self.config.engine.branch_timeout();

        let (literature, trials) = futures::join!(
            with_timeout(self.literature.health_check(), deadline),
            with_timeout(self.trials.health_check(), deadline),
        );

        let mut results = HashMap::new();
        for (name, outcome) in [
            (self.literature.name(), literature),
            (self.trials.name(), trials),
        ] {
            let healthy = matches!(outcome, Ok(Ok(true)));
            if healthy {
                info!("Source {} is healthy", name);
            } else {
                warn!("Source {} is unhealthy", name);
            }
            results.insert(name.to_string(), healthy);
        }
        results
    }
}

/// Adapter boundary: degrade anticipated failures to `fallback`, propagate
/// the rest
fn neutralize<T>(source: &str, operation: &str, result: Result<T>, fallback: T) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_surfaced() => {
            error!("{} via {} failed unexpectedly: {}", operation, source, e);
            Err(e)
        }
        Err(e) => {
            warn!(
                "{} via {} failed, returning empty result: {}",
                operation, source, e
            );
            Ok(fallback)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{engine, Behaviour};
    use super::*;

    #[tokio::test]
    async fn test_literature_scores_attached() {
        let engine = engine(Behaviour::Succeed, Behaviour::Succeed);
        let items = engine
            .search_literature("diabetes", None, SortMode::Relevance)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        // "diabetes outcomes" title hit, 1990 has no recency bonus
        assert_eq!(items[0].relevance_score, 3);
        assert_eq!(items[1].relevance_score, 0);
    }

    #[tokio::test]
    async fn test_unavailable_sources_degrade_to_empty() {
        let engine = engine(Behaviour::Unavailable, Behaviour::Unavailable);
        assert!(engine
            .search_literature("diabetes", Some(5), SortMode::Date)
            .await
            .unwrap()
            .is_empty());
        assert!(engine.search_trials("diabetes", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_upstream_is_surfaced() {
        let engine = engine(Behaviour::Malformed, Behaviour::Succeed);
        let err = engine
            .search_literature("diabetes", None, SortMode::Relevance)
            .await
            .unwrap_err();
        assert!(err.is_surfaced());
    }

    #[tokio::test]
    async fn test_knowledge_lookups() {
        let engine = engine(Behaviour::Succeed, Behaviour::Succeed);

        let criteria = engine.diagnostic_criteria("diabetes").await.unwrap().unwrap();
        assert_eq!(criteria.criteria.len(), 4);
        assert_eq!(criteria.source, "American Diabetes Association");

        let unknown = "nonexistent_condition_xyz";
        assert!(engine.diagnostic_criteria(unknown).await.unwrap().is_none());
        assert!(engine.treatment_guidelines(unknown, None).await.unwrap().is_none());
        assert!(engine.icd10(unknown).await.unwrap().is_none());
        assert!(engine.calculators(unknown, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_interactions() {
        let engine = engine(Behaviour::Succeed, Behaviour::Succeed);
        let found = engine.check_interactions(&["warfarin", "aspirin"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Moderate);
        assert!(engine.check_interactions(&["metformin", "lisinopril"]).is_empty());
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(ResearchEngine::effective_limit(None, 10, 100), 10);
        assert_eq!(ResearchEngine::effective_limit(Some(0), 10, 100), 10);
        assert_eq!(ResearchEngine::effective_limit(Some(25), 10, 100), 25);
        assert_eq!(ResearchEngine::effective_limit(Some(500), 10, 100), 100);
    }

    #[tokio::test]
    async fn test_health_check_reports_each_source() {
        let engine = engine(Behaviour::Succeed, Behaviour::Unavailable);
        let health = engine.health_check().await;
        assert_eq!(health.get("scripted_literature"), Some(&true));
        assert_eq!(health.get("scripted_trials"), Some(&false));
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = Config::default();
        config.trials.fields.clear();
        assert!(ResearchEngine::from_config(config).is_err());
    }
}
