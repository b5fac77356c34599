//! # Comprehensive Research
//!
//! One request fans out to six branches (literature, trials, diagnostic
//! criteria, treatment guidelines, ICD-10, calculators), each running as its
//! own task. The orchestrator waits for all of them before assembling the
//! [`AggregateResult`]; it never races them against each other.
//!
//! Branch failure semantics:
//! - anticipated upstream failures are already neutralized by the adapters
//!   and arrive here as empty values;
//! - a branch exceeding `engine.branch_timeout_secs` is abandoned, yields its
//!   empty value and is listed in `degraded_sources`;
//! - a surfaced adapter error or a panicked task fails the whole request.
//!
//! Cancelling the caller's token, or dropping the returned future, cancels
//! every in-flight branch.

use super::{DrugInteraction, ResearchEngine};
use crate::client::{ClinicalTrialItem, LiteratureItem, SortMode};
use crate::knowledge::{
    CalculatorDescriptor, DiagnosticCriteria, Icd10Entry, PatientContext, TreatmentGuideline,
};
use crate::resilience::{with_deadline, BranchOutcome};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Input of a comprehensive research request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveRequest {
    /// Condition or topic; also the key for the knowledge lookups
    pub query: String,
    #[serde(default)]
    pub medications: Vec<String>,
    /// Reserved for personalization, passed through unused
    #[serde(default)]
    pub patient_context: Option<PatientContext>,
}

impl ComprehensiveRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_medications(mut self, medications: Vec<String>) -> Self {
        self.medications = medications;
        self
    }

    #[must_use]
    pub fn with_patient_context(mut self, context: PatientContext) -> Self {
        self.patient_context = Some(context);
        self
    }
}

/// Unified answer of a comprehensive request. Every field is always present;
/// a failed or empty source shows up as `[]` or `null`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub request_id: Uuid,
    pub literature: Vec<LiteratureItem>,
    pub clinical_trials: Vec<ClinicalTrialItem>,
    pub diagnostic_criteria: Option<DiagnosticCriteria>,
    pub treatment_guidelines: Option<TreatmentGuideline>,
    pub drug_interactions: Vec<DrugInteraction>,
    pub icd_codes: Option<Icd10Entry>,
    pub calculators: Vec<CalculatorDescriptor>,
    /// Branches that hit their deadline and were replaced by empty values
    pub degraded_sources: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

type BranchHandle<T> = JoinHandle<BranchOutcome<Result<T>>>;

fn spawn_branch<T, F>(
    name: &'static str,
    future: F,
    deadline: Duration,
    token: &CancellationToken,
) -> BranchHandle<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let token = token.clone();
    tokio::spawn(async move { with_deadline(name, future, deadline, &token).await })
}

/// Folds joined branches into values, remembering degradation and failure
#[derive(Default)]
struct BranchCollector {
    degraded: Vec<String>,
    cancelled: bool,
    failure: Option<Error>,
}

impl BranchCollector {
    fn collect<T: Default>(
        &mut self,
        name: &str,
        joined: std::result::Result<BranchOutcome<Result<T>>, JoinError>,
    ) -> T {
        match joined {
            Ok(BranchOutcome::Completed(Ok(value))) => value,
            Ok(BranchOutcome::Completed(Err(e))) => {
                error!("Branch {} failed: {}", name, e);
                self.record_failure(e);
                T::default()
            }
            Ok(BranchOutcome::TimedOut(deadline)) => {
                warn!(
                    "Branch {} exceeded its {:?} deadline, using empty result",
                    name, deadline
                );
                self.degraded.push(name.to_string());
                T::default()
            }
            Ok(BranchOutcome::Cancelled) => {
                debug!("Branch {} cancelled", name);
                self.cancelled = true;
                T::default()
            }
            Err(join_error) => {
                error!("Branch {} task failed: {}", name, join_error);
                self.record_failure(Error::Internal(format!(
                    "{name} branch task failed: {join_error}"
                )));
                T::default()
            }
        }
    }

    fn record_failure(&mut self, e: Error) {
        if self.failure.is_none() {
            self.failure = Some(e);
        }
    }
}

impl ResearchEngine {
    /// Query every source concurrently and merge the answers
    pub async fn comprehensive_research(
        &self,
        request: &ComprehensiveRequest,
    ) -> Result<AggregateResult> {
        self.comprehensive_research_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// [`ResearchEngine::comprehensive_research`] that stops early when
    /// `cancellation` fires, returning [`Error::Cancelled`]
    #[instrument(
        skip_all,
        fields(query = %request.query, request_id = tracing::field::Empty)
    )]
    pub async fn comprehensive_research_with_cancellation(
        &self,
        request: &ComprehensiveRequest,
        cancellation: &CancellationToken,
    ) -> Result<AggregateResult> {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let start_time = Instant::now();
        let deadline = self.config.engine.branch_timeout();
        info!(
            "Starting comprehensive research ({} medications, branch deadline {:?})",
            request.medications.len(),
            deadline
        );

        // Dropping this future cancels the branches through the guard.
        let token = cancellation.child_token();
        let _guard = token.clone().drop_guard();

        let query = request.query.trim().to_string();

        let literature = spawn_branch(
            "literature",
            {
                let (engine, query) = (self.clone(), query.clone());
                async move {
                    engine
                        .search_literature(&query, None, SortMode::Relevance)
                        .await
                }
            },
            deadline,
            &token,
        );
        let trials = spawn_branch(
            "clinical_trials",
            {
                let (engine, query) = (self.clone(), query.clone());
                async move { engine.search_trials(&query, None).await }
            },
            deadline,
            &token,
        );
        let criteria = spawn_branch(
            "diagnostic_criteria",
            {
                let (engine, query) = (self.clone(), query.clone());
                async move { engine.diagnostic_criteria(&query).await }
            },
            deadline,
            &token,
        );
        let guidelines = spawn_branch(
            "treatment_guidelines",
            {
                let (engine, query) = (self.clone(), query.clone());
                let context = request.patient_context.clone();
                async move { engine.treatment_guidelines(&query, context.as_ref()).await }
            },
            deadline,
            &token,
        );
        let codes = spawn_branch(
            "icd_codes",
            {
                let (engine, query) = (self.clone(), query.clone());
                async move { engine.icd10(&query).await }
            },
            deadline,
            &token,
        );
        let calculators = spawn_branch(
            "calculators",
            {
                let (engine, query) = (self.clone(), query.clone());
                let context = request.patient_context.clone();
                async move { engine.calculators(&query, context.as_ref()).await }
            },
            deadline,
            &token,
        );

        let (literature, trials, criteria, guidelines, codes, calculators) =
            tokio::join!(literature, trials, criteria, guidelines, codes, calculators);

        let mut branches = BranchCollector::default();
        let literature = branches.collect("literature", literature);
        let clinical_trials = branches.collect("clinical_trials", trials);
        let diagnostic_criteria = branches.collect("diagnostic_criteria", criteria);
        let treatment_guidelines = branches.collect("treatment_guidelines", guidelines);
        let icd_codes = branches.collect("icd_codes", codes);
        let calculators = branches.collect("calculators", calculators);

        if let Some(failure) = branches.failure {
            error!(
                "Comprehensive research failed after {:?}: {}",
                start_time.elapsed(),
                failure
            );
            return Err(failure);
        }
        if branches.cancelled || cancellation.is_cancelled() {
            warn!("Comprehensive research cancelled after {:?}", start_time.elapsed());
            return Err(Error::Cancelled(format!("request {request_id}")));
        }

        // Local table lookup, no I/O: runs inline once the fan-out is joined.
        let drug_interactions = if request.medications.len() >= 2 {
            self.check_interactions(&request.medications)
        } else {
            Vec::new()
        };

        let result = AggregateResult {
            request_id,
            literature,
            clinical_trials,
            diagnostic_criteria,
            treatment_guidelines,
            drug_interactions,
            icd_codes,
            calculators,
            degraded_sources: branches.degraded,
            timestamp: Utc::now(),
        };

        info!(
            "Comprehensive research completed in {:?}: {} articles, {} trials, {} interactions, {} degraded sources",
            start_time.elapsed(),
            result.literature.len(),
            result.clinical_trials.len(),
            result.drug_interactions.len(),
            result.degraded_sources.len()
        );

        Ok(result)
    }
}
