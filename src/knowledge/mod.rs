//! # Knowledge Sources
//!
//! Condition-keyed clinical knowledge: diagnostic criteria, treatment
//! guidelines, ICD-10 coding and clinical calculators.
//!
//! The engine only depends on the [`KnowledgeSource`] trait. The embedded
//! [`StaticKnowledgeSource`] tables satisfy it today; a live clinical
//! knowledge service can be plugged in without touching the orchestrator.
//! A missing entry is `Ok(None)` (or an empty list), never an error.

pub mod static_tables;

pub use static_tables::StaticKnowledgeSource;

use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opaque patient context passed through to knowledge sources. The embedded
/// tables do not personalize on it.
pub type PatientContext = serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticCriteria {
    pub condition: String,
    pub criteria: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentGuideline {
    pub condition: String,
    pub first_line: Vec<String>,
    pub second_line: Vec<String>,
    pub lifestyle: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Icd10Entry {
    pub condition: String,
    pub code: String,
    pub description: String,
    /// More specific codes commonly used for the same condition
    pub related_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculatorDescriptor {
    pub name: String,
    pub description: String,
    /// Patient values the calculator needs
    pub inputs: Vec<String>,
    pub reference_url: String,
}

/// Capability interface for condition-keyed clinical knowledge
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    fn name(&self) -> &str;

    async fn diagnostic_criteria(&self, condition: &str) -> Result<Option<DiagnosticCriteria>>;

    async fn treatment_guidelines(
        &self,
        condition: &str,
        patient_context: Option<&PatientContext>,
    ) -> Result<Option<TreatmentGuideline>>;

    async fn icd10(&self, condition: &str) -> Result<Option<Icd10Entry>>;

    async fn calculators(
        &self,
        condition: &str,
        patient_data: Option<&PatientContext>,
    ) -> Result<Vec<CalculatorDescriptor>>;
}

/// Canonical lookup key: trimmed, lower-cased, single-spaced
#[must_use]
pub fn normalize_condition(condition: &str) -> String {
    condition
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
