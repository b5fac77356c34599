use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Known interacting pairs. The lookup table is made symmetric when built.
const INTERACTION_PAIRS: &[(&str, &str)] = &[
    ("warfarin", "aspirin"),
    ("warfarin", "ibuprofen"),
    ("warfarin", "naproxen"),
    ("warfarin", "amiodarone"),
    ("warfarin", "fluconazole"),
    ("aspirin", "ibuprofen"),
    ("aspirin", "clopidogrel"),
    ("clopidogrel", "omeprazole"),
    ("lisinopril", "spironolactone"),
    ("lisinopril", "potassium chloride"),
    ("simvastatin", "clarithromycin"),
    ("simvastatin", "amiodarone"),
    ("digoxin", "amiodarone"),
    ("sertraline", "tramadol"),
    ("fluoxetine", "tramadol"),
    ("sildenafil", "nitroglycerin"),
    ("methotrexate", "trimethoprim"),
];

const RECOMMENDATION: &str =
    "Monitor the patient closely and consider dose adjustment or an alternative medication if necessary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrugInteraction {
    /// First drug as supplied by the caller
    pub drug1: String,
    /// Second drug as supplied by the caller
    pub drug2: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

/// Pairwise drug-interaction detector over a static table
#[derive(Debug, Clone)]
pub struct InteractionChecker {
    table: HashMap<String, HashSet<String>>,
}

fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

impl InteractionChecker {
    #[must_use]
    pub fn new() -> Self {
        Self::from_pairs(INTERACTION_PAIRS.iter().copied())
    }

    /// Build a checker from interacting pairs, inserting both directions
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table: HashMap<String, HashSet<String>> = HashMap::new();
        for (a, b) in pairs {
            let (a, b) = (canonical(a), canonical(b));
            table.entry(a.clone()).or_default().insert(b.clone());
            table.entry(b).or_default().insert(a);
        }
        Self { table }
    }

    fn interacts(&self, a: &str, b: &str) -> bool {
        self.table.get(a).is_some_and(|set| set.contains(b))
            || self.table.get(b).is_some_and(|set| set.contains(a))
    }

    /// Index pairs `(i, j)`, `i < j`, whose medications interact, in
    /// enumeration order
    pub fn interacting_pairs<S: AsRef<str>>(&self, medications: &[S]) -> Vec<(usize, usize)> {
        let names: Vec<String> = medications.iter().map(|m| canonical(m.as_ref())).collect();

        let mut pairs = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                if self.interacts(&names[i], &names[j]) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }

    /// Report every interacting pair in the list, keeping the caller's
    /// spelling of each drug
    pub fn check<S: AsRef<str>>(&self, medications: &[S]) -> Vec<DrugInteraction> {
        let interactions: Vec<DrugInteraction> = self
            .interacting_pairs(medications)
            .into_iter()
            .map(|(i, j)| {
                let drug1 = medications[i].as_ref().to_string();
                let drug2 = medications[j].as_ref().to_string();
                DrugInteraction {
                    description: format!("Potential interaction between {drug1} and {drug2}"),
                    drug1,
                    drug2,
                    severity: Severity::Moderate,
                    recommendation: RECOMMENDATION.to_string(),
                }
            })
            .collect();

        debug!(
            "Checked {} medications, found {} interactions",
            medications.len(),
            interactions.len()
        );
        interactions
    }
}

impl Default for InteractionChecker {
    fn default() -> Self {
        Self::new()
    }
}
