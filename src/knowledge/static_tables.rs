use super::{
    normalize_condition, CalculatorDescriptor, DiagnosticCriteria, Icd10Entry, KnowledgeSource,
    PatientContext, TreatmentGuideline,
};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

struct CriteriaRow {
    key: &'static str,
    criteria: &'static [&'static str],
    source: &'static str,
}

struct GuidelineRow {
    key: &'static str,
    first_line: &'static [&'static str],
    second_line: &'static [&'static str],
    lifestyle: &'static [&'static str],
    source: &'static str,
}

struct CodeRow {
    key: &'static str,
    code: &'static str,
    description: &'static str,
    related: &'static [&'static str],
}

struct CalculatorRow {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    inputs: &'static [&'static str],
    reference_url: &'static str,
}

const SYNONYMS: &[(&str, &str)] = &[
    ("diabetes mellitus", "diabetes"),
    ("type 2 diabetes", "diabetes"),
    ("type 2 diabetes mellitus", "diabetes"),
    ("t2dm", "diabetes"),
    ("high blood pressure", "hypertension"),
    ("htn", "hypertension"),
    ("congestive heart failure", "heart failure"),
    ("chf", "heart failure"),
    ("ckd", "chronic kidney disease"),
];

const CRITERIA: &[CriteriaRow] = &[
    CriteriaRow {
        key: "diabetes",
        criteria: &[
            "Fasting plasma glucose >= 126 mg/dL (7.0 mmol/L)",
            "2-hour plasma glucose >= 200 mg/dL (11.1 mmol/L) during a 75 g oral glucose tolerance test",
            "HbA1c >= 6.5% (48 mmol/mol)",
            "Random plasma glucose >= 200 mg/dL (11.1 mmol/L) with classic symptoms of hyperglycemia",
        ],
        source: "American Diabetes Association",
    },
    CriteriaRow {
        key: "hypertension",
        criteria: &[
            "Stage 1: systolic 130-139 mmHg or diastolic 80-89 mmHg",
            "Stage 2: systolic >= 140 mmHg or diastolic >= 90 mmHg",
            "Based on an average of >= 2 readings obtained on >= 2 occasions",
            "Out-of-office measurement recommended to confirm the diagnosis",
        ],
        source: "American College of Cardiology/American Heart Association",
    },
    CriteriaRow {
        key: "asthma",
        criteria: &[
            "History of variable respiratory symptoms (wheeze, shortness of breath, chest tightness, cough)",
            "Bronchodilator reversibility: FEV1 increase > 12% and > 200 mL from baseline",
            "Excessive variability in twice-daily peak expiratory flow over 2 weeks",
            "Positive bronchial challenge test",
        ],
        source: "Global Initiative for Asthma",
    },
    CriteriaRow {
        key: "heart failure",
        criteria: &[
            "Typical symptoms and/or signs of heart failure",
            "Left ventricular ejection fraction category: reduced (<= 40%), mildly reduced (41-49%) or preserved (>= 50%)",
            "Elevated natriuretic peptides (BNP >= 35 pg/mL or NT-proBNP >= 125 pg/mL)",
            "Objective evidence of structural or functional cardiac abnormality",
        ],
        source: "European Society of Cardiology",
    },
    CriteriaRow {
        key: "chronic kidney disease",
        criteria: &[
            "GFR < 60 mL/min/1.73 m2 for more than 3 months",
            "Albuminuria: urine albumin-to-creatinine ratio >= 30 mg/g for more than 3 months",
            "Urine sediment, electrolyte, histologic or imaging abnormalities of kidney structure",
            "History of kidney transplantation",
        ],
        source: "Kidney Disease: Improving Global Outcomes (KDIGO)",
    },
];

const GUIDELINES: &[GuidelineRow] = &[
    GuidelineRow {
        key: "diabetes",
        first_line: &["Metformin", "Lifestyle modification"],
        second_line: &[
            "SGLT2 inhibitors",
            "GLP-1 receptor agonists",
            "DPP-4 inhibitors",
            "Sulfonylureas",
            "Insulin",
        ],
        lifestyle: &[
            "Medical nutrition therapy",
            "150 minutes per week of moderate-intensity physical activity",
            "Weight loss of 5-7% when overweight",
        ],
        source: "American Diabetes Association Standards of Care",
    },
    GuidelineRow {
        key: "hypertension",
        first_line: &[
            "Thiazide diuretics",
            "ACE inhibitors",
            "Angiotensin receptor blockers",
            "Calcium channel blockers",
        ],
        second_line: &["Combination therapy", "Mineralocorticoid receptor antagonists"],
        lifestyle: &[
            "DASH diet",
            "Sodium restriction below 1500 mg/day",
            "Regular aerobic exercise",
            "Limit alcohol intake",
        ],
        source: "American College of Cardiology/American Heart Association",
    },
    GuidelineRow {
        key: "asthma",
        first_line: &["As-needed low-dose ICS-formoterol"],
        second_line: &[
            "Daily low-dose inhaled corticosteroid",
            "Medium-dose ICS-LABA",
            "Add-on long-acting muscarinic antagonist",
        ],
        lifestyle: &[
            "Avoid known triggers",
            "Smoking cessation",
            "Written asthma action plan",
        ],
        source: "Global Initiative for Asthma",
    },
    GuidelineRow {
        key: "heart failure",
        first_line: &[
            "ACE inhibitor, ARB or ARNI",
            "Evidence-based beta blockers",
            "Mineralocorticoid receptor antagonists",
            "SGLT2 inhibitors",
        ],
        second_line: &["Ivabradine", "Hydralazine-isosorbide dinitrate", "Digoxin"],
        lifestyle: &["Sodium restriction", "Daily weight monitoring", "Cardiac rehabilitation"],
        source: "European Society of Cardiology",
    },
    GuidelineRow {
        key: "chronic kidney disease",
        first_line: &["ACE inhibitors or ARBs when albuminuric", "SGLT2 inhibitors"],
        second_line: &["Finerenone in diabetic kidney disease", "Statins"],
        lifestyle: &[
            "Protein intake of 0.8 g/kg/day",
            "Sodium restriction below 2 g/day",
            "Avoid nephrotoxic drugs",
        ],
        source: "Kidney Disease: Improving Global Outcomes (KDIGO)",
    },
];

const CODES: &[CodeRow] = &[
    CodeRow {
        key: "diabetes",
        code: "E11.9",
        description: "Type 2 diabetes mellitus without complications",
        related: &["E11.65", "E11.22", "E10.9"],
    },
    CodeRow {
        key: "hypertension",
        code: "I10",
        description: "Essential (primary) hypertension",
        related: &["I11.9", "I12.9"],
    },
    CodeRow {
        key: "asthma",
        code: "J45.909",
        description: "Unspecified asthma, uncomplicated",
        related: &["J45.20", "J45.40", "J45.50"],
    },
    CodeRow {
        key: "heart failure",
        code: "I50.9",
        description: "Heart failure, unspecified",
        related: &["I50.22", "I50.32"],
    },
    CodeRow {
        key: "chronic kidney disease",
        code: "N18.9",
        description: "Chronic kidney disease, unspecified",
        related: &["N18.3", "N18.4", "N18.5"],
    },
];

const CALCULATORS: &[CalculatorRow] = &[
    CalculatorRow {
        key: "diabetes",
        name: "HbA1c to Estimated Average Glucose",
        description: "Converts HbA1c percentage to estimated average glucose",
        inputs: &["hba1c"],
        reference_url: "https://professional.diabetes.org/glucose_calc",
    },
    CalculatorRow {
        key: "diabetes",
        name: "HOMA-IR",
        description: "Homeostatic model assessment of insulin resistance",
        inputs: &["fasting_glucose", "fasting_insulin"],
        reference_url: "https://www.mdcalc.com/calc/3120/homa-ir-homeostatic-model-assessment-insulin-resistance",
    },
    CalculatorRow {
        key: "hypertension",
        name: "ASCVD 10-Year Risk",
        description: "Pooled cohort equations for 10-year atherosclerotic cardiovascular disease risk",
        inputs: &[
            "age",
            "sex",
            "race",
            "total_cholesterol",
            "hdl_cholesterol",
            "systolic_bp",
            "treated_for_hypertension",
            "diabetes",
            "smoker",
        ],
        reference_url: "https://tools.acc.org/ascvd-risk-estimator-plus/",
    },
    CalculatorRow {
        key: "asthma",
        name: "Asthma Control Test",
        description: "Five-question assessment of asthma control over the past 4 weeks",
        inputs: &["act_responses"],
        reference_url: "https://www.asthma.com/understanding-asthma/severe-asthma/asthma-control-test/",
    },
    CalculatorRow {
        key: "heart failure",
        name: "MAGGIC Risk Score",
        description: "Estimates 1- and 3-year mortality in heart failure",
        inputs: &[
            "age",
            "ejection_fraction",
            "systolic_bp",
            "bmi",
            "creatinine",
            "nyha_class",
        ],
        reference_url: "https://www.mdcalc.com/calc/3803/maggic-risk-calculator-heart-failure",
    },
    CalculatorRow {
        key: "chronic kidney disease",
        name: "CKD-EPI eGFR (2021)",
        description: "Estimated glomerular filtration rate from serum creatinine",
        inputs: &["serum_creatinine", "age", "sex"],
        reference_url: "https://www.kidney.org/professionals/kdoqi/gfr_calculator",
    },
];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Knowledge tables embedded in the binary
#[derive(Debug, Clone)]
pub struct StaticKnowledgeSource {
    synonyms: HashMap<&'static str, &'static str>,
    criteria: HashMap<&'static str, DiagnosticCriteria>,
    guidelines: HashMap<&'static str, TreatmentGuideline>,
    codes: HashMap<&'static str, Icd10Entry>,
    calculators: HashMap<&'static str, Vec<CalculatorDescriptor>>,
}

impl StaticKnowledgeSource {
    #[must_use]
    pub fn new() -> Self {
        let criteria = CRITERIA
            .iter()
            .map(|row| {
                (
                    row.key,
                    DiagnosticCriteria {
                        condition: row.key.to_string(),
                        criteria: strings(row.criteria),
                        source: row.source.to_string(),
                    },
                )
            })
            .collect();

        let guidelines = GUIDELINES
            .iter()
            .map(|row| {
                (
                    row.key,
                    TreatmentGuideline {
                        condition: row.key.to_string(),
                        first_line: strings(row.first_line),
                        second_line: strings(row.second_line),
                        lifestyle: strings(row.lifestyle),
                        source: row.source.to_string(),
                    },
                )
            })
            .collect();

        let codes = CODES
            .iter()
            .map(|row| {
                (
                    row.key,
                    Icd10Entry {
                        condition: row.key.to_string(),
                        code: row.code.to_string(),
                        description: row.description.to_string(),
                        related_codes: strings(row.related),
                    },
                )
            })
            .collect();

        let mut calculators: HashMap<&'static str, Vec<CalculatorDescriptor>> = HashMap::new();
        for row in CALCULATORS {
            calculators.entry(row.key).or_default().push(CalculatorDescriptor {
                name: row.name.to_string(),
                description: row.description.to_string(),
                inputs: strings(row.inputs),
                reference_url: row.reference_url.to_string(),
            });
        }

        Self {
            synonyms: SYNONYMS.iter().copied().collect(),
            criteria,
            guidelines,
            codes,
            calculators,
        }
    }

    /// Resolve a free-text condition to its table key
    fn resolve(&self, condition: &str) -> String {
        let key = normalize_condition(condition);
        match self.synonyms.get(key.as_str()) {
            Some(canonical) => (*canonical).to_string(),
            None => key,
        }
    }

    fn lookup<'a, T>(
        &self,
        table: &'a HashMap<&'static str, T>,
        kind: &str,
        condition: &str,
    ) -> Option<&'a T> {
        let key = self.resolve(condition);
        let hit = table.get(key.as_str());
        if hit.is_none() {
            debug!("No {} entry for condition '{}'", kind, key);
        }
        hit
    }
}

impl Default for StaticKnowledgeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeSource for StaticKnowledgeSource {
    fn name(&self) -> &str {
        "static_tables"
    }

    async fn diagnostic_criteria(&self, condition: &str) -> Result<Option<DiagnosticCriteria>> {
        Ok(self
            .lookup(&self.criteria, "diagnostic criteria", condition)
            .cloned())
    }

    async fn treatment_guidelines(
        &self,
        condition: &str,
        _patient_context: Option<&PatientContext>,
    ) -> Result<Option<TreatmentGuideline>> {
        Ok(self
            .lookup(&self.guidelines, "treatment guideline", condition)
            .cloned())
    }

    async fn icd10(&self, condition: &str) -> Result<Option<Icd10Entry>> {
        Ok(self.lookup(&self.codes, "ICD-10", condition).cloned())
    }

    async fn calculators(
        &self,
        condition: &str,
        _patient_data: Option<&PatientContext>,
    ) -> Result<Vec<CalculatorDescriptor>> {
        Ok(self
            .lookup(&self.calculators, "calculator", condition)
            .cloned()
            .unwrap_or_default())
    }
}
