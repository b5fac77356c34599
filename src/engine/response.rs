use crate::{Error, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Envelope returned by every caller-facing operation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResponse<T> {
    pub success: bool,
    pub data: T,
    /// Number of records, set for list results
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub count: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ResearchResponse<T> {
    /// Wrap a single record
    pub fn single(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            timestamp: Utc::now(),
        }
    }
}

impl<T> ResearchResponse<Vec<T>> {
    /// Wrap a list of records
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Turn a soft absence into [`Error::NotFound`] for callers that need a record
pub fn require_found<T>(value: Option<T>, resource: &str, key: &str) -> Result<T> {
    value.ok_or_else(|| Error::NotFound {
        resource: resource.to_string(),
        key: key.to_string(),
    })
}
