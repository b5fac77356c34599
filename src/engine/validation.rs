//! Request validation for callers of the engine.
//!
//! The engine never calls these itself; it trusts its inputs. They exist so
//! request layers (and the CLI) reject malformed input consistently.

use crate::{Error, Result};

pub const MIN_QUERY_LEN: usize = 2;
pub const MIN_MEDICATIONS: usize = 2;
pub const MAX_MEDICATIONS: usize = 20;
pub const MIN_MEDICATION_LEN: usize = 2;
pub const MAX_MEDICATION_LEN: usize = 100;

/// Validate a free-text query or condition, returning it trimmed
pub fn validate_query<'a>(field: &str, query: &'a str) -> Result<&'a str> {
    let trimmed = query.trim();
    if trimmed.chars().count() < MIN_QUERY_LEN {
        return Err(Error::InvalidInput {
            field: field.to_string(),
            reason: format!("must be at least {MIN_QUERY_LEN} characters"),
        });
    }
    Ok(trimmed)
}

/// Validate a medication list for interaction checking
pub fn validate_medications<S: AsRef<str>>(medications: &[S]) -> Result<()> {
    if !(MIN_MEDICATIONS..=MAX_MEDICATIONS).contains(&medications.len()) {
        return Err(Error::InvalidInput {
            field: "medications".to_string(),
            reason: format!(
                "expected between {MIN_MEDICATIONS} and {MAX_MEDICATIONS} medications, got {}",
                medications.len()
            ),
        });
    }

    for (index, medication) in medications.iter().enumerate() {
        let len = medication.as_ref().trim().chars().count();
        if !(MIN_MEDICATION_LEN..=MAX_MEDICATION_LEN).contains(&len) {
            return Err(Error::InvalidInput {
                field: format!("medications[{index}]"),
                reason: format!(
                    "must be between {MIN_MEDICATION_LEN} and {MAX_MEDICATION_LEN} characters"
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_validation() {
        assert_eq!(validate_query("query", "  asthma ").unwrap(), "asthma");
        assert!(validate_query("query", " a ").is_err());
        assert!(validate_query("condition", "").is_err());
    }

    #[test]
    fn test_medication_bounds() {
        assert!(validate_medications(&["warfarin"]).is_err());
        assert!(validate_medications(&["warfarin", "aspirin"]).is_ok());

        let too_many: Vec<String> = (0..21).map(|i| format!("drug{i}")).collect();
        assert!(validate_medications(&too_many).is_err());

        let err = validate_medications(&["warfarin", "x"]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "medications[1]"));

        let long = "a".repeat(101);
        assert!(validate_medications(&["warfarin", long.as_str()]).is_err());
    }
}
