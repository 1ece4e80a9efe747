//! # Planner Error Types Module
//!
//! This module defines the error types surfaced by the planning and shopping-list
//! operations. Quantity parsing and unit standardization never fail, so they have
//! no variants here.

use thiserror::Error;

/// Errors returned by planner operations
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The seed recipe of a new plan does not exist
    #[error("Seed recipe {0} not found")]
    SeedNotFound(i64),
    /// A shopping list was requested for an empty selection
    #[error("No recipes selected")]
    EmptySelection,
    /// Every candidate was filtered out
    #[error("No candidate recipes match the current filters")]
    NoCandidates,
    /// A plan slot index beyond the end of the plan
    #[error("Plan slot {index} is out of range for a plan of {len} slots")]
    SlotOutOfRange { index: usize, len: usize },
    /// The recency window cannot be turned into a start date
    #[error("Recency window of {0} days is out of range")]
    RecencyWindow(i64),
    /// Weighted sampling could not be set up (non-finite scores)
    #[error("Sampling error: {0}")]
    Sampling(String),
    /// A catalogue payload could not be turned into a recipe
    #[error("Import error: {0}")]
    Import(String),
    /// Persistence collaborator failure
    #[error("Store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for PlannerError {
    fn from(err: sqlx::Error) -> Self {
        PlannerError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::Import(err.to_string())
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PlannerError::SeedNotFound(42).to_string(),
            "Seed recipe 42 not found"
        );
        assert_eq!(PlannerError::EmptySelection.to_string(), "No recipes selected");
        assert_eq!(
            PlannerError::SlotOutOfRange { index: 7, len: 5 }.to_string(),
            "Plan slot 7 is out of range for a plan of 5 slots"
        );
        assert_eq!(
            PlannerError::RecencyWindow(-3).to_string(),
            "Recency window of -3 days is out of range"
        );
    }

    #[test]
    fn test_json_error_becomes_import_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let planner_err: PlannerError = err.into();
        assert!(matches!(planner_err, PlannerError::Import(_)));
    }
}
