//! Error taxonomy for the deal pipeline.
//!
//! Collaborator adapters work with `anyhow` internally and map into these
//! variants at their trait boundary, so the planner can apply its
//! skip / abort policy by matching on the kind of failure.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The deal source could not be read. Fails the whole run.
    #[error("deal source unavailable: {0}")]
    SourceUnavailable(String),

    /// One estimator could not price one deal. The deal is skipped.
    #[error("{estimator} failed to estimate a price: {reason}")]
    EstimationFailure { estimator: String, reason: String },

    /// The notifier could not deliver an alert. Logged, never propagated.
    #[error("alert delivery failed: {0}")]
    DeliveryFailure(String),

    /// Every candidate deal failed estimation.
    #[error("run failed: all {attempted} candidate deals failed estimation")]
    RunFailed { attempted: usize },
}

impl PipelineError {
    pub fn estimation(estimator: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PipelineError::EstimationFailure {
            estimator: estimator.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller should treat this as "try again next cycle".
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable(_) | PipelineError::RunFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimation_helper_formats_reason() {
        let err = PipelineError::estimation("Frontier", anyhow::anyhow!("HTTP 500"));
        assert_eq!(
            err.to_string(),
            "Frontier failed to estimate a price: HTTP 500"
        );
        assert!(!err.is_run_level());
    }

    #[test]
    fn test_run_level_classification() {
        assert!(PipelineError::SourceUnavailable("down".into()).is_run_level());
        assert!(PipelineError::RunFailed { attempted: 5 }.is_run_level());
        assert!(!PipelineError::DeliveryFailure("x".into()).is_run_level());
    }
}
