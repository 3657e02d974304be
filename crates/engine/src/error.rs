//! Engine error types

use thiserror::Error;

/// Errors returned by the placement engine.
///
/// Filter and algorithm failures are terminal for a single decision and are
/// never retried inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid resource quantity {quantity:?}: {reason}")]
    ResourceParse { quantity: String, reason: String },

    #[error("no candidate nodes for workload {workload}: {detail}")]
    NoCandidateNodes { workload: String, detail: String },

    #[error("no suitable node for workload {workload} using {algorithm} among {candidates} candidates")]
    NoSuitableNode {
        workload: String,
        algorithm: String,
        candidates: usize,
    },

    #[error("policy not found: {0}")]
    PolicyNotFound(String),

    #[error("policy already exists: {0}")]
    PolicyAlreadyExists(String),

    #[error("invalid policy {policy}: {reason}")]
    InvalidPolicy { policy: String, reason: String },

    #[error("invalid workload {workload}: {reason}")]
    InvalidWorkload { workload: String, reason: String },

    #[error("strategy {strategy} failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    #[error("no applicable optimization strategy for workload {0}")]
    NoApplicableStrategy(String),

    #[error("all {attempted} applicable strategies failed for workload {workload}")]
    NoSuccessfulStrategy { workload: String, attempted: usize },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse classification used by collaborators to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 404-style: the named thing does not exist
    NotFound,
    /// 409-style: conflicts with existing state
    Conflict,
    /// 422-style: the input is malformed or violates a contract
    Unprocessable,
    /// 503-style: nothing can currently satisfy the request
    Unavailable,
}

impl EngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::PolicyNotFound(_) => ErrorClass::NotFound,
            EngineError::PolicyAlreadyExists(_) => ErrorClass::Conflict,
            EngineError::ResourceParse { .. }
            | EngineError::InvalidPolicy { .. }
            | EngineError::InvalidWorkload { .. } => ErrorClass::Unprocessable,
            EngineError::NoCandidateNodes { .. }
            | EngineError::NoSuitableNode { .. }
            | EngineError::StrategyFailed { .. }
            | EngineError::NoApplicableStrategy(_)
            | EngineError::NoSuccessfulStrategy { .. } => ErrorClass::Unavailable,
        }
    }

    pub(crate) fn parse(quantity: &str, reason: impl Into<String>) -> Self {
        EngineError::ResourceParse {
            quantity: quantity.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_policy(policy: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidPolicy {
            policy: policy.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_distinguish_failures() {
        assert_eq!(
            EngineError::PolicyNotFound("x".into()).class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            EngineError::PolicyAlreadyExists("x".into()).class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            EngineError::parse("abc", "not a number").class(),
            ErrorClass::Unprocessable
        );
        assert_eq!(
            EngineError::NoCandidateNodes {
                workload: "w".into(),
                detail: "empty".into()
            }
            .class(),
            ErrorClass::Unavailable
        );
    }

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = EngineError::NoSuitableNode {
            workload: "trainer".into(),
            algorithm: "balanced".into(),
            candidates: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("trainer"));
        assert!(msg.contains("balanced"));
        assert!(msg.contains('3'));
    }
}
