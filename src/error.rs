//! Error types for the analysis pipeline.
//!
//! There is a single failure class at the stage level, `ExecutionError`.
//! The pipeline wraps it with the stage that failed so the caller can tell
//! how far the run got.

use thiserror::Error;

use crate::pipeline::Stage;
use crate::state::PipelinePhase;

/// Failure raised by an agent execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Model call failed: {0}")]
    Model(String),

    #[error("Malformed agent output: {0}")]
    MalformedOutput(String),

    #[error("Agent execution timed out: {0}")]
    Timeout(String),

    #[error("Tool failure: {0}")]
    Tool(String),
}

/// Violation of the set-once, in-order discipline of the run state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Field `{field}` is already set")]
    AlreadySet { field: &'static str },

    #[error("Field `{field}` cannot be set before `{missing}`")]
    OutOfOrder {
        field: &'static str,
        missing: &'static str,
    },
}

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage `{stage}` failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ExecutionError,
    },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Pipeline already started (current phase: {phase})")]
    AlreadyStarted { phase: PipelinePhase },
}

impl PipelineError {
    /// The stage that failed, if the failure came from an agent execution.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError::Model("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_pipeline_error_from_state() {
        let err: PipelineError = StateError::AlreadySet { field: "analysis" }.into();
        assert!(matches!(err, PipelineError::State(_)));
        assert!(err.failed_stage().is_none());
    }

    #[test]
    fn test_stage_error_names_stage() {
        let err = PipelineError::Stage {
            stage: Stage::ResearchCompetitors,
            source: ExecutionError::Timeout("60s".to_string()),
        };
        assert_eq!(err.failed_stage(), Some(Stage::ResearchCompetitors));
        assert!(err.to_string().contains("research_competitors"));
    }
}
