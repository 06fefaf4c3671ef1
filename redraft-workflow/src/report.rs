//! Run outcome aggregation - stages, stage failures, and the result record

use redraft_core::{Artifact, Critique, ExecutionOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage of the reflection loop, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generation,
    ExecutionV1,
    Reflection,
    ExecutionV2,
}

impl Stage {
    /// Stable name used in failure records and output
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Generation => "generation",
            Stage::ExecutionV1 => "execution_v1",
            Stage::Reflection => "reflection",
            Stage::ExecutionV2 => "execution_v2",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure scoped to the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

impl StageFailure {
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.reason)
    }
}

/// Everything one run actually produced.
///
/// Fields fill in stage order and are never cleared afterwards: a v2
/// failure leaves the v1 artifact, the v1 outcome, and the critique in
/// place. `failure` is set exactly when a stage could not complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub artifact_v1: Option<Artifact>,
    pub outcome_v1: Option<ExecutionOutcome>,
    pub critique: Option<Critique>,
    pub artifact_v2: Option<Artifact>,
    pub outcome_v2: Option<ExecutionOutcome>,
    pub failure: Option<StageFailure>,
}

impl WorkflowResult {
    /// A result that died before producing anything
    pub fn failed(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(StageFailure::new(stage, reason)),
            ..Self::default()
        }
    }

    /// Every stage ran to completion
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// The refined artifact failed but the first draft's results stand
    pub fn is_partial_success(&self) -> bool {
        let v2_failed = matches!(&self.failure, Some(f) if f.stage == Stage::ExecutionV2);
        let v1_succeeded = self
            .outcome_v1
            .as_ref()
            .map(|outcome| outcome.is_success())
            .unwrap_or(false);
        v2_failed && v1_succeeded
    }

    /// The most refined artifact the run got to
    pub fn final_artifact(&self) -> Option<&Artifact> {
        self.artifact_v2.as_ref().or(self.artifact_v1.as_ref())
    }

    /// The outcome of the last execution that ran
    pub fn final_outcome(&self) -> Option<&ExecutionOutcome> {
        self.outcome_v2.as_ref().or(self.outcome_v1.as_ref())
    }
}
