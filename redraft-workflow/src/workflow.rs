//! Orchestrator - sequences generate, execute, reflect, re-execute
//!
//! The state machine is strictly linear: Start -> Generated(v1) ->
//! Executed(v1) -> Reflected -> Executed(v2) -> Done, with an absorbing
//! failure from any state. No state is revisited and there is exactly one
//! reflection attempt per run.

use crate::report::{Stage, StageFailure, WorkflowResult};
use redraft_core::{Artifact, ArtifactRunner, Critique, Evidence, ExecutionOutcome, TagPair};
use redraft_error::Result;

/// Drafts the first artifact version for a task.
///
/// Returns the raw model response; extraction is the orchestrator's job,
/// keeping this a pure prompt-assembly + call boundary.
#[allow(async_fn_in_trait)]
pub trait Generator {
    async fn draft(&self) -> Result<String>;
}

/// Critiques a draft and proposes a refined version.
///
/// `evidence` carries what executing the draft produced; `None` asks for a
/// judgement from the artifact text alone. Parse degradation is absorbed
/// into the returned [`Critique`]; an `Err` means the model call itself
/// failed.
#[allow(async_fn_in_trait)]
pub trait Reflector {
    async fn critique(&self, draft: &Artifact, evidence: Option<&Evidence>) -> Result<Critique>;
}

/// Run one full reflection pass and aggregate everything it produced.
///
/// Failure semantics follow the stage order:
/// - a generation error, or a response with no extractable artifact, ends
///   the run before anything executes
/// - a v1 execution failure ends the run; there is no evidence worth
///   reflecting on
/// - a reflection call failure ends the run but keeps the v1 results
/// - a v2 execution failure is recorded alongside the v1 results it does
///   not invalidate
pub async fn run_reflection<G, R, X>(
    generator: &G,
    reflector: &R,
    runner: &X,
    gate: &TagPair,
) -> WorkflowResult
where
    G: Generator,
    R: Reflector,
    X: ArtifactRunner,
{
    let mut report = WorkflowResult::default();

    // Start -> Generated(v1)
    let raw = match generator.draft().await {
        Ok(raw) => raw,
        Err(e) => {
            report.failure = Some(StageFailure::new(Stage::Generation, e.to_string()));
            return report;
        }
    };
    let artifact_v1 = match gate.extract(&raw) {
        Some(body) => Artifact::draft(body),
        None => {
            report.failure = Some(StageFailure::new(
                Stage::Generation,
                "no executable artifact found",
            ));
            return report;
        }
    };
    report.artifact_v1 = Some(artifact_v1.clone());

    // Generated(v1) -> Executed(v1)
    let evidence = match runner.execute(&artifact_v1).await {
        Ok(evidence) => evidence,
        Err(e) => {
            let detail = e.to_string();
            report.outcome_v1 = Some(ExecutionOutcome::Failure(detail.clone()));
            report.failure = Some(StageFailure::new(Stage::ExecutionV1, detail));
            return report;
        }
    };
    report.outcome_v1 = Some(ExecutionOutcome::Success(evidence.clone()));

    // Executed(v1) -> Reflected
    let critique = match reflector.critique(&artifact_v1, Some(&evidence)).await {
        Ok(critique) => critique,
        Err(e) => {
            report.failure = Some(StageFailure::new(Stage::Reflection, e.to_string()));
            return report;
        }
    };
    let artifact_v2 = critique.refined.clone();
    report.critique = Some(critique);
    report.artifact_v2 = Some(artifact_v2.clone());

    // Reflected -> Executed(v2)
    match runner.execute(&artifact_v2).await {
        Ok(evidence) => {
            report.outcome_v2 = Some(ExecutionOutcome::Success(evidence));
        }
        Err(e) => {
            let detail = e.to_string();
            report.outcome_v2 = Some(ExecutionOutcome::Failure(detail.clone()));
            report.failure = Some(StageFailure::new(Stage::ExecutionV2, detail));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use redraft_core::error::{execution_failed, inference_failed};
    use redraft_core::{CritiqueSource, ResultTable, Version};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptGenerator {
        reply: String,
    }

    impl Generator for ScriptGenerator {
        async fn draft(&self) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        async fn draft(&self) -> Result<String> {
            Err(inference_failed("model unavailable"))
        }
    }

    struct ScriptReflector {
        refined_text: String,
        calls: AtomicUsize,
    }

    impl ScriptReflector {
        fn new(refined_text: &str) -> Self {
            Self {
                refined_text: refined_text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Reflector for ScriptReflector {
        async fn critique(
            &self,
            draft: &Artifact,
            evidence: Option<&Evidence>,
        ) -> Result<Critique> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(evidence.is_some(), "orchestrator reflects with evidence");
            Ok(Critique {
                feedback: "tighten the margins".to_string(),
                refined: draft.refine(self.refined_text.clone()),
                source: CritiqueSource::Parsed,
            })
        }
    }

    struct FailingReflector;

    impl Reflector for FailingReflector {
        async fn critique(&self, _: &Artifact, _: Option<&Evidence>) -> Result<Critique> {
            Err(inference_failed("reviewer offline"))
        }
    }

    /// Succeeds with an empty table unless told to fail a given version
    struct ScriptRunner {
        fail_on: Option<u8>,
        calls: AtomicUsize,
    }

    impl ScriptRunner {
        fn new(fail_on: Option<u8>) -> Self {
            Self {
                fail_on,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ArtifactRunner for ScriptRunner {
        async fn execute(&self, artifact: &Artifact) -> Result<Evidence> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(artifact.version.ordinal()) {
                return Err(execution_failed(format!("{} raised", artifact.version)));
            }
            Ok(Evidence::Table(ResultTable::default()))
        }
    }

    fn wrapped(body: &str) -> String {
        TagPair::execute_python().wrap(body)
    }

    #[tokio::test]
    async fn test_full_pass() {
        let generator = ScriptGenerator {
            reply: format!("Sure, here you go:\n{}\nHope that helps!", wrapped("x=1")),
        };
        let reflector = ScriptReflector::new("x=2");
        let runner = ScriptRunner::new(None);
        let gate = TagPair::execute_python();

        let result = run_reflection(&generator, &reflector, &runner, &gate).await;

        assert!(result.is_complete());
        assert_eq!(result.artifact_v1.as_ref().unwrap().text, "x=1");
        assert_eq!(result.artifact_v2.as_ref().unwrap().text, "x=2");
        assert_eq!(result.artifact_v2.as_ref().unwrap().version, Version::V2);
        assert!(result.outcome_v1.as_ref().unwrap().is_success());
        assert!(result.outcome_v2.as_ref().unwrap().is_success());
        assert_eq!(result.critique.as_ref().unwrap().feedback, "tighten the margins");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_untagged_response_stops_before_execution() {
        let generator = ScriptGenerator {
            reply: "here is some code: x=1".to_string(),
        };
        let reflector = ScriptReflector::new("x=2");
        let runner = ScriptRunner::new(None);
        let gate = TagPair::execute_python();

        let result = run_reflection(&generator, &reflector, &runner, &gate).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::Generation);
        assert_eq!(failure.reason, "no executable artifact found");
        assert!(result.artifact_v1.is_none());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reflector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generator_error_names_generation() {
        let reflector = ScriptReflector::new("x=2");
        let runner = ScriptRunner::new(None);
        let gate = TagPair::execute_python();

        let result = run_reflection(&FailingGenerator, &reflector, &runner, &gate).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::Generation);
        assert!(failure.reason.contains("model unavailable"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_v1_failure_skips_reflection() {
        let generator = ScriptGenerator {
            reply: wrapped("x=1"),
        };
        let reflector = ScriptReflector::new("x=2");
        let runner = ScriptRunner::new(Some(1));
        let gate = TagPair::execute_python();

        let result = run_reflection(&generator, &reflector, &runner, &gate).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::ExecutionV1);
        assert!(result.artifact_v1.is_some());
        assert!(!result.outcome_v1.as_ref().unwrap().is_success());
        assert!(result.critique.is_none());
        assert!(result.artifact_v2.is_none());
        assert!(result.outcome_v2.is_none());
        assert_eq!(reflector.calls.load(Ordering::SeqCst), 0);
        assert!(!result.is_partial_success());
    }

    #[tokio::test]
    async fn test_reflection_error_keeps_v1_results() {
        let generator = ScriptGenerator {
            reply: wrapped("x=1"),
        };
        let runner = ScriptRunner::new(None);
        let gate = TagPair::execute_python();

        let result = run_reflection(&generator, &FailingReflector, &runner, &gate).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::Reflection);
        assert!(failure.reason.contains("reviewer offline"));
        assert_eq!(result.artifact_v1.as_ref().unwrap().text, "x=1");
        assert!(result.outcome_v1.as_ref().unwrap().is_success());
        assert!(result.artifact_v2.is_none());
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_v2_failure_is_partial_success() {
        let generator = ScriptGenerator {
            reply: wrapped("x=1"),
        };
        let reflector = ScriptReflector::new("x=broken");
        let runner = ScriptRunner::new(Some(2));
        let gate = TagPair::execute_python();

        let result = run_reflection(&generator, &reflector, &runner, &gate).await;

        let failure = result.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::ExecutionV2);
        assert_eq!(result.artifact_v1.as_ref().unwrap().text, "x=1");
        assert!(result.outcome_v1.as_ref().unwrap().is_success());
        assert_eq!(result.critique.as_ref().unwrap().feedback, "tighten the margins");
        assert_eq!(result.artifact_v2.as_ref().unwrap().text, "x=broken");
        assert!(!result.outcome_v2.as_ref().unwrap().is_success());
        assert!(result.is_partial_success());
    }
}
