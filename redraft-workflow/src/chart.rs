//! Chart variant - matplotlib code over a CSV dataset
//!
//! Drafts plotting code, runs it in the Python sandbox, and refines it from
//! the rendered image: the chart itself rides along as multimodal evidence
//! when the reviewing model supports image input.

use crate::prompt;
use crate::report::WorkflowResult;
use crate::workflow::{run_reflection, Generator, Reflector};
use redraft_core::error::io_error;
use redraft_core::{
    parse_critique, Artifact, Critique, DatasetProfile, Evidence, ExecutionOutcome, ImagePayload,
    ModelSession, PythonSandbox, RefinedSource, TagPair,
};
use redraft_error::Result;
use std::path::{Path, PathBuf};

/// Configuration for the chart workflow
#[derive(Debug, Clone)]
pub struct ChartConfig {
    /// Model that drafts the plotting code
    pub generation_model: String,
    /// Model that reviews the rendered chart (needs image input)
    pub reflection_model: String,
    /// Basename for saved images: `{basename}_v1.png`, `{basename}_v2.png`
    pub basename: String,
    /// Directory the sandbox stages executions under
    pub workdir: PathBuf,
    /// Python interpreter for the sandbox
    pub python: Option<String>,
    /// Print stage progress to stdout
    pub verbose: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            generation_model: "gemini-2.5-flash-lite".to_string(),
            reflection_model: "gemini-2.5-flash".to_string(),
            basename: "chart".to_string(),
            workdir: PathBuf::from("."),
            python: None,
            verbose: true,
        }
    }
}

/// The chart workflow - one reflection pass over plotting code.
pub struct ChartWorkflow {
    session: ModelSession,
    config: ChartConfig,
}

impl ChartWorkflow {
    /// Create a workflow with the default configuration
    pub fn new(session: ModelSession) -> Self {
        Self::with_config(session, ChartConfig::default())
    }

    pub fn with_config(session: ModelSession, config: ChartConfig) -> Self {
        Self { session, config }
    }

    /// Run one full reflection pass against a CSV dataset.
    ///
    /// Each execution is staged in a fresh scratch directory under the
    /// configured workdir; image paths in the result point into those
    /// directories.
    pub async fn run(&self, dataset: &Path, instruction: &str) -> Result<WorkflowResult> {
        if self.config.verbose {
            println!("Instruction: {}\n", instruction);
            println!("Profiling dataset: {}", dataset.display());
        }

        let profile = DatasetProfile::from_csv(dataset)?;

        if self.config.verbose {
            println!("   {} rows, {} columns\n", profile.rows, profile.columns.len());
        }

        let mut sandbox = PythonSandbox::new(dataset, &self.config.workdir);
        if let Some(python) = &self.config.python {
            sandbox = sandbox.with_python(python.as_str());
        }

        let gate = TagPair::execute_python();
        let task = ChartTask {
            session: &self.session,
            config: &self.config,
            schema: profile.schema_block(),
            instruction,
            out_v1: format!("{}_v1.png", self.config.basename),
            out_v2: format!("{}_v2.png", self.config.basename),
            gate: gate.clone(),
        };

        let result = run_reflection(&task, &task, &sandbox, &gate).await;

        if self.config.verbose {
            match &result.failure {
                None => {
                    if let Some(ExecutionOutcome::Success(Evidence::File(path))) =
                        &result.outcome_v2
                    {
                        println!("\nRefined chart saved: {}", path.display());
                    }
                    println!("Reflection pass complete");
                }
                Some(failure) => println!("\nStopped at {}", failure),
            }
        }

        Ok(result)
    }

    /// Critique plotting code from its text alone, without running it.
    pub async fn review(&self, dataset: &Path, instruction: &str, code: &str) -> Result<Critique> {
        let profile = DatasetProfile::from_csv(dataset)?;
        let gate = TagPair::execute_python();
        let task = ChartTask {
            session: &self.session,
            config: &self.config,
            schema: profile.schema_block(),
            instruction,
            out_v1: format!("{}_v1.png", self.config.basename),
            out_v2: format!("{}_v2.png", self.config.basename),
            gate,
        };
        task.critique(&Artifact::draft(code), None).await
    }
}

/// Stage implementations for one chart run: the same task value acts as
/// both the Generator and the Reflector.
struct ChartTask<'a> {
    session: &'a ModelSession,
    config: &'a ChartConfig,
    schema: String,
    instruction: &'a str,
    out_v1: String,
    out_v2: String,
    gate: TagPair,
}

impl Generator for ChartTask<'_> {
    async fn draft(&self) -> Result<String> {
        if self.config.verbose {
            println!("Drafting plot code with {}...", self.config.generation_model);
        }

        let prompt =
            prompt::chart_generation(&self.gate, self.instruction, &self.schema, &self.out_v1);
        let raw = self
            .session
            .complete_text(&self.config.generation_model, &prompt, None)
            .await?;

        if self.config.verbose {
            println!("   Response: {} chars", raw.len());
        }
        Ok(raw)
    }
}

impl Reflector for ChartTask<'_> {
    async fn critique(&self, draft: &Artifact, evidence: Option<&Evidence>) -> Result<Critique> {
        let raw = match evidence {
            Some(Evidence::File(path)) => {
                if self.config.verbose {
                    println!(
                        "Reviewing {} with {}...",
                        path.display(),
                        self.config.reflection_model
                    );
                }
                let image = ImagePayload::from_file(path)
                    .map_err(|e| io_error(format!("Failed to read chart image: {}", e)))?;
                let prompt = prompt::chart_reflection(
                    &self.gate,
                    self.instruction,
                    &self.schema,
                    &draft.text,
                    &self.out_v2,
                );
                self.session
                    .complete_with_image(&self.config.reflection_model, &prompt, image, None)
                    .await?
            }
            _ => {
                if self.config.verbose {
                    println!(
                        "Reviewing {} code with {}...",
                        draft.version, self.config.reflection_model
                    );
                }
                let prompt = prompt::chart_review(
                    &self.gate,
                    self.instruction,
                    &self.schema,
                    &draft.text,
                    &self.out_v2,
                );
                self.session
                    .complete_text(&self.config.reflection_model, &prompt, None)
                    .await?
            }
        };

        let critique = parse_critique(&raw, RefinedSource::TaggedBlock(&self.gate), draft);
        if self.config.verbose {
            println!("   Feedback: {}", truncate(&critique.feedback, 100));
        }
        Ok(critique)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redraft_core::provider::{
        CompletionRequest, CompletionResponse, FinishReason, ProviderError, Usage,
    };
    use redraft_core::{CritiqueSource, ModelCaller, ProviderFamily, ProviderRegistry, Version};
    use std::collections::VecDeque;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Caller that pops scripted replies and records every request
    struct ScriptedCaller {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCaller {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn prompt(&self, index: usize) -> String {
            self.requests.lock().unwrap()[index].messages[0].content.clone()
        }
    }

    #[async_trait]
    impl ModelCaller for ScriptedCaller {
        fn name(&self) -> &str {
            "scripted"
        }

        fn family(&self) -> ProviderFamily {
            ProviderFamily::Gemini
        }

        fn models(&self) -> Vec<String> {
            vec!["scripted-1".into()]
        }

        fn default_model(&self) -> &str {
            "scripted-1"
        }

        fn supports_images(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted");
            Ok(CompletionResponse {
                id: "scripted".into(),
                model: request.model.unwrap_or_else(|| "scripted-1".into()),
                content: Some(reply),
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            })
        }
    }

    fn session_with(caller: Arc<ScriptedCaller>) -> ModelSession {
        let mut registry = ProviderRegistry::new();
        registry.register(caller);
        ModelSession::new(registry)
    }

    fn quiet_config() -> ChartConfig {
        ChartConfig {
            verbose: false,
            ..ChartConfig::default()
        }
    }

    #[test]
    fn test_default_models() {
        let config = ChartConfig::default();
        assert_eq!(config.generation_model, "gemini-2.5-flash-lite");
        assert_eq!(config.reflection_model, "gemini-2.5-flash");
        assert_eq!(config.basename, "chart");
    }

    #[tokio::test]
    async fn test_draft_prompt_carries_the_contract() {
        let caller = Arc::new(ScriptedCaller::new(&[
            "<execute_python>plt.plot(df.price)</execute_python>",
        ]));
        let session = session_with(caller.clone());
        let config = quiet_config();
        let task = ChartTask {
            session: &session,
            config: &config,
            schema: "- price (number)\n".to_string(),
            instruction: "plot revenue by month",
            out_v1: "chart_v1.png".to_string(),
            out_v2: "chart_v2.png".to_string(),
            gate: TagPair::execute_python(),
        };

        let raw = task.draft().await.unwrap();
        assert!(raw.contains("<execute_python>"));

        let prompt = caller.prompt(0);
        assert!(prompt.contains("plot revenue by month"));
        assert!(prompt.contains("- price (number)"));
        assert!(prompt.contains("chart_v1.png"));
        assert!(caller.requests.lock().unwrap()[0].image.is_none());
    }

    #[tokio::test]
    async fn test_text_review_parses_the_critique() {
        let caller = Arc::new(ScriptedCaller::new(&[
            "{\"feedback\": \"ok\"}\n<execute_python>y=2</execute_python>",
        ]));
        let session = session_with(caller.clone());
        let config = quiet_config();
        let task = ChartTask {
            session: &session,
            config: &config,
            schema: String::new(),
            instruction: "plot revenue",
            out_v1: "chart_v1.png".to_string(),
            out_v2: "chart_v2.png".to_string(),
            gate: TagPair::execute_python(),
        };

        let draft = Artifact::draft("y=1");
        let critique = task.critique(&draft, None).await.unwrap();

        assert_eq!(critique.feedback, "ok");
        assert_eq!(critique.refined.text, "y=2");
        assert_eq!(critique.refined.version, Version::V2);
        assert_eq!(critique.source, CritiqueSource::Parsed);

        let prompt = caller.prompt(0);
        assert!(prompt.contains("without running it"));
        assert!(caller.requests.lock().unwrap()[0].image.is_none());
    }

    #[tokio::test]
    async fn test_image_evidence_rides_along() {
        let dir = tempfile::TempDir::new().unwrap();
        let image_path = dir.path().join("chart_v1.png");
        let mut file = std::fs::File::create(&image_path).unwrap();
        file.write_all(b"\x89PNG fake").unwrap();

        let caller = Arc::new(ScriptedCaller::new(&[
            "{\"feedback\": \"legend overlaps\"}\n<execute_python>y=2</execute_python>",
        ]));
        let session = session_with(caller.clone());
        let config = quiet_config();
        let task = ChartTask {
            session: &session,
            config: &config,
            schema: String::new(),
            instruction: "plot revenue",
            out_v1: "chart_v1.png".to_string(),
            out_v2: "chart_v2.png".to_string(),
            gate: TagPair::execute_python(),
        };

        let draft = Artifact::draft("y=1");
        let evidence = Evidence::File(image_path);
        let critique = task.critique(&draft, Some(&evidence)).await.unwrap();

        assert_eq!(critique.feedback, "legend overlaps");
        let request = &caller.requests.lock().unwrap()[0];
        assert!(request.image.is_some());
        let prompt = &request.messages[0].content;
        assert!(prompt.contains("attached chart"));
        assert!(prompt.contains("chart_v2.png"));
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("épées épées", 5), "épées…");
    }
}
