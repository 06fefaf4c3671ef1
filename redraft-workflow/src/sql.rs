//! SQL variant - query generation and refinement over SQLite
//!
//! Drafts a query for the user question, runs it, and feeds the actual
//! result set back to the reviewing model as a markdown table.

use crate::prompt;
use crate::report::WorkflowResult;
use crate::workflow::{run_reflection, Generator, Reflector};
use redraft_core::{
    parse_critique, Artifact, Critique, Evidence, ExecutionOutcome, ModelSession, RefinedSource,
    SqliteExecutor, TagPair,
};
use redraft_error::Result;

/// Configuration for the SQL workflow
#[derive(Debug, Clone)]
pub struct SqlConfig {
    /// Model that drafts the query
    pub generation_model: String,
    /// Model that reviews the query against its result set
    pub reflection_model: String,
    /// Print stage progress to stdout
    pub verbose: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            generation_model: "gemini-2.5-flash-lite".to_string(),
            reflection_model: "gemini-2.5-pro".to_string(),
            verbose: true,
        }
    }
}

/// The SQL workflow - one reflection pass over a query.
pub struct SqlWorkflow {
    session: ModelSession,
    config: SqlConfig,
}

impl SqlWorkflow {
    /// Create a workflow with the default configuration
    pub fn new(session: ModelSession) -> Self {
        Self::with_config(session, SqlConfig::default())
    }

    pub fn with_config(session: ModelSession, config: SqlConfig) -> Self {
        Self { session, config }
    }

    /// Run one full reflection pass against the database.
    pub async fn run(&self, db: &SqliteExecutor, question: &str) -> Result<WorkflowResult> {
        if self.config.verbose {
            println!("Question: {}\n", question);
        }

        let schema = db.schema_text().await?;

        if self.config.verbose {
            println!("Schema:\n{}\n", schema);
        }

        let gate = TagPair::execute_sql();
        let task = SqlTask {
            session: &self.session,
            config: &self.config,
            question,
            schema: &schema,
            gate: gate.clone(),
        };

        let result = run_reflection(&task, &task, db, &gate).await;

        if self.config.verbose {
            match &result.failure {
                None => {
                    if let Some(ExecutionOutcome::Success(Evidence::Table(table))) =
                        &result.outcome_v2
                    {
                        println!("\nFinal answer ({} rows):", table.len());
                        print!("{}", table.to_markdown());
                    }
                    println!("Reflection pass complete");
                }
                Some(failure) => println!("\nStopped at {}", failure),
            }
        }

        Ok(result)
    }

    /// Critique a query from its text alone, without running it.
    pub async fn review(&self, db: &SqliteExecutor, question: &str, sql: &str) -> Result<Critique> {
        let schema = db.schema_text().await?;
        let task = SqlTask {
            session: &self.session,
            config: &self.config,
            question,
            schema: &schema,
            gate: TagPair::execute_sql(),
        };
        task.critique(&Artifact::draft(sql), None).await
    }
}

/// Stage implementations for one SQL run: the same task value acts as
/// both the Generator and the Reflector.
struct SqlTask<'a> {
    session: &'a ModelSession,
    config: &'a SqlConfig,
    question: &'a str,
    schema: &'a str,
    gate: TagPair,
}

impl Generator for SqlTask<'_> {
    async fn draft(&self) -> Result<String> {
        if self.config.verbose {
            println!("Drafting SQL with {}...", self.config.generation_model);
        }

        let prompt = prompt::sql_generation(&self.gate, self.question, self.schema);
        let raw = self
            .session
            .complete_text(&self.config.generation_model, &prompt, Some(0.0))
            .await?;

        if self.config.verbose {
            println!("   Response: {} chars", raw.len());
        }
        Ok(raw)
    }
}

impl Reflector for SqlTask<'_> {
    async fn critique(&self, draft: &Artifact, evidence: Option<&Evidence>) -> Result<Critique> {
        if self.config.verbose {
            println!(
                "Reviewing {} with {}...",
                draft.version, self.config.reflection_model
            );
            if let Some(Evidence::Table(table)) = evidence {
                println!("   {} returned {} rows", draft.version, table.len());
            }
        }

        let prompt = match evidence {
            Some(Evidence::Table(table)) => prompt::sql_reflection(
                self.question,
                &draft.text,
                &table.to_markdown(),
                self.schema,
            ),
            Some(Evidence::File(path)) => prompt::sql_reflection(
                self.question,
                &draft.text,
                &format!("(file produced at {})", path.display()),
                self.schema,
            ),
            None => prompt::sql_review(self.question, &draft.text, self.schema),
        };
        let raw = self
            .session
            .complete_text(&self.config.reflection_model, &prompt, Some(0.0))
            .await?;

        let critique = parse_critique(&raw, RefinedSource::InlineField("refined_sql"), draft);
        if self.config.verbose {
            println!("   Feedback: {}", critique.feedback);
        }
        Ok(critique)
    }
}
