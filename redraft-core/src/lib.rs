//! # Redraft Core
//!
//! Building blocks for a generate / execute / critique / regenerate loop.
//!
//! ## Core Concepts
//! - **Artifact**: A versioned unit of executable text (code or query)
//! - **TagPair**: The delimiter gate between model prose and executable text
//! - **Critique**: Structured feedback plus a refined artifact, parsed tolerantly
//! - **Evidence**: What an execution produced (result table or saved file)
//! - **Runners**: Sandboxed executors for the two variants (Python, SQLite)
//! - **Provider**: Trait-based LLM communication (OpenAI, Anthropic, Gemini)

pub mod artifact;
pub mod critique;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod outcome;
pub mod provider;
pub mod runner;
pub mod sandbox;
pub mod session;
pub mod sqlite;

pub use artifact::{Artifact, Version};
pub use critique::{parse_critique, Critique, CritiqueSource, RefinedSource};
pub use dataset::{ColumnKind, ColumnProfile, DatasetProfile};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use extract::TagPair;
pub use outcome::{Evidence, ExecutionOutcome, ResultTable};
pub use provider::{
    AnthropicCaller, ChatMessage, CompletionRequest, CompletionResponse, FinishReason,
    GeminiCaller, ImagePayload, ModelCaller, OpenAiCaller, ProviderConfig, ProviderError,
    ProviderFamily, Role, Usage, UsageTracker,
};
pub use runner::ArtifactRunner;
pub use sandbox::{PythonSandbox, DATA_HANDLE};
pub use session::{ModelSession, ProviderRegistry};
pub use sqlite::SqliteExecutor;
