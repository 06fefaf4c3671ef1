//! # Artifact runners
//!
//! The execution seam of the loop. A runner takes one artifact, runs it in an
//! environment the runner alone controls, and reports what that run produced.
//! The contract is narrow on purpose: inputs are the artifact text plus
//! whatever read-only bindings the runner was constructed with; output is a
//! side-effect descriptor or a failure message. Isolation mechanics live
//! entirely behind this trait.

use crate::artifact::Artifact;
use crate::error::Result;
use crate::outcome::Evidence;

/// Executes artifacts against real data.
///
/// Implementations must:
/// - construct a fresh execution environment per call, so consecutive
///   executions of the same run share no state
/// - surface artifact failures as errors carrying the captured message,
///   never by panicking or crashing the process
#[allow(async_fn_in_trait)]
pub trait ArtifactRunner: Send + Sync {
    /// Run one artifact to completion and describe what it produced
    async fn execute(&self, artifact: &Artifact) -> Result<Evidence>;
}
