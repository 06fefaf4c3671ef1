//! # Redraft Workflow
//!
//! One fixed-depth improvement cycle per run:
//! 1. Draft an artifact (v1) from the instruction and a schema description
//! 2. Execute v1 against real data
//! 3. Critique v1, grounded in what the execution actually produced
//! 4. Execute the refined artifact (v2)
//!
//! Two instantiations ship: matplotlib code over a CSV dataset, and SQL
//! queries over SQLite. The model proposes, the executor is the ground truth.

pub mod chart;
pub mod prompt;
pub mod report;
pub mod sql;
pub mod workflow;

pub use chart::{ChartConfig, ChartWorkflow};
pub use report::{Stage, StageFailure, WorkflowResult};
pub use sql::{SqlConfig, SqlWorkflow};
pub use workflow::{run_reflection, Generator, Reflector};
