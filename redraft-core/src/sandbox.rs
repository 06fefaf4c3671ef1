//! # Python Execution Sandbox
//!
//! Runs generated Python snippets against a CSV dataset, one scratch
//! directory per execution:
//! - Every call stages a fresh directory, so the two versions of a run
//!   never see each other's files
//! - The dataset is bound to a pandas frame named `df` before the snippet
//!   runs; snippets address data only through that handle
//! - Files the snippet writes into the scratch directory are discovered
//!   afterwards and returned as evidence
//!
//! The sandbox never inspects the snippet. It stages, runs, and collects.

use crate::artifact::Artifact;
use crate::error::{self, Result};
use crate::outcome::Evidence;
use crate::runner::ArtifactRunner;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Variable name snippets use to address the loaded dataset
pub const DATA_HANDLE: &str = "df";

/// Staged script file name inside each scratch directory
const SCRIPT_NAME: &str = "snippet.py";

/// Default wall-clock limit for one execution
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Trailing characters of interpreter output kept in failure messages
const OUTPUT_TAIL_CHARS: usize = 2000;

/// Executes Python artifacts in per-call scratch directories
#[derive(Debug, Clone)]
pub struct PythonSandbox {
    /// Python interpreter binary
    python_bin: String,
    /// CSV dataset handed to every snippet as `df`
    dataset: PathBuf,
    /// Parent directory for scratch directories
    workdir: PathBuf,
    /// Wall-clock limit per execution
    timeout: Duration,
}

impl PythonSandbox {
    /// Create a sandbox over a CSV dataset, staging runs under `workdir`
    pub fn new(dataset: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            python_bin: "python3".to_string(),
            dataset: dataset.into(),
            workdir: workdir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Override the interpreter binary (e.g. a venv path)
    pub fn with_python(mut self, python_bin: impl Into<String>) -> Self {
        self.python_bin = python_bin.into();
        self
    }

    /// Override the per-execution wall-clock limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory scratch directories are created under
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Stage a fresh scratch directory for one execution
    fn fresh_exec_dir(&self, artifact: &Artifact) -> Result<PathBuf> {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = self.workdir.join(format!("exec_{}_{:x}", artifact.version, nanos));
        std::fs::create_dir_all(&dir)
            .map_err(|e| error::io_error(format!("failed to create scratch dir {}: {}", dir.display(), e)))?;
        Ok(dir)
    }

    /// Prefix the snippet with the dataset binding.
    ///
    /// The backend is forced to Agg before the snippet can import pyplot,
    /// so chart code renders headless.
    fn compose_script(dataset: &Path, body: &str) -> String {
        format!(
            "import matplotlib\n\
             matplotlib.use(\"Agg\")\n\
             import pandas as pd\n\
             \n\
             {} = pd.read_csv(r\"{}\")\n\
             \n\
             {}\n",
            DATA_HANDLE,
            dataset.display(),
            body
        )
    }

    /// Find the file the snippet produced, newest first, ignoring the
    /// staged script itself
    fn discover_output(dir: &Path) -> Result<Option<PathBuf>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| error::io_error(format!("failed to read scratch dir {}: {}", dir.display(), e)))?;

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.file_name().and_then(|n| n.to_str()) == Some(SCRIPT_NAME) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            match &newest {
                Some((ts, _)) if *ts >= modified => {}
                _ => newest = Some((modified, path)),
            }
        }

        Ok(newest.map(|(_, path)| path))
    }
}

impl ArtifactRunner for PythonSandbox {
    async fn execute(&self, artifact: &Artifact) -> Result<Evidence> {
        // Resolve the dataset up front so the snippet sees an absolute path
        // regardless of the scratch cwd.
        let dataset = std::fs::canonicalize(&self.dataset).map_err(|e| {
            error::dataset_invalid(format!("dataset {} not readable: {}", self.dataset.display(), e))
                .with_operation("sandbox::execute")
        })?;

        let exec_dir = self.fresh_exec_dir(artifact)?;
        let script_path = exec_dir.join(SCRIPT_NAME);
        let script = Self::compose_script(&dataset, &artifact.text);
        std::fs::write(&script_path, script)
            .map_err(|e| error::io_error(format!("failed to stage {}: {}", script_path.display(), e)))?;

        let mut cmd = Command::new(&self.python_bin);
        cmd.arg(SCRIPT_NAME)
            .current_dir(&exec_dir)
            // Reap the interpreter if the timeout drops the output future.
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                error::execution_failed(format!("could not launch '{}': {}", self.python_bin, e))
                    .with_operation("sandbox::execute")
                    .with_context("version", artifact.version.to_string())
            })?,
            Err(_) => {
                return Err(error::execution_timeout(self.timeout.as_secs())
                    .with_operation("sandbox::execute")
                    .with_context("version", artifact.version.to_string()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if !stderr.trim().is_empty() {
                tail(stderr.trim(), OUTPUT_TAIL_CHARS)
            } else if !stdout.trim().is_empty() {
                tail(stdout.trim(), OUTPUT_TAIL_CHARS)
            } else {
                format!("interpreter exited with {}", output.status)
            };
            return Err(error::execution_failed(detail)
                .with_operation("sandbox::execute")
                .with_context("version", artifact.version.to_string()));
        }

        match Self::discover_output(&exec_dir)? {
            Some(path) => Ok(Evidence::File(path)),
            None => Err(error::execution_failed("snippet completed but produced no output file")
                .with_operation("sandbox::execute")
                .with_context("version", artifact.version.to_string())),
        }
    }
}

/// Keep the last `max_chars` characters of interpreter output
fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().skip(count - max_chars).collect();
    format!("...{}", kept)
}
