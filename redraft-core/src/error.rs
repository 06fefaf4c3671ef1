//! Core error types
//!
//! Re-exports redraft-error and provides core-specific conveniences.

// Re-export the unified error types
pub use redraft_error::{Error, ErrorKind, ErrorStatus, Result};

// =============================================================================
// Core-specific error constructors
// =============================================================================

/// Create an ExtractionFailed error for a missing delimiter pair
pub fn extraction_failed(marker: impl Into<String>) -> Error {
    Error::extraction_failed(marker)
}

/// Create an ExecutionFailed error
pub fn execution_failed(message: impl Into<String>) -> Error {
    Error::execution_failed(message)
}

/// Create an ExecutionTimeout error
pub fn execution_timeout(secs: u64) -> Error {
    Error::execution_timeout(secs)
}

/// Create a DatasetInvalid error
pub fn dataset_invalid(message: impl Into<String>) -> Error {
    Error::dataset_invalid(message)
}

/// Create a SchemaUnavailable error
pub fn schema_unavailable(message: impl Into<String>) -> Error {
    Error::schema_unavailable(message)
}

/// Create an IoFailed error
pub fn io_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::IoFailed, message)
}

/// Create an InferenceFailed error
pub fn inference_failed(message: impl Into<String>) -> Error {
    Error::inference_failed(message)
}

/// Create a ConfigInvalid error
pub fn config_invalid(message: impl Into<String>) -> Error {
    Error::config_invalid(message)
}
