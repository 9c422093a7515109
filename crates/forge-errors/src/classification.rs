//! The eight tagged error kinds produced by the task runner core, and the
//! exit-code mapping the CLI applies to them.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Classification of a `ForgeError`, used only by the ambient CLI layer to
/// pick a process exit code. Never consulted by the core's own control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClassification {
    /// File not found, parse error, missing/empty required field, duplicate
    /// id, unknown include id, invalid name.
    Configuration,
    /// Input sub-resolver failure, unreadable file, VCS query failure.
    Resolution,
    /// I/O failure while hashing.
    Digest,
    /// Task command exited non-zero.
    Execution,
    /// Declared output missing after command success.
    Verification,
    /// Upload backend reported a failure for one job.
    Upload,
    /// Persistence failure on save, or transport failure on lookup.
    Store,
    /// Unknown URI scheme for a job's destination, or a backend violated its
    /// contract.
    Scheduler,
    /// A bug in forge itself, not a modeled failure.
    Internal,
    /// Invalid CLI usage (bad specifier syntax, unknown flag).
    UserInput,
}

impl ErrorClassification {
    /// The process exit code the CLI uses for this classification.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorClassification::UserInput => 2,
            ErrorClassification::Internal => 100,
            _ => 1,
        }
    }

    pub fn category_name(&self) -> &'static str {
        match self {
            ErrorClassification::Configuration => "Configuration",
            ErrorClassification::Resolution => "Resolution",
            ErrorClassification::Digest => "Digest",
            ErrorClassification::Execution => "Execution",
            ErrorClassification::Verification => "Verification",
            ErrorClassification::Upload => "Upload",
            ErrorClassification::Store => "Store",
            ErrorClassification::Scheduler => "Scheduler",
            ErrorClassification::Internal => "Internal",
            ErrorClassification::UserInput => "User Input",
        }
    }
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category_name())
    }
}

/// Implemented by every error type produced by the core so the CLI can map it
/// to an exit code without matching on concrete variants.
pub trait Classify {
    fn classify(&self) -> ErrorClassification;
}

/// The eight error kinds of the task runner core, carried as tagged variants
/// with structured context per kind.
#[derive(Debug, Error, Diagnostic)]
pub enum ForgeError {
    #[error("configuration error at {path}: {cause}")]
    Config { path: String, cause: String },

    #[error("failed to resolve inputs ({sub_specification}): {cause}")]
    Resolution {
        sub_specification: &'static str,
        cause: String,
    },

    #[error("failed to hash {path}: {cause}")]
    Digest { path: String, cause: String },

    #[error("task `{task_id}` exited with status {exit_code}: {command}")]
    Execution {
        task_id: String,
        command: String,
        exit_code: i32,
    },

    #[error("output \"{output_name}\" was not created by task run")]
    Verification { output_name: String },

    #[error("upload of {output_name} to {destination} failed: {cause}")]
    Upload {
        output_name: String,
        destination: String,
        cause: String,
    },

    #[error("store error: {cause}")]
    Store { cause: String },

    #[error("scheduler error: {cause}")]
    Scheduler { cause: String },

    #[error("aggregated errors from run ({count} task(s) failed)")]
    Aggregate {
        count: usize,
        #[related]
        causes: Vec<ForgeError>,
    },
}

impl Classify for ForgeError {
    fn classify(&self) -> ErrorClassification {
        match self {
            ForgeError::Config { .. } => ErrorClassification::Configuration,
            ForgeError::Resolution { .. } => ErrorClassification::Resolution,
            ForgeError::Digest { .. } => ErrorClassification::Digest,
            ForgeError::Execution { .. } => ErrorClassification::Execution,
            ForgeError::Verification { .. } => ErrorClassification::Verification,
            ForgeError::Upload { .. } => ErrorClassification::Upload,
            ForgeError::Store { .. } => ErrorClassification::Store,
            ForgeError::Scheduler { .. } => ErrorClassification::Scheduler,
            ForgeError::Aggregate { .. } => ErrorClassification::Execution,
        }
    }
}
