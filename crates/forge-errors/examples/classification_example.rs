//! Demonstrates implementing `Classify` for an application-defined error
//! type and using the classification to pick a process exit code.
//!
//! Run with: cargo run -p forge-errors --example classification_example

use forge_errors::{Classify, ErrorClassification};
use thiserror::Error;

#[derive(Debug, Error)]
enum CustomError {
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("upload destination rejected the request: {0}")]
    UploadRejected(String),

    #[error("internal invariant violated: {0}")]
    InternalError(String),

    #[error("invalid task specifier: {0}")]
    InvalidInput(String),
}

impl Classify for CustomError {
    fn classify(&self) -> ErrorClassification {
        match self {
            CustomError::ConfigNotFound(_) => ErrorClassification::Configuration,
            CustomError::UploadRejected(_) => ErrorClassification::Upload,
            CustomError::InternalError(_) => ErrorClassification::Internal,
            CustomError::InvalidInput(_) => ErrorClassification::UserInput,
        }
    }
}

fn report(error: &dyn Classify, error_display: &str) {
    let classification = error.classify();
    println!(
        "{error_display}\n  category: {} | exit code: {}\n",
        classification.category_name(),
        classification.exit_code()
    );
}

fn main() {
    let errors = vec![
        CustomError::ConfigNotFound(".app.toml".to_string()),
        CustomError::UploadRejected("bucket does not exist".to_string()),
        CustomError::InternalError("upload scheduler drained twice".to_string()),
        CustomError::InvalidInput("a.b.c".to_string()),
    ];

    for error in &errors {
        report(error, &error.to_string());
    }

    println!("All classifications and their exit codes:");
    let classifications = [
        ErrorClassification::Configuration,
        ErrorClassification::Resolution,
        ErrorClassification::Digest,
        ErrorClassification::Execution,
        ErrorClassification::Verification,
        ErrorClassification::Upload,
        ErrorClassification::Store,
        ErrorClassification::Scheduler,
        ErrorClassification::Internal,
        ErrorClassification::UserInput,
    ];
    for classification in classifications {
        println!(
            "{:<15} exit code {}",
            classification.category_name(),
            classification.exit_code()
        );
    }
}
