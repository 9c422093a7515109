//! The core of the forge task runner: application/task loading, input
//! resolution, digesting, status, execution, and upload scheduling.
//!
//! The CLI crate is a thin shell around this library: it owns argument
//! parsing and process exit codes, while every other decision -- what a
//! task's inputs are, whether it is pending, how its outputs get uploaded --
//! lives here.

mod config;
mod includes;
mod inputs;
mod loader;
mod model;
mod process;
mod runner;
mod scheduler;
pub mod signal;
mod status;
pub mod telemetry;
mod vars;

pub use config::{discover_app_dirs, load_repository_config, RepositoryConfig, APP_CONFIG_FILENAME};
pub use includes::IncludeDb;
pub use loader::{load_app, parse_specifier, select_tasks, Half, Specifier, SpecifierError};
pub use model::{
    Application, DockerImageOutput, FileOutput, GolangSourceRoot, InputFile, Output, OutputKind,
    Task, TaskId, TaskRun, UploadJob, UploadResult,
};
pub use runner::{run, Filter, OutputSink, RunOptions};
pub use status::{status, Status, TaskStatus};
pub use vars::VariableResolver;
