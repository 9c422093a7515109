//! Entry point for the `forge` binary.
//!
//! Owns argument parsing, logging setup, and process exit codes; every
//! decision about what a task's inputs are, whether it is pending, and how
//! its outputs get uploaded lives in `forge-lib`.

mod cli;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use cli::{Cli, Command};
use forge_errors::{Classify, ForgeError};
use forge_lib::{signal::SignalHandler, Application, Filter, RunOptions};
use forge_upload::{DockerRegistryBackend, FileCopyBackend, S3Backend, UploadBackend};
use forgepath::AbsoluteSystemPathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const REPOSITORY_CONFIG_FILENAME: &str = "forge.toml";
const STORE_DIR: &str = ".forge";
const STORE_FILENAME: &str = "runs.db";

fn main() {
    human_panic::setup_panic!();
    let cli = Cli::parse();

    if let Command::Completion { shell } = cli.command {
        Cli::print_completions(shell);
        std::process::exit(0);
    }

    forge_lib::telemetry::ForgeSubscriber::install(cli.verbose as usize, cli.use_color());

    let runtime = tokio::runtime::Runtime::new().expect("failed to start the async runtime");
    let exit_code = runtime.block_on(run(cli));
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Version => {
            println!("forge {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Command::Completion { .. } => unreachable!("handled before the runtime started"),
        Command::Run(args) => match run_command(args).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("error: {e}");
                e.classify().exit_code()
            }
        },
    }
}

async fn run_command(args: cli::RunArgs) -> Result<(), ForgeError> {
    let cwd = std::env::current_dir().map_err(|e| config_err("cwd", e))?;
    let repo_root = AbsoluteSystemPathBuf::new(cwd.to_string_lossy().into_owned())
        .map_err(|e| config_err("cwd", e))?
        .to_realpath()
        .map_err(|e| config_err("cwd", e))?;

    let repository_config = forge_lib::load_repository_config(&repo_root.join_component(REPOSITORY_CONFIG_FILENAME))?;

    if repository_config.postgresql_url.is_some() {
        warn!("database.postgresql_url is set, but only the embedded SQLite store is implemented; ignoring it");
    }

    let app_dirs = forge_lib::discover_app_dirs(&repo_root, &repository_config)?;
    let includes = forge_lib::IncludeDb::load(&repo_root, &repository_config.include_dirs)?;

    let scm = forge_scm::Scm::open(&repo_root).ok();
    let git_commit = scm.as_ref().and_then(|s| s.state().ok()).map(|s| s.commit_id).unwrap_or_default();

    let mut applications = Vec::with_capacity(app_dirs.len());
    for app_dir in &app_dirs {
        applications.push(forge_lib::load_app(&repo_root, app_dir, &includes, &git_commit)?);
    }

    let tasks = select_tasks(&repo_root, &applications, &args.specifier)?;

    let store_path = store_path(&repo_root);
    if let Some(parent) = store_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ForgeError::Store { cause: e.to_string() })?;
    }
    let store = forge_store::SqliteStore::open(&store_path).map_err(|e| ForgeError::Store { cause: e.to_string() })?;

    let backends = build_backends().await;

    let cancellation = CancellationToken::new();
    let signal_handler = SignalHandler::new(async { tokio::signal::ctrl_c().await.ok() });
    let signal_task = signal_handler.subscribe().map(|subscriber| {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            let _guard = subscriber.listen().await;
            cancellation.cancel();
        })
    });

    let output: forge_lib::OutputSink = Arc::new(std::sync::Mutex::new(std::io::stderr()));

    let result = forge_lib::run(
        tasks,
        RunOptions {
            repository_root: &repo_root,
            scm: scm.as_ref(),
            store: &store,
            backends,
            filter: Filter::from(args.filter),
            skip_upload: args.skip_upload,
            output,
            cancellation,
        },
    )
    .await;

    if let Some(task) = signal_task {
        task.abort();
    }
    signal_handler.close().await;
    result
}

/// Resolves the task specifier mini-language against the loaded applications
/// and returns the matching, owned `Task`s.
fn select_tasks(
    repo_root: &forgepath::AbsoluteSystemPath,
    applications: &[Application],
    specifier: &str,
) -> Result<Vec<forge_lib::Task>, ForgeError> {
    let parsed = forge_lib::parse_specifier(repo_root, specifier)
        .map_err(|e| config_err("task specifier", e))?;

    let (app_half, task_half) = match parsed {
        forge_lib::Specifier::Path(dir) => {
            let owner = applications
                .iter()
                .find(|a| a.directory.as_path() == dir.as_path())
                .ok_or_else(|| config_err("task specifier", format!("no application found at {dir}")))?;
            (forge_lib::Half::Literal(owner.name.clone()), forge_lib::Half::Wildcard)
        }
        forge_lib::Specifier::Pattern { app, task } => (app, task),
    };

    let selected = forge_lib::select_tasks(applications, &app_half, &task_half)?;
    Ok(selected.into_iter().cloned().collect())
}

async fn build_backends() -> Vec<Arc<dyn UploadBackend>> {
    let mut backends: Vec<Arc<dyn UploadBackend>> = vec![Arc::new(FileCopyBackend)];

    backends.push(Arc::new(S3Backend::from_env().await));

    match DockerRegistryBackend::connect() {
        Ok(backend) => backends.push(Arc::new(backend)),
        Err(e) => warn!("docker registry backend unavailable, docker:// outputs will fail to upload: {e}"),
    }

    backends
}

fn store_path(repo_root: &forgepath::AbsoluteSystemPath) -> PathBuf {
    repo_root.as_path().join(STORE_DIR).join(STORE_FILENAME)
}

fn config_err(path: impl Into<String>, cause: impl std::fmt::Display) -> ForgeError {
    ForgeError::Config { path: path.into(), cause: cause.to_string() }
}
