//! The task runner: orchestrates filter -> execute -> verify -> queue
//! uploads -> record for a selection of tasks.
//!
//! Scheduling is mostly serial: tasks execute one at a time, while outputs
//! from an already-finished task upload on the scheduler's single
//! background worker, overlapping with the next task's command execution.
//! A task command failure aborts the execution loop but does not cancel the
//! upload context -- uploads already queued for earlier, successful tasks
//! are always allowed to finish and be recorded.

use std::{
    io::Write,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use forge_errors::ForgeError;
use forge_scm::Scm;
use forge_store::RunStore;
use forge_upload::UploadBackend;
use forgepath::AbsoluteSystemPath;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    model::{DockerImageOutput, FileOutput, Output, OutputKind, Task, TaskId, TaskRun, UploadJob, UploadResult},
    process::ChildExit,
    scheduler::{UploadQueue, UploadScheduler},
    status::{self, Status},
};

/// Which tasks `run` selects out of the full, loaded set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Run every task, regardless of status.
    Always,
    /// Run only tasks the Status Manager reports `Pending`.
    OnlyPending,
}

/// Where the runner writes a task's combined stdout/stderr and its own
/// per-task status/upload lines. A single mutex-guarded sink so writes from
/// the main execution loop never tear a line.
pub type OutputSink = Arc<Mutex<dyn Write + Send>>;

pub struct RunOptions<'a> {
    pub repository_root: &'a AbsoluteSystemPath,
    pub scm: Option<&'a Scm>,
    pub store: &'a dyn RunStore,
    pub backends: Vec<Arc<dyn UploadBackend>>,
    pub filter: Filter,
    pub skip_upload: bool,
    pub output: OutputSink,
    /// Cancels in-flight and not-yet-started uploads; the caller owns this
    /// token so it can wire it to a signal handler. Cancelling it never
    /// aborts an already-running task command, only the upload side.
    pub cancellation: CancellationToken,
}

/// Runs `tasks` to completion. Tasks are sorted by composite id first, so
/// selection and execution are deterministic regardless of the order the
/// caller passes them in.
pub async fn run(tasks: Vec<Task>, opts: RunOptions<'_>) -> Result<(), ForgeError> {
    let mut tasks = tasks;
    tasks.sort_by(|a, b| a.id.cmp(&b.id));

    // Filter stage: ask the Status Manager about every task, print its
    // status, and select the ones this filter cares about. The inputs and
    // digest the Status Manager already computed are carried into the
    // `TaskRun` so they are never recomputed.
    let mut selected: Vec<TaskRun> = Vec::new();
    for task in tasks {
        let task_status = status::status(opts.repository_root, &task, opts.scm, opts.store)?;
        print_line(&opts.output, &status_line(&task.id, &task_status.status));

        let keep = match opts.filter {
            Filter::Always => true,
            Filter::OnlyPending => matches!(task_status.status, Status::Pending),
        };
        if keep {
            selected.push(TaskRun::new(task, task_status.inputs, task_status.total_input_digest));
        }
    }

    if selected.is_empty() {
        return Ok(());
    }

    // Upload plumbing: size both channels to the total output count across
    // every selected run so `queue` never blocks waiting on a slow worker.
    let total_outputs: usize = selected.iter().map(|r| r.task.outputs.total_count()).sum();
    let channel_capacity = total_outputs.max(1);

    let (jobs_tx, jobs_rx) = mpsc::channel(channel_capacity);
    let (results_tx, mut results_rx) = mpsc::channel(channel_capacity);

    let scheduler = UploadScheduler::new(opts.backends, jobs_rx, results_tx, opts.cancellation.clone())?;
    let scheduler_handle = scheduler.start();
    let mut queue = UploadQueue::new(jobs_tx);

    // Execution loop. A command failure stops further execution but does
    // not cancel uploads already queued for earlier tasks. `succeeded_count`
    // tracks how many leading entries of `selected` finished cleanly, since
    // the failing task_run itself must never be recorded even though it has
    // no outputs to wait on.
    let mut execution_error: Option<ForgeError> = None;
    let mut succeeded_count = 0usize;

    for index in 0..selected.len() {
        selected[index].start_ts = Some(SystemTime::now());
        let run_result = execute_one(&selected[index], opts.output.clone()).await;
        selected[index].stop_ts = Some(SystemTime::now());

        match run_result {
            Ok(outputs) => {
                selected[index].outputs = outputs;
                succeeded_count = index + 1;
            }
            Err(e) => {
                execution_error = Some(e);
                break;
            }
        }

        if !opts.skip_upload {
            let task_run = &selected[index];
            let jobs: Vec<UploadJob> = task_run
                .outputs
                .iter()
                .enumerate()
                .map(|(output_index, output)| UploadJob {
                    task_run_index: index,
                    output_index,
                    task_id: task_run.task.id.clone(),
                    output_identity: output.identity().to_string(),
                    output_kind: output.kind(),
                    source_path: output.upload_source_path().to_owned(),
                    destination: output.upload_destination().clone(),
                })
                .collect();
            for job in jobs {
                queue.queue(job).await;
            }
        }
    }

    queue.close();

    // Drain. A task_run's outputs are "done" once its `finished_uploads`
    // reaches its output count, counting both successes and failures.
    // `skip_upload` and zero-output runs never produce an `UploadResult`,
    // so they are recorded directly once their execution slot is known to
    // have finished without error.
    while let Some(result) = results_rx.recv().await {
        let index = result.job.task_run_index;
        print_upload_result(&opts.output, &result);
        selected[index].finished_uploads.push(result);
    }
    let _ = scheduler_handle.await;

    let mut record_errors = Vec::new();
    for task_run in selected.iter().take(succeeded_count) {
        if !opts.skip_upload && task_run.finished_uploads.len() != task_run.outputs.len() {
            // A successful task_run whose uploads never fully drained is a
            // scheduler bug, not a recoverable state; skip recording it
            // rather than persist a row with missing output metadata.
            record_errors.push(ForgeError::Scheduler {
                cause: format!(
                    "{}: expected {} upload result(s), got {}",
                    task_run.task.id,
                    task_run.outputs.len(),
                    task_run.finished_uploads.len()
                ),
            });
            continue;
        }
        if let Err(e) = record_run(opts.store, task_run, opts.scm) {
            record_errors.push(ForgeError::Store { cause: e.to_string() });
        }
    }

    if let Some(e) = execution_error {
        return Err(e);
    }

    let upload_errors: Vec<ForgeError> = selected
        .iter()
        .flat_map(|r| r.finished_uploads.iter())
        .filter(|u| !u.is_ok())
        .map(|u| ForgeError::Upload {
            output_name: u.job.output_identity.clone(),
            destination: u.job.destination.to_uri(),
            cause: u.error.clone().unwrap_or_default(),
        })
        .collect();

    let mut all_errors = upload_errors;
    all_errors.extend(record_errors);

    if !all_errors.is_empty() {
        return Err(ForgeError::Aggregate { count: all_errors.len(), causes: all_errors });
    }

    Ok(())
}

/// Executes one task's command and, on success, materializes and verifies
/// its declared outputs.
async fn execute_one(task_run: &TaskRun, sink: OutputSink) -> Result<Vec<Output>, ForgeError> {
    let cwd = task_run.task.directory.as_path().as_std_path();
    let exit = crate::process::run_task_command(&task_run.task.command, cwd, sink)
        .await
        .map_err(|e| ForgeError::Execution {
            task_id: task_run.task.id.to_string(),
            command: task_run.task.command.clone(),
            exit_code: e.raw_os_error().unwrap_or(-1),
        })?;

    if !exit.success() {
        let exit_code = match exit {
            ChildExit::Exited(code) => code,
            ChildExit::Signaled => -1,
        };
        return Err(ForgeError::Execution {
            task_id: task_run.task.id.to_string(),
            command: task_run.task.command.clone(),
            exit_code,
        });
    }

    materialize_outputs(&task_run.task)
}

/// Resolves a task's declared outputs into their materialized form and
/// verifies each one exists.
fn materialize_outputs(task: &Task) -> Result<Vec<Output>, ForgeError> {
    let mut outputs = Vec::with_capacity(task.outputs.total_count());

    for file in &task.outputs.files {
        let absolute_path = join_relative(&task.directory, &file.path, &file.path)?;
        let output = Output::File(FileOutput {
            relative_path: file.path.clone(),
            absolute_path,
            destination: file.destination.clone(),
        });
        if !output.exists() {
            return Err(ForgeError::Verification { output_name: file.path.clone() });
        }
        outputs.push(output);
    }

    for image in &task.outputs.docker_images {
        let idfile_absolute_path = join_relative(&task.directory, &image.idfile, &image.idfile)?;
        let output = Output::DockerImage(DockerImageOutput {
            idfile_relative_path: image.idfile.clone(),
            idfile_absolute_path,
            destination: image.destination.clone(),
        });
        if !output.exists() {
            return Err(ForgeError::Verification { output_name: image.idfile.clone() });
        }
        outputs.push(output);
    }

    Ok(outputs)
}

fn join_relative(
    base: &forgepath::AbsoluteSystemPath,
    relative: &str,
    output_name: &str,
) -> Result<forgepath::AbsoluteSystemPathBuf, ForgeError> {
    let relative = forgepath::RelativeUnixPathBuf::new(relative)
        .map_err(|_| ForgeError::Verification { output_name: output_name.to_string() })?;
    base.join_unix_path(&relative)
        .map_err(|_| ForgeError::Verification { output_name: output_name.to_string() })
}

fn status_line(id: &TaskId, status: &Status) -> String {
    match status {
        Status::Pending => format!("{id}: pending"),
        Status::Exists { .. } => format!("{id}: cached, skipping execution"),
        Status::Undefined { cause } => format!("{id}: status undefined ({cause})"),
    }
}

fn print_line(output: &OutputSink, line: &str) {
    let mut guard = output.lock().expect("output sink poisoned");
    let _ = writeln!(guard, "{line}");
}

fn print_upload_result(output: &OutputSink, result: &UploadResult) {
    let line = if result.is_ok() {
        format!(
            "{}: uploaded {} -> {}",
            result.job.task_id,
            result.job.output_identity,
            result.url.clone().unwrap_or_default()
        )
    } else {
        format!(
            "{}: upload of {} failed: {}",
            result.job.task_id,
            result.job.output_identity,
            result.error.clone().unwrap_or_default()
        )
    };
    print_line(output, &line);
}

/// Builds and persists a `Run` row for one finished `TaskRun`.
fn record_run(store: &dyn RunStore, task_run: &TaskRun, scm: Option<&Scm>) -> Result<(), forge_store::StoreError> {
    let inputs = task_run
        .inputs
        .iter()
        .map(|input| forge_store::StoredInput {
            repository_local_path: input.repository_local_path.as_str().to_string(),
            digest_hex: input_digest_hex(input),
        })
        .collect();

    let outputs = task_run
        .outputs
        .iter()
        .map(|output| {
            let upload = task_run.finished_uploads.iter().find(|u| u.job.output_identity == output.identity());
            let (upload_uri, upload_duration_ms) = match upload {
                Some(u) if u.is_ok() => (
                    u.url.clone().unwrap_or_default(),
                    u.end_ts.duration_since(u.start_ts).unwrap_or_default().as_millis() as u64,
                ),
                _ => (output.upload_destination().to_uri(), 0),
            };
            forge_store::StoredOutput {
                identity: output.identity().to_string(),
                kind: match output.kind() {
                    OutputKind::File => forge_store::OutputKind::File,
                    OutputKind::DockerImage => forge_store::OutputKind::DockerImage,
                },
                size: output.size().unwrap_or(0),
                digest_hex: output.digest().map(|d| d.to_hex()).unwrap_or_default(),
                upload_uri,
                upload_method: upload_method_for(output.upload_destination()),
                upload_duration_ms,
            }
        })
        .collect();

    let start_ts_ms = task_run.start_ts.map(system_time_to_ms).unwrap_or(0);
    let stop_ts_ms = task_run.stop_ts.map(system_time_to_ms).unwrap_or(0);

    let run = forge_store::Run {
        application_name: task_run.task.id.app.clone(),
        task_name: task_run.task.id.task.clone(),
        start_ts_ms,
        stop_ts_ms,
        total_input_digest_hex: task_run.total_input_digest.to_hex(),
        inputs,
        outputs,
        vcs_state: scm
            .and_then(|s| s.state().ok())
            .map(|s| forge_store::VcsState { commit_id: s.commit_id, is_dirty: s.is_dirty })
            .unwrap_or_else(|| forge_store::VcsState { commit_id: String::new(), is_dirty: false }),
    };

    store.save(run)?;
    Ok(())
}

/// The Status Manager already hashed every input while computing the total
/// digest; `InputFile::digest` returns that cached value without re-reading
/// the file.
fn input_digest_hex(input: &crate::model::InputFile) -> String {
    let mut input = input.clone();
    input.digest().map(|d| d.to_hex()).unwrap_or_default()
}

fn upload_method_for(destination: &forge_upload::Destination) -> forge_store::UploadMethod {
    match destination.scheme() {
        "file" => forge_store::UploadMethod::FileCopy,
        "s3" => forge_store::UploadMethod::S3,
        "docker" => forge_store::UploadMethod::DockerRegistry,
        other => unreachable!("unknown upload scheme {other:?} survived Destination::parse"),
    }
}

fn system_time_to_ms(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputSpec, OutputSpec};

    fn make_task(id: (&str, &str), dir: &AbsoluteSystemPath, command: &str) -> Task {
        let mut inputs = InputSpec::default();
        inputs.file_globs = vec!["*.txt".to_string()];
        Task {
            id: TaskId::new(id.0, id.1),
            command: command.to_string(),
            directory: dir.to_owned(),
            inputs,
            outputs: OutputSpec::default(),
        }
    }

    fn temp_root() -> forgepath::AbsoluteSystemPathBuf {
        let tmp = tempfile::tempdir().unwrap();
        // Leak the tempdir so it outlives the test body; these tests only run
        // inside a process-scoped CI sandbox so this is not a real leak risk.
        let path = tmp.path().to_path_buf();
        std::mem::forget(tmp);
        forgepath::AbsoluteSystemPathBuf::new(path.to_str().unwrap()).unwrap().to_realpath().unwrap()
    }

    fn sink() -> OutputSink {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn empty_task_list_succeeds_immediately() {
        let root = temp_root();
        let store = forge_store::SqliteStore::open_in_memory().unwrap();

        let result = run(
            Vec::new(),
            RunOptions {
                repository_root: &root,
                scm: None,
                store: &store,
                backends: vec![],
                filter: Filter::Always,
                skip_upload: true,
                output: sink(),
                cancellation: CancellationToken::new(),
            },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn zero_output_task_records_a_row_and_second_run_is_cached() {
        let root = temp_root();
        std::fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        let store = forge_store::SqliteStore::open_in_memory().unwrap();

        let task = make_task(("pay", "build"), &root, "true");
        let result = run(
            vec![task.clone()],
            RunOptions {
                repository_root: &root,
                scm: None,
                store: &store,
                backends: vec![],
                filter: Filter::Always,
                skip_upload: true,
                output: sink(),
                cancellation: CancellationToken::new(),
            },
        )
        .await;
        assert!(result.is_ok(), "{result:?}");

        let status_result = status::status(&root, &task, None, &store).unwrap();
        assert!(matches!(status_result.status, Status::Exists { .. }));
    }

    #[tokio::test]
    async fn missing_declared_output_is_a_verification_error() {
        let root = temp_root();
        std::fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        let store = forge_store::SqliteStore::open_in_memory().unwrap();

        let mut task = make_task(("pay", "build"), &root, "true");
        task.outputs.files.push(crate::model::FileOutputSpec {
            path: "dist/app.tar".to_string(),
            destination: forge_upload::Destination::File { path: "/tmp/out.tar".into() },
        });

        let result = run(
            vec![task],
            RunOptions {
                repository_root: &root,
                scm: None,
                store: &store,
                backends: vec![],
                filter: Filter::Always,
                skip_upload: true,
                output: sink(),
                cancellation: CancellationToken::new(),
            },
        )
        .await;
        assert!(matches!(result, Err(ForgeError::Verification { .. })));
    }

    #[tokio::test]
    async fn only_pending_filter_skips_cached_tasks() {
        let root = temp_root();
        std::fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        let store = forge_store::SqliteStore::open_in_memory().unwrap();

        let task = make_task(("pay", "build"), &root, "true");
        run(
            vec![task.clone()],
            RunOptions {
                repository_root: &root,
                scm: None,
                store: &store,
                backends: vec![],
                filter: Filter::Always,
                skip_upload: true,
                output: sink(),
                cancellation: CancellationToken::new(),
            },
        )
        .await
        .unwrap();

        // Second run with OnlyPending should select nothing; rerunning "true"
        // again would succeed trivially anyway, so assert via the status
        // directly alongside a no-op run call.
        let second = run(
            vec![task],
            RunOptions {
                repository_root: &root,
                scm: None,
                store: &store,
                backends: vec![],
                filter: Filter::OnlyPending,
                skip_upload: true,
                output: sink(),
                cancellation: CancellationToken::new(),
            },
        )
        .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn successful_upload_is_recorded_with_its_url() {
        use forge_upload::FileCopyBackend;

        let root = temp_root();
        std::fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        let upload_dir = tempfile::tempdir().unwrap();
        let mut task = make_task(("pay", "build"), &root, "echo hi > out.txt");
        task.outputs.files.push(crate::model::FileOutputSpec {
            path: "out.txt".to_string(),
            destination: forge_upload::Destination::File { path: upload_dir.path().join("out.txt") },
        });
        let store = forge_store::SqliteStore::open_in_memory().unwrap();

        let result = run(
            vec![task.clone()],
            RunOptions {
                repository_root: &root,
                scm: None,
                store: &store,
                backends: vec![Arc::new(FileCopyBackend)],
                filter: Filter::Always,
                skip_upload: false,
                output: sink(),
                cancellation: CancellationToken::new(),
            },
        )
        .await;
        assert!(result.is_ok(), "{result:?}");

        let status_result = status::status(&root, &task, None, &store).unwrap();
        assert!(matches!(status_result.status, Status::Exists { .. }));
    }
}
