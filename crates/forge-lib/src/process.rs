//! Spawns and waits on a single task's shell command.
//!
//! Tasks execute one at a time (see `runner`), so this module has no need for
//! the process-group/PTY machinery a parallel task runner would carry. It
//! spawns a command through the shell, mirrors stdout/stderr into a single
//! mutex-guarded writer so interleaved writes from the two streams never
//! tear a line in half, and reports the exit status.

use std::{
    process::{ExitStatus, Stdio},
    sync::{Arc, Mutex},
};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
};
use tracing::debug;

/// Outcome of running a task's command to completion.
#[derive(Debug)]
pub enum ChildExit {
    /// The process exited; `0` is success, anything else is a failure.
    Exited(i32),
    /// The process was terminated by a signal (unix only).
    Signaled,
}

impl ChildExit {
    pub fn success(&self) -> bool {
        matches!(self, ChildExit::Exited(0))
    }
}

fn classify(status: ExitStatus) -> ChildExit {
    match status.code() {
        Some(code) => ChildExit::Exited(code),
        None => ChildExit::Signaled,
    }
}

/// A sink that every line of captured output is written to under a single
/// lock, so stdout and stderr never interleave mid-line.
pub type OutputSink = Arc<Mutex<dyn std::io::Write + Send>>;

/// Runs `command` (interpreted by `/bin/sh -c` on unix, `cmd /C` on windows)
/// with `cwd` as its working directory, streaming combined stdout/stderr into
/// `sink` line by line, and returns once the child has exited.
pub async fn run_task_command(
    command: &str,
    cwd: &std::path::Path,
    sink: OutputSink,
) -> std::io::Result<ChildExit> {
    debug!(%command, cwd = %cwd.display(), "spawning task command");

    let mut cmd = shell_command(command);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let out_sink = sink.clone();
    let stdout_task = tokio::spawn(pump_lines(stdout, out_sink));
    let err_sink = sink;
    let stderr_task = tokio::spawn(pump_lines(stderr, err_sink));

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    Ok(classify(status))
}

async fn pump_lines<R>(reader: R, sink: OutputSink)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut guard = sink.lock().expect("output sink poisoned");
        let _ = writeln!(guard, "{line}");
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Writes into an in-memory buffer, used so tests can assert on captured
/// output without touching the filesystem.
#[cfg(test)]
pub fn buffer_sink() -> (OutputSink, Arc<Mutex<Vec<u8>>>) {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink: OutputSink = buf.clone();
    (sink, buf)
}
