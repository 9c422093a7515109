//! The data model: applications, tasks, include fragments, resolved
//! inputs/outputs, and the transient records the runner builds while
//! executing a selection of tasks.

use std::time::SystemTime;

use forge_digest::{Digest, DigestError};
use forge_upload::Destination;
use forgepath::{AbsoluteSystemPath, AbsoluteSystemPathBuf, RelativeUnixPathBuf};
use serde::{Deserialize, Serialize};

/// A task's globally unique composite id, `app.task`. Neither half may
/// contain `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub app: String,
    pub task: String,
}

impl TaskId {
    pub fn new(app: impl Into<String>, task: impl Into<String>) -> Self {
        Self { app: app.into(), task: task.into() }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.app, self.task)
    }
}

/// One root directory whose transitively-imported, non-standard-library,
/// non-test source files become inputs. `environment` parametrizes the
/// source-language discovery tool (e.g. Go module/vendor mode).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GolangSourceRoot {
    pub path: String,
    pub environment: Vec<(String, String)>,
}

/// The unresolved input specification of a task: three independent,
/// optional, unioned sub-sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSpec {
    pub file_globs: Vec<String>,
    pub git_file_globs: Vec<String>,
    pub golang_sources: Vec<GolangSourceRoot>,
}

impl InputSpec {
    pub fn is_empty(&self) -> bool {
        self.file_globs.is_empty() && self.git_file_globs.is_empty() && self.golang_sources.is_empty()
    }

    /// Appends another spec's lists onto this one. Used by include merging,
    /// which never replaces a section, only appends to it.
    pub fn merge(&mut self, other: InputSpec) {
        self.file_globs.extend(other.file_globs);
        self.git_file_globs.extend(other.git_file_globs);
        self.golang_sources.extend(other.golang_sources);
    }
}

/// A declared file output: a path relative to the task directory, plus its
/// resolved upload destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutputSpec {
    pub path: String,
    pub destination: Destination,
}

/// A declared docker image output: the path to the id-file the task command
/// writes the produced image id into, plus the registry destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerImageOutputSpec {
    pub idfile: String,
    pub destination: Destination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub files: Vec<FileOutputSpec>,
    pub docker_images: Vec<DockerImageOutputSpec>,
}

impl OutputSpec {
    pub fn total_count(&self) -> usize {
        self.files.len() + self.docker_images.len()
    }

    pub fn merge(&mut self, other: OutputSpec) {
        self.files.extend(other.files);
        self.docker_images.extend(other.docker_images);
    }
}

/// A task: an opaque shell command scoped to an application, with a
/// precise declaration of its inputs and outputs. Immutable once built by
/// the Task Loader.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub command: String,
    pub directory: AbsoluteSystemPathBuf,
    pub inputs: InputSpec,
    pub outputs: OutputSpec,
}

/// An application: a uniquely-named directory containing at least one task.
#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    pub directory: AbsoluteSystemPathBuf,
    pub tasks: Vec<Task>,
}

/// One resolved input file. `digest` is computed lazily and cached so a
/// second call to [`InputFile::digest`] does not re-hash the file.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub absolute_path: AbsoluteSystemPathBuf,
    pub repository_local_path: RelativeUnixPathBuf,
    digest: Option<Digest>,
}

impl InputFile {
    pub fn new(absolute_path: AbsoluteSystemPathBuf, repository_local_path: RelativeUnixPathBuf) -> Self {
        Self { absolute_path, repository_local_path, digest: None }
    }

    /// Returns the cached digest, computing and caching it on first call.
    pub fn digest(&mut self) -> Result<&Digest, DigestError> {
        if self.digest.is_none() {
            let digest = forge_digest::hash_input_file(
                self.repository_local_path.as_str(),
                self.absolute_path.as_path(),
            )?;
            self.digest = Some(digest);
        }
        Ok(self.digest.as_ref().expect("just populated"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    File,
    DockerImage,
}

/// A `FileOutput` output, materialized after the task command has run.
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub relative_path: String,
    pub absolute_path: AbsoluteSystemPathBuf,
    pub destination: Destination,
}

/// A `DockerImageOutput` output, materialized after the task command has
/// run. The id file is expected to contain a single content-addressed image
/// id (see `forge_digest::hash_docker_image_id`).
#[derive(Debug, Clone)]
pub struct DockerImageOutput {
    pub idfile_relative_path: String,
    pub idfile_absolute_path: AbsoluteSystemPathBuf,
    pub destination: Destination,
}

/// The polymorphic, capability-complete resolved output: implemented as a
/// tagged variant, not an open-world trait object, since no extension
/// beyond these two kinds is needed within the core.
#[derive(Debug, Clone)]
pub enum Output {
    File(FileOutput),
    DockerImage(DockerImageOutput),
}

impl Output {
    pub fn identity(&self) -> &str {
        match self {
            Output::File(f) => &f.relative_path,
            Output::DockerImage(d) => &d.idfile_relative_path,
        }
    }

    pub fn absolute_local_path(&self) -> &AbsoluteSystemPath {
        match self {
            Output::File(f) => &f.absolute_path,
            Output::DockerImage(d) => &d.idfile_absolute_path,
        }
    }

    pub fn exists(&self) -> bool {
        self.absolute_local_path().exists()
    }

    pub fn size(&self) -> std::io::Result<u64> {
        let metadata = self
            .absolute_local_path()
            .stat()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok(metadata.len())
    }

    pub fn digest(&self) -> Result<Digest, DigestError> {
        match self {
            Output::File(f) => forge_digest::hash_file_contents(f.absolute_path.as_path()),
            Output::DockerImage(d) => {
                let contents = std::fs::read_to_string(d.idfile_absolute_path.as_path())
                    .map_err(|source| DigestError::Io { path: d.idfile_absolute_path.to_string(), source })?;
                forge_digest::hash_docker_image_id(&contents)
            }
        }
    }

    pub fn upload_destination(&self) -> &Destination {
        match self {
            Output::File(f) => &f.destination,
            Output::DockerImage(d) => &d.destination,
        }
    }

    pub fn kind(&self) -> OutputKind {
        match self {
            Output::File(_) => OutputKind::File,
            Output::DockerImage(_) => OutputKind::DockerImage,
        }
    }

    /// The local path whose bytes an `UploadJob` must transport: the file
    /// itself for `FileOutput`, the id file for `DockerImageOutput` (the
    /// docker backend reads the image id back out of it).
    pub fn upload_source_path(&self) -> &AbsoluteSystemPath {
        self.absolute_local_path()
    }
}

/// One queued upload, addressed back to its owning task run by index so it
/// can cross an owned (`'static`) channel without borrowing.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub task_run_index: usize,
    pub output_index: usize,
    pub task_id: TaskId,
    pub output_identity: String,
    pub output_kind: OutputKind,
    pub source_path: AbsoluteSystemPathBuf,
    pub destination: Destination,
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub job: UploadJob,
    pub url: Option<String>,
    pub error: Option<String>,
    pub start_ts: SystemTime,
    pub end_ts: SystemTime,
}

impl UploadResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A task selected for execution: owns the inputs and total input digest
/// the Status Manager already computed, so they are never recomputed.
/// Transient — created by the filter stage, destroyed after record.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub task: Task,
    pub start_ts: Option<SystemTime>,
    pub stop_ts: Option<SystemTime>,
    pub total_input_digest: Digest,
    pub inputs: Vec<InputFile>,
    pub outputs: Vec<Output>,
    pub finished_uploads: Vec<UploadResult>,
}

impl TaskRun {
    pub fn new(task: Task, inputs: Vec<InputFile>, total_input_digest: Digest) -> Self {
        Self {
            task,
            start_ts: None,
            stop_ts: None,
            total_input_digest,
            inputs,
            outputs: Vec::new(),
            finished_uploads: Vec::new(),
        }
    }
}
