//! The status manager: combines the input resolver, digest engine, and
//! run store to assign a `Status` to a task.

use forge_digest::Digest;
use forge_errors::ForgeError;
use forge_scm::Scm;
use forge_store::RunStore;
use forgepath::AbsoluteSystemPath;

use crate::{inputs, model::{InputFile, Task}};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Pending,
    Exists { run_id_task_name: String },
    Undefined { cause: String },
}

/// The inputs, the total digest used to look them up, and the assigned
/// status. These are the exact values used for the store lookup, so
/// callers never need to re-resolve.
pub struct TaskStatus {
    pub status: Status,
    pub inputs: Vec<InputFile>,
    pub total_input_digest: Digest,
}

pub fn status(
    repository_root: &AbsoluteSystemPath,
    task: &Task,
    scm: Option<&Scm>,
    store: &dyn RunStore,
) -> Result<TaskStatus, ForgeError> {
    let mut resolved = inputs::resolve(repository_root, task, scm)?;

    let mut per_file = Vec::with_capacity(resolved.len());
    for input in resolved.iter_mut() {
        let digest = input
            .digest()
            .map_err(|e| ForgeError::Digest { path: input.repository_local_path.as_str().to_string(), cause: e.to_string() })?;
        per_file.push(digest.clone());
    }
    let total_input_digest = forge_digest::combine_total(&per_file);

    let status = match store.latest_run_by_digest(&task.id.app, &total_input_digest.to_hex()) {
        Ok(Some(run)) => Status::Exists { run_id_task_name: run.task_name },
        Ok(None) => Status::Pending,
        Err(e) => Status::Undefined { cause: e.to_string() },
    };

    Ok(TaskStatus { status, inputs: resolved, total_input_digest })
}

#[cfg(test)]
mod tests {
    use forge_store::SqliteStore;
    use forgepath::AbsoluteSystemPathBuf;

    use super::*;
    use crate::model::{InputSpec, OutputSpec, TaskId};

    fn make_task(dir: &AbsoluteSystemPath) -> Task {
        let mut inputs = InputSpec::default();
        inputs.file_globs = vec!["*.txt".to_string()];
        Task {
            id: TaskId::new("app", "build"),
            command: "true".to_string(),
            directory: dir.to_owned(),
            inputs,
            outputs: OutputSpec::default(),
        }
    }

    #[test]
    fn status_is_pending_when_store_has_no_matching_run() {
        let tmp = tempfile::tempdir().unwrap();
        let root = AbsoluteSystemPathBuf::new(tmp.path().to_str().unwrap()).unwrap().to_realpath().unwrap();
        std::fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        let task = make_task(&root);
        let store = SqliteStore::open_in_memory().unwrap();

        let result = status(&root, &task, None, &store).unwrap();
        assert_eq!(result.status, Status::Pending);
        assert_eq!(result.inputs.len(), 1);
    }

    #[test]
    fn status_is_exists_when_digest_matches_a_stored_run() {
        let tmp = tempfile::tempdir().unwrap();
        let root = AbsoluteSystemPathBuf::new(tmp.path().to_str().unwrap()).unwrap().to_realpath().unwrap();
        std::fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        let task = make_task(&root);
        let store = SqliteStore::open_in_memory().unwrap();

        let first = status(&root, &task, None, &store).unwrap();
        store
            .save(forge_store::Run {
                application_name: "app".to_string(),
                task_name: "build".to_string(),
                start_ts_ms: 0,
                stop_ts_ms: 1,
                total_input_digest_hex: first.total_input_digest.to_hex(),
                inputs: vec![],
                outputs: vec![],
                vcs_state: forge_store::VcsState { commit_id: "deadbeef".into(), is_dirty: false },
            })
            .unwrap();

        let second = status(&root, &task, None, &store).unwrap();
        assert!(matches!(second.status, Status::Exists { .. }));
    }
}
