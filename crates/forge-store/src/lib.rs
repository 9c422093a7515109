//! The run store contract (persist and look up completed runs by
//! `(app_name, total_input_digest)`) and its one concrete, fully-supported
//! implementation: an embedded SQLite table.
//!
//! `NotExist` is modeled as `Ok(None)`, not an error — only a transport or
//! persistence failure is a [`StoreError`].

use std::path::Path;

use forge_digest::Digest;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store query failed: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("stored row was corrupt: {0}")]
    Corrupt(String),
}

/// The VCS state attached to a stored run: the commit at the time of
/// execution and whether the working tree had uncommitted changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcsState {
    pub commit_id: String,
    pub is_dirty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredInput {
    pub repository_local_path: String,
    pub digest_hex: String,
}

/// How an output was transported; derived from its destination URI scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadMethod {
    FileCopy,
    S3,
    DockerRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputKind {
    File,
    DockerImage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredOutput {
    pub identity: String,
    pub kind: OutputKind,
    pub size: u64,
    pub digest_hex: String,
    pub upload_uri: String,
    pub upload_method: UploadMethod,
    pub upload_duration_ms: u64,
}

/// A persisted record of one task execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub application_name: String,
    pub task_name: String,
    pub start_ts_ms: i64,
    pub stop_ts_ms: i64,
    pub total_input_digest_hex: String,
    pub inputs: Vec<StoredInput>,
    pub outputs: Vec<StoredOutput>,
    pub vcs_state: VcsState,
}

impl Run {
    pub fn total_input_digest(&self) -> Result<Digest, StoreError> {
        Digest::from_hex(&self.total_input_digest_hex)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

/// The run store contract. Implementations must be transactional per
/// `save`; callers do not rely on de-duplication across `save` calls.
pub trait RunStore: Send + Sync {
    /// Returns the most recent run matching `(app_name, total_input_digest_hex)`,
    /// or `Ok(None)` if no such run exists.
    fn latest_run_by_digest(
        &self,
        app_name: &str,
        total_input_digest_hex: &str,
    ) -> Result<Option<Run>, StoreError>;

    /// Persists `run`, returning its assigned row id.
    fn save(&self, run: Run) -> Result<i64, StoreError>;
}

/// An embedded, file-backed store. This is the default and the only store
/// exercised by the test suite; a `database.postgresql_url` in the
/// repository config is accepted for forward compatibility but does not
/// select a different backend (see `DESIGN.md`).
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                application_name        TEXT NOT NULL,
                task_name               TEXT NOT NULL,
                start_ts_ms             INTEGER NOT NULL,
                stop_ts_ms              INTEGER NOT NULL,
                total_input_digest_hex  TEXT NOT NULL,
                vcs_commit_id           TEXT NOT NULL,
                vcs_dirty               INTEGER NOT NULL,
                inputs_json             TEXT NOT NULL,
                outputs_json            TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS runs_by_digest
                ON runs (application_name, total_input_digest_hex, id DESC);",
        )?;
        Ok(Self { conn })
    }
}

impl RunStore for SqliteStore {
    fn latest_run_by_digest(
        &self,
        app_name: &str,
        total_input_digest_hex: &str,
    ) -> Result<Option<Run>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT task_name, start_ts_ms, stop_ts_ms, vcs_commit_id, vcs_dirty,
                    inputs_json, outputs_json
             FROM runs
             WHERE application_name = ?1 AND total_input_digest_hex = ?2
             ORDER BY id DESC
             LIMIT 1",
        )?;

        let row = stmt
            .query_row(params![app_name, total_input_digest_hex], |row| {
                let task_name: String = row.get(0)?;
                let start_ts_ms: i64 = row.get(1)?;
                let stop_ts_ms: i64 = row.get(2)?;
                let vcs_commit_id: String = row.get(3)?;
                let vcs_dirty: i64 = row.get(4)?;
                let inputs_json: String = row.get(5)?;
                let outputs_json: String = row.get(6)?;
                Ok((
                    task_name,
                    start_ts_ms,
                    stop_ts_ms,
                    vcs_commit_id,
                    vcs_dirty != 0,
                    inputs_json,
                    outputs_json,
                ))
            })
            .optional()?;

        let Some((task_name, start_ts_ms, stop_ts_ms, commit_id, is_dirty, inputs_json, outputs_json)) =
            row
        else {
            return Ok(None);
        };

        let inputs: Vec<StoredInput> =
            serde_json::from_str(&inputs_json).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let outputs: Vec<StoredOutput> =
            serde_json::from_str(&outputs_json).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Some(Run {
            application_name: app_name.to_string(),
            task_name,
            start_ts_ms,
            stop_ts_ms,
            total_input_digest_hex: total_input_digest_hex.to_string(),
            inputs,
            outputs,
            vcs_state: VcsState { commit_id, is_dirty },
        }))
    }

    fn save(&self, run: Run) -> Result<i64, StoreError> {
        let inputs_json =
            serde_json::to_string(&run.inputs).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let outputs_json =
            serde_json::to_string(&run.outputs).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO runs (
                application_name, task_name, start_ts_ms, stop_ts_ms,
                total_input_digest_hex, vcs_commit_id, vcs_dirty,
                inputs_json, outputs_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.application_name,
                run.task_name,
                run.start_ts_ms,
                run.stop_ts_ms,
                run.total_input_digest_hex,
                run.vcs_state.commit_id,
                run.vcs_state.is_dirty as i64,
                inputs_json,
                outputs_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}
