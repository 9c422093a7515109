//! VCS interrogation: the set of files git considers tracked and not
//! ignored, intersected against glob matches for the `GitFiles` input
//! sub-specification, and the repository's current commit/dirty state for
//! the stored run record.

#[cfg(test)]
mod test_utils;

use std::collections::HashSet;

use forgepath::{AbsoluteSystemPath, AbsoluteSystemPathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScmError {
    #[error("failed to open git repository at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: git2::Error,
    },
    #[error("git query failed: {0}")]
    Query(#[from] git2::Error),
    #[error("path {0} is not valid UTF-8")]
    InvalidUnicode(String),
}

/// The repository's current commit id and whether the working tree has
/// uncommitted changes, as recorded in a `Build` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsState {
    pub commit_id: String,
    pub is_dirty: bool,
}

/// A thin handle on a git repository rooted at `root`, used to answer
/// tracked-file and dirty-state queries.
pub struct Scm {
    repo: git2::Repository,
    root: AbsoluteSystemPathBuf,
}

impl Scm {
    pub fn open(root: &AbsoluteSystemPath) -> Result<Self, ScmError> {
        let repo = git2::Repository::open(root.as_path()).map_err(|source| ScmError::Open {
            path: root.to_string(),
            source,
        })?;
        Ok(Self {
            repo,
            root: root.to_owned(),
        })
    }

    /// All paths git considers tracked and not ignored, as repository-root
    /// relative forward-slash paths. Used to intersect against glob matches
    /// for the `GitFiles` input sub-specification.
    pub fn tracked_files(&self) -> Result<HashSet<String>, ScmError> {
        let index = self.repo.index()?;
        let mut files = HashSet::with_capacity(index.len());
        for entry in index.iter() {
            let path = std::str::from_utf8(&entry.path)
                .map_err(|_| ScmError::InvalidUnicode(String::from_utf8_lossy(&entry.path).into_owned()))?;
            // git's index already excludes ignored paths (they're never added);
            // a path can still be present in the index and covered by .gitignore
            // only if force-added, which we treat as tracked.
            files.insert(path.replace('\\', "/"));
        }
        Ok(files)
    }

    /// Intersects `candidates` (repository-root relative, forward-slash
    /// paths) against the tracked set, preserving `candidates`' order.
    pub fn filter_tracked(&self, candidates: Vec<String>) -> Result<Vec<String>, ScmError> {
        let tracked = self.tracked_files()?;
        Ok(candidates
            .into_iter()
            .filter(|p| tracked.contains(p))
            .collect())
    }

    pub fn state(&self) -> Result<VcsState, ScmError> {
        let commit_id = match self.repo.head() {
            Ok(head) => head
                .peel_to_commit()
                .map(|c| c.id().to_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let is_dirty = !statuses.is_empty();

        Ok(VcsState { commit_id, is_dirty })
    }

    pub fn root(&self) -> &AbsoluteSystemPath {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_utils::{commit_all, init_repo, tmp_dir};

    #[test]
    fn tracked_files_reflects_committed_state() {
        let (_tmp, root) = tmp_dir();
        init_repo(&root);
        fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        fs::write(root.join_component("b.txt").as_path(), "b").unwrap();
        commit_all(&root);

        let scm = Scm::open(&root).unwrap();
        let tracked = scm.tracked_files().unwrap();
        assert!(tracked.contains("a.txt"));
        assert!(tracked.contains("b.txt"));
    }

    #[test]
    fn state_reports_dirty_after_uncommitted_change() {
        let (_tmp, root) = tmp_dir();
        init_repo(&root);
        fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        commit_all(&root);

        let scm = Scm::open(&root).unwrap();
        let clean = scm.state().unwrap();
        assert!(!clean.is_dirty);
        assert!(!clean.commit_id.is_empty());

        fs::write(root.join_component("a.txt").as_path(), "changed").unwrap();
        let dirty = scm.state().unwrap();
        assert!(dirty.is_dirty);
        assert_eq!(dirty.commit_id, clean.commit_id);
    }

    #[test]
    fn filter_tracked_preserves_order_and_drops_untracked() {
        let (_tmp, root) = tmp_dir();
        init_repo(&root);
        fs::write(root.join_component("a.txt").as_path(), "a").unwrap();
        commit_all(&root);
        fs::write(root.join_component("b.txt").as_path(), "b").unwrap();

        let scm = Scm::open(&root).unwrap();
        let filtered = scm
            .filter_tracked(vec!["b.txt".to_string(), "a.txt".to_string()])
            .unwrap();
        assert_eq!(filtered, vec!["a.txt".to_string()]);
    }
}
