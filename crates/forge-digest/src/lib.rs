//! Stable content digests for task inputs and outputs.
//!
//! A single algorithm (SHA-384) is used throughout; no other algorithm is
//! ever produced or accepted here, so callers can treat [`Digest`] as an
//! opaque, comparable byte string without needing to know which hash
//! function produced it.

use std::{
    fmt,
    io::{self, Read},
};

use sha2::{Digest as _, Sha384};
use thiserror::Error;

/// The algorithm tag every [`Digest`] carries in its hex form.
pub const ALGORITHM: &str = "sha384";

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("digest string {0:?} is missing the `{ALGORITHM}:` prefix")]
    MissingPrefix(String),
    #[error("digest string {0:?} is not valid hex")]
    InvalidHex(String),
    #[error("image id {0:?} is not a well-formed content-addressed identifier")]
    MalformedImageId(String),
}

/// An opaque SHA-384 digest. Equality is byte-equality.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Renders as `sha384:<hex>`, the form persisted in stored run rows.
    pub fn to_hex(&self) -> String {
        format!("{ALGORITHM}:{}", hex::encode(&self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let hex_part = s
            .strip_prefix(&format!("{ALGORITHM}:"))
            .ok_or_else(|| DigestError::MissingPrefix(s.to_string()))?;
        let bytes = hex::decode(hex_part).map_err(|_| DigestError::InvalidHex(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hashes `repo_local_path`'s UTF-8 bytes, then the file's contents, in that
/// order. This is the per-`InputFile` digest: it makes the total input
/// digest sensitive to a file's logical location, not just its bytes.
pub fn hash_input_file(repo_local_path: &str, path: &std::path::Path) -> Result<Digest, DigestError> {
    let mut hasher = Sha384::new();
    hasher.update(repo_local_path.as_bytes());
    copy_file_into(&mut hasher, path)?;
    Ok(Digest(hasher.finalize().to_vec()))
}

/// Hashes a file's contents only, with no path prefix. Used for `FileOutput`
/// digests, where the upload destination already captures identity.
pub fn hash_file_contents(path: &std::path::Path) -> Result<Digest, DigestError> {
    let mut hasher = Sha384::new();
    copy_file_into(&mut hasher, path)?;
    Ok(Digest(hasher.finalize().to_vec()))
}

fn copy_file_into(hasher: &mut Sha384, path: &std::path::Path) -> Result<(), DigestError> {
    let mut file = std::fs::File::open(path).map_err(|source| DigestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|source| DigestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}

/// Combines the per-input digests of a task's resolved input list, in
/// resolver order, into the task's total input digest. Sensitive both to the
/// file set and to the order the resolver produced it in.
pub fn combine_total(per_file_digests: &[Digest]) -> Digest {
    let mut hasher = Sha384::new();
    for digest in per_file_digests {
        hasher.update(digest.as_bytes());
    }
    Digest(hasher.finalize().to_vec())
}

/// Validates that `raw` (read from a docker image id file) looks like a
/// well-formed content-addressed image identifier (`sha256:<64 hex
/// chars>`), then folds it into a [`Digest`] via SHA-384 so it shares a
/// storage representation with every other digest this crate produces.
pub fn hash_docker_image_id(raw: &str) -> Result<Digest, DigestError> {
    let raw = raw.trim();
    let (algo, hex_part) = raw
        .split_once(':')
        .ok_or_else(|| DigestError::MalformedImageId(raw.to_string()))?;
    let well_formed =
        algo == "sha256" && hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit());
    if !well_formed {
        return Err(DigestError::MalformedImageId(raw.to_string()));
    }
    let mut hasher = Sha384::new();
    hasher.update(raw.as_bytes());
    Ok(Digest(hasher.finalize().to_vec()))
}
