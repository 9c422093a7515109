use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DestinationError {
    #[error("upload destination {0:?} has no recognized scheme")]
    UnknownScheme(String),
    #[error("s3 destination {0:?} must be s3://bucket/key")]
    MalformedS3(String),
    #[error("docker destination {0:?} must be docker://repository:tag")]
    MalformedDocker(String),
}

/// An upload destination URI, parsed bit-exact:
/// `s3://bucket/key`, `file:///absolute/or/relative/path`, or
/// `docker://repository:tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    S3 { bucket: String, key: String },
    File { path: PathBuf },
    Docker { repository: String, tag: String },
}

impl Destination {
    pub fn parse(uri: &str) -> Result<Self, DestinationError> {
        if let Some(rest) = uri.strip_prefix("s3://") {
            let (bucket, key) = rest
                .split_once('/')
                .ok_or_else(|| DestinationError::MalformedS3(uri.to_string()))?;
            if bucket.is_empty() || key.is_empty() {
                return Err(DestinationError::MalformedS3(uri.to_string()));
            }
            return Ok(Destination::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(Destination::File { path: PathBuf::from(rest) });
        }
        if let Some(rest) = uri.strip_prefix("docker://") {
            let (repository, tag) = rest
                .rsplit_once(':')
                .ok_or_else(|| DestinationError::MalformedDocker(uri.to_string()))?;
            if repository.is_empty() || tag.is_empty() {
                return Err(DestinationError::MalformedDocker(uri.to_string()));
            }
            return Ok(Destination::Docker {
                repository: repository.to_string(),
                tag: tag.to_string(),
            });
        }
        Err(DestinationError::UnknownScheme(uri.to_string()))
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Destination::S3 { .. } => "s3",
            Destination::File { .. } => "file",
            Destination::Docker { .. } => "docker",
        }
    }

    pub fn to_uri(&self) -> String {
        match self {
            Destination::S3 { bucket, key } => format!("s3://{bucket}/{key}"),
            Destination::File { path } => format!("file://{}", path.display()),
            Destination::Docker { repository, tag } => format!("docker://{repository}:{tag}"),
        }
    }
}
