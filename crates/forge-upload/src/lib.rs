//! The upload backend contract and its three concrete backends:
//! `file://` (fully supported, exercised end-to-end by the test suite),
//! `s3://` (single PUT, via `aws-sdk-s3`), and `docker://` (tag + push, via
//! `bollard`). All three share one trait so the Upload Scheduler can
//! dispatch on URI scheme without knowing which backend it holds.

mod destination;

use std::path::Path;

use async_trait::async_trait;
pub use destination::{Destination, DestinationError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("upload was cancelled")]
    Cancelled,
    #[error("S3 upload failed: {0}")]
    S3(String),
    #[error("docker registry upload failed: {0}")]
    Docker(String),
    #[error("backend returned an empty url without reporting an error")]
    EmptyUrl,
}

/// Performs the transfer for one URI scheme. Implementations should respect
/// `ctx` cancellation where practical; on cancellation they return an error
/// without guaranteeing any particular on-disk/remote state.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    fn uri_scheme(&self) -> &'static str;

    async fn upload(
        &self,
        ctx: &CancellationToken,
        source: &Path,
        destination: &Destination,
    ) -> Result<String, BackendError>;
}

/// Copies `source` onto the local (or network-mounted) filesystem at the
/// destination path. The only backend this repository needs to work for its
/// own end-to-end tests.
pub struct FileCopyBackend;

#[async_trait]
impl UploadBackend for FileCopyBackend {
    fn uri_scheme(&self) -> &'static str {
        "file"
    }

    async fn upload(
        &self,
        ctx: &CancellationToken,
        source: &Path,
        destination: &Destination,
    ) -> Result<String, BackendError> {
        let Destination::File { path } = destination else {
            return Err(BackendError::Docker("wrong destination kind for file backend".into()));
        };
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, path).await?;
        Ok(format!("file://{}", path.display()))
    }
}

/// Single-PUT upload to S3. No multipart, no retry: the contract this
/// backend satisfies is the `UploadBackend` trait, not a production-grade
/// object storage client.
pub struct S3Backend {
    client: aws_sdk_s3::Client,
}

impl S3Backend {
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
        }
    }
}

#[async_trait]
impl UploadBackend for S3Backend {
    fn uri_scheme(&self) -> &'static str {
        "s3"
    }

    async fn upload(
        &self,
        ctx: &CancellationToken,
        source: &Path,
        destination: &Destination,
    ) -> Result<String, BackendError> {
        let Destination::S3 { bucket, key } = destination else {
            return Err(BackendError::S3("wrong destination kind for s3 backend".into()));
        };
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        let body = aws_sdk_s3::primitives::ByteStream::from_path(source)
            .await
            .map_err(|e| BackendError::S3(e.to_string()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| BackendError::S3(e.to_string()))?;
        Ok(format!("s3://{bucket}/{key}"))
    }
}

/// Tags the locally-built image identified by the id file at `source` and
/// pushes it to `repository:tag`. Credentials come from
/// `FORGE_REGISTRY_USERNAME`/`FORGE_REGISTRY_PASSWORD`.
pub struct DockerRegistryBackend {
    docker: bollard::Docker,
}

impl DockerRegistryBackend {
    pub fn connect() -> Result<Self, BackendError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| BackendError::Docker(e.to_string()))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl UploadBackend for DockerRegistryBackend {
    fn uri_scheme(&self) -> &'static str {
        "docker"
    }

    async fn upload(
        &self,
        ctx: &CancellationToken,
        source: &Path,
        destination: &Destination,
    ) -> Result<String, BackendError> {
        let Destination::Docker { repository, tag } = destination else {
            return Err(BackendError::Docker("wrong destination kind for docker backend".into()));
        };
        if ctx.is_cancelled() {
            return Err(BackendError::Cancelled);
        }

        let image_id = tokio::fs::read_to_string(source)
            .await
            .map_err(BackendError::Io)?;
        let image_id = image_id.trim();

        self.docker
            .tag_image(
                image_id,
                Some(bollard::image::TagImageOptions {
                    repo: repository.as_str(),
                    tag: tag.as_str(),
                }),
            )
            .await
            .map_err(|e| BackendError::Docker(e.to_string()))?;

        let credentials = registry_credentials();
        let mut stream = self.docker.push_image(
            repository,
            Some(bollard::image::PushImageOptions { tag: tag.as_str() }),
            credentials,
        );

        use futures::StreamExt;
        while let Some(chunk) = stream.next().await {
            if ctx.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
            let info = chunk.map_err(|e| BackendError::Docker(e.to_string()))?;
            if let Some(error) = info.error {
                return Err(BackendError::Docker(error));
            }
        }

        Ok(format!("docker://{repository}:{tag}"))
    }
}

fn registry_credentials() -> Option<bollard::auth::DockerCredentials> {
    let username = std::env::var("FORGE_REGISTRY_USERNAME").ok()?;
    let password = std::env::var("FORGE_REGISTRY_PASSWORD").ok();
    Some(bollard::auth::DockerCredentials {
        username: Some(username),
        password,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_backend_copies_and_reports_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("out.txt");
        tokio::fs::write(&source, b"hi").await.unwrap();
        let dest_path = dir.path().join("nested").join("out.txt");

        let backend = FileCopyBackend;
        let ctx = CancellationToken::new();
        let destination = Destination::File { path: dest_path.clone() };
        let url = backend.upload(&ctx, &source, &destination).await.unwrap();

        assert!(url.starts_with("file://"));
        assert_eq!(tokio::fs::read(&dest_path).await.unwrap(), b"hi");
    }

    #[tokio::test]
    async fn file_backend_respects_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("out.txt");
        tokio::fs::write(&source, b"hi").await.unwrap();

        let backend = FileCopyBackend;
        let ctx = CancellationToken::new();
        ctx.cancel();
        let destination = Destination::File {
            path: dir.path().join("out.txt"),
        };
        let result = backend.upload(&ctx, &source, &destination).await;
        assert!(matches!(result, Err(BackendError::Cancelled)));
    }
}
