//! Raw TOML schemas and the two config loaders built on top
//! of them: the repository config loader and the app/include config
//! parsing the task loader and include database drive.

use forge_errors::ForgeError;
use forge_upload::Destination;
use forgepath::{AbsoluteSystemPath, AbsoluteSystemPathBuf};
use serde::Deserialize;

use crate::model::{DockerImageOutputSpec, FileOutputSpec, GolangSourceRoot, InputSpec, OutputSpec};

pub(crate) fn config_err(path: impl Into<String>, cause: impl std::fmt::Display) -> ForgeError {
    ForgeError::Config { path: path.into(), cause: cause.to_string() }
}

// ---------------------------------------------------------------------
// Repository config (`forge.toml`)
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRepositoryConfig {
    #[serde(default)]
    discover: RawDiscover,
    #[serde(default)]
    include_dirs: Vec<String>,
    #[serde(default)]
    database: RawDatabase,
}

#[derive(Debug, Default, Deserialize)]
struct RawDiscover {
    #[serde(default)]
    dirs: Vec<String>,
    #[serde(default = "default_search_depth")]
    search_depth: u32,
}

fn default_search_depth() -> u32 {
    5
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    postgresql_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub discover_dirs: Vec<String>,
    pub search_depth: u32,
    pub include_dirs: Vec<String>,
    pub postgresql_url: Option<String>,
}

/// The fixed filename every app config lives under.
pub const APP_CONFIG_FILENAME: &str = ".app.toml";

pub fn load_repository_config(path: &AbsoluteSystemPath) -> Result<RepositoryConfig, ForgeError> {
    let text = std::fs::read_to_string(path.as_path())
        .map_err(|e| config_err(path.to_string(), format!("failed to read repository config: {e}")))?;
    let raw: RawRepositoryConfig =
        toml::from_str(&text).map_err(|e| config_err(path.to_string(), e))?;
    Ok(RepositoryConfig {
        discover_dirs: raw.discover.dirs,
        search_depth: raw.discover.search_depth,
        include_dirs: raw.include_dirs,
        postgresql_url: raw.database.postgresql_url,
    })
}

/// Walks each `discover.dirs` entry up to `search_depth` levels looking for
/// `.app.toml`. A configured directory that does not exist, or a symlink
/// encountered along the way, is a `ConfigError`.
pub fn discover_app_dirs(
    repo_root: &AbsoluteSystemPath,
    config: &RepositoryConfig,
) -> Result<Vec<AbsoluteSystemPathBuf>, ForgeError> {
    let mut found = Vec::new();
    for dir in &config.discover_dirs {
        let start = repo_root.join_component(dir);
        if !start.exists() {
            return Err(config_err(format!("discover.dirs[{dir}]"), "directory does not exist"));
        }
        walk_for_app_configs(&start, config.search_depth, &mut found)?;
    }
    found.sort();
    found.dedup();
    Ok(found)
}

fn walk_for_app_configs(
    dir: &AbsoluteSystemPath,
    depth_remaining: u32,
    out: &mut Vec<AbsoluteSystemPathBuf>,
) -> Result<(), ForgeError> {
    let metadata = dir
        .symlink_metadata()
        .map_err(|e| config_err(dir.to_string(), e))?;
    if metadata.file_type().is_symlink() {
        return Err(config_err(dir.to_string(), "symlinked directories are not allowed during discovery"));
    }

    if dir.join_component(APP_CONFIG_FILENAME).exists() {
        out.push(dir.to_owned());
    }

    if depth_remaining == 0 {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir.as_path()).map_err(|e| config_err(dir.to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| config_err(dir.to_string(), e))?;
        let file_type = entry.file_type().map_err(|e| config_err(dir.to_string(), e))?;
        if file_type.is_dir() {
            let child = AbsoluteSystemPathBuf::new(entry.path()).map_err(|e| config_err(dir.to_string(), e))?;
            walk_for_app_configs(&child, depth_remaining - 1, out)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Shared Input/Output schema (used by both app configs and include files)
// ---------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFiles {
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGolangSources {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawInput {
    #[serde(rename = "Files", default)]
    pub files: Option<RawFiles>,
    #[serde(rename = "GitFiles", default)]
    pub git_files: Option<RawFiles>,
    #[serde(rename = "GolangSources", default)]
    pub golang_sources: Option<RawGolangSources>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawS3Upload {
    pub bucket: String,
    pub dest_file: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFileCopy {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFileOutput {
    pub path: String,
    #[serde(rename = "S3Upload", default)]
    pub s3_upload: Option<RawS3Upload>,
    #[serde(rename = "FileCopy", default)]
    pub file_copy: Option<RawFileCopy>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRegistryUpload {
    pub repository: String,
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDockerImageOutput {
    pub idfile: String,
    #[serde(rename = "RegistryUpload")]
    pub registry_upload: RawRegistryUpload,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawOutput {
    #[serde(rename = "File", default)]
    pub file: Vec<RawFileOutput>,
    #[serde(rename = "DockerImage", default)]
    pub docker_image: Vec<RawDockerImageOutput>,
}

// ---------------------------------------------------------------------
// App config (`.app.toml`, consumed by the task loader)
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawAppTask {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(rename = "Input", default)]
    pub input: RawInput,
    #[serde(rename = "Output", default)]
    pub output: RawOutput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAppConfig {
    pub name: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(rename = "Task", default)]
    pub task: Vec<RawAppTask>,
}

pub(crate) fn parse_app_config(path: &AbsoluteSystemPath, text: &str) -> Result<RawAppConfig, ForgeError> {
    toml::from_str(text).map_err(|e| config_err(path.to_string(), e))
}

// ---------------------------------------------------------------------
// Include fragment files (any `*.toml` under `include_dirs`)
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawInputInclude {
    pub id: String,
    #[serde(flatten)]
    pub input: RawInput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawOutputInclude {
    pub id: String,
    #[serde(flatten)]
    pub output: RawOutput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTaskInclude {
    pub id: String,
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(rename = "Input", default)]
    pub input: RawInput,
    #[serde(rename = "Output", default)]
    pub output: RawOutput,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawIncludeFile {
    #[serde(rename = "Inputs", default)]
    pub inputs: Vec<RawInputInclude>,
    #[serde(rename = "Outputs", default)]
    pub outputs: Vec<RawOutputInclude>,
    #[serde(rename = "Tasks", default)]
    pub tasks: Vec<RawTaskInclude>,
}

pub(crate) fn parse_include_file(path: &AbsoluteSystemPath, text: &str) -> Result<RawIncludeFile, ForgeError> {
    toml::from_str(text).map_err(|e| config_err(path.to_string(), e))
}

// ---------------------------------------------------------------------
// Raw -> model conversion, with glob validation (`**` at most once) and
// the exactly-one-of check on `FileOutput`'s upload destination.
// ---------------------------------------------------------------------

pub(crate) fn validate_glob(config_path: &str, glob: &str) -> Result<(), ForgeError> {
    if glob.matches("**").count() > 1 {
        return Err(config_err(config_path, format!("glob {glob:?} uses `**` more than once")));
    }
    Ok(())
}

pub(crate) fn convert_input(config_path: &str, raw: RawInput) -> Result<InputSpec, ForgeError> {
    let mut spec = InputSpec::default();
    if let Some(files) = raw.files {
        for (i, glob) in files.paths.iter().enumerate() {
            validate_glob(&format!("{config_path}.Files.paths[{i}]"), glob)?;
        }
        spec.file_globs = files.paths;
    }
    if let Some(git_files) = raw.git_files {
        for (i, glob) in git_files.paths.iter().enumerate() {
            validate_glob(&format!("{config_path}.GitFiles.paths[{i}]"), glob)?;
        }
        spec.git_file_globs = git_files.paths;
    }
    if let Some(golang) = raw.golang_sources {
        let environment = golang
            .environment
            .iter()
            .map(|entry| {
                entry.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())).ok_or_else(|| {
                    config_err(
                        format!("{config_path}.GolangSources.environment"),
                        format!("{entry:?} is not KEY=VALUE"),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for path in golang.paths {
            spec.golang_sources.push(GolangSourceRoot { path, environment: environment.clone() });
        }
    }
    Ok(spec)
}

pub(crate) fn convert_output(config_path: &str, raw: RawOutput) -> Result<OutputSpec, ForgeError> {
    let mut spec = OutputSpec::default();
    for (i, file) in raw.file.into_iter().enumerate() {
        let item_path = format!("{config_path}.File[{i}]");
        let destination = match (file.s3_upload, file.file_copy) {
            (Some(s3), None) => Destination::S3 { bucket: s3.bucket, key: s3.dest_file },
            (None, Some(copy)) => Destination::File { path: copy.path.into() },
            (None, None) => {
                return Err(config_err(item_path, "output must declare exactly one of S3Upload or FileCopy"))
            }
            (Some(_), Some(_)) => {
                return Err(config_err(item_path, "output must declare exactly one of S3Upload or FileCopy"))
            }
        };
        if file.path.is_empty() {
            return Err(config_err(format!("{item_path}.path"), "must not be empty"));
        }
        spec.files.push(FileOutputSpec { path: file.path, destination });
    }
    for (i, image) in raw.docker_image.into_iter().enumerate() {
        let item_path = format!("{config_path}.DockerImage[{i}]");
        if image.idfile.is_empty() {
            return Err(config_err(format!("{item_path}.idfile"), "must not be empty"));
        }
        let destination = Destination::Docker {
            repository: image.registry_upload.repository,
            tag: image.registry_upload.tag,
        };
        spec.docker_images.push(DockerImageOutputSpec { idfile: image.idfile, destination });
    }
    Ok(spec)
}
