//! The task loader: merges an app config with include fragments, applies
//! the variable resolvers, and produces validated `Task`s. Also implements
//! the task specifier mini-language used by the runner's entry point.

use forge_errors::ForgeError;
use forgepath::{AbsoluteSystemPath, AbsoluteSystemPathBuf};

use crate::{
    config::{self, config_err, RawAppConfig, APP_CONFIG_FILENAME},
    includes::IncludeDb,
    model::{Application, InputSpec, OutputSpec, Task, TaskId},
    vars::VariableResolver,
};

/// Loads and validates the application rooted at `app_dir`.
pub fn load_app(
    repo_root: &AbsoluteSystemPath,
    app_dir: &AbsoluteSystemPath,
    includes: &IncludeDb,
    git_commit: &str,
) -> Result<Application, ForgeError> {
    let config_path = app_dir.join_component(APP_CONFIG_FILENAME);
    let text = std::fs::read_to_string(config_path.as_path())
        .map_err(|e| config_err(config_path.to_string(), e))?;
    let raw: RawAppConfig = config::parse_app_config(&config_path, &text)?;

    validate_app_name(&raw.name)?;

    let root_resolver = VariableResolver::root_only(repo_root.to_string());
    let full_resolver = VariableResolver::full(repo_root.to_string(), raw.name.clone(), git_commit.to_string());

    let mut tasks = Vec::new();

    // Step 3a: for every id in `app.includes`, append the referenced
    // `TaskInclude` as a full task of this app.
    for include_id in &raw.includes {
        let include_id = root_resolver.resolve(include_id);
        let fragment = includes
            .task(&include_id)
            .ok_or_else(|| config_err("includes", format!("unknown task include id {include_id:?}")))?;
        tasks.push(RawMergedTask {
            name: fragment.name.clone(),
            command: fragment.command.clone(),
            inputs: fragment.inputs.clone(),
            outputs: fragment.outputs.clone(),
        });
    }

    // Step 3b: app-declared tasks, each merged with its own `includes`
    // (input/output fragments only).
    for raw_task in raw.task {
        let mut inputs = config::convert_input(&format!("Task.{}.Input", raw_task.name), raw_task.input)?;
        let mut outputs = config::convert_output(&format!("Task.{}.Output", raw_task.name), raw_task.output)?;

        for include_id in &raw_task.includes {
            let include_id = root_resolver.resolve(include_id);
            if let Some(spec) = includes.input(&include_id) {
                inputs.merge(spec.clone());
            } else if let Some(spec) = includes.output(&include_id) {
                outputs.merge(spec.clone());
            } else {
                return Err(config_err(
                    format!("Task.{}.includes", raw_task.name),
                    format!("unknown include id {include_id:?}"),
                ));
            }
        }

        tasks.push(RawMergedTask { name: raw_task.name, command: raw_task.command, inputs, outputs });
    }

    // Step 4: apply the full variable resolver to every string field, and
    // build the final, immutable `Task`s.
    let mut resolved_tasks = Vec::with_capacity(tasks.len());
    for merged in tasks {
        resolved_tasks.push(resolve_task(&raw.name, merged, &full_resolver, app_dir)?);
    }

    validate_app(&raw.name, &resolved_tasks)?;

    Ok(Application { name: raw.name, directory: app_dir.to_owned(), tasks: resolved_tasks })
}

/// A task after include merging, before variable resolution.
struct RawMergedTask {
    name: String,
    command: String,
    inputs: InputSpec,
    outputs: OutputSpec,
}

fn resolve_task(
    app_name: &str,
    merged: RawMergedTask,
    resolver: &VariableResolver,
    app_dir: &AbsoluteSystemPath,
) -> Result<Task, ForgeError> {
    let command = resolver.resolve(&merged.command);

    let mut inputs = merged.inputs;
    for glob in inputs.file_globs.iter_mut().chain(inputs.git_file_globs.iter_mut()) {
        *glob = resolver.resolve(glob);
    }
    for root in inputs.golang_sources.iter_mut() {
        root.path = resolver.resolve(&root.path);
        for (_, value) in root.environment.iter_mut() {
            *value = resolver.resolve(value);
        }
    }

    let mut outputs = merged.outputs;
    for file in outputs.files.iter_mut() {
        file.path = resolver.resolve(&file.path);
        resolve_destination(&mut file.destination, resolver);
    }
    for image in outputs.docker_images.iter_mut() {
        image.idfile = resolver.resolve(&image.idfile);
        resolve_destination(&mut image.destination, resolver);
    }

    Ok(Task {
        id: TaskId::new(app_name, &merged.name),
        command,
        directory: app_dir.to_owned(),
        inputs,
        outputs,
    })
}

fn resolve_destination(destination: &mut forge_upload::Destination, resolver: &VariableResolver) {
    use forge_upload::Destination;
    match destination {
        Destination::File { path } => {
            let resolved = resolver.resolve(&path.to_string_lossy());
            *path = resolved.into();
        }
        Destination::S3 { bucket, key } => {
            *bucket = resolver.resolve(bucket);
            *key = resolver.resolve(key);
        }
        Destination::Docker { repository, tag } => {
            *repository = resolver.resolve(repository);
            *tag = resolver.resolve(tag);
        }
    }
}

fn validate_app_name(name: &str) -> Result<(), ForgeError> {
    if name.is_empty() {
        return Err(config_err("name", "app name must not be empty"));
    }
    if name.contains('.') {
        return Err(config_err("name", format!("app name {name:?} must not contain '.'")));
    }
    Ok(())
}

fn validate_app(app_name: &str, tasks: &[Task]) -> Result<(), ForgeError> {
    if tasks.is_empty() {
        return Err(config_err(app_name, "an application must declare at least one task"));
    }

    let mut seen = std::collections::HashSet::new();
    for task in tasks {
        let name = &task.id.task;
        if name.is_empty() {
            return Err(config_err(app_name, "task name must not be empty"));
        }
        if name.contains('.') {
            return Err(config_err(app_name, format!("task name {name:?} must not contain '.'")));
        }
        if !seen.insert(name.clone()) {
            return Err(config_err(app_name, format!("duplicate task name {name:?}")));
        }
        if task.command.trim().is_empty() {
            return Err(config_err(format!("{app_name}.{name}"), "task command must not be empty"));
        }
        if task.inputs.is_empty() {
            return Err(config_err(format!("{app_name}.{name}"), "task must declare at least one input"));
        }
        for file in &task.outputs.files {
            if file.path.is_empty() {
                return Err(config_err(format!("{app_name}.{name}.Output"), "File.path must not be empty"));
            }
        }
        for image in &task.outputs.docker_images {
            if image.idfile.is_empty() {
                return Err(config_err(format!("{app_name}.{name}.Output"), "DockerImage.idfile must not be empty"));
            }
        }
    }
    Ok(())
}

/// One half of a resolved task specifier: a literal name or a wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Half {
    Literal(String),
    Wildcard,
}

/// A parsed task specifier: either a filesystem path to an app directory,
/// or an `app[.task]` pattern where either half may be `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    Path(AbsoluteSystemPathBuf),
    Pattern { app: Half, task: Half },
}

#[derive(Debug, thiserror::Error)]
pub enum SpecifierError {
    #[error("empty task specifier")]
    Empty,
    #[error("invalid task specifier {0:?}: more than one '.'")]
    InvalidSyntax(String),
    #[error("empty half in task specifier {0:?}")]
    EmptyHalf(String),
}

/// Parses a task specifier string. Resolving it against a loaded set of
/// applications (unknown app / unknown task) is the caller's job, since that
/// requires the already-loaded `Application` list.
pub fn parse_specifier(repo_root: &AbsoluteSystemPath, raw: &str) -> Result<Specifier, SpecifierError> {
    if raw.is_empty() {
        return Err(SpecifierError::Empty);
    }

    let segments: Vec<&str> = raw.split('/').collect();
    if !segments.iter().any(|s| s.is_empty()) {
        let as_path = repo_root.join_components(&segments);
        if as_path.join_component(APP_CONFIG_FILENAME).exists() {
            return Ok(Specifier::Path(as_path));
        }
    }

    if !raw.contains('.') {
        return Ok(Specifier::Pattern { app: parse_half(raw)?, task: Half::Wildcard });
    }

    let mut parts = raw.splitn(3, '.');
    let app = parts.next().expect("non-empty");
    let task = parts.next().expect("contains '.'");
    if parts.next().is_some() {
        return Err(SpecifierError::InvalidSyntax(raw.to_string()));
    }

    Ok(Specifier::Pattern { app: parse_half(app)?, task: parse_half(task)? })
}

fn parse_half(raw: &str) -> Result<Half, SpecifierError> {
    if raw.is_empty() {
        return Err(SpecifierError::EmptyHalf(raw.to_string()));
    }
    if raw == "*" {
        return Ok(Half::Wildcard);
    }
    Ok(Half::Literal(raw.to_string()))
}

/// Selects the tasks matching a parsed, already-app-resolved specifier out
/// of a fully loaded set of applications. `Specifier::Path` must already
/// have been turned into the owning `Application`'s name by the caller.
pub fn select_tasks<'a>(
    applications: &'a [Application],
    app: &Half,
    task: &Half,
) -> Result<Vec<&'a Task>, ForgeError> {
    let app_matches = |name: &str| matches!(app, Half::Wildcard) || matches!(app, Half::Literal(a) if a == name);
    let task_matches = |name: &str| matches!(task, Half::Wildcard) || matches!(task, Half::Literal(t) if t == name);

    if let Half::Literal(name) = app {
        if !applications.iter().any(|a| &a.name == name) {
            return Err(config_err("task specifier", format!("unknown app {name:?}")));
        }
    }

    let mut selected = Vec::new();
    for application in applications {
        if !app_matches(&application.name) {
            continue;
        }
        if let Half::Literal(name) = task {
            if !application.tasks.iter().any(|t| &t.id.task == name) {
                return Err(config_err(
                    "task specifier",
                    format!("unknown task {name:?} in app {:?}", application.name),
                ));
            }
        }
        for t in &application.tasks {
            if task_matches(&t.id.task) {
                selected.push(t);
            }
        }
    }
    Ok(selected)
}
