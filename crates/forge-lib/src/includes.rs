//! The include database: discovers every `*.toml` under the configured
//! include directories, parses each, and indexes fragments by id into three
//! maps (`inputs`, `outputs`, `tasks`).

use std::collections::BTreeMap;

use forge_errors::ForgeError;
use forgepath::AbsoluteSystemPath;

use crate::{
    config::{self, config_err, RawIncludeFile, RawInput, RawOutput},
    model::{InputSpec, OutputSpec},
};

/// A `TaskInclude` fragment, offered to consumers with its own `includes`
/// already merged in, per the Include DB's contract.
#[derive(Debug, Clone)]
pub struct TaskIncludeFragment {
    pub name: String,
    pub command: String,
    pub inputs: InputSpec,
    pub outputs: OutputSpec,
}

#[derive(Debug, Default)]
pub struct IncludeDb {
    inputs: BTreeMap<String, InputSpec>,
    outputs: BTreeMap<String, OutputSpec>,
    tasks: BTreeMap<String, TaskIncludeFragment>,
}

impl IncludeDb {
    pub fn input(&self, id: &str) -> Option<&InputSpec> {
        self.inputs.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&OutputSpec> {
        self.outputs.get(id)
    }

    pub fn task(&self, id: &str) -> Option<&TaskIncludeFragment> {
        self.tasks.get(id)
    }

    /// Discovers and loads every include fragment under `include_dirs`.
    pub fn load(repo_root: &AbsoluteSystemPath, include_dirs: &[String]) -> Result<Self, ForgeError> {
        let mut toml_files = Vec::new();
        for dir in include_dirs {
            let start = repo_root.join_component(dir);
            if !start.exists() {
                return Err(config_err(format!("include_dirs[{dir}]"), "directory does not exist"));
            }
            collect_toml_files(&start, &mut toml_files)?;
        }
        toml_files.sort();

        let mut raw_inputs = Vec::new();
        let mut raw_outputs = Vec::new();
        let mut raw_tasks = Vec::new();

        for path in &toml_files {
            let text = std::fs::read_to_string(path.as_path()).map_err(|e| config_err(path.to_string(), e))?;
            let file: RawIncludeFile = config::parse_include_file(path, &text)?;
            raw_inputs.extend(file.inputs.into_iter().map(|f| (f.id, f.input)));
            raw_outputs.extend(file.outputs.into_iter().map(|f| (f.id, f.output)));
            raw_tasks.extend(file.tasks);
        }

        check_no_duplicates_across(&raw_inputs, &raw_outputs)?;

        let mut inputs = BTreeMap::new();
        for (id, raw) in raw_inputs {
            let spec = config::convert_input(&format!("Inputs.{id}"), raw)?;
            inputs.insert(id, spec);
        }

        let mut outputs = BTreeMap::new();
        for (id, raw) in raw_outputs {
            let spec = config::convert_output(&format!("Outputs.{id}"), raw)?;
            outputs.insert(id, spec);
        }

        let mut tasks = BTreeMap::new();
        for raw in raw_tasks {
            if tasks.contains_key(&raw.id) {
                return Err(config_err("Tasks", format!("duplicate include id {:?}", raw.id)));
            }
            let config_path = format!("Tasks.{}", raw.id);
            let mut task_inputs = config::convert_input(&format!("{config_path}.Input"), raw.input)?;
            let mut task_outputs = config::convert_output(&format!("{config_path}.Output"), raw.output)?;

            for included_id in &raw.includes {
                if let Some(spec) = inputs.get(included_id) {
                    task_inputs.merge(spec.clone());
                } else if let Some(spec) = outputs.get(included_id) {
                    task_outputs.merge(spec.clone());
                } else {
                    return Err(config_err(
                        format!("{config_path}.includes"),
                        format!("unknown include id {included_id:?}"),
                    ));
                }
            }

            tasks.insert(
                raw.id,
                TaskIncludeFragment { name: raw.name, command: raw.command, inputs: task_inputs, outputs: task_outputs },
            );
        }

        Ok(Self { inputs, outputs, tasks })
    }
}

fn check_no_duplicates_across(
    inputs: &[(String, RawInput)],
    outputs: &[(String, RawOutput)],
) -> Result<(), ForgeError> {
    let mut seen = std::collections::HashSet::new();
    for (id, _) in inputs.iter() {
        if !seen.insert(id.clone()) {
            return Err(config_err("Inputs", format!("duplicate include id {id:?}")));
        }
    }
    for (id, _) in outputs.iter() {
        if !seen.insert(id.clone()) {
            return Err(config_err("Outputs", format!("duplicate include id {id:?}")));
        }
    }
    Ok(())
}

fn collect_toml_files(dir: &AbsoluteSystemPath, out: &mut Vec<forgepath::AbsoluteSystemPathBuf>) -> Result<(), ForgeError> {
    let metadata = dir.symlink_metadata().map_err(|e| config_err(dir.to_string(), e))?;
    if metadata.file_type().is_symlink() {
        return Err(config_err(dir.to_string(), "symlinked directories are not allowed under include_dirs"));
    }
    let entries = std::fs::read_dir(dir.as_path()).map_err(|e| config_err(dir.to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| config_err(dir.to_string(), e))?;
        let file_type = entry.file_type().map_err(|e| config_err(dir.to_string(), e))?;
        let path = forgepath::AbsoluteSystemPathBuf::new(entry.path()).map_err(|e| config_err(dir.to_string(), e))?;
        if file_type.is_symlink() {
            return Err(config_err(path.to_string(), "symlinks are not allowed under include_dirs"));
        } else if file_type.is_dir() {
            collect_toml_files(&path, out)?;
        } else if path.extension() == Some(std::ffi::OsStr::new("toml")) {
            out.push(path);
        }
    }
    Ok(())
}
