//! Diff command - show what applying manifests would change

use clap::ValueEnum;
use std::path::{Path, PathBuf};

use driftguard_core::StructuredObject;
use driftguard_kube::{KubeStore, ManagerOptions, ResourceManager};

use crate::display;
use crate::error::{CliError, Result};
use crate::exit_codes;

/// Output format of the diff command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Run the diff command
pub async fn run(
    files: &[PathBuf],
    namespace: &str,
    output: OutputFormat,
    options: &ManagerOptions,
) -> Result<i32> {
    let mut objects = load_manifests(files)?;
    if objects.is_empty() {
        return Err(CliError::input("no objects found in the given manifests"));
    }

    let store = KubeStore::try_default(options).await?;
    apply_default_namespace(&mut objects, namespace, |api_version, kind| {
        store.is_namespaced(api_version, kind)
    });

    let manager = ResourceManager::new(store, options.clone());
    let changes = manager.diff_all(&objects).await?;

    match output {
        OutputFormat::Text => display::print_changes(&changes),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&changes)
                .map_err(|e| CliError::internal(e.to_string()))?;
            println!("{}", json);
        }
    }

    Ok(if changes.has_changes() {
        exit_codes::CHANGES_FOUND
    } else {
        exit_codes::SUCCESS
    })
}

/// Read every object from the given multi-document YAML files, in order
pub fn load_manifests(files: &[PathBuf]) -> Result<Vec<StructuredObject>> {
    let mut objects = Vec::new();

    for file in files {
        let content = std::fs::read_to_string(file).map_err(|e| CliError::Io {
            message: format!("{}: {}", file.display(), e),
        })?;
        let parsed = StructuredObject::parse_manifest(&content)
            .map_err(|e| invalid_manifest(file, &e.to_string()))?;

        for object in parsed {
            if object.name().is_empty() {
                return Err(invalid_manifest(
                    file,
                    &format!("{} object is missing metadata.name", object.kind()),
                ));
            }
            objects.push(object);
        }
    }

    Ok(objects)
}

/// Set `namespace` on namespaced objects that do not name one
///
/// Kinds the server does not know are left alone; their dry-run reports them.
pub fn apply_default_namespace<F>(objects: &mut [StructuredObject], namespace: &str, is_namespaced: F)
where
    F: Fn(&str, &str) -> Option<bool>,
{
    for object in objects.iter_mut() {
        if object.namespace().is_empty()
            && is_namespaced(object.api_version(), object.kind()) == Some(true)
        {
            object.set_namespace(namespace);
        }
    }
}

fn invalid_manifest(file: &Path, message: &str) -> CliError {
    CliError::input_with_help(
        format!("{}: {}", file.display(), message),
        "manifests must be YAML documents with apiVersion, kind and metadata.name",
    )
}
