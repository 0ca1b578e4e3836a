//! Access command - check a cross-namespace reference against a policy

use console::style;
use std::path::Path;

use driftguard_core::{AccessCheck, AccessPolicy, AccessRequest};
use driftguard_kube::{Authorization, KubeStore, ManagerOptions};

use crate::error::{CliError, Result};
use crate::exit_codes;

/// Run the access command
pub async fn run(
    namespace: &str,
    reference: &str,
    policy: Option<&Path>,
    options: &ManagerOptions,
) -> Result<i32> {
    let (reference_namespace, reference_name) = parse_reference(reference)?;
    let policy = policy.map(load_policy).transpose()?;

    // Same-namespace references and missing policies are settled without a cluster
    let request = AccessRequest::new(namespace, reference_namespace, reference_name);
    if request.precheck(policy.as_ref())? == AccessCheck::Granted {
        print_granted(&request);
        return Ok(exit_codes::SUCCESS);
    }

    let store = KubeStore::try_default(options).await?;
    Authorization::new(store)
        .with_timeout(options.timeout)
        .has_access_to_ref(namespace, reference_namespace, reference_name, policy.as_ref())
        .await?;

    print_granted(&request);
    Ok(exit_codes::SUCCESS)
}

/// Split `namespace/name`; a bare name stays in the requester namespace
pub fn parse_reference(reference: &str) -> Result<(&str, &str)> {
    let (namespace, name) = match reference.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("", reference),
    };

    if name.is_empty() || name.contains('/') || (reference.contains('/') && namespace.is_empty()) {
        return Err(CliError::input_with_help(
            format!("invalid reference '{}'", reference),
            "use <namespace>/<name>, or <name> for the requesting namespace",
        ));
    }

    Ok((namespace, name))
}

/// Load a policy and check its selectors before any lookup
pub fn load_policy(path: &Path) -> Result<AccessPolicy> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
        message: format!("{}: {}", path.display(), e),
    })?;
    let policy = AccessPolicy::from_yaml(&content)
        .map_err(|e| CliError::input(format!("{}: {}", path.display(), e)))?;

    for selector in &policy.namespace_selectors {
        selector
            .matcher()
            .map_err(|e| CliError::input(format!("{}: {}", path.display(), e)))?;
    }

    Ok(policy)
}

fn print_granted(request: &AccessRequest<'_>) {
    println!(
        "{} namespace '{}' may reference '{}'",
        style("allowed:").green().bold(),
        request.object_namespace,
        request.reference()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("shared/repo").unwrap(), ("shared", "repo"));
        assert_eq!(parse_reference("repo").unwrap(), ("", "repo"));
        assert!(parse_reference("a/b/c").is_err());
        assert!(parse_reference("/repo").is_err());
        assert!(parse_reference("shared/").is_err());
        assert!(parse_reference("").is_err());
    }

    #[test]
    fn test_load_policy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "namespaceSelectors:\n  - matchLabels:\n      tenant: a\n  - matchLabels: {{}}"
        )
        .unwrap();

        let policy = load_policy(file.path()).unwrap();
        assert_eq!(policy.namespace_selectors.len(), 2);
        assert!(policy.namespace_selectors[1].match_labels.is_empty());
    }

    #[test]
    fn test_malformed_selector_rejected_before_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespaceSelectors:\n  - matchLabels:\n      'bad key': a").unwrap();

        let err = load_policy(file.path()).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::INVALID_INPUT);
    }
}
