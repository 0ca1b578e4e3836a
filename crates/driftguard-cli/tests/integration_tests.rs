//! Integration tests for CLI commands
//!
//! Only paths that settle before connecting to a cluster are exercised here.

use std::io::Write;
use std::process::{Command, Output};

/// Helper to run driftguard command
fn driftguard(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_driftguard"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("DRIFTGUARD_CONFIG")
        .output()
        .expect("Failed to execute driftguard")
}

fn file_with(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod general {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = driftguard(&["--help"]);

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("diff"));
        assert!(out.contains("access"));
    }

    #[test]
    fn test_version() {
        let output = driftguard(&["--version"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_unknown_command_is_usage_error() {
        let output = driftguard(&["apply"]);
        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_missing_config_file() {
        let output = driftguard(&[
            "access",
            "--config",
            "/nonexistent/driftguard.yaml",
            "-n",
            "apps",
            "-r",
            "apps/repo",
        ]);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_invalid_config_file() {
        let config = file_with("timeout: 0s\n");
        let output = driftguard(&[
            "access",
            "--config",
            config.path().to_str().unwrap(),
            "-n",
            "apps",
            "-r",
            "apps/repo",
        ]);
        assert_eq!(output.status.code(), Some(4));
    }
}

mod access_command {
    use super::*;

    #[test]
    fn test_same_namespace_allowed() {
        let output = driftguard(&["access", "-n", "apps", "-r", "apps/repo"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("allowed"));
        assert!(out.contains("apps/repo"));
    }

    #[test]
    fn test_bare_name_stays_in_namespace() {
        let output = driftguard(&["access", "-n", "apps", "-r", "repo"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("apps/repo"));
    }

    #[test]
    fn test_cross_namespace_without_policy_denied() {
        let output = driftguard(&["access", "-n", "apps", "-r", "shared/repo"]);

        assert_eq!(output.status.code(), Some(3));
        let err = stderr(&output);
        assert!(err.contains("shared/repo"));
        assert!(err.contains("ACL"));
    }

    #[test]
    fn test_invalid_reference() {
        let output = driftguard(&["access", "-n", "apps", "-r", "a/b/c"]);
        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_missing_policy_file() {
        let output = driftguard(&[
            "access",
            "-n",
            "apps",
            "-r",
            "shared/repo",
            "--policy",
            "/nonexistent/policy.yaml",
        ]);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_malformed_policy_file() {
        let policy = file_with("namespaceSelectors:\n  - matchLabels:\n      'bad key': a\n");
        let output = driftguard(&[
            "access",
            "-n",
            "apps",
            "-r",
            "shared/repo",
            "--policy",
            policy.path().to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(4));
    }
}

mod diff_command {
    use super::*;

    #[test]
    fn test_filename_required() {
        let output = driftguard(&["diff"]);
        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_missing_manifest() {
        let output = driftguard(&["diff", "-f", "/nonexistent/app.yaml"]);

        assert_eq!(output.status.code(), Some(5));
        assert!(stderr(&output).contains("app.yaml"));
    }

    #[test]
    fn test_manifest_without_kind() {
        let manifest = file_with("apiVersion: v1\nmetadata:\n  name: settings\n");
        let output = driftguard(&["diff", "-f", manifest.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("kind"));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = file_with("---\n# nothing here\n");
        let output = driftguard(&["diff", "-f", manifest.path().to_str().unwrap()]);

        assert_eq!(output.status.code(), Some(4));
    }
}
