//! Integration tests for the wingetup CLI binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Temporary working directory for one invocation of the binary
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self { temp_dir }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn wingetup(&self, args: &[&str]) -> Output {
        let bin_path = env!("CARGO_BIN_EXE_wingetup");
        Command::new(bin_path)
            .args(args)
            .current_dir(self.path())
            .env_remove("GITHUB_OUTPUT")
            .env("RUST_LOG", "off")
            .output()
            .expect("failed to run wingetup")
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.wingetup(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("add-arch"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.wingetup(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("wingetup"));
}

#[test]
fn test_hash_prints_uppercase_sha256() {
    let ctx = TestContext::new();
    std::fs::write(ctx.path().join("hello.txt"), "hello world").unwrap();

    let output = ctx.wingetup(&["hash", "hello.txt"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9  hello.txt"
    );
}

#[test]
fn test_hash_missing_file_fails() {
    let ctx = TestContext::new();
    let output = ctx.wingetup(&["hash", "missing.msi"]);
    assert!(!output.status.success());
}

#[test]
fn test_completions_bash() {
    let ctx = TestContext::new();
    let output = ctx.wingetup(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("wingetup"));
}

#[test]
fn test_check_rejects_invalid_config() {
    let ctx = TestContext::new();
    std::fs::write(ctx.path().join("Contoso.App.checkver.yaml"), "checkver: [unclosed\n").unwrap();

    let output = ctx.wingetup(&["check", "Contoso.App.checkver.yaml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Contoso.App.checkver.yaml"));
}

#[test]
fn test_check_all_on_empty_directory() {
    let ctx = TestContext::new();
    std::fs::create_dir(ctx.path().join("packages")).unwrap();

    let output = ctx.wingetup(&["check", "--all", "packages"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no checkver files"));
}

#[test]
fn test_update_requires_version_info() {
    let ctx = TestContext::new();
    let output = ctx.wingetup(&["update", "Contoso.App.checkver.yaml", "version.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("version.json"));
}

#[test]
fn test_update_help_lists_workflow_environment() {
    let ctx = TestContext::new();
    let output = ctx.wingetup(&["update", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for var in [
        "GITHUB_TOKEN",
        "GH_TOKEN",
        "WINGET_FORK_REPO",
        "GITHUB_REPOSITORY_OWNER",
        "GITHUB_REPOSITORY",
        "GITHUB_RUN_NUMBER",
        "GITHUB_RUN_ID",
    ] {
        assert!(stdout.contains(&format!("env: {var}")), "{var} missing from help");
    }
    assert!(!stdout.contains("WINGET_PKGS_TOKEN"));
}
