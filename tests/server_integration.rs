//! Integration tests for the MCP service layer
//!
//! Drives the tools against fake Auggie shell scripts and scratch workspaces,
//! without requiring the real CLI or a connected MCP client.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use tempfile::TempDir;

use augment_mcp::config::ServerConfig;
use augment_mcp::server::resources::{self, ResourceRequest};
use augment_mcp::server::tools::{
    CommandArguments, ConfigureRequest, CustomCommandRequest, ListCommandsRequest, ReviewRequest,
    SearchRequest,
};
use augment_mcp::server::AugmentService;
use augment_mcp::workspace;

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn service_with_binary(binary: Option<&PathBuf>) -> AugmentService {
    AugmentService::new(ServerConfig {
        binary_path: binary.map(|path| path.display().to_string()),
        session_token: None,
        default_timeout_ms: Some(10_000),
        log_level: None,
    })
}

/// Extract the first text content through the wire shape, which is stable
/// across SDK versions.
fn tool_text(result: &CallToolResult) -> String {
    let value = serde_json::to_value(result).unwrap();
    value["content"][0]["text"]
        .as_str()
        .expect("tool result should carry text content")
        .to_string()
}

fn review_request(instruction: &str) -> ReviewRequest {
    ReviewRequest {
        instruction: instruction.to_string(),
        context: None,
        paths: None,
        workspace_root: None,
        model: None,
        compact: None,
        github_api_token: None,
        timeout_ms: None,
        extra_args: None,
        binary_path: None,
        session_token: None,
    }
}

#[tokio::test]
async fn test_review_returns_trimmed_stdout_and_records_telemetry() {
    let dir = TempDir::new().unwrap();
    let cli = script(&dir, "fake_auggie.sh", "cat > /dev/null\necho 'Looks good.'\n");
    let service = service_with_binary(Some(&cli));

    let mut request = review_request("review this");
    request.context = Some("fn main() {}".to_string());
    let result = service
        .augment_review(Parameters(request))
        .await
        .unwrap();
    assert_eq!(tool_text(&result), "Looks good.");

    let metrics = service.telemetry().metrics_snapshot();
    assert_eq!(metrics.requests.total_tools_called, 1);
    assert_eq!(metrics.auggie.total_runs, 1);
    assert!((metrics.auggie.success_rate - 1.0).abs() < f64::EPSILON);

    let history = service.telemetry().history(10);
    assert_eq!(history.runs.len(), 1);
    assert!(history.runs[0].success);
    assert_eq!(history.runs[0].instruction, "review this");
}

#[tokio::test]
async fn test_review_failure_includes_workspace_and_streams() {
    let dir = TempDir::new().unwrap();
    let cli = script(
        &dir,
        "failing_auggie.sh",
        "cat > /dev/null\necho 'partial' \necho 'credentials missing' >&2\nexit 2\n",
    );
    let service = service_with_binary(Some(&cli));
    let workspace_root = dir.path().display().to_string();

    let mut request = review_request("fail");
    request.workspace_root = Some(workspace_root.clone());
    let err = service
        .augment_review(Parameters(request))
        .await
        .unwrap_err();

    assert!(err.message.contains("exited with code 2"));
    assert!(err.message.contains(&format!("Workspace: {workspace_root}")));
    assert!(err.message.contains("stderr:\ncredentials missing"));
    assert!(err.message.contains("stdout:\npartial"));

    let history = service.telemetry().history(10);
    assert!(!history.runs[0].success);
    assert!(history.runs[0].error.is_some());
}

#[tokio::test]
async fn test_review_loads_path_context() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("api.py");
    fs::write(&source, "def handler(): pass\n").unwrap();
    // Echo stdin back so the test can see what Auggie would have received.
    let cli = script(&dir, "echo_auggie.sh", "cat\n");
    let service = service_with_binary(Some(&cli));

    let mut request = review_request("summarize");
    request.paths = Some(vec![source.display().to_string()]);
    request.context = Some("extra notes".to_string());
    let result = service.augment_review(Parameters(request)).await.unwrap();

    let text = tool_text(&result);
    assert!(text.contains(&format!("# File: {}", source.display())));
    assert!(text.contains("def handler"));
    assert!(text.ends_with("extra notes"));
}

#[tokio::test]
async fn test_review_rejects_unreadable_path() {
    let dir = TempDir::new().unwrap();
    let cli = script(&dir, "unused.sh", "exit 0\n");
    let service = service_with_binary(Some(&cli));

    let mut request = review_request("summarize");
    request.paths = Some(vec!["/definitely/not/a/file".to_string()]);
    let err = service
        .augment_review(Parameters(request))
        .await
        .unwrap_err();
    assert!(err.message.contains("not a readable file"));

    // Nothing was launched, so no run was recorded.
    assert_eq!(service.telemetry().metrics_snapshot().auggie.total_runs, 0);
}

#[tokio::test]
async fn test_configure_project_scope_writes_settings() {
    let dir = TempDir::new().unwrap();
    let service = service_with_binary(None);
    let permissions =
        serde_json::json!([{"tool-name": "view", "permission": {"type": "allow"}}]);

    let result = service
        .augment_configure(Parameters(ConfigureRequest {
            workspace_root: dir.path().display().to_string(),
            permissions: permissions.clone(),
            scope: Some("project".to_string()),
        }))
        .await
        .unwrap();

    let settings_path = dir.path().join(".augment").join("settings.json");
    assert!(settings_path.is_file());
    assert!(tool_text(&result).contains(&settings_path.display().to_string()));

    let data: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&settings_path).unwrap()).unwrap();
    assert_eq!(data["tool-permissions"], permissions);
}

#[tokio::test]
async fn test_configure_rejects_unknown_scope() {
    let dir = TempDir::new().unwrap();
    let service = service_with_binary(None);

    let err = service
        .augment_configure(Parameters(ConfigureRequest {
            workspace_root: dir.path().display().to_string(),
            permissions: serde_json::json!([]),
            scope: Some("global".to_string()),
        }))
        .await
        .unwrap_err();
    assert!(err.message.contains("scope must be either"));
}

#[tokio::test]
async fn test_custom_command_passes_arguments_and_workspace() {
    let dir = TempDir::new().unwrap();
    let cli = script(&dir, "args_auggie.sh", "echo \"Args: $*\"\n");
    let service = service_with_binary(Some(&cli));

    let result = service
        .augment_custom_command(Parameters(CustomCommandRequest {
            command_name: "security-review".to_string(),
            arguments: Some(CommandArguments::One("src/api.py".to_string())),
            workspace_root: Some("/workspace/project".to_string()),
            timeout_ms: None,
            binary_path: None,
            session_token: None,
        }))
        .await
        .unwrap();

    let text = tool_text(&result);
    assert!(text.contains("command security-review src/api.py"));
    assert!(text.contains("--workspace-root /workspace/project"));
}

#[tokio::test]
async fn test_list_commands_runs_command_list() {
    let dir = TempDir::new().unwrap();
    let cli = script(
        &dir,
        "list_auggie.sh",
        "echo \"Args: $*\"\necho security-review\necho performance-check\n",
    );
    let service = service_with_binary(Some(&cli));

    let result = service
        .augment_list_commands(Parameters(ListCommandsRequest {
            workspace_root: Some("/workspace/project".to_string()),
            timeout_ms: None,
            binary_path: None,
            session_token: None,
        }))
        .await
        .unwrap();

    let text = tool_text(&result);
    assert!(text.contains("Args: command list --workspace-root /workspace/project"));
    assert!(text.contains("security-review"));
    assert!(text.contains("performance-check"));
}

#[tokio::test]
async fn test_search_tool_reports_matches() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "alpha\nneedle in here\n").unwrap();
    let service = service_with_binary(None);

    let result = service
        .augment_search(Parameters(SearchRequest {
            pattern: "needle".to_string(),
            root: Some(dir.path().display().to_string()),
            max_results: None,
        }))
        .await
        .unwrap();

    let report: serde_json::Value = serde_json::from_str(&tool_text(&result)).unwrap();
    assert_eq!(report["total"], 1);
    let matched = report["matches"][0].clone();
    assert!(matched["path"].as_str().unwrap().ends_with("notes.txt"));
    assert_eq!(matched["line"], 2);
}

#[tokio::test]
async fn test_workspace_resources_roundtrip() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().display().to_string();

    let commands_dir = dir.path().join(".augment").join("commands");
    fs::create_dir_all(&commands_dir).unwrap();
    fs::write(
        commands_dir.join("security-review.md"),
        "---\ndescription: Security sweep\ntags: security\n---\nDo the sweep.\n",
    )
    .unwrap();
    workspace::write_permissions(
        &root,
        &serde_json::json!([{"tool-name": "view"}]),
        workspace::ConfigScope::Project,
    )
    .unwrap();

    let service = service_with_binary(None);

    let settings_uri = format!("augment://workspace/{root}/settings");
    let parsed = resources::parse_uri(&settings_uri).unwrap();
    assert!(matches!(parsed, ResourceRequest::Settings(_)));
    let body = resources::read(&parsed, service.telemetry()).unwrap();
    let settings: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(settings["exists"], true);
    assert_eq!(settings["tool_permissions"][0]["tool-name"], "view");

    let commands_uri = format!("augment://workspace/{root}/commands");
    let parsed = resources::parse_uri(&commands_uri).unwrap();
    let body = resources::read(&parsed, service.telemetry()).unwrap();
    let catalog: serde_json::Value = serde_json::from_str(&body).unwrap();
    let workspace_commands: Vec<_> = catalog["commands"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|entry| entry["scope"] == "workspace")
        .collect();
    assert_eq!(workspace_commands.len(), 1);
    assert_eq!(workspace_commands[0]["name"], "security-review");
    assert_eq!(workspace_commands[0]["description"], "Security sweep");
}
