//! Augment MCP service
//!
//! Exposes Auggie-backed review and workflow capability over MCP: five tools,
//! templated workspace resources plus telemetry resources, and three prompt
//! templates. Every Auggie run goes through the invocation core and is
//! recorded in telemetry.

use std::time::Instant;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, GetPromptRequestParam, GetPromptResult, Implementation,
    ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, PaginatedRequestParam,
    Prompt, PromptArgument, PromptMessage, PromptMessageRole, RawResource, RawResourceTemplate,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
};
use rmcp::schemars;
use rmcp::service::RequestContext;
use rmcp::{
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::auggie::{self, runner, AuggieInvocation, AuggieRunResult, RunOptions};
use crate::config::ServerConfig;
use crate::errors::AuggieError;
use crate::search;
use crate::server::{prompts, resources};
use crate::telemetry::{OperationKind, RunRecord, TelemetryCollector};
use crate::workspace::{self, ConfigScope};

const INSTRUCTIONS: &str = "Call the `augment_review` tool to delegate reviews to Augment's \
Auggie CLI. Provide the instruction you want Auggie to follow and optional context such as raw \
text or file paths. The tool streams context to Auggie and returns its textual response. Set \
AUGMENT_SESSION_AUTH in the environment before running the server or pass `session_token` per \
call.";

/// Augment MCP service
#[derive(Clone)]
pub struct AugmentService {
    config: ServerConfig,
    telemetry: TelemetryCollector,
    tool_router: ToolRouter<Self>,
}

impl AugmentService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            telemetry: TelemetryCollector::new(),
            tool_router: Self::tool_router(),
        }
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Per-call options resolved against the server configuration.
    fn run_options(
        &self,
        timeout_ms: Option<u64>,
        session_token: Option<&str>,
        binary_path: Option<&str>,
    ) -> RunOptions {
        RunOptions::default()
            .with_timeout_ms(self.config.resolved_timeout_ms(timeout_ms))
            .with_session_token(self.config.resolved_session_token(session_token))
            .with_binary_path(self.config.resolved_binary(binary_path))
    }

    fn record_run(
        &self,
        command: &str,
        instruction: Option<&str>,
        workspace_root: Option<&str>,
        model: Option<&str>,
        duration_ms: u64,
        outcome: &Result<AuggieRunResult, AuggieError>,
    ) {
        let (success, output_length, error) = match outcome {
            Ok(result) => (true, result.stdout.len(), None),
            Err(err) => (false, 0, Some(err.to_string())),
        };
        self.telemetry.record_run(RunRecord::new(
            command.to_string(),
            instruction,
            workspace_root.map(str::to_string),
            model.map(str::to_string),
            duration_ms,
            success,
            output_length,
            error,
        ));
    }

    fn record_tool(&self, started: Instant) {
        self.telemetry
            .record_operation(OperationKind::Tool, started.elapsed().as_secs_f64() * 1000.0);
    }
}

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReviewRequest {
    /// Instruction for Auggie to follow
    #[schemars(description = "Instruction for Auggie to follow")]
    pub instruction: String,

    /// Raw context text piped to Auggie's stdin
    #[schemars(description = "Raw context text piped to Auggie's stdin")]
    pub context: Option<String>,

    /// Files whose contents are loaded and prepended to the context
    #[schemars(description = "Files whose contents are loaded and prepended to the context")]
    pub paths: Option<Vec<String>>,

    #[schemars(description = "Workspace the review runs against")]
    pub workspace_root: Option<String>,

    #[schemars(description = "Model passed through to Auggie")]
    pub model: Option<String>,

    #[schemars(description = "Request compact output")]
    pub compact: Option<bool>,

    #[schemars(description = "GitHub API token for PR-aware reviews")]
    pub github_api_token: Option<String>,

    #[schemars(description = "Deadline for the whole run in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[schemars(description = "Extra Auggie arguments inserted before --print")]
    pub extra_args: Option<Vec<String>>,

    #[schemars(description = "Override for the Auggie binary path")]
    pub binary_path: Option<String>,

    #[schemars(description = "Per-call session credential")]
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConfigureRequest {
    #[schemars(description = "Workspace whose settings are written")]
    pub workspace_root: String,

    #[schemars(description = "Permission entries written as tool-permissions")]
    pub permissions: Value,

    #[schemars(description = "Either 'project' (default) or 'user'")]
    pub scope: Option<String>,
}

/// Custom command arguments: a single string or a list
#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum CommandArguments {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CustomCommandRequest {
    #[schemars(description = "Name of the Auggie custom command")]
    pub command_name: String,

    #[schemars(description = "Arguments forwarded to the command")]
    pub arguments: Option<CommandArguments>,

    #[schemars(description = "Workspace the command runs against")]
    pub workspace_root: Option<String>,

    #[schemars(description = "Deadline for the whole run in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[schemars(description = "Override for the Auggie binary path")]
    pub binary_path: Option<String>,

    #[schemars(description = "Per-call session credential")]
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListCommandsRequest {
    #[schemars(description = "Workspace whose commands are listed")]
    pub workspace_root: Option<String>,

    #[schemars(description = "Deadline for the whole run in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[schemars(description = "Override for the Auggie binary path")]
    pub binary_path: Option<String>,

    #[schemars(description = "Per-call session credential")]
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    #[schemars(description = "Text to look for")]
    pub pattern: String,

    #[schemars(description = "Directory to search; defaults to the current directory")]
    pub root: Option<String>,

    #[schemars(description = "Result cap; defaults to 100")]
    pub max_results: Option<usize>,
}

// ============================================================================
// Tools
// ============================================================================

#[tool_router]
impl AugmentService {
    /// Run a review-style Auggie invocation with optional file and text context.
    #[tool(
        name = "augment_review",
        description = "Use Auggie to review artifacts with the Augment context engine"
    )]
    pub async fn augment_review(
        &self,
        Parameters(request): Parameters<ReviewRequest>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();

        let mut context_parts = Vec::new();
        if let Some(paths) = request.paths.as_deref() {
            if !paths.is_empty() {
                let loaded = workspace::load_paths(paths)
                    .map_err(|err| McpError::invalid_params(err.to_string(), None))?;
                context_parts.push(loaded);
            }
        }
        if let Some(context) = request.context.as_deref() {
            if !context.is_empty() {
                context_parts.push(context.to_string());
            }
        }
        let combined_context = if context_parts.is_empty() {
            None
        } else {
            Some(context_parts.join("\n\n"))
        };

        let options = self.run_options(
            request.timeout_ms,
            request.session_token.as_deref(),
            request.binary_path.as_deref(),
        );
        let spec = AuggieInvocation::new(request.instruction.clone())
            .with_input_text(combined_context)
            .with_workspace_root(request.workspace_root.clone())
            .with_model(request.model.clone())
            .with_compact(request.compact.unwrap_or(false))
            .with_github_api_token(request.github_api_token.clone())
            .with_extra_args(request.extra_args.clone().unwrap_or_default())
            .with_options(options)
            .into_spec()
            .map_err(|err| McpError::invalid_params(err.to_string(), None))?;

        let command_line = spec.command_line();
        let run_started = Instant::now();
        let outcome = runner::run(spec).await;
        self.record_run(
            &command_line,
            Some(&request.instruction),
            request.workspace_root.as_deref(),
            request.model.as_deref(),
            run_started.elapsed().as_millis() as u64,
            &outcome,
        );

        let output = normalize_outcome(outcome, request.workspace_root.as_deref())?;
        self.record_tool(started);
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    /// Write Augment permission configuration to the scoped settings file.
    #[tool(
        name = "augment_configure",
        description = "Configure Augment tool permissions for a workspace"
    )]
    pub async fn augment_configure(
        &self,
        Parameters(request): Parameters<ConfigureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();

        let scope = match request.scope.as_deref().unwrap_or("project") {
            "project" => ConfigScope::Project,
            "user" => ConfigScope::User,
            other => {
                return Err(McpError::invalid_params(
                    format!("scope must be either 'user' or 'project', got '{other}'"),
                    None,
                ))
            }
        };

        let settings_path =
            workspace::write_permissions(&request.workspace_root, &request.permissions, scope)
                .map_err(|err| McpError::internal_error(err.to_string(), None))?;

        self.record_tool(started);
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Configured tool permissions at {}",
            settings_path.display()
        ))]))
    }

    /// Run a named Auggie custom command for reusable workflows.
    #[tool(
        name = "augment_custom_command",
        description = "Execute a custom Auggie command for reusable workflows"
    )]
    pub async fn augment_custom_command(
        &self,
        Parameters(request): Parameters<CustomCommandRequest>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();

        let mut args = vec!["command".to_string(), request.command_name.clone()];
        match request.arguments {
            Some(CommandArguments::One(argument)) => args.push(argument),
            Some(CommandArguments::Many(arguments)) => args.extend(arguments),
            None => {}
        }
        if let Some(root) = &request.workspace_root {
            args.extend(["--workspace-root".to_string(), root.clone()]);
        }

        let options = self.run_options(
            request.timeout_ms,
            request.session_token.as_deref(),
            request.binary_path.as_deref(),
        );
        let spec = auggie::command_spec(args, options);
        let command_line = spec.command_line();
        let run_started = Instant::now();
        let outcome = runner::run(spec).await;
        self.record_run(
            &command_line,
            None,
            request.workspace_root.as_deref(),
            None,
            run_started.elapsed().as_millis() as u64,
            &outcome,
        );

        let output = normalize_outcome(outcome, request.workspace_root.as_deref())?;
        self.record_tool(started);
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    /// List registered Auggie slash commands.
    #[tool(
        name = "augment_list_commands",
        description = "List available Auggie custom commands"
    )]
    pub async fn augment_list_commands(
        &self,
        Parameters(request): Parameters<ListCommandsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();

        let mut args = vec!["command".to_string(), "list".to_string()];
        if let Some(root) = &request.workspace_root {
            args.extend(["--workspace-root".to_string(), root.clone()]);
        }

        let options = self.run_options(
            request.timeout_ms,
            request.session_token.as_deref(),
            request.binary_path.as_deref(),
        );
        let spec = auggie::command_spec(args, options);
        let command_line = spec.command_line();
        let run_started = Instant::now();
        let outcome = runner::run(spec).await;
        self.record_run(
            &command_line,
            None,
            request.workspace_root.as_deref(),
            None,
            run_started.elapsed().as_millis() as u64,
            &outcome,
        );

        let output = normalize_outcome(outcome, request.workspace_root.as_deref())?;
        self.record_tool(started);
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    /// Search workspace text with the rg, grep, built-in fallback chain.
    #[tool(
        name = "augment_search",
        description = "Search workspace files for a pattern, falling back from rg to grep to a built-in scan"
    )]
    pub async fn augment_search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let started = Instant::now();

        let root = request.root.unwrap_or_else(|| ".".to_string());
        let max_results = request.max_results.unwrap_or(search::DEFAULT_MAX_RESULTS);
        let report = search::search_workspace(&root, &request.pattern, max_results)
            .await
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;

        let body = serde_json::to_string_pretty(&report)
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;
        self.record_tool(started);
        Ok(CallToolResult::success(vec![Content::text(body)]))
    }
}

/// Normalize a run outcome into tool output the way callers expect: trimmed
/// stdout on success, and failure messages that keep the underlying tool's
/// own diagnostics.
fn normalize_outcome(
    outcome: Result<AuggieRunResult, AuggieError>,
    workspace_root: Option<&str>,
) -> Result<String, McpError> {
    match outcome {
        Ok(result) => {
            let stderr = result.stderr.trim();
            if !stderr.is_empty() {
                warn!(stderr = %stderr, "Auggie stderr");
            }
            let output = result.stdout.trim();
            Ok(if output.is_empty() {
                "Auggie produced no output".to_string()
            } else {
                output.to_string()
            })
        }
        Err(err) => {
            let mut message = vec![err.to_string()];
            if let AuggieError::CommandFailed { result } = &err {
                if let Some(root) = workspace_root {
                    message.push(format!("Workspace: {root}"));
                }
                let stderr = result.stderr.trim();
                if !stderr.is_empty() {
                    message.push(format!("stderr:\n{stderr}"));
                }
                let stdout = result.stdout.trim();
                if !stdout.is_empty() {
                    message.push(format!("stdout:\n{stdout}"));
                }
            }
            Err(McpError::internal_error(message.join("\n\n"), None))
        }
    }
}

// ============================================================================
// Server handler: info, resources, prompts
// ============================================================================

#[tool_handler]
impl ServerHandler for AugmentService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut metrics = RawResource::new(resources::METRICS_URI, "Augment Server Metrics");
        metrics.description = Some("Performance counters for this server instance".to_string());
        metrics.mime_type = Some("application/json".to_string());

        let mut history = RawResource::new(resources::HISTORY_URI, "Auggie Run History");
        history.description = Some("Recent Auggie CLI invocations with statistics".to_string());
        history.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![metrics.no_annotation(), history.no_annotation()],
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let settings = RawResourceTemplate {
            uri_template: resources::SETTINGS_TEMPLATE.to_string(),
            name: "Augment Workspace Settings".to_string(),
            title: None,
            description: Some(
                "Current Augment configuration and tool permissions for a workspace".to_string(),
            ),
            mime_type: Some("application/json".to_string()),
        };
        let commands = RawResourceTemplate {
            uri_template: resources::COMMANDS_TEMPLATE.to_string(),
            name: "Augment Custom Commands".to_string(),
            title: None,
            description: Some(
                "List available Augment custom command definitions".to_string(),
            ),
            mime_type: Some("application/json".to_string()),
        };

        Ok(ListResourceTemplatesResult {
            resource_templates: vec![settings.no_annotation(), commands.no_annotation()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let started = Instant::now();

        let parsed = resources::parse_uri(&request.uri).ok_or_else(|| {
            McpError::resource_not_found(format!("Unknown resource URI: {}", request.uri), None)
        })?;
        let body = resources::read(&parsed, &self.telemetry)
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;

        self.telemetry.record_operation(
            OperationKind::Resource,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(body, request.uri)],
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: vec![
                Prompt::new(
                    "security_review",
                    Some("Generate a comprehensive security review request for a file"),
                    Some(vec![
                        prompt_argument("file_path", "File to review", true),
                        prompt_argument(
                            "focus_areas",
                            "all, sql-injection, xss, auth, or crypto",
                            false,
                        ),
                        prompt_argument("severity_threshold", "Minimum severity to report", false),
                    ]),
                ),
                Prompt::new(
                    "refactor_code",
                    Some("Request a refactoring plan with targeted improvement goals"),
                    Some(vec![
                        prompt_argument("file_path", "File to refactor", true),
                        prompt_argument("goals", "Comma-separated refactoring goals", false),
                        prompt_argument(
                            "preserve_behavior",
                            "Whether observable behaviour must be preserved",
                            false,
                        ),
                    ]),
                ),
                Prompt::new(
                    "generate_tests",
                    Some("Request targeted automated tests for recent changes"),
                    Some(vec![
                        prompt_argument("file_path", "File or module to cover", true),
                        prompt_argument("test_style", "unit, integration, or end-to-end", false),
                        prompt_argument("frameworks", "Preferred frameworks or tools", false),
                    ]),
                ),
            ],
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        let started = Instant::now();
        let args = request.arguments.unwrap_or_default();

        let file_path = arg_str(&args, "file_path")
            .ok_or_else(|| McpError::invalid_params("file_path is required", None))?;

        let content = match request.name.as_str() {
            "security_review" => prompts::security_review(
                &file_path,
                arg_str(&args, "focus_areas").as_deref().unwrap_or("all"),
                arg_str(&args, "severity_threshold")
                    .as_deref()
                    .unwrap_or("medium"),
            ),
            "refactor_code" => prompts::refactor_code(
                &file_path,
                &arg_list(&args, "goals"),
                arg_bool(&args, "preserve_behavior").unwrap_or(true),
            ),
            "generate_tests" => prompts::generate_tests(
                &file_path,
                arg_str(&args, "test_style").as_deref().unwrap_or("unit"),
                arg_str(&args, "frameworks").as_deref(),
            ),
            other => {
                return Err(McpError::invalid_params(
                    format!("Unknown prompt: {other}"),
                    None,
                ))
            }
        };

        self.telemetry.record_operation(
            OperationKind::Prompt,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, content)],
        })
    }
}

fn prompt_argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        required: Some(required),
    }
}

fn arg_str(args: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

fn arg_list(args: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn arg_bool(args: &serde_json::Map<String, Value>, key: &str) -> Option<bool> {
    match args.get(key) {
        Some(Value::Bool(flag)) => Some(*flag),
        Some(Value::String(text)) => text.parse().ok(),
        _ => None,
    }
}
