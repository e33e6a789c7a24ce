//! Workspace filesystem glue
//!
//! Reads and writes the `.augment/` configuration surface: settings JSON,
//! custom command catalogs with front-matter metadata, and file-context
//! loading for review invocations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a settings write or command definition lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    User,
    Project,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::User => "user",
            ConfigScope::Project => "project",
        }
    }
}

/// Snapshot of a workspace's Augment settings file
#[derive(Debug, Serialize)]
pub struct WorkspaceSettings {
    pub workspace: String,
    pub settings_file: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_permissions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

/// One discovered custom command definition
#[derive(Debug, Clone, Serialize)]
pub struct CommandEntry {
    pub name: String,
    pub path: String,
    pub scope: String,
    pub namespace: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
}

/// Merged workspace- and user-scope command catalog
#[derive(Debug, Serialize)]
pub struct CommandCatalog {
    pub workspace: String,
    pub total: usize,
    pub commands: Vec<CommandEntry>,
}

/// Expand a leading `~` to the home directory.
pub fn expand_workspace(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Read a file as text with invalid bytes replaced.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Concatenate file contents with headers for Auggie context.
pub fn load_paths(paths: &[String]) -> Result<String> {
    let mut chunks = Vec::with_capacity(paths.len());
    for raw_path in paths {
        let path = expand_workspace(raw_path);
        if !path.is_file() {
            bail!("Path is not a readable file: {raw_path}");
        }
        let text = read_text_lossy(&path)?;
        chunks.push(format!("# File: {raw_path}\n\n{text}"));
    }
    Ok(chunks.join("\n\n"))
}

/// Read `<workspace>/.augment/settings.json` without failing on absence.
pub fn read_workspace_settings(workspace_path: &str) -> Result<WorkspaceSettings> {
    let workspace = expand_workspace(workspace_path);
    let settings_path = workspace.join(".augment").join("settings.json");

    if !settings_path.exists() {
        return Ok(WorkspaceSettings {
            workspace: workspace.display().to_string(),
            settings_file: settings_path.display().to_string(),
            exists: false,
            tool_permissions: None,
            settings: None,
        });
    }

    let raw = read_text_lossy(&settings_path)?;
    let data: Value = if raw.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(&raw).with_context(|| {
            format!("Failed to parse workspace settings: {}", settings_path.display())
        })?
    };

    Ok(WorkspaceSettings {
        workspace: workspace.display().to_string(),
        settings_file: settings_path.display().to_string(),
        exists: true,
        tool_permissions: Some(
            data.get("tool-permissions")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
        ),
        settings: Some(data),
    })
}

/// Write `{"tool-permissions": …}` to the scoped settings file, creating
/// parent directories. Returns the path written.
pub fn write_permissions(
    workspace_root: &str,
    permissions: &Value,
    scope: ConfigScope,
) -> Result<PathBuf> {
    let settings_path = match scope {
        ConfigScope::Project => {
            let root = expand_workspace(workspace_root);
            if !root.exists() {
                bail!("Workspace root does not exist: {workspace_root}");
            }
            root.join(".augment").join("settings.json")
        }
        ConfigScope::User => dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".augment")
            .join("settings.json"),
    };

    if let Some(parent) = settings_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let config = serde_json::json!({ "tool-permissions": permissions });
    let body = serde_json::to_string_pretty(&config)?;
    fs::write(&settings_path, format!("{body}\n"))
        .with_context(|| format!("Failed to write settings: {}", settings_path.display()))?;

    Ok(settings_path)
}

/// Enumerate workspace- and user-level command files.
pub fn command_catalog(workspace_path: &str) -> Result<CommandCatalog> {
    let workspace = expand_workspace(workspace_path);

    let mut commands =
        collect_command_entries(&workspace.join(".augment").join("commands"), "workspace")?;
    if let Some(home) = dirs::home_dir() {
        commands.extend(collect_command_entries(
            &home.join(".augment").join("commands"),
            "user",
        )?);
    }

    Ok(CommandCatalog {
        workspace: workspace.display().to_string(),
        total: commands.len(),
        commands,
    })
}

/// Recursively collect `*.md` command files under `root`, sorted by path.
pub fn collect_command_entries(root: &Path, scope: &str) -> Result<Vec<CommandEntry>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    walk_markdown(root, &mut files)?;
    files.sort();

    let mut entries = Vec::with_capacity(files.len());
    for cmd_file in files {
        let Ok(raw) = read_text_lossy(&cmd_file) else {
            continue;
        };
        let meta = parse_front_matter(&raw);
        let namespace = cmd_file
            .parent()
            .filter(|parent| *parent != root)
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(|rel| rel.to_string_lossy().replace('\\', "/"));

        entries.push(CommandEntry {
            name: cmd_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: cmd_file.display().to_string(),
            scope: scope.to_string(),
            namespace,
            description: meta.get("description").cloned(),
            tags: meta.get("tags").cloned(),
        });
    }

    Ok(entries)
}

fn walk_markdown(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let read_dir =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_markdown(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "md") && path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Parse simple `key: value` front matter delimited by `---` lines.
pub fn parse_front_matter(text: &str) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    let mut lines = text.lines();

    if lines.next().map(str::trim) != Some("---") {
        return meta;
    }

    for line in lines {
        let stripped = line.trim();
        if stripped == "---" {
            break;
        }
        if let Some((key, value)) = stripped.split_once(':') {
            meta.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    meta
}
