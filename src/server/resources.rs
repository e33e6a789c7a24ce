//! MCP resource surface
//!
//! URI routing and JSON payload assembly for the workspace and telemetry
//! resources. Workspace resources are templated on the workspace path;
//! telemetry resources are fixed URIs.

use anyhow::Result;

use crate::telemetry::TelemetryCollector;
use crate::workspace;

pub const METRICS_URI: &str = "augment://telemetry/metrics";
pub const HISTORY_URI: &str = "augment://telemetry/history";
pub const SETTINGS_TEMPLATE: &str = "augment://workspace/{workspace_path}/settings";
pub const COMMANDS_TEMPLATE: &str = "augment://workspace/{workspace_path}/commands";

/// How many runs the history resource returns
const HISTORY_RESOURCE_LIMIT: usize = 50;

/// A parsed resource request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRequest {
    /// Augment settings for one workspace
    Settings(String),
    /// Custom command catalog for one workspace
    Commands(String),
    /// Current metrics snapshot
    Metrics,
    /// Recent run history
    History,
}

/// Route a resource URI. Workspace paths may themselves contain slashes, so
/// the template match strips the scheme prefix and the trailing segment.
pub fn parse_uri(uri: &str) -> Option<ResourceRequest> {
    match uri {
        METRICS_URI => return Some(ResourceRequest::Metrics),
        HISTORY_URI => return Some(ResourceRequest::History),
        _ => {}
    }

    let rest = uri.strip_prefix("augment://workspace/")?;
    if let Some(workspace_path) = rest.strip_suffix("/settings") {
        if !workspace_path.is_empty() {
            return Some(ResourceRequest::Settings(workspace_path.to_string()));
        }
    }
    if let Some(workspace_path) = rest.strip_suffix("/commands") {
        if !workspace_path.is_empty() {
            return Some(ResourceRequest::Commands(workspace_path.to_string()));
        }
    }
    None
}

/// Produce the JSON document for one parsed request.
pub fn read(request: &ResourceRequest, telemetry: &TelemetryCollector) -> Result<String> {
    let body = match request {
        ResourceRequest::Settings(workspace_path) => {
            serde_json::to_string_pretty(&workspace::read_workspace_settings(workspace_path)?)?
        }
        ResourceRequest::Commands(workspace_path) => {
            serde_json::to_string_pretty(&workspace::command_catalog(workspace_path)?)?
        }
        ResourceRequest::Metrics => serde_json::to_string_pretty(&telemetry.metrics_snapshot())?,
        ResourceRequest::History => {
            serde_json::to_string_pretty(&telemetry.history(HISTORY_RESOURCE_LIMIT))?
        }
    };
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_telemetry_uris() {
        assert_eq!(parse_uri(METRICS_URI), Some(ResourceRequest::Metrics));
        assert_eq!(parse_uri(HISTORY_URI), Some(ResourceRequest::History));
    }

    #[test]
    fn test_parse_workspace_templates() {
        assert_eq!(
            parse_uri("augment://workspace/home/dev/project/settings"),
            Some(ResourceRequest::Settings("home/dev/project".to_string()))
        );
        assert_eq!(
            parse_uri("augment://workspace/tmp/commands"),
            Some(ResourceRequest::Commands("tmp".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_uris() {
        assert_eq!(parse_uri("augment://workspace//settings"), None);
        assert_eq!(parse_uri("augment://other/thing"), None);
        assert_eq!(parse_uri("file:///etc/passwd"), None);
    }

    #[test]
    fn test_metrics_read_is_json() {
        let telemetry = TelemetryCollector::new();
        let body = read(&ResourceRequest::Metrics, &telemetry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(value.get("server").is_some());
        assert!(value.get("requests").is_some());
    }
}
