//! Telemetry for the Augment MCP server
//!
//! Process-local counters and history behind an `Arc<Mutex>`: operation
//! counts and bounded duration samples per kind, plus a bounded record of
//! Auggie CLI runs. Snapshots are serializable so they can be served as MCP
//! resources. Aggregation stays at counts and means.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Most recent samples retained per duration list and for run history
pub const HISTORY_LIMIT: usize = 1000;

/// Instructions stored in run records are clipped to this many characters
const INSTRUCTION_CLIP: usize = 200;

/// What kind of MCP operation a duration sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Tool,
    Resource,
    Prompt,
}

/// One recorded Auggie CLI invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub instruction: String,
    pub workspace_root: Option<String>,
    pub model: Option<String>,
    pub duration_ms: u64,
    pub success: bool,
    pub output_length: usize,
    pub error: Option<String>,
}

impl RunRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command: String,
        instruction: Option<&str>,
        workspace_root: Option<String>,
        model: Option<String>,
        duration_ms: u64,
        success: bool,
        output_length: usize,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            command,
            instruction: instruction
                .unwrap_or_default()
                .chars()
                .take(INSTRUCTION_CLIP)
                .collect(),
            workspace_root,
            model,
            duration_ms,
            success,
            output_length,
            error,
        }
    }
}

#[derive(Debug, Default)]
struct TelemetryState {
    tools_called: u64,
    resources_read: u64,
    prompts_requested: u64,
    tool_durations: VecDeque<f64>,
    resource_durations: VecDeque<f64>,
    prompt_durations: VecDeque<f64>,
    history: VecDeque<RunRecord>,
}

/// Telemetry collector shared across server handlers
#[derive(Clone)]
pub struct TelemetryCollector {
    state: Arc<Mutex<TelemetryState>>,
    start_instant: Instant,
    started_at: DateTime<Utc>,
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TelemetryState::default())),
            start_instant: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record one completed tool, resource, or prompt operation.
    pub fn record_operation(&self, kind: OperationKind, duration_ms: f64) {
        let mut state = self.state.lock().unwrap();
        let durations = match kind {
            OperationKind::Tool => {
                state.tools_called += 1;
                &mut state.tool_durations
            }
            OperationKind::Resource => {
                state.resources_read += 1;
                &mut state.resource_durations
            }
            OperationKind::Prompt => {
                state.prompts_requested += 1;
                &mut state.prompt_durations
            }
        };
        durations.push_back(duration_ms);
        while durations.len() > HISTORY_LIMIT {
            durations.pop_front();
        }
    }

    /// Record one Auggie CLI run for history tracking.
    pub fn record_run(&self, record: RunRecord) {
        let mut state = self.state.lock().unwrap();
        state.history.push_back(record);
        while state.history.len() > HISTORY_LIMIT {
            state.history.pop_front();
        }
    }

    /// Snapshot of performance metrics and statistics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().unwrap();
        let uptime_seconds = self.start_instant.elapsed().as_secs_f64();
        let total_requests = state.tools_called + state.resources_read;
        let requests_per_minute = if uptime_seconds > 0.0 {
            total_requests as f64 / (uptime_seconds / 60.0)
        } else {
            0.0
        };

        let total_runs = state.history.len();
        let successes = state.history.iter().filter(|run| run.success).count();
        let run_durations: Vec<f64> = state
            .history
            .iter()
            .map(|run| run.duration_ms as f64)
            .collect();

        MetricsSnapshot {
            server: ServerMetrics {
                uptime_seconds: uptime_seconds as u64,
                start_time: self.started_at.to_rfc3339(),
            },
            requests: RequestMetrics {
                total_tools_called: state.tools_called,
                total_resources_read: state.resources_read,
                total_prompts_requested: state.prompts_requested,
                requests_per_minute,
            },
            performance: PerformanceMetrics {
                avg_tool_duration_ms: mean(state.tool_durations.iter()),
                avg_resource_duration_ms: mean(state.resource_durations.iter()),
                avg_prompt_duration_ms: mean(state.prompt_durations.iter()),
            },
            auggie: RunMetrics {
                total_runs,
                success_rate: if total_runs > 0 {
                    successes as f64 / total_runs as f64
                } else {
                    0.0
                },
                avg_duration_ms: mean(run_durations.iter()),
            },
        }
    }

    /// The most recent `limit` run records, clamped to `1..=HISTORY_LIMIT`.
    pub fn history(&self, limit: usize) -> HistorySnapshot {
        let limit = limit.clamp(1, HISTORY_LIMIT);
        let state = self.state.lock().unwrap();

        let skip = state.history.len().saturating_sub(limit);
        let runs: Vec<RunRecord> = state.history.iter().skip(skip).cloned().collect();

        let total_success = runs.iter().filter(|run| run.success).count();
        let total_failures = runs.len() - total_success;
        let durations: Vec<f64> = runs.iter().map(|run| run.duration_ms as f64).collect();

        let mut model_counts: HashMap<&str, usize> = HashMap::new();
        for model in runs.iter().filter_map(|run| run.model.as_deref()) {
            *model_counts.entry(model).or_default() += 1;
        }
        let most_used_model = model_counts
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .map(|(model, _)| model.to_string());

        HistorySnapshot {
            total_runs: state.history.len(),
            limit,
            statistics: HistoryStatistics {
                total_success,
                total_failures,
                avg_duration_ms: mean(durations.iter()),
                most_used_model,
            },
            runs,
        }
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Server-level metrics
#[derive(Debug, Serialize)]
pub struct ServerMetrics {
    pub uptime_seconds: u64,
    pub start_time: String,
}

/// Request counters
#[derive(Debug, Serialize)]
pub struct RequestMetrics {
    pub total_tools_called: u64,
    pub total_resources_read: u64,
    pub total_prompts_requested: u64,
    pub requests_per_minute: f64,
}

/// Mean durations per operation kind
#[derive(Debug, Serialize)]
pub struct PerformanceMetrics {
    pub avg_tool_duration_ms: f64,
    pub avg_resource_duration_ms: f64,
    pub avg_prompt_duration_ms: f64,
}

/// Auggie run statistics
#[derive(Debug, Serialize)]
pub struct RunMetrics {
    pub total_runs: usize,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
}

/// Full metrics snapshot
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub server: ServerMetrics,
    pub requests: RequestMetrics,
    pub performance: PerformanceMetrics,
    pub auggie: RunMetrics,
}

/// Statistics over a limited history window
#[derive(Debug, Serialize)]
pub struct HistoryStatistics {
    pub total_success: usize,
    pub total_failures: usize,
    pub avg_duration_ms: f64,
    pub most_used_model: Option<String>,
}

/// Recent run history plus statistics
#[derive(Debug, Serialize)]
pub struct HistorySnapshot {
    pub total_runs: usize,
    pub limit: usize,
    pub statistics: HistoryStatistics,
    pub runs: Vec<RunRecord>,
}
