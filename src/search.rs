//! Workspace text search with a fallback chain
//!
//! Tries `rg`, then `grep`, then a built-in recursive scan. The external
//! searchers run through the invocation core, so a missing binary surfaces
//! as a classified `NotInstalled` outcome and selects the next link instead
//! of being guessed from stderr text.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::auggie::{runner, AuggieRunResult, CommandSpec};
use crate::errors::AuggieError;

/// Deadline for one external searcher run
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Result cap applied when the caller does not set one
pub const DEFAULT_MAX_RESULTS: usize = 100;

/// Files larger than this are skipped by the built-in scan
const BUILTIN_SCAN_MAX_FILE_BYTES: u64 = 1_048_576;

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub path: String,
    pub line: u64,
    pub text: String,
}

/// Search results plus which backend produced them
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub pattern: String,
    pub root: String,
    pub backend: String,
    pub total: usize,
    pub truncated: bool,
    pub matches: Vec<SearchMatch>,
}

enum SearcherOutcome {
    Stdout(String),
    Missing,
    Failed(AuggieError),
}

/// Search `root` for `pattern`, falling back from rg to grep to the
/// built-in scan.
pub async fn search_workspace(
    root: &str,
    pattern: &str,
    max_results: usize,
) -> Result<SearchReport> {
    let root_path = crate::workspace::expand_workspace(root);
    if !root_path.is_dir() {
        anyhow::bail!("Search root is not a directory: {root}");
    }
    let root_str = root_path.display().to_string();

    for (backend, args) in [
        (
            "rg",
            vec![
                "--line-number",
                "--no-heading",
                "--color",
                "never",
                pattern,
                root_str.as_str(),
            ],
        ),
        ("grep", vec!["-rn", pattern, root_str.as_str()]),
    ] {
        match interpret(run_searcher(backend, &args).await) {
            SearcherOutcome::Stdout(stdout) => {
                let (matches, truncated) = take_matches(parse_matches(&stdout), max_results);
                return Ok(report(pattern, &root_str, backend, matches, truncated));
            }
            SearcherOutcome::Missing => {
                debug!(backend, "searcher not installed, falling back");
            }
            SearcherOutcome::Failed(err) => {
                return Err(err).with_context(|| format!("{backend} search failed"));
            }
        }
    }

    let mut matches = Vec::new();
    builtin_scan(&root_path, pattern, max_results + 1, &mut matches)?;
    let (matches, truncated) = take_matches(matches, max_results);
    Ok(report(pattern, &root_str, "builtin", matches, truncated))
}

async fn run_searcher(binary: &str, args: &[&str]) -> std::result::Result<AuggieRunResult, AuggieError> {
    let spec = CommandSpec::new(binary)
        .args(args.iter().copied())
        .with_timeout(SEARCH_TIMEOUT);
    runner::run(spec).await
}

/// Classify one searcher outcome. Exit code 1 with empty output is the
/// searchers' "no matches", not a failure.
fn interpret(outcome: std::result::Result<AuggieRunResult, AuggieError>) -> SearcherOutcome {
    match outcome {
        Ok(result) => SearcherOutcome::Stdout(result.stdout),
        Err(AuggieError::NotInstalled { .. }) => SearcherOutcome::Missing,
        Err(AuggieError::CommandFailed { result })
            if result.exit_code == 1 && result.stdout.trim().is_empty() =>
        {
            SearcherOutcome::Stdout(String::new())
        }
        Err(err) => SearcherOutcome::Failed(err),
    }
}

/// Parse `path:line:text` records; lines not matching the shape are skipped.
fn parse_matches(stdout: &str) -> Vec<SearchMatch> {
    stdout
        .lines()
        .filter_map(|line| {
            let (path, rest) = line.split_once(':')?;
            let (line_no, text) = rest.split_once(':')?;
            let line_no: u64 = line_no.parse().ok()?;
            Some(SearchMatch {
                path: path.to_string(),
                line: line_no,
                text: text.to_string(),
            })
        })
        .collect()
}

fn take_matches(mut matches: Vec<SearchMatch>, max_results: usize) -> (Vec<SearchMatch>, bool) {
    let truncated = matches.len() > max_results;
    matches.truncate(max_results);
    (matches, truncated)
}

fn report(
    pattern: &str,
    root: &str,
    backend: &str,
    matches: Vec<SearchMatch>,
    truncated: bool,
) -> SearchReport {
    SearchReport {
        pattern: pattern.to_string(),
        root: root.to_string(),
        backend: backend.to_string(),
        total: matches.len(),
        truncated,
        matches,
    }
}

/// Recursive substring scan; skips hidden entries, `target/`, and oversized
/// files. Stops once `limit` matches are collected.
fn builtin_scan(
    dir: &Path,
    pattern: &str,
    limit: usize,
    matches: &mut Vec<SearchMatch>,
) -> Result<()> {
    let read_dir = fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    let mut entries: Vec<_> = read_dir.filter_map(|entry| entry.ok()).collect();
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        if matches.len() >= limit {
            return Ok(());
        }
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == "target" {
            continue;
        }

        if path.is_dir() {
            builtin_scan(&path, pattern, limit, matches)?;
        } else if path.is_file() {
            let size = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
            if size > BUILTIN_SCAN_MAX_FILE_BYTES {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else { continue };
            let text = String::from_utf8_lossy(&bytes);
            for (index, line) in text.lines().enumerate() {
                if line.contains(pattern) {
                    matches.push(SearchMatch {
                        path: path.display().to_string(),
                        line: (index + 1) as u64,
                        text: line.to_string(),
                    });
                    if matches.len() >= limit {
                        return Ok(());
                    }
                }
            }
        }
    }
    Ok(())
}
