//! Agent output: bounded capture, summary parsing, progress lines.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tasks::{AgentSummary, UsdCost};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::info;

/// Text captured from one output stream.
#[derive(Debug, Default)]
pub(crate) struct Captured {
    pub text: String,
    /// Bytes past the limit were discarded.
    pub truncated: bool,
}

/// Reads `reader` to EOF, keeping at most `limit` bytes and handing every line
/// to `on_line`. Reading continues past the limit so the child never blocks on
/// a full pipe.
///
/// Memory stays bounded by `limit` however long a line runs: a line longer
/// than `limit` is never buffered whole and is not passed to `on_line`.
pub(crate) async fn capture<R, F>(reader: Option<R>, limit: usize, mut on_line: F) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let Some(reader) = reader else {
        return Ok(Captured::default());
    };
    let mut reader = BufReader::new(reader);
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut line = Vec::new();
    let mut oversized = false;
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            break;
        }
        let read = chunk.len();

        let room = limit.saturating_sub(kept.len());
        if read > room {
            truncated = true;
        }
        kept.extend_from_slice(&chunk[..read.min(room)]);

        for piece in chunk.split_inclusive(|byte| *byte == b'\n') {
            if !oversized {
                if line.len() + piece.len() > limit {
                    oversized = true;
                    line = Vec::new();
                } else {
                    line.extend_from_slice(piece);
                }
            }
            if piece.ends_with(b"\n") {
                if !oversized {
                    on_line(&String::from_utf8_lossy(&line));
                }
                line.clear();
                oversized = false;
            }
        }
        reader.consume(read);
    }
    if !oversized && !line.is_empty() {
        on_line(&String::from_utf8_lossy(&line));
    }
    Ok(Captured {
        text: String::from_utf8_lossy(&kept).into_owned(),
        truncated,
    })
}

/// Extracts the result text and cost from the agent's stdout.
///
/// Accepts a single JSON document, or JSON lines of which the last one carrying
/// a result wins. Anything unparseable yields an empty summary.
pub fn parse_summary(stdout: &str) -> AgentSummary {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return AgentSummary::default();
    }
    if let Some(summary) = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|value| summary_from(&value))
    {
        return summary;
    }
    trimmed
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .find_map(|value| summary_from(&value))
        .unwrap_or_default()
}

fn summary_from(value: &Value) -> Option<AgentSummary> {
    let object = value.as_object()?;
    let result = object.get("result").and_then(Value::as_str).map(str::to_string);
    let cost = ["total_cost_usd", "cost_usd"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_f64))
        .and_then(UsdCost::new);
    if result.is_none() && cost.is_none() {
        return None;
    }
    Some(AgentSummary { result, cost })
}

/// One-line description of a tool the agent invoked, or `None` for tools not
/// worth reporting.
pub fn describe_tool_use(name: &str, input: &Value, workdir: &Path) -> Option<String> {
    let field = |key: &str| input.get(key).and_then(Value::as_str).unwrap_or_default();
    let relative = |path: &str| {
        Path::new(path)
            .strip_prefix(workdir)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.to_string())
    };
    match name {
        "Read" => Some(format!("Reading {}", relative(field("file_path")))),
        "Write" => Some(format!("Writing {}", relative(field("file_path")))),
        "Bash" => match field("command").split_whitespace().next() {
            Some(program) => Some(format!("Running {program}")),
            None => Some("Running command".to_string()),
        },
        "Glob" => Some("Searching files".to_string()),
        "Grep" => Some("Searching content".to_string()),
        _ => None,
    }
}

/// Logs each distinct tool use seen in streamed agent output.
pub(crate) struct ProgressReporter {
    workdir: std::path::PathBuf,
    seen: HashSet<String>,
}

impl ProgressReporter {
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            seen: HashSet::new(),
        }
    }

    pub fn observe(&mut self, line: &str) {
        let Ok(event) = serde_json::from_str::<Value>(line.trim()) else {
            return;
        };
        if event.get("type").and_then(Value::as_str) != Some("assistant") {
            return;
        }
        let blocks = event
            .pointer("/message/content")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for block in blocks {
            if block.get("type").and_then(Value::as_str) != Some("tool_use") {
                continue;
            }
            let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
            let input = block.get("input").unwrap_or(&Value::Null);
            if let Some(description) = describe_tool_use(name, input, &self.workdir) {
                if self.seen.insert(description.clone()) {
                    info!("{description}");
                }
            }
        }
    }

    #[cfg(test)]
    fn seen(&self) -> usize {
        self.seen.len()
    }
}
