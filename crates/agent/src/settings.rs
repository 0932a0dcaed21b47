use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PROGRAM: &str = "claude";
pub const DEFAULT_MODEL: &str = "sonnet";
const DEFAULT_SHELL_PREFIX: &str = "uv run";
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_OUTPUT_LIMIT: usize = 4 * 1024 * 1024;

/// Variables removed from the agent's environment.
///
/// `ANTHROPIC_API_KEY` would bill the agent to the worker's key instead of the
/// agent's own login; the other two make the CLI believe it runs nested inside
/// another agent session.
pub const STRIPPED_ENV: &[&str] = &["ANTHROPIC_API_KEY", "CLAUDECODE", "CLAUDE_CODE_ENTRYPOINT"];

/// A tool the agent is allowed to use without asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    FileRead,
    FileWrite,
    FileSearch,
    ContentSearch,
    /// Shell commands starting with `prefix`.
    Shell { prefix: String },
}

impl Capability {
    /// Name as understood by `--allowedTools`.
    pub fn tool_name(&self) -> String {
        match self {
            Self::FileRead => "Read".to_string(),
            Self::FileWrite => "Write".to_string(),
            Self::FileSearch => "Glob".to_string(),
            Self::ContentSearch => "Grep".to_string(),
            Self::Shell { prefix } => format!("Bash({prefix}:*)"),
        }
    }

    /// The four file capabilities, without shell access.
    pub fn file_access() -> Vec<Self> {
        vec![
            Self::FileRead,
            Self::FileWrite,
            Self::FileSearch,
            Self::ContentSearch,
        ]
    }
}

/// How the dispatcher launches the agent. Fixed for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Executable name or path.
    pub program: String,
    pub model: String,
    /// Working directory of the agent, and the root of everything it may touch.
    pub workdir: PathBuf,
    pub capabilities: Vec<Capability>,
    /// Environment variables removed before spawning.
    pub stripped_env: Vec<String>,
    /// Time between SIGTERM and SIGKILL when the group must be torn down.
    pub kill_grace: Duration,
    /// Ask for streamed output and log each tool use as it happens.
    pub stream_progress: bool,
    /// Per-stream capture limit in bytes; the rest is read and discarded.
    pub output_limit: usize,
}

impl AgentSettings {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let mut capabilities = Capability::file_access();
        capabilities.push(Capability::Shell {
            prefix: DEFAULT_SHELL_PREFIX.to_string(),
        });
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            model: DEFAULT_MODEL.to_string(),
            workdir: workdir.into(),
            capabilities,
            stripped_env: STRIPPED_ENV.iter().map(|v| v.to_string()).collect(),
            kill_grace: DEFAULT_KILL_GRACE,
            stream_progress: false,
            output_limit: DEFAULT_OUTPUT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names() {
        let names: Vec<String> = AgentSettings::new(".")
            .capabilities
            .iter()
            .map(Capability::tool_name)
            .collect();
        assert_eq!(names, vec!["Read", "Write", "Glob", "Grep", "Bash(uv run:*)"]);
    }

    #[test]
    fn defaults() {
        let settings = AgentSettings::new("/work");
        assert_eq!(settings.program, "claude");
        assert_eq!(settings.model, "sonnet");
        assert_eq!(settings.kill_grace, Duration::from_secs(2));
        assert!(settings.stripped_env.contains(&"CLAUDECODE".to_string()));
        assert!(!settings.stream_progress);
    }
}
