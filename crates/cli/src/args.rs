use std::path::{Path, PathBuf};
use std::time::Duration;

use agent::{AgentSettings, Capability, DEFAULT_MODEL, DEFAULT_PROGRAM};
use clap::{value_parser, Parser, ValueEnum};
use tasks::labels::DEFAULT_LABEL_PREFIX;
use tasks::{LabelVocabulary, ProjectName, WorkerConfig, WorkerError};

const DEFAULT_LOG_FILE: &str = "agent_worker.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Dispatch open tasks of a task-tracker project to a command-line AI agent.
#[derive(Parser, Debug)]
#[command(name = "worker", version, about)]
pub struct Args {
    /// Project to take tasks from (matched case-insensitively)
    #[arg(long)]
    pub project: String,

    /// Poll continuously instead of running once
    #[arg(long)]
    pub watch: bool,

    /// Seconds between polls in watch mode
    #[arg(long, default_value_t = 30, value_parser = value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Per-task timeout in seconds
    #[arg(long, default_value_t = 300, value_parser = value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Give up on a task after N failed attempts
    #[arg(long, default_value_t = 3, value_parser = value_parser!(u32).range(1..))]
    pub max_retries: u32,

    /// Stream agent progress and log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Agent executable
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    pub agent_bin: String,

    /// Model passed to the agent
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Directory the agent works in (default: current directory)
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Shell commands the agent may run without asking, by prefix
    #[arg(long, default_value = "uv run")]
    pub shell_prefix: String,

    /// Do not allow the agent any shell command
    #[arg(long, conflicts_with = "shell_prefix")]
    pub no_shell: bool,

    /// Prefix of the labels the worker owns
    #[arg(long, default_value = DEFAULT_LABEL_PREFIX)]
    pub label_prefix: String,

    /// Close tasks in the tracker after a successful run
    #[arg(long)]
    pub close_on_success: bool,

    /// Dotfile holding TODOIST_API_TOKEN, relative to the workdir
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,

    /// Log file for watch mode, relative to the workdir
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Base URL of the task tracker API
    #[arg(long, default_value = todoist::DEFAULT_API_BASE)]
    pub api_base: String,
}

impl Args {
    pub fn resolve_workdir(&self) -> std::io::Result<PathBuf> {
        match &self.workdir {
            Some(dir) => dir.canonicalize(),
            None => std::env::current_dir(),
        }
    }

    pub fn env_file(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.env_file)
    }

    /// Only watch mode writes a log file.
    pub fn log_file(&self, workdir: &Path) -> Option<PathBuf> {
        self.watch.then(|| {
            workdir.join(
                self.log_file
                    .as_deref()
                    .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE)),
            )
        })
    }

    pub fn worker_config(&self) -> Result<WorkerConfig, WorkerError> {
        let project = ProjectName::new(self.project.trim())
            .ok_or_else(|| WorkerError::configuration("--project must not be empty"))?;
        if self.label_prefix.trim().is_empty() {
            return Err(WorkerError::configuration("--label-prefix must not be empty"));
        }

        let mut config = WorkerConfig::new(project);
        config.watch = self.watch;
        config.poll_interval = Duration::from_secs(self.interval);
        config.task_timeout = Duration::from_secs(self.timeout);
        config.max_retries = self.max_retries;
        config.verbose = self.verbose;
        config.labels = LabelVocabulary::with_prefix(self.label_prefix.trim());
        config.close_on_success = self.close_on_success;
        config.validate()?;
        Ok(config)
    }

    pub fn agent_settings(&self, workdir: &Path) -> AgentSettings {
        let mut settings = AgentSettings::new(workdir);
        settings.program = self.agent_bin.clone();
        settings.model = self.model.clone();
        settings.stream_progress = self.verbose;
        settings.capabilities = Capability::file_access();
        let prefix = self.shell_prefix.trim();
        if !self.no_shell && !prefix.is_empty() {
            settings.capabilities.push(Capability::Shell {
                prefix: prefix.to_string(),
            });
        }
        settings.stripped_env.push(todoist::TOKEN_ENV.to_string());
        settings
    }
}
