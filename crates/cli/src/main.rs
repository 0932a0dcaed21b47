//! Worker CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: `clap` flags into an immutable
//!    [`tasks::WorkerConfig`] and [`agent::AgentSettings`].
//! 2. **Wire observability**: `tracing-subscriber` on stderr, plus a rolling
//!    `tracing-appender` file in watch mode.
//! 3. **Construct infrastructure**: the Todoist client and the agent
//!    dispatcher, injected into a [`lifecycle::Controller`].
//! 4. **Run**: a single poll cycle, or the watch loop until a signal arrives.
//!
//! Exit codes: `0` success, nothing to do, or stopped by a signal; `1`
//! configuration or fatal error; `2` a single run in which some task failed.

mod args;
mod credentials;
mod logging;
mod signals;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use agent::ClaudeDispatcher;
use anyhow::Context;
use args::Args;
use clap::Parser;
use lifecycle::{Controller, CycleReport, WorkerContext};
use tasks::{TaskStore, WorkerError};
use todoist::{ClientOptions, TodoistClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// How a run ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStatus {
    Clean,
    TasksFailed,
}

fn exit_code(outcome: &anyhow::Result<RunStatus>) -> u8 {
    match outcome {
        Ok(RunStatus::Clean) => 0,
        Ok(RunStatus::TasksFailed) => 2,
        Err(_) => 1,
    }
}

/// Status of a single (non-watch) run from its one cycle.
fn single_run_status(cycle: Result<CycleReport, WorkerError>) -> Result<RunStatus, WorkerError> {
    match cycle {
        Ok(report) if report.any_failed() => Ok(RunStatus::TasksFailed),
        Ok(_) => Ok(RunStatus::Clean),
        Err(WorkerError::Interrupted) => {
            info!("Stopped.");
            Ok(RunStatus::Clean)
        }
        Err(e) => Err(e),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let workdir = match args.resolve_workdir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("error: cannot use working directory: {e}");
            return ExitCode::from(1);
        }
    };
    let log_file = args.log_file(&workdir);
    let _log_guard = match logging::init(args.verbose, args.log_format, log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(1);
        }
    };

    let outcome = run(&args, &workdir).await;
    if let Err(e) = &outcome {
        error!("{e:#}");
    }
    ExitCode::from(exit_code(&outcome))
}

async fn run(args: &Args, workdir: &Path) -> anyhow::Result<RunStatus> {
    let config = args.worker_config()?;
    let token = credentials::load_token(&args.env_file(workdir))?;
    let client = TodoistClient::new(
        &token,
        ClientOptions {
            api_base: args.api_base.clone(),
            ..ClientOptions::default()
        },
    )?;

    let settings = args.agent_settings(workdir);
    which::which(&settings.program).map_err(|_| WorkerError::AgentMissing {
        program: settings.program.clone(),
    })?;

    let shutdown = CancellationToken::new();
    signals::install(shutdown.clone()).context("cannot install signal handlers")?;

    let project = client
        .find_project(&config.project)
        .await?
        .ok_or_else(|| WorkerError::ProjectNotFound {
            name: config.project.clone(),
        })?;
    info!(project = %config.project, project_id = %project, workdir = %workdir.display(), "Watching project");
    if config.verbose {
        info!("Verbose mode: streaming agent progress");
    }

    let watch = config.watch;
    let controller = Controller::new(WorkerContext {
        store: Arc::new(client),
        dispatcher: Arc::new(ClaudeDispatcher::new(settings, shutdown.clone())),
        config,
        project,
        shutdown,
    });

    if watch {
        lifecycle::watch(&controller).await?;
        info!("Stopped.");
        return Ok(RunStatus::Clean);
    }
    Ok(single_run_status(controller.run_cycle().await)?)
}

#[cfg(test)]
mod tests {
    use tasks::{PollCycleId, ProjectName, StoreError, StoreErrorKind};

    use super::*;

    fn report() -> CycleReport {
        CycleReport {
            cycle: PollCycleId::new_random(),
            eligible: 2,
            skipped: 0,
            succeeded: 2,
            retried: 0,
            given_up: 0,
            vanished: 0,
            interrupted: false,
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&Ok(RunStatus::Clean)), 0);
        assert_eq!(exit_code(&Ok(RunStatus::TasksFailed)), 2);
        let fatal = anyhow::Error::from(WorkerError::ProjectNotFound {
            name: ProjectName::new("Demo").unwrap(),
        });
        assert_eq!(exit_code(&Err(fatal)), 1);
    }

    #[test]
    fn clean_cycle_is_clean() {
        assert_eq!(single_run_status(Ok(report())).unwrap(), RunStatus::Clean);
    }

    #[test]
    fn retried_or_given_up_tasks_fail_the_run() {
        let mut retried = report();
        retried.retried = 1;
        assert_eq!(single_run_status(Ok(retried)).unwrap(), RunStatus::TasksFailed);

        let mut given_up = report();
        given_up.given_up = 1;
        assert_eq!(single_run_status(Ok(given_up)).unwrap(), RunStatus::TasksFailed);
    }

    #[test]
    fn interrupt_is_clean() {
        assert_eq!(
            single_run_status(Err(WorkerError::Interrupted)).unwrap(),
            RunStatus::Clean
        );
    }

    #[test]
    fn store_failure_is_fatal() {
        let err = WorkerError::Store(StoreError::new(
            "list tasks",
            StoreErrorKind::Server,
            "status 503",
        ));
        assert_eq!(exit_code(&single_run_status(Err(err)).map_err(anyhow::Error::from)), 1);
    }
}
