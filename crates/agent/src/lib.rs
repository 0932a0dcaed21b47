//! Agent dispatcher.
//!
//! Implements [`tasks::AgentDispatcher`] by running the agent CLI (`claude` by
//! default) once per task:
//!
//! - the prompt is the task title, plus the description when there is one;
//! - the child gets its own process group, a null stdin, and the worker's
//!   environment minus credentials that would let it act as another principal
//!   or believe it runs nested inside another agent session;
//! - stdout and stderr are captured concurrently up to a byte cap;
//! - on timeout or shutdown the *whole* group is sent SIGTERM, then SIGKILL
//!   after a grace period, so descendants of the agent are reaped too.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Process management and the agent's output contract live
//! here. The `lifecycle` crate only sees [`tasks::DispatchResult`].

mod command;
mod dispatcher;
mod output;
mod process;
mod settings;

pub use command::{build_args, build_prompt};
pub use dispatcher::ClaudeDispatcher;
pub use output::{describe_tool_use, parse_summary};
pub use settings::{AgentSettings, Capability, DEFAULT_MODEL, DEFAULT_PROGRAM, STRIPPED_ENV};
