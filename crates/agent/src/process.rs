//! Process-group supervision for the agent child.

use std::process::ExitStatus;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How waiting on the child ended.
#[derive(Debug)]
pub(crate) enum Exit {
    Exited(ExitStatus),
    TimedOut,
    Interrupted,
}

/// The process group led by the agent child.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcessGroup(Pid);

impl ProcessGroup {
    /// The group of a child spawned with `process_group(0)`; its id equals the
    /// child's pid. `None` once the child has been reaped.
    pub fn of(child: &Child) -> Option<Self> {
        let pid = i32::try_from(child.id()?).ok()?;
        Some(Self(Pid::from_raw(pid)))
    }

    /// Sends `signal` to every member. A group that no longer exists is fine.
    pub fn signal(&self, signal: Signal) {
        match killpg(self.0, signal) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(errno) => warn!(pgid = self.0.as_raw(), %signal, %errno, "Failed to signal agent process group"),
        }
    }
}

/// Kills whatever is left of the group when dropped.
pub(crate) struct GroupGuard(ProcessGroup);

impl GroupGuard {
    pub fn new(group: ProcessGroup) -> Self {
        Self(group)
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.0.signal(Signal::SIGKILL);
    }
}

/// Waits for the child, terminating the whole group when `timeout` elapses or
/// `shutdown` fires first.
pub(crate) async fn wait_bounded(
    child: &mut Child,
    group: ProcessGroup,
    timeout: Duration,
    grace: Duration,
    shutdown: &CancellationToken,
) -> std::io::Result<Exit> {
    tokio::select! {
        status = child.wait() => Ok(Exit::Exited(status?)),
        _ = tokio::time::sleep(timeout) => {
            terminate(child, group, grace).await?;
            Ok(Exit::TimedOut)
        }
        _ = shutdown.cancelled() => {
            terminate(child, group, grace).await?;
            Ok(Exit::Interrupted)
        }
    }
}

/// SIGTERM to the group, up to `grace` for the leader to exit, then SIGKILL to
/// the group and reap the leader.
async fn terminate(child: &mut Child, group: ProcessGroup, grace: Duration) -> std::io::Result<()> {
    group.signal(Signal::SIGTERM);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => debug!(status = ?status.ok(), "Agent exited after SIGTERM"),
        Err(_) => debug!(grace_ms = grace.as_millis() as u64, "Agent ignored SIGTERM"),
    }
    group.signal(Signal::SIGKILL);
    child.wait().await.map(|_| ())
}
