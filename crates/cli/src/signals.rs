use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `shutdown` on the first SIGINT or SIGTERM.
pub fn install(shutdown: CancellationToken) -> std::io::Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Interrupt received, shutting down"),
            _ = terminate.recv() => info!("SIGTERM received, shutting down"),
        }
        shutdown.cancel();
    });
    Ok(())
}
