//! Graceful shutdown: Ctrl-C cancels the running pipeline

use tokio_util::sync::CancellationToken;

/// Cancel `token` on the first SIGINT/Ctrl-C.
///
/// Must be called inside a Tokio runtime. The listener task ends on its own
/// once the token is cancelled for any other reason.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    log::warn!("Shutdown requested, cancelling pipeline");
                    token.cancel();
                }
                Err(e) => log::warn!("Cannot listen for Ctrl-C: {e}"),
            },
        }
    })
}
