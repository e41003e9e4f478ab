//! Cancels a run when the process receives an interrupt or termination signal

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Signal listener bound to one run's cancellation token
pub struct SignalCancel {
    token: CancellationToken,
    stop: CancellationToken,
    listener: Option<JoinHandle<()>>,
}

impl SignalCancel {
    /// Starts listening. Must be called from inside the tokio runtime.
    pub fn arm() -> Self {
        let token = CancellationToken::new();
        let stop = CancellationToken::new();

        let listener = tokio::spawn({
            let token = token.clone();
            let stop = stop.clone();
            async move {
                tokio::select! {
                    _ = stop.cancelled() => {}
                    received = wait_for_signal() => match received {
                        Ok(name) => {
                            info!("Received {}, canceling", name);
                            token.cancel();
                        }
                        Err(e) => warn!("Can't listen for signals: {}", e),
                    },
                }
            }
        });

        Self {
            token,
            stop,
            listener: Some(listener),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stops listening and waits for the listener to exit.
    ///
    /// A signal arriving after this returns no longer touches the token.
    pub async fn disarm(mut self) {
        self.stop.cancel();
        if let Some(listener) = self.listener.take() {
            let _ = listener.await;
        }
    }
}

impl Drop for SignalCancel {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = hangup.recv() => Ok("SIGHUP"),
        _ = quit.recv() => Ok("SIGQUIT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
