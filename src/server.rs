use crate::api::{self, AppState};
use crate::error::{ServerError, StartupError};
use crate::services::dispatcher::PushDispatcher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Listening,
    Draining,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished within the grace period.
    Graceful,
    /// The grace period ran out and outstanding requests were aborted.
    Forced,
}

/// The listening HTTP server and its shutdown controls.
///
/// Signal handling is left to the caller; `shutdown` is the only way to stop the server.
#[derive(Debug)]
pub struct PushServer {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    hard_stop: CancellationToken,
    phase: watch::Sender<Phase>,
    task: JoinHandle<std::io::Result<()>>,
}

impl PushServer {
    /// Binds `address` and starts serving in a background task.
    ///
    /// # Errors
    /// Returns `StartupError::Bind` if the address cannot be bound.
    pub async fn start(address: &str, dispatcher: Arc<PushDispatcher>) -> Result<Self, StartupError> {
        let phase = watch::Sender::new(Phase::Starting);
        let bind_error = |source| StartupError::Bind { address: address.to_string(), source };
        let listener = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let hard_stop = CancellationToken::new();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let app = api::app_router(AppState { dispatcher, hard_stop: hard_stop.clone() });

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.wait_for(|&s| s).await;
                })
                .await
        });

        tracing::info!(listen_address = %local_addr, "Starting server");
        phase.send_replace(Phase::Listening);

        Ok(Self { local_addr, shutdown_tx, hard_stop, phase, task })
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Resolves only if the listener stops on its own.
    ///
    /// The server cannot be shut down after this returns.
    ///
    /// # Errors
    /// Always returns the reason the listener stopped.
    pub async fn wait(&mut self) -> Result<(), ServerError> {
        let joined = (&mut self.task).await;
        self.phase.send_replace(Phase::Stopped);
        match joined {
            Ok(Ok(())) => Err(ServerError::Stopped),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stops accepting connections and gives in-flight requests up to `grace` to finish.
    ///
    /// Requests still running after `grace` have their provider calls abandoned and the
    /// server task is aborted. Both outcomes count as a clean shutdown.
    ///
    /// # Errors
    /// Returns a `ServerError` if the listener failed while draining.
    pub async fn shutdown(mut self, grace: Duration) -> Result<ShutdownOutcome, ServerError> {
        self.phase.send_replace(Phase::Draining);
        tracing::info!(grace_ms = grace.as_millis(), "Shutting down, draining in-flight requests");
        let _ = self.shutdown_tx.send(true);

        let result = match tokio::time::timeout(grace, &mut self.task).await {
            Ok(Ok(Ok(()))) => Ok(ShutdownOutcome::Graceful),
            Ok(Ok(Err(e))) => Err(ServerError::from(e)),
            Ok(Err(e)) => Err(ServerError::from(e)),
            Err(_) => {
                tracing::warn!("Grace period expired, aborting outstanding requests");
                self.hard_stop.cancel();
                self.task.abort();
                Ok(ShutdownOutcome::Forced)
            }
        };

        self.phase.send_replace(Phase::Stopped);
        match &result {
            Ok(outcome) => tracing::info!(?outcome, "Server stopped"),
            Err(e) => tracing::error!(error = %e, "Server failed while draining"),
        }
        result
    }
}
