#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use anyhow::Context;
use gomuks_push::adapters::push::FcmPushProvider;
use gomuks_push::config::Config;
use gomuks_push::server::PushServer;
use gomuks_push::services::dispatcher::PushDispatcher;
use gomuks_push::services::translator::MessageTranslator;
use gomuks_push::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    gomuks_push::setup_panic_hook();

    let result = run(config).await;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "Push gateway exited with an error");
    }

    telemetry_guard.shutdown();
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let boot_span = tracing::info_span!("boot_server");
    let mut server = async {
        let provider = FcmPushProvider::from_config(&config.fcm).context("Failed to initialize FCM client")?;
        let translator = MessageTranslator::new(config.fcm.package_name.clone());
        let dispatcher = Arc::new(PushDispatcher::new(Arc::new(provider), translator));

        PushServer::start(&config.server.listen_address(), dispatcher).await.context("Failed to start server")
    }
    .instrument(boot_span)
    .await?;

    tokio::select! {
        () = shutdown_signal() => {}
        res = server.wait() => return res.context("Listener stopped unexpectedly"),
    }

    server.shutdown(Duration::from_secs(config.server.shutdown_timeout_secs)).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Received shutdown signal");
}
