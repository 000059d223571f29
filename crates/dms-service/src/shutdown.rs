//! Graceful shutdown signal, generalized from the teacher's own
//! `control::shutdown` (ctrl-c plus SIGTERM): waits on whichever the
//! process receives first.

use tokio::signal;

/// Resolves on either Ctrl-C or (on unix) SIGTERM. Used as axum's
/// `with_graceful_shutdown` future and as the Kafka consumer task's
/// cancellation signal (spec §5: "cancellable at shutdown; cancellation
/// drains the current message and releases the consumer connection").
pub async fn signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
