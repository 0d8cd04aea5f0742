//! HTTP server startup

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

/// Serve the API on an already bound listener until `cancel` fires
///
/// In-flight requests are allowed to complete once shutdown begins.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let app = build_router(state);

    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "API server listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    info!("API server stopped");
    Ok(())
}
