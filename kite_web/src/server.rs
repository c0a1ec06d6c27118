//! HTTP server lifecycle.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::WebError;
use crate::facade::WebFacade;

/// Bind the facade's port on all interfaces. Port 0 picks a free port.
pub async fn bind(facade: &WebFacade) -> Result<TcpListener, WebError> {
    let port = facade.get_server_port();
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| WebError::Bind { port, source })
}

/// Serve the facade's routes on `listener` until `shutdown` resolves.
///
/// A facade is served once: its routes are installed here.
///
/// # Errors
///
/// [`WebError::RoutesInstalled`] if the facade's routes were already
/// installed, or an I/O error from the server.
pub async fn serve<F>(
    facade: Arc<WebFacade>,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), WebError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = facade
        .install_routes(Router::new())
        .map_err(|_| WebError::RoutesInstalled)?;
    let local_addr = listener.local_addr()?;

    info!("Starting web server on {}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Web server shutdown complete");
    Ok(())
}
