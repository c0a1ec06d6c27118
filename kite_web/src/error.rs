//! Web facade errors.

use std::io;

use thiserror::Error;

/// Failure to start or run the HTTP server.
#[derive(Debug, Error)]
pub enum WebError {
    /// The listening socket could not be bound.
    #[error("failed to bind web server on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The facade's routes are already installed on another router.
    #[error("web routes already installed; a facade is served once")]
    RoutesInstalled,

    /// The server stopped with an I/O error.
    #[error("web server failed: {0}")]
    Serve(#[from] io::Error),
}
