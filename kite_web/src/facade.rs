//! The firmware's view of its HTTP server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use axum::Router;
use kite_common::modules::ModuleSwitches;
use tracing::{info, warn};

use crate::routes;
use crate::status::StatusCache;

/// How page content is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WebMode {
    /// Pages are generated in code. The only mode this build serves.
    Generated = 0,
    /// Pages come from a file system image.
    Files = 1,
}

impl WebMode {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Files,
            _ => Self::Generated,
        }
    }
}

/// Route table, port, delivery mode and cached status of the web server.
#[derive(Debug)]
pub struct WebFacade {
    port: u16,
    mode: AtomicU8,
    status: StatusCache,
    modules: Arc<ModuleSwitches>,
    routes_installed: AtomicBool,
}

impl WebFacade {
    pub fn new(port: u16, status: StatusCache, modules: Arc<ModuleSwitches>) -> Self {
        Self {
            port,
            mode: AtomicU8::new(WebMode::Generated as u8),
            status,
            modules,
            routes_installed: AtomicBool::new(false),
        }
    }

    /// Merge the facade's routes into `router`.
    ///
    /// Routes are installed once per facade. Later calls log a warning and
    /// return `router` unchanged.
    pub fn setup_routes(self: &Arc<Self>, router: Router) -> Router {
        self.install_routes(router).unwrap_or_else(|router| {
            warn!("web routes already installed; ignoring repeated setup");
            router
        })
    }

    /// As [`setup_routes`](Self::setup_routes), but hands `router` back
    /// unchanged as the error if the routes were already installed.
    pub fn install_routes(self: &Arc<Self>, router: Router) -> Result<Router, Router> {
        if self.routes_installed.swap(true, Ordering::AcqRel) {
            return Err(router);
        }
        info!(port = self.port, "web routes installed");
        Ok(router.merge(routes::router(Arc::clone(self))))
    }

    #[inline]
    pub fn get_server_port(&self) -> u16 {
        self.port
    }

    /// Select file-backed (`true`) or generated (`false`) pages.
    ///
    /// The choice is recorded, but only generated pages are served.
    pub fn set_webserver_mode(&self, use_files: bool) {
        let mode = if use_files {
            WebMode::Files
        } else {
            WebMode::Generated
        };
        self.mode.store(mode as u8, Ordering::Relaxed);
        if use_files {
            warn!("file-backed web mode selected but not available; serving generated pages");
        }
    }

    #[inline]
    pub fn webserver_mode(&self) -> WebMode {
        WebMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    /// Human-readable status, at most one refresh interval old.
    pub fn get_system_status_string(&self) -> String {
        self.status.get()
    }

    pub(crate) fn status_cache(&self) -> &StatusCache {
        &self.status
    }

    pub fn modules(&self) -> &ModuleSwitches {
        &self.modules
    }
}
