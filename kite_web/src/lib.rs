//! # Kite Web
//!
//! The web facade of the Kite PiloteV3 firmware.
//!
//! | Route | Method | Response |
//! |---|---|---|
//! | `/` | GET | generated HTML status page |
//! | `/api/status` | GET | cached status string, `text/plain` |
//! | `/api/modules` | GET | JSON map of module name to enabled flag |
//! | `/api/modules/{name}` | PUT | `{"enabled": bool}`; 404 for unknown modules |
//!
//! The JSON routes answer 503 while the `api` module is disabled.

pub mod error;
pub mod facade;
pub mod routes;
pub mod server;
pub mod status;

pub use error::WebError;
pub use facade::{WebFacade, WebMode};
pub use server::{bind, serve};
pub use status::{StatusCache, StatusSource};
