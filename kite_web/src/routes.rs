//! HTTP route handlers.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, put},
};
use kite_common::modules::Modules;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::facade::WebFacade;

#[derive(Debug, Deserialize)]
pub struct ModuleUpdate {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ModuleState {
    pub module: String,
    pub enabled: bool,
    pub previous: bool,
}

fn module_map(enabled: Modules) -> BTreeMap<String, bool> {
    Modules::all()
        .iter_names()
        .map(|(name, flag)| (name.to_ascii_lowercase(), enabled.contains(flag)))
        .collect()
}

/// JSON API routes answer 503 while the `api` module is switched off.
fn api_disabled(facade: &WebFacade) -> Option<Response> {
    if facade.modules().is_enabled(Modules::API) {
        return None;
    }
    Some(
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "api module disabled" })),
        )
            .into_response(),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

async fn index(State(facade): State<Arc<WebFacade>>) -> Html<String> {
    let status = escape_html(&facade.get_system_status_string());
    let enabled = facade.modules().snapshot();

    let mut page = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Kite PiloteV3</title></head><body>\n<h1>Kite PiloteV3</h1>\n",
    );
    let _ = write!(page, "<pre id=\"status\">{status}</pre>\n<table id=\"modules\">\n");
    for (name, on) in module_map(enabled) {
        let state = if on { "on" } else { "off" };
        let _ = writeln!(page, "<tr><td>{name}</td><td class=\"{state}\">{state}</td></tr>");
    }
    page.push_str("</table>\n</body></html>\n");
    Html(page)
}

async fn status(State(facade): State<Arc<WebFacade>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        facade.get_system_status_string(),
    )
}

async fn list_modules(State(facade): State<Arc<WebFacade>>) -> Response {
    if let Some(rejection) = api_disabled(&facade) {
        return rejection;
    }
    Json(module_map(facade.modules().snapshot())).into_response()
}

async fn set_module(
    State(facade): State<Arc<WebFacade>>,
    Path(name): Path<String>,
    Json(update): Json<ModuleUpdate>,
) -> Response {
    if let Some(rejection) = api_disabled(&facade) {
        return rejection;
    }
    let Some(module) = Modules::from_lowercase_name(&name) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown module: {name}") })),
        )
            .into_response();
    };

    let previous = facade.modules().set(module, update.enabled).contains(module);
    if previous != update.enabled {
        info!(module = %name, enabled = update.enabled, "module switched via API");
        facade.status_cache().invalidate();
    }

    Json(ModuleState {
        module: name.to_ascii_lowercase(),
        enabled: update.enabled,
        previous,
    })
    .into_response()
}

pub fn router(facade: Arc<WebFacade>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/api/modules", get(list_modules))
        .route("/api/modules/{name}", put(set_module))
        .with_state(facade)
}
