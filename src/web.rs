//! Prompt editor: a tiny HTML form for replacing the system prompt.
//!
//! Every route requires HTTP Basic credentials. Saving inserts a new prompt
//! row; the pipeline picks it up once its prompt cache expires.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use buddy_channels::telegram::format::escape_html;
use buddy_core::config::WebConfig;
use buddy_memory::Store;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Shared state for web handlers.
#[derive(Clone)]
pub struct WebState {
    store: Store,
    username: String,
    password: String,
}

impl WebState {
    pub fn new(store: Store, config: &WebConfig) -> Self {
        Self {
            store,
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

/// Form body of `POST /save`.
#[derive(Debug, Deserialize)]
struct PromptForm {
    #[serde(default)]
    prompt: String,
}

/// Constant-time string comparison for credential checks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check Basic auth. Returns `None` if authorized, `Some(response)` if rejected.
fn check_auth(headers: &HeaderMap, state: &WebState) -> Option<Response> {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| BASE64.decode(encoded.trim()).ok())
        .and_then(|raw| String::from_utf8(raw).ok())
        .and_then(|creds| {
            let (user, pass) = creds.split_once(':')?;
            // Both comparisons always run.
            let user_ok = constant_time_eq(user, &state.username);
            let pass_ok = constant_time_eq(pass, &state.password);
            Some(user_ok & pass_ok)
        })
        .unwrap_or(false);

    if authorized {
        return None;
    }
    Some(
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, r#"Basic realm="Restricted""#)],
            "Unauthorized",
        )
            .into_response(),
    )
}

fn render_form(prompt: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><meta charset=\"utf-8\"><title>System prompt</title></head>\n\
         <body>\n\
         <h1>System prompt</h1>\n\
         <form method=\"post\" action=\"/save\">\n\
         <textarea name=\"prompt\" rows=\"30\" cols=\"120\">{}</textarea><br>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n\
         </body>\n\
         </html>\n",
        escape_html(prompt)
    )
}

/// `GET /`: the form, prefilled with the current prompt (uncached).
async fn index(headers: HeaderMap, State(state): State<WebState>) -> Response {
    if let Some(rejected) = check_auth(&headers, &state) {
        return rejected;
    }

    match state.store.load_system_prompt().await {
        Ok(prompt) => Html(render_form(prompt.as_deref().unwrap_or_default())).into_response(),
        Err(e) => {
            error!("failed to load system prompt: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load prompt").into_response()
        }
    }
}

/// `POST /save`: store a new prompt and go back to the form.
async fn save(
    headers: HeaderMap,
    State(state): State<WebState>,
    Form(form): Form<PromptForm>,
) -> Response {
    if let Some(rejected) = check_auth(&headers, &state) {
        return rejected;
    }

    if form.prompt.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Prompt cannot be empty").into_response();
    }

    match state.store.insert_system_prompt(&form.prompt).await {
        Ok(()) => {
            info!("system prompt updated ({} chars)", form.prompt.chars().count());
            Redirect::to("/").into_response()
        }
        Err(e) => {
            error!("failed to save system prompt: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save prompt").into_response()
        }
    }
}

/// Any other method on `/save`.
async fn save_method_not_allowed(headers: HeaderMap, State(state): State<WebState>) -> Response {
    if let Some(rejected) = check_auth(&headers, &state) {
        return rejected;
    }
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response()
}

fn build_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/save", post(save).fallback(save_method_not_allowed))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}

/// Bind the prompt editor's listening socket.
pub async fn bind(config: &WebConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind((config.host.as_str(), config.port)).await
}

/// Serve the prompt editor on an already bound listener. Runs until the
/// process exits.
pub async fn serve(listener: TcpListener, config: WebConfig, store: Store) {
    let app = build_router(WebState::new(store, &config));

    match listener.local_addr() {
        Ok(addr) => info!("prompt editor listening on {addr}"),
        Err(e) => warn!("prompt editor listening on unknown address: {e}"),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("prompt editor stopped: {e}");
    }
}
