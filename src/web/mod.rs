// src/web/mod.rs
// HTTP surface: chat relay, protected image, contact form

pub mod chat;
pub mod contact;
pub mod error;
pub mod image;
pub mod state;

pub use state::AppState;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let version_header = SetResponseHeaderLayer::if_not_present(
        header::HeaderName::from_static("x-folio-version"),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );

    let api_router = Router::new()
        .route(
            "/chat",
            post(chat::chat).layer(DefaultBodyLimit::max(chat::CHAT_BODY_LIMIT)),
        )
        .route("/protected-image", get(image::protected_image))
        .route("/send-message", post(contact::send_message));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router)
        .layer(version_header)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness plus which optional features are wired up
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chat": state.relay.is_configured(),
        "mail": state.mailer.is_configured(),
    }))
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "Folio relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
