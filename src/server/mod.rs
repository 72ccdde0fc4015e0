//! JSON API server with a static-file fallback for the public site assets.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::content::{Article, Category, PatchNote};
use crate::maintenance::{self, Maintenance};
use crate::status::{self, ServerStatus};
use crate::Site;

/// Server state
struct AppState {
    site: Site,
}

/// Handler error: status code plus a short message for the response body.
type ApiError = (StatusCode, String);

fn internal<E: Display>(err: E) -> ApiError {
    tracing::error!("request failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal error".to_string(),
    )
}

fn not_found(what: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

/// Build the API router over a site.
pub fn router(site: Site) -> Router {
    let public_dir = site.public_dir.clone();
    let state = Arc::new(AppState { site });

    let api = Router::new()
        .route("/status", get(server_status))
        .route("/maintenance", get(maintenance_status))
        .route("/patch-notes", get(list_patch_notes))
        .route("/patch-notes/:slug", get(get_patch_note))
        .route("/content/:category", get(list_content))
        .route("/content/:category/:id", get(get_content));

    Router::new()
        .nest("/api", api)
        .fallback_service(ServeDir::new(&public_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    let app = router(site.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("API server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Ping the game server. Failures are part of the contract: the endpoint
/// always answers 200 with the offline shape when the server is unreachable.
async fn server_status(State(state): State<Arc<AppState>>) -> Json<ServerStatus> {
    let game = &state.site.config.game;
    let timeout = Duration::from_millis(game.timeout_ms);
    match status::ping(&game.host, game.port, timeout).await {
        Ok(status) => Json(status),
        Err(e) => {
            tracing::debug!("game server ping failed: {}", e);
            Json(ServerStatus::offline())
        }
    }
}

async fn maintenance_status(State(state): State<Arc<AppState>>) -> Json<Maintenance> {
    let config = &state.site.config;
    Json(maintenance::fetch(&config.calendar, config.tz()).await)
}

async fn list_patch_notes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PatchNote>>, ApiError> {
    let store = state.site.store();
    let notes = tokio::task::spawn_blocking(move || store.patch_notes())
        .await
        .map_err(internal)?
        .map_err(internal)?;
    Ok(Json(notes))
}

async fn get_patch_note(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<PatchNote>, ApiError> {
    let store = state.site.store();
    let note = tokio::task::spawn_blocking(move || store.patch_note(&slug))
        .await
        .map_err(internal)?
        .map_err(internal)?
        .ok_or_else(|| not_found("patch note"))?;
    Ok(Json(note))
}

async fn list_content(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let category: Category = category.parse().map_err(|_| not_found("category"))?;
    let store = state.site.store();
    let articles = tokio::task::spawn_blocking(move || store.list(category))
        .await
        .map_err(internal)?
        .map_err(internal)?;
    Ok(Json(articles))
}

async fn get_content(
    State(state): State<Arc<AppState>>,
    Path((category, id)): Path<(String, String)>,
) -> Result<Json<Article>, ApiError> {
    let category: Category = category.parse().map_err(|_| not_found("category"))?;
    let store = state.site.store();
    let article = tokio::task::spawn_blocking(move || store.get(category, &id))
        .await
        .map_err(internal)?
        .map_err(internal)?
        .ok_or_else(|| not_found("article"))?;
    Ok(Json(article))
}
