//! Axum HTTP boundary: every motion route enqueues and acknowledges
//! immediately; clients poll `/api/status`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use eyre::WrapErr;
use serde::Deserialize;
use serde_json::json;

use slider_core::{MotionProfile, SliderController, StatusSnapshot};

pub type AppState = Arc<SliderController>;

pub async fn serve(ctl: AppState, bind: &str) -> eyre::Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .wrap_err_with(|| format!("parse bind address {bind:?}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "slider API listening");
    axum::serve(listener, router(ctl))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/home", post(post_home))
        .route("/api/jog", post(post_jog))
        .route("/api/run", post(post_run))
        .route("/api/prime", post(post_prime))
        .route("/api/stop", post(post_stop))
        .route("/api/presets", get(list_presets))
        .route("/api/presets/{name}", post(save_preset).delete(delete_preset))
        .route("/api/run_preset/{name}", get(run_preset))
        .route("/api/prime_preset/{name}", get(prime_preset))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct JogRequest {
    distance_mm: f64,
    #[serde(default = "default_jog_speed")]
    speed_mm_s: f64,
}

fn default_jog_speed() -> f64 {
    50.0
}

fn ack(res: slider_core::Result<()>) -> axum::response::Response {
    match res {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("{e:#}") })),
        )
            .into_response(),
    }
}

fn reject(status: StatusCode, msg: impl std::fmt::Display) -> axum::response::Response {
    (status, Json(json!({ "error": msg.to_string() }))).into_response()
}

async fn get_status(State(ctl): State<AppState>) -> Json<StatusSnapshot> {
    Json(ctl.status())
}

async fn post_home(State(ctl): State<AppState>) -> impl IntoResponse {
    ack(ctl.enqueue_home())
}

async fn post_jog(State(ctl): State<AppState>, Json(req): Json<JogRequest>) -> impl IntoResponse {
    if !(req.speed_mm_s.is_finite() && req.speed_mm_s > 0.0) {
        return reject(StatusCode::UNPROCESSABLE_ENTITY, "speed_mm_s must be > 0");
    }
    if !req.distance_mm.is_finite() {
        return reject(StatusCode::UNPROCESSABLE_ENTITY, "distance_mm must be finite");
    }
    ack(ctl.enqueue_jog(req.distance_mm, req.speed_mm_s))
}

async fn post_run(
    State(ctl): State<AppState>,
    Json(profile): Json<MotionProfile>,
) -> impl IntoResponse {
    match profile.validated() {
        Ok(profile) => ack(ctl.enqueue_run_profile(profile)),
        Err(e) => reject(StatusCode::UNPROCESSABLE_ENTITY, e),
    }
}

async fn post_prime(
    State(ctl): State<AppState>,
    Json(profile): Json<MotionProfile>,
) -> impl IntoResponse {
    match profile.validated() {
        Ok(profile) => ack(ctl.enqueue_prime(profile)),
        Err(e) => reject(StatusCode::UNPROCESSABLE_ENTITY, e),
    }
}

async fn post_stop(State(ctl): State<AppState>) -> impl IntoResponse {
    ctl.stop();
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn list_presets(State(ctl): State<AppState>) -> impl IntoResponse {
    match ctl.presets().list() {
        Ok(all) => (StatusCode::OK, Json(all)).into_response(),
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

async fn save_preset(
    State(ctl): State<AppState>,
    Path(name): Path<String>,
    Json(profile): Json<MotionProfile>,
) -> impl IntoResponse {
    let profile = match profile.validated() {
        Ok(p) => p,
        Err(e) => return reject(StatusCode::UNPROCESSABLE_ENTITY, e),
    };
    match ctl.presets().save(&name, &profile) {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

async fn delete_preset(State(ctl): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match ctl.presets().delete(&name) {
        Ok(_removed) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

async fn run_preset(State(ctl): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match ctl.presets().get(&name) {
        Ok(Some(profile)) => ack(ctl.enqueue_run_profile(profile)),
        Ok(None) => reject(StatusCode::NOT_FOUND, "preset not found"),
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}

async fn prime_preset(State(ctl): State<AppState>, Path(name): Path<String>) -> impl IntoResponse {
    match ctl.presets().get(&name) {
        Ok(Some(profile)) => ack(ctl.enqueue_prime(profile)),
        Ok(None) => reject(StatusCode::NOT_FOUND, "preset not found"),
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")),
    }
}
