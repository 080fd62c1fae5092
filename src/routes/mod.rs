// src/routes/mod.rs
pub mod chat;
pub mod workouts;

use crate::state::SharedState;
use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use chat::{chat_handler, delete_session_handler, history_handler};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use workouts::{form_tips_handler, plan_handler, quick_workout_handler};

use crate::services::metrics_manager::MetricsData;

pub fn create_router(state: SharedState) -> Router<SharedState> {
    // Exported plans are linked as /reports/<id>.pdf wherever they are written.
    let reports = ServeDir::new(&state.report_dir);
    let admin_routes = Router::new()
        .route("/metrics", get(get_metrics_handler))
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/{session_id}", delete(delete_session_handler))
        .route("/chat/{session_id}/history", get(history_handler))
        .route("/workouts/plan", post(plan_handler))
        .route("/workouts/quick", post(quick_workout_handler))
        .route("/workouts/form-tips", post(form_tips_handler))
        .nest("/admin", admin_routes)
        .nest_service("/reports", reports)
        .route("/health", get(|| async { "OK" }))
        .fallback_service(ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
}

async fn auth_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // No configured key means the admin surface stays closed.
    let expected = state.admin_key.as_deref().ok_or(StatusCode::UNAUTHORIZED)?;
    match req.headers().get("x-admin-key") {
        Some(val) if val == expected => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub async fn get_metrics_handler(State(state): State<SharedState>) -> Json<MetricsData> {
    Json(state.metrics.get_metrics().await)
}
