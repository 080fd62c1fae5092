use axum::{Json, extract::State};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    message::{
        FormTipsRequest, FormTipsResponse, PlanResponse, QuickWorkoutRequest, WorkoutPlanRequest,
    },
    services::{
        classifier::Category, models::WorkoutRequest, report_generator::generate_pdf_plan,
    },
    state::SharedState,
};

pub async fn plan_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WorkoutPlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let request = WorkoutRequest::new(
        payload.goals,
        payload.fitness_level,
        payload.available_time_minutes,
        payload.equipment,
    );

    let mut usage = state.request_usage();
    let reply = state.coach.generate_workout_plan(&request, &mut usage).await;
    state.metrics.record_reply(&reply).await;

    let category = reply.category.unwrap_or(Category::General);
    info!(
        %category,
        level = %request.fitness_level,
        source = reply.source.as_str(),
        "workout plan"
    );

    let pdf_url = if payload.export_pdf {
        let plan_id = Uuid::new_v4().to_string();
        let title = format!("{} workout plan", category.as_str());
        match generate_pdf_plan(&state.report_dir, &plan_id, &title, &reply.text).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "plan export failed");
                None
            }
        }
    } else {
        None
    };

    Ok(Json(PlanResponse {
        category,
        plan: reply.text,
        source: reply.source,
        pdf_url,
    }))
}

pub async fn quick_workout_handler(
    State(state): State<SharedState>,
    Json(payload): Json<QuickWorkoutRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let mut usage = state.request_usage();
    let reply = state
        .coach
        .generate_quick_workout(payload.duration_minutes, &payload.equipment, &mut usage)
        .await;
    state.metrics.record_reply(&reply).await;

    Ok(Json(PlanResponse {
        category: reply.category.unwrap_or(Category::Quick),
        plan: reply.text,
        source: reply.source,
        pdf_url: None,
    }))
}

pub async fn form_tips_handler(
    State(state): State<SharedState>,
    Json(payload): Json<FormTipsRequest>,
) -> Result<Json<FormTipsResponse>, AppError> {
    if payload.exercise.trim().is_empty() {
        return Err(AppError::BadRequest("Exercise cannot be empty".to_string()));
    }

    let mut usage = state.request_usage();
    let reply = state.coach.generate_form_tips(&payload.exercise, &mut usage).await;
    state.metrics.record_reply(&reply).await;

    Ok(Json(FormTipsResponse {
        tips: reply.text,
        source: reply.source,
    }))
}
