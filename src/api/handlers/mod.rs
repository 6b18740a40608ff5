use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use planner_core::{generate_plan, PlanError, PlanRequest};
use uuid::Uuid;

use super::AppState;
use crate::assistant::{
    parse_topic_response, ConversationHistory, ConversationKey, PromptContext,
    RecordExchangeInput, TopicExtraction, DEFAULT_CONTEXT_EXCHANGES,
};
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map an error to a response. Precondition failures and lookups are reported
/// to the client as-is; anything else is logged and returned as a generic 500
/// so internal details do not leak.
fn api_error(e: anyhow::Error) -> (StatusCode, String) {
    if let Some(plan_error) = e.downcast_ref::<PlanError>() {
        tracing::warn!("Plan rejected: {}", plan_error);
        return (StatusCode::BAD_REQUEST, plan_error.to_string());
    }

    let msg = e.to_string();

    if msg.contains("not found") {
        tracing::warn!("Lookup failed: {}", msg);
        return (StatusCode::NOT_FOUND, msg);
    }
    if msg.starts_with("Invalid") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }
    if msg.contains("UNIQUE constraint failed: users.email") {
        tracing::warn!("Duplicate user email");
        return (StatusCode::CONFLICT, "Email already registered".to_string());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} not found", what))
}

fn require_plan(state: &AppState, id: Uuid) -> ApiResult<StudyPlan> {
    state
        .db
        .get_plan(id)
        .map_err(api_error)?
        .ok_or_else(|| not_found("Study plan"))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Users
// ============================================================

pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> ApiResult<(StatusCode, Json<User>)> {
    state
        .db
        .create_user(input)
        .map(|u| (StatusCode::CREATED, Json(u)))
        .map_err(api_error)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    state
        .db
        .get_user(id)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("User"))
}

pub async fn list_user_plans(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<StudyPlan>>> {
    state
        .db
        .get_user(user_id)
        .map_err(api_error)?
        .ok_or_else(|| not_found("User"))?;

    state
        .db
        .get_plans_by_user(user_id)
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Study Plans
// ============================================================

pub async fn create_plan(
    State(state): State<AppState>,
    Json(input): Json<CreateStudyPlanInput>,
) -> ApiResult<(StatusCode, Json<StudyPlan>)> {
    state
        .db
        .create_plan(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(api_error)
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StudyPlanWithTopics>> {
    state
        .db
        .get_plan_with_topics(id)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("Study plan"))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStudyPlanInput>,
) -> ApiResult<Json<StudyPlan>> {
    state
        .db
        .update_plan(id, input)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("Study plan"))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.db.delete_plan(id).map_err(api_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Study plan"))
    }
}

// ============================================================
// Generation
// ============================================================

/// Allocate the plan's budget across the given topics, lay out sessions from
/// today, and replace whatever topics and sessions the plan had before.
pub async fn generate_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<GeneratePlanInput>,
) -> ApiResult<Json<GeneratePlanResponse>> {
    let plan = require_plan(&state, id)?;

    let generated = generate_plan(&PlanRequest {
        topics: input.topics,
        today: state.clock.today(),
        exam_date: plan.exam_date,
        daily_hours: plan.daily_hours,
    })
    .map_err(|e| api_error(e.into()))?;

    let topics = state
        .db
        .replace_plan_schedule(id, &generated)
        .map_err(api_error)?;

    tracing::info!(
        plan_id = %id,
        topics = topics.len(),
        sessions = generated.schedule.session_count(),
        overrun_days = generated.overrun_days,
        "Generated study plan"
    );

    Ok(Json(GeneratePlanResponse {
        plan_id: id,
        topics,
        session_count: generated.schedule.session_count(),
        budget_hours: generated.budget_hours,
        days_remaining: generated.days_remaining,
        first_session_date: generated.schedule.first_date(),
        last_session_date: generated.schedule.last_date(),
        overrun_days: generated.overrun_days,
    }))
}

/// Decode a raw topic-extraction response into weighted topics.
pub async fn parse_topics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ParseTopicsInput>,
) -> ApiResult<Json<TopicExtraction>> {
    require_plan(&state, id)?;
    Ok(Json(parse_topic_response(&input.raw)))
}

pub async fn list_topics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Topic>>> {
    require_plan(&state, id)?;
    state.db.get_topics(id).map(Json).map_err(api_error)
}

// ============================================================
// Sessions & Dashboard
// ============================================================

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<Vec<StudySession>>> {
    require_plan(&state, id)?;
    state
        .db
        .get_plan_sessions(id, query.date)
        .map(Json)
        .map_err(api_error)
}

pub async fn complete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StudySession>> {
    state
        .db
        .complete_session(id)
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("Session"))
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Dashboard>> {
    let plan = require_plan(&state, id)?;
    let sessions = state.db.get_plan_sessions(id, None).map_err(api_error)?;

    Ok(Json(Dashboard::build(&plan, &sessions, state.clock.today())))
}

// ============================================================
// Materials
// ============================================================

pub async fn add_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AddMaterialInput>,
) -> ApiResult<(StatusCode, Json<UploadedMaterial>)> {
    state
        .db
        .add_material(id, input)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(api_error)
}

pub async fn list_materials(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<UploadedMaterial>>> {
    require_plan(&state, id)?;
    state.db.get_materials(id).map(Json).map_err(api_error)
}

// ============================================================
// Conversations
// ============================================================

pub async fn get_conversation(
    State(state): State<AppState>,
    Path((user_id, plan_id)): Path<(Uuid, Uuid)>,
) -> Json<ConversationHistory> {
    Json(state.conversations.history(ConversationKey { user_id, plan_id }))
}

pub async fn record_exchange(
    State(state): State<AppState>,
    Path((user_id, plan_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<RecordExchangeInput>,
) -> ApiResult<(StatusCode, Json<ConversationHistory>)> {
    require_plan(&state, plan_id)?;

    let key = ConversationKey { user_id, plan_id };
    state.conversations.record(key, input);

    Ok((StatusCode::CREATED, Json(state.conversations.history(key))))
}

pub async fn clear_conversation(
    State(state): State<AppState>,
    Path((user_id, plan_id)): Path<(Uuid, Uuid)>,
) -> StatusCode {
    state.conversations.clear(ConversationKey { user_id, plan_id });
    StatusCode::NO_CONTENT
}

/// Context for the next chat prompt: the plan's topics and materials plus the
/// last few exchanges of this conversation.
pub async fn get_conversation_context(
    State(state): State<AppState>,
    Path((user_id, plan_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PromptContext>> {
    let plan = require_plan(&state, plan_id)?;
    let topics = state.db.get_topics(plan_id).map_err(api_error)?;
    let materials = state.db.get_materials(plan_id).map_err(api_error)?;
    let recent = state.conversations.recent(
        ConversationKey { user_id, plan_id },
        DEFAULT_CONTEXT_EXCHANGES,
    );

    Ok(Json(PromptContext::build(&plan, &topics, &materials, recent)))
}
