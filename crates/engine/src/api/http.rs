//! HTTP routes.
//!
//! Handlers stay thin: parse the request, call the use case, map the error.
//! Routes without a user id in the path identify the caller through the
//! `X-User-Id` header.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use habitquest_domain::{
    Area, AreaId, BadHabit, BadHabitId, DomainError, GeneralStreak, GoodHabit, GoodHabitId,
    HabitKind, LevelCurve, Transaction, User, UserConfig, UserId,
};

use crate::app::App;
use crate::use_cases::actions::{ActionError, BadHabitResult, CompletionResult};
use crate::use_cases::config::ConfigError;
use crate::use_cases::game::{GameError, GameStateView};
use crate::use_cases::management::{CreditPurchaseResult, ManagementError};
use crate::use_cases::streaks::{HabitHistory, HabitStreakView, StreakError};

/// Days covered by a streak query when no window is given (today inclusive).
const DEFAULT_WINDOW_DAYS: i64 = 14;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/api/actions/habits/{id}/complete", post(complete_habit))
        .route("/api/actions/bad-habits/{id}/record", post(record_bad_habit))
        .route("/api/streaks/general", get(general_streak))
        .route("/api/streaks/habits", get(habit_streaks))
        .route("/api/streaks/habits/{id}/history", get(habit_history))
        .route("/api/users", post(create_user))
        .route(
            "/api/users/{id}/config",
            get(get_user_config).put(update_user_config),
        )
        .route("/api/users/{id}/game-state", get(get_game_state))
        .route("/api/users/{id}/recovery-progress", put(set_recovery_progress))
        .route("/api/users/{id}/complete-recovery", post(complete_recovery))
        .route("/api/users/{id}/transactions", get(list_transactions))
        .route("/api/areas", get(list_areas).post(create_area))
        .route("/api/areas/{id}/archive", post(archive_area))
        .route("/api/areas/{id}/restore", post(restore_area))
        .route("/api/habits", get(list_good_habits).post(create_good_habit))
        .route("/api/habits/{id}/archive", post(archive_good_habit))
        .route("/api/habits/{id}/restore", post(restore_good_habit))
        .route("/api/bad-habits", get(list_bad_habits).post(create_bad_habit))
        .route("/api/bad-habits/{id}/archive", post(archive_bad_habit))
        .route("/api/bad-habits/{id}/restore", post(restore_bad_habit))
        .route("/api/bad-habits/{id}/buy-credit", post(buy_credit))
}

async fn health() -> &'static str {
    "OK"
}

/// Caller identity for routes without a user id in the path.
fn user_id_from_headers(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get("X-User-Id")
        .ok_or_else(|| ApiError::BadRequest("Missing X-User-Id header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::BadRequest("Invalid X-User-Id header".to_string()))?;

    let uuid = Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest("X-User-Id is not a valid UUID".to_string()))?;
    Ok(UserId::from_uuid(uuid))
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl WindowQuery {
    fn resolve(&self) -> (NaiveDate, NaiveDate) {
        let today = Utc::now().date_naive();
        let to = self.to.unwrap_or(today);
        let from = self
            .from
            .unwrap_or(to - TimeDelta::days(DEFAULT_WINDOW_DAYS - 1));
        (from, to)
    }
}

// =============================================================================
// Actions
// =============================================================================

async fn complete_habit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<CompletionResult>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let result = app
        .use_cases
        .complete_good_habit
        .execute(user_id, GoodHabitId::from_uuid(id))
        .await?;
    Ok(Json(result))
}

async fn record_bad_habit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<BadHabitResult>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let result = app
        .use_cases
        .record_bad_habit
        .execute(user_id, BadHabitId::from_uuid(id))
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Streaks
// =============================================================================

async fn general_streak(
    State(app): State<Arc<App>>,
    Query(window): Query<WindowQuery>,
    headers: HeaderMap,
) -> Result<Json<GeneralStreak>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let (from, to) = window.resolve();
    let streak = app
        .use_cases
        .general_streak
        .execute(user_id, from, to)
        .await?;
    Ok(Json(streak))
}

#[derive(Debug, Serialize)]
struct HabitStreaksResponse {
    items: Vec<HabitStreakView>,
}

async fn habit_streaks(
    State(app): State<Arc<App>>,
    Query(window): Query<WindowQuery>,
    headers: HeaderMap,
) -> Result<Json<HabitStreaksResponse>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let (from, to) = window.resolve();
    let items = app
        .use_cases
        .habit_streaks
        .execute(user_id, from, to)
        .await?;
    Ok(Json(HabitStreaksResponse { items }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(rename = "type")]
    kind: String,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct HabitHistoryResponse {
    history: HabitHistory,
}

async fn habit_history(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> Result<Json<HabitHistoryResponse>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let kind: HabitKind = query
        .kind
        .parse()
        .map_err(|_| ApiError::BadRequest("type must be good or bad".to_string()))?;
    let (from, to) = WindowQuery {
        from: query.from,
        to: query.to,
    }
    .resolve();

    let history = app
        .use_cases
        .habit_history
        .execute(user_id, id, kind, from, to)
        .await?;
    Ok(Json(HabitHistoryResponse { history }))
}

// =============================================================================
// Users: bootstrap, config, game lifecycle, ledger
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    name: String,
}

async fn create_user(
    State(app): State<Arc<App>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let user = app.use_cases.users.create(request.name).await?;
    Ok(Json(user))
}

async fn get_user_config(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserConfig>, ApiError> {
    let config = app
        .use_cases
        .get_config
        .execute(UserId::from_uuid(id))
        .await?;
    Ok(Json(config))
}

async fn update_user_config(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(config): Json<UserConfig>,
) -> Result<Json<UserConfig>, ApiError> {
    let updated = app
        .use_cases
        .update_config
        .execute(UserId::from_uuid(id), config)
        .await?;
    Ok(Json(updated))
}

async fn get_game_state(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateView>, ApiError> {
    let view = app
        .use_cases
        .game_state
        .execute(UserId::from_uuid(id))
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct RecoveryProgressRequest {
    distance: u32,
}

async fn set_recovery_progress(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecoveryProgressRequest>,
) -> Result<Json<GameStateView>, ApiError> {
    let view = app
        .use_cases
        .set_recovery_progress
        .execute(UserId::from_uuid(id), request.distance)
        .await?;
    Ok(Json(view))
}

async fn complete_recovery(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameStateView>, ApiError> {
    let view = app
        .use_cases
        .complete_recovery
        .execute(UserId::from_uuid(id))
        .await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct TransactionsQuery {
    limit: Option<u32>,
}

async fn list_transactions(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let transactions = app
        .use_cases
        .users
        .transactions(UserId::from_uuid(id), query.limit.unwrap_or(50))
        .await?;
    Ok(Json(transactions))
}

// =============================================================================
// Areas
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "includeArchived", default)]
    include_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAreaRequest {
    name: String,
    #[serde(default)]
    icon: String,
    xp_per_level: Option<u32>,
    level_curve: Option<LevelCurve>,
    level_multiplier: Option<f64>,
}

async fn list_areas(
    State(app): State<Arc<App>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Area>>, ApiError> {
    let areas = app.use_cases.areas.list(query.include_archived).await?;
    Ok(Json(areas))
}

async fn create_area(
    State(app): State<Arc<App>>,
    Json(request): Json<CreateAreaRequest>,
) -> Result<Json<Area>, ApiError> {
    let area = app
        .use_cases
        .areas
        .create(
            request.name,
            request.icon,
            request.xp_per_level.unwrap_or(100),
            request.level_curve.unwrap_or(LevelCurve::Linear),
            request.level_multiplier.unwrap_or(1.0),
        )
        .await?;
    Ok(Json(area))
}

async fn archive_area(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Area>, ApiError> {
    let area = app.use_cases.areas.archive(AreaId::from_uuid(id)).await?;
    Ok(Json(area))
}

async fn restore_area(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Area>, ApiError> {
    let area = app.use_cases.areas.restore(AreaId::from_uuid(id)).await?;
    Ok(Json(area))
}

// =============================================================================
// Habits
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGoodHabitRequest {
    area_id: Uuid,
    name: String,
    xp_reward: u32,
    #[serde(default)]
    coin_reward: u32,
    #[serde(default = "default_cadence")]
    cadence: String,
}

fn default_cadence() -> String {
    "daily".to_string()
}

async fn list_good_habits(
    State(app): State<Arc<App>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<GoodHabit>>, ApiError> {
    let habits = app
        .use_cases
        .habits
        .list_good(query.include_archived)
        .await?;
    Ok(Json(habits))
}

async fn create_good_habit(
    State(app): State<Arc<App>>,
    Json(request): Json<CreateGoodHabitRequest>,
) -> Result<Json<GoodHabit>, ApiError> {
    let habit = app
        .use_cases
        .habits
        .create_good(
            AreaId::from_uuid(request.area_id),
            request.name,
            request.xp_reward,
            request.coin_reward,
            request.cadence,
        )
        .await?;
    Ok(Json(habit))
}

async fn archive_good_habit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GoodHabit>, ApiError> {
    let habit = app
        .use_cases
        .habits
        .archive_good(GoodHabitId::from_uuid(id))
        .await?;
    Ok(Json(habit))
}

async fn restore_good_habit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<GoodHabit>, ApiError> {
    let habit = app
        .use_cases
        .habits
        .restore_good(GoodHabitId::from_uuid(id))
        .await?;
    Ok(Json(habit))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBadHabitRequest {
    area_id: Option<Uuid>,
    name: String,
    life_penalty: u32,
    #[serde(default)]
    controllable: bool,
    #[serde(default)]
    coin_cost: u32,
}

async fn list_bad_habits(
    State(app): State<Arc<App>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BadHabit>>, ApiError> {
    let habits = app
        .use_cases
        .habits
        .list_bad(query.include_archived)
        .await?;
    Ok(Json(habits))
}

async fn create_bad_habit(
    State(app): State<Arc<App>>,
    Json(request): Json<CreateBadHabitRequest>,
) -> Result<Json<BadHabit>, ApiError> {
    let habit = app
        .use_cases
        .habits
        .create_bad(
            request.area_id.map(AreaId::from_uuid),
            request.name,
            request.life_penalty,
            request.controllable,
            request.coin_cost,
        )
        .await?;
    Ok(Json(habit))
}

async fn archive_bad_habit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BadHabit>, ApiError> {
    let habit = app
        .use_cases
        .habits
        .archive_bad(BadHabitId::from_uuid(id))
        .await?;
    Ok(Json(habit))
}

async fn restore_bad_habit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BadHabit>, ApiError> {
    let habit = app
        .use_cases
        .habits
        .restore_bad(BadHabitId::from_uuid(id))
        .await?;
    Ok(Json(habit))
}

async fn buy_credit(
    State(app): State<Arc<App>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<CreditPurchaseResult>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    let result = app
        .use_cases
        .buy_credit
        .execute(user_id, BadHabitId::from_uuid(id))
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Error mapping
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => {
                (axum::http::StatusCode::NOT_FOUND, "Not found").into_response()
            }
            ApiError::BadRequest(msg) => {
                (axum::http::StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::Conflict(msg) => (axum::http::StatusCode::CONFLICT, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                )
                    .into_response()
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { .. } => ApiError::NotFound,
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::InvalidStateTransition(msg) => ApiError::Conflict(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) | DomainError::Parse(msg) => {
                ApiError::BadRequest(msg)
            }
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::UserNotFound(_)
            | ActionError::HabitNotFound
            | ActionError::AreaNotFound => ApiError::NotFound,
            ActionError::Domain(e) => e.into(),
            ActionError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StreakError> for ApiError {
    fn from(e: StreakError) -> Self {
        match e {
            StreakError::UserNotFound(_) | StreakError::HabitNotFound => ApiError::NotFound,
            StreakError::Domain(e) => e.into(),
            StreakError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::UserNotFound(_) => ApiError::NotFound,
            GameError::Domain(e) => e.into(),
            GameError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::UserNotFound(_) => ApiError::NotFound,
            ConfigError::Domain(e) => e.into(),
            ConfigError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ManagementError> for ApiError {
    fn from(e: ManagementError) -> Self {
        match e {
            ManagementError::UserNotFound(_)
            | ManagementError::AreaNotFound
            | ManagementError::HabitNotFound => ApiError::NotFound,
            ManagementError::Domain(e) => e.into(),
            ManagementError::Repo(e) => ApiError::Internal(e.to_string()),
        }
    }
}
