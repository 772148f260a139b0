//! Handlers for the `/users` resource (profile, listing, stats, password).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use warden_core::error::CoreError;
use warden_core::types::DbId;
use warden_core::validation::{
    validate_display_name, validate_pagination, validate_password_strength,
};
use warden_db::models::user::{User, UserActivity};
use warden_db::repositories::UserRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthSession;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub name: String,
    /// Unix milliseconds.
    pub registration_date: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            registration_date: user.created_at.timestamp_millis(),
        }
    }
}

/// Request body for `PATCH /users/me`.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityResponse {
    pub id: DbId,
    pub name: String,
    pub registration_date: i64,
    pub total_login_count: i64,
    pub last_active_timestamp: Option<i64>,
}

impl From<UserActivity> for UserActivityResponse {
    fn from(row: UserActivity) -> Self {
        Self {
            id: row.id,
            name: row.name,
            registration_date: row.created_at.timestamp_millis(),
            total_login_count: row.total_login_count,
            last_active_timestamp: row.last_active_at.map(|t| t.timestamp_millis()),
        }
    }
}

/// One page of users plus the total across all pages.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub data: Vec<UserActivityResponse>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub user_sign_up: i64,
    pub todays_active_session: i64,
    #[serde(rename = "average7dActiveUsers")]
    pub average_7d_active_users: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStatusResponse {
    pub allow_password: bool,
    pub password_enabled: bool,
}

/// Request body for `POST /users/password`.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
}

/// Request body for `PUT /users/password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, ctx.user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "User",
            id: ctx.user_id.to_string(),
        })?;
    Ok(Json(DataResponse { data: user.into() }))
}

/// PATCH /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let name = validate_display_name(&input.name)?;
    let user = UserRepo::update_name(&state.pool, ctx.user_id, &name)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "User",
            id: ctx.user_id.to_string(),
        })?;
    Ok(Json(DataResponse { data: user.into() }))
}

// ---------------------------------------------------------------------------
// Listing and stats
// ---------------------------------------------------------------------------

/// GET /api/v1/users?page=&limit=
pub async fn list_users(
    State(state): State<AppState>,
    AuthSession(_ctx): AuthSession,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<UserListResponse>> {
    let (limit, offset) = validate_pagination(query.page, query.limit)?;

    let rows = UserRepo::list_with_activity(&state.pool, limit, offset).await?;
    let total = UserRepo::count(&state.pool).await?;

    Ok(Json(UserListResponse {
        data: rows.into_iter().map(UserActivityResponse::from).collect(),
        total,
    }))
}

/// GET /api/v1/users/stats
///
/// "Today" starts at UTC midnight. The 7-day figure is the daily average of
/// active sessions created in the last week.
pub async fn user_stats(
    State(state): State<AppState>,
    AuthSession(_ctx): AuthSession,
) -> AppResult<Json<DataResponse<UserStatsResponse>>> {
    let now = Utc::now();
    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    let week_start = now - Duration::days(7);

    let stats = UserRepo::stats(&state.pool, today_start, week_start).await?;

    Ok(Json(DataResponse {
        data: UserStatsResponse {
            user_sign_up: stats.user_sign_ups,
            todays_active_session: stats.active_sessions_today,
            average_7d_active_users: daily_average(stats.active_sessions_last_7_days, 7),
        },
    }))
}

/// `total / days`, rounded to two decimal places.
fn daily_average(total: i64, days: i64) -> f64 {
    ((total as f64 / days as f64) * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Password
// ---------------------------------------------------------------------------

/// GET /api/v1/users/password
pub async fn password_status(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
) -> AppResult<Json<DataResponse<PasswordStatusResponse>>> {
    let provider = state.providers.default_provider();
    let status = state.sessions.password_status(&ctx, provider.as_ref()).await?;
    Ok(Json(DataResponse {
        data: PasswordStatusResponse {
            allow_password: status.allow_password,
            password_enabled: status.password_enabled,
        },
    }))
}

/// POST /api/v1/users/password
pub async fn set_password(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
    Json(input): Json<SetPasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength("Password", &input.password)?;

    let provider = state.providers.default_provider();
    state
        .sessions
        .set_password(&ctx, provider.as_ref(), &input.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/users/password
///
/// `currentPassword` must be present but is only checked when the account
/// already has a password.
pub async fn change_password(
    State(state): State<AppState>,
    AuthSession(ctx): AuthSession,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password_strength("New password", &input.new_password)?;

    let provider = state.providers.default_provider();
    state
        .sessions
        .change_password(
            &ctx,
            provider.as_ref(),
            &input.current_password,
            &input.new_password,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
