use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::auth::AuthUser;
use crate::auth::{hash_password, issue_token, validate_password, verify_password};
use crate::db::user_repo;
use crate::errors::AppError;
use crate::models::{SubscriptionTier, UserProfile};
use crate::AppState;

use super::ApiResponse;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub company: Option<String>,
    pub subscription_tier: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("a valid email is required".into()));
    }
    if body.full_name.trim().is_empty() {
        return Err(AppError::Validation("full_name is required".into()));
    }
    validate_password(&body.password)?;

    let tier = match body.subscription_tier.as_deref() {
        None => SubscriptionTier::Basic,
        Some(s) => SubscriptionTier::from_api_str(s)
            .ok_or_else(|| AppError::Validation(format!("unknown subscription tier: {s}")))?,
    };

    let hash = hash_password(&body.password)?;
    let user = user_repo::create_user(
        &state.db,
        email,
        &hash,
        body.full_name.trim(),
        body.company.as_deref(),
        tier,
    )
    .await?
    .ok_or_else(|| AppError::Validation("email is already registered".into()))?;

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_expiry_hours)
        .map_err(|e| AppError::Internal(e.into()))?;
    tracing::info!(user_id = %user.id, tier = %user.subscription_tier, "User registered");

    Ok(ApiResponse::ok(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let invalid = || AppError::Unauthorized("invalid email or password".into());

    let user = user_repo::get_user_by_email(&state.db, body.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&body.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: bad password");
        return Err(invalid());
    }

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_expiry_hours)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(ApiResponse::ok(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let user = user_repo::get_user_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    Ok(ApiResponse::ok(user.into()))
}
