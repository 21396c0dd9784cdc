use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::decode_token;
use crate::errors::AppError;
use crate::models::SubscriptionTier;
use crate::AppState;

/// Authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub tier: SubscriptionTier,
}

/// Bearer-token authentication middleware.
///
/// Every request must carry `Authorization: Bearer <jwt>` signed with
/// `JWT_SECRET`. Missing, malformed, invalid and expired tokens are all 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid Authorization header".into()))?;

    let claims = decode_token(&token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
        tier: claims.tier,
    });

    Ok(next.run(req).await)
}
