use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use treats_types::models::UserId;

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    /// Session the token was issued for. Logging out ends it.
    pub sid: Uuid,
    pub exp: usize,
}

/// The authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
    pub session_id: Uuid,
}

/// Validates the bearer token and checks that its session is still live.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::InvalidToken)?;

    let claims = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::InvalidToken)?
    .claims;

    let user_id = state
        .store
        .with_workspace(|ws, _| ws.session_user(claims.sid))?;
    if user_id != claims.sub {
        return Err(ApiError::InvalidToken);
    }

    req.extensions_mut().insert(AuthUser {
        user_id,
        session_id: claims.sid,
    });
    Ok(next.run(req).await)
}
