use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};
use uuid::Uuid;

use treats_store::{NewUser, Store};
use treats_types::api::{AuthResponse, Empty, LoginRequest, RegisterRequest};
use treats_types::models::UserId;

use crate::error::{ApiError, ApiResult, JsonBody};
use crate::middleware::{AuthUser, Claims};
use crate::scheduler::Scheduler;

const MIN_PASSWORD_LEN: usize = 6;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<Store>,
    pub scheduler: Scheduler,
    pub jwt_secret: String,
}

impl AppStateInner {
    /// Writes a snapshot off the async runtime. A failed write is logged and
    /// the request still succeeds: the change is live in memory.
    pub async fn persist(&self) {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to save snapshot: {:#}", e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hashing password: {}", e))?
        .to_string();

    let new_user = NewUser {
        email: req.email,
        name_first: req.name_first,
        name_last: req.name_last,
        password_hash,
    };
    let (user_id, sid) = state.store.with_workspace_mut(|ws, now| {
        let user_id = ws.register(new_user, now)?;
        Ok::<_, ApiError>((user_id, ws.open_session(user_id)))
    })?;
    state.persist().await;

    let token = create_token(&state.jwt_secret, user_id, sid)?;
    Ok(Json(AuthResponse {
        token,
        auth_user_id: user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user_id, password_hash) = state
        .store
        .with_workspace(|ws, _| ws.credentials(&req.email))?;

    let parsed_hash =
        PasswordHash::new(&password_hash).map_err(|e| anyhow::anyhow!("stored hash: {}", e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::BadRequest("Incorrect password".into()))?;

    let sid = state
        .store
        .with_workspace_mut(|ws, _| ws.open_session(user_id));
    state.persist().await;
    info!("User {} logged in", user_id);

    let token = create_token(&state.jwt_secret, user_id, sid)?;
    Ok(Json(AuthResponse {
        token,
        auth_user_id: user_id,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.close_session(auth.session_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

fn create_token(secret: &str, user_id: UserId, sid: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        sid,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
