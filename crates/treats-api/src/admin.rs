use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use treats_types::api::{Empty, PermissionChangeRequest, UserQuery};

use crate::auth::AppState;
use crate::error::{ApiResult, JsonBody, QueryParams};
use crate::middleware::AuthUser;

pub async fn change_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<PermissionChangeRequest>,
) -> ApiResult<Json<Empty>> {
    state.store.with_workspace_mut(|ws, _| {
        ws.change_permission(auth.user_id, req.u_id, req.permission_id)
    })?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn remove_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<UserQuery>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.remove_user(auth.user_id, query.u_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

/// Wipes the workspace back to its initial state. Pending scheduled jobs
/// belong to the old generation and are discarded when they fire.
pub async fn clear(State(state): State<AppState>) -> Json<Empty> {
    state.store.with_workspace_mut(|ws, _| ws.clear());
    info!("Workspace cleared");
    state.persist().await;
    Json(Empty {})
}
