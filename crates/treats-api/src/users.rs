use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use treats_types::api::{
    Empty, SetEmailRequest, SetHandleRequest, SetNameRequest, UserProfileResponse, UserQuery,
    UserStatsResponse, UsersAllResponse, WorkspaceStatsResponse,
};

use crate::auth::AppState;
use crate::error::{ApiResult, JsonBody, QueryParams};
use crate::middleware::AuthUser;

pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<UserQuery>,
) -> ApiResult<Json<UserProfileResponse>> {
    let user = state
        .store
        .with_workspace(|ws, _| ws.user_profile(auth.user_id, query.u_id))?;
    Ok(Json(UserProfileResponse { user }))
}

pub async fn all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UsersAllResponse>> {
    let users = state.store.with_workspace(|ws, _| ws.all_users(auth.user_id))?;
    Ok(Json(UsersAllResponse { users }))
}

pub async fn set_name(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SetNameRequest>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.set_name(auth.user_id, &req.name_first, &req.name_last))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn set_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SetEmailRequest>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.set_email(auth.user_id, &req.email))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn set_handle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SetHandleRequest>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.set_handle(auth.user_id, &req.handle_str))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserStatsResponse>> {
    let user_stats = state.store.with_workspace(|ws, _| ws.user_stats(auth.user_id))?;
    Ok(Json(UserStatsResponse { user_stats }))
}

pub async fn workspace_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<WorkspaceStatsResponse>> {
    let workspace_stats = state
        .store
        .with_workspace(|ws, _| ws.workspace_stats(auth.user_id))?;
    Ok(Json(WorkspaceStatsResponse { workspace_stats }))
}
