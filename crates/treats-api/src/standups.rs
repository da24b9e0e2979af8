use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use treats_types::api::{
    ChannelIdParams, Empty, StandupActiveResponse, StandupSendRequest, StandupStartRequest,
    StandupStartResponse,
};

use crate::auth::AppState;
use crate::error::{ApiResult, JsonBody, QueryParams};
use crate::middleware::AuthUser;

pub async fn start(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<StandupStartRequest>,
) -> ApiResult<Json<StandupStartResponse>> {
    let (time_finish, job) = state.store.with_workspace_mut(|ws, now| {
        ws.start_standup(auth.user_id, req.channel_id, req.length, now)
    })?;
    state.scheduler.submit(job);
    state.persist().await;
    Ok(Json(StandupStartResponse { time_finish }))
}

pub async fn active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<ChannelIdParams>,
) -> ApiResult<Json<StandupActiveResponse>> {
    let active = state
        .store
        .with_workspace(|ws, now| ws.standup_active(auth.user_id, query.channel_id, now))?;
    Ok(Json(active))
}

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<StandupSendRequest>,
) -> ApiResult<Json<Empty>> {
    state.store.with_workspace_mut(|ws, now| {
        ws.standup_send(auth.user_id, req.channel_id, &req.message, now)
    })?;
    state.persist().await;
    Ok(Json(Empty {}))
}
