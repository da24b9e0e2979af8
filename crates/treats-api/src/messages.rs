use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use treats_types::api::{
    EditMessageRequest, Empty, MessageIdParams, MessageIdResponse, ReactRequest, SendDmRequest,
    SendLaterDmRequest, SendLaterRequest, SendMessageRequest, ShareMessageRequest,
    ShareMessageResponse,
};
use treats_types::models::Target;

use crate::auth::AppState;
use crate::error::{ApiResult, JsonBody, QueryParams};
use crate::middleware::AuthUser;

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SendMessageRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    let message_id = state.store.with_workspace_mut(|ws, now| {
        ws.send_message(auth.user_id, req.channel_id, &req.message, now)
    })?;
    state.persist().await;
    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn send_dm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SendDmRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    let message_id = state
        .store
        .with_workspace_mut(|ws, now| ws.send_dm(auth.user_id, req.dm_id, &req.message, now))?;
    state.persist().await;
    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn send_later(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SendLaterRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    schedule(
        &state,
        auth,
        Target::Channel(req.channel_id),
        &req.message,
        req.time_sent,
    )
    .await
}

pub async fn send_later_dm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<SendLaterDmRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    schedule(
        &state,
        auth,
        Target::Dm(req.dm_id),
        &req.message,
        req.time_sent,
    )
    .await
}

async fn schedule(
    state: &AppState,
    auth: AuthUser,
    target: Target,
    body: &str,
    time_sent: i64,
) -> ApiResult<Json<MessageIdResponse>> {
    let (message_id, job) = state.store.with_workspace_mut(|ws, now| {
        ws.schedule_send(auth.user_id, target, body, time_sent, now)
    })?;
    debug!("Message {} deferred until {}", message_id, time_sent);
    state.scheduler.submit(job);
    // The reserved id is part of the workspace state.
    state.persist().await;
    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn edit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<EditMessageRequest>,
) -> ApiResult<Json<Empty>> {
    state.store.with_workspace_mut(|ws, now| {
        ws.edit_message(auth.user_id, req.message_id, &req.message, now)
    })?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<MessageIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, now| ws.remove_message(auth.user_id, query.message_id, now))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn share(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ShareMessageRequest>,
) -> ApiResult<Json<ShareMessageResponse>> {
    let shared_message_id = state.store.with_workspace_mut(|ws, now| {
        ws.share_message(
            auth.user_id,
            req.og_message_id,
            &req.message,
            req.channel_id,
            req.dm_id,
            now,
        )
    })?;
    state.persist().await;
    Ok(Json(ShareMessageResponse { shared_message_id }))
}

pub async fn react(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ReactRequest>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.react(auth.user_id, req.message_id, req.react_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn unreact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ReactRequest>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.unreact(auth.user_id, req.message_id, req.react_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn pin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<MessageIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.pin(auth.user_id, req.message_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn unpin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<MessageIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.unpin(auth.user_id, req.message_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}
