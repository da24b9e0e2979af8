use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use treats_types::api::{
    ChannelDetailsResponse, ChannelIdParams, ChannelMemberRequest, ChannelMessagesQuery,
    ChannelsCreateRequest, ChannelsCreateResponse, ChannelsListResponse, Empty, MessagesPage,
};

use crate::auth::AppState;
use crate::error::{ApiResult, JsonBody, QueryParams};
use crate::middleware::AuthUser;

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChannelsCreateRequest>,
) -> ApiResult<Json<ChannelsCreateResponse>> {
    let channel_id = state.store.with_workspace_mut(|ws, now| {
        ws.create_channel(auth.user_id, &req.name, req.is_public, now)
    })?;
    state.persist().await;
    Ok(Json(ChannelsCreateResponse { channel_id }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<ChannelsListResponse>> {
    let channels = state.store.with_workspace(|ws, _| ws.list_channels(auth.user_id))?;
    Ok(Json(ChannelsListResponse { channels }))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<ChannelsListResponse>> {
    let channels = state
        .store
        .with_workspace(|ws, _| ws.list_all_channels(auth.user_id))?;
    Ok(Json(ChannelsListResponse { channels }))
}

pub async fn details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<ChannelIdParams>,
) -> ApiResult<Json<ChannelDetailsResponse>> {
    let details = state
        .store
        .with_workspace(|ws, _| ws.channel_details(auth.user_id, query.channel_id))?;
    Ok(Json(details))
}

pub async fn join(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChannelIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, now| ws.join_channel(auth.user_id, req.channel_id, now))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChannelMemberRequest>,
) -> ApiResult<Json<Empty>> {
    state.store.with_workspace_mut(|ws, now| {
        ws.invite_to_channel(auth.user_id, req.channel_id, req.u_id, now)
    })?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChannelIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, now| ws.leave_channel(auth.user_id, req.channel_id, now))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn add_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChannelMemberRequest>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, _| ws.add_channel_owner(auth.user_id, req.channel_id, req.u_id))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn remove_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<ChannelMemberRequest>,
) -> ApiResult<Json<Empty>> {
    state.store.with_workspace_mut(|ws, _| {
        ws.remove_channel_owner(auth.user_id, req.channel_id, req.u_id)
    })?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<ChannelMessagesQuery>,
) -> ApiResult<Json<MessagesPage>> {
    let page = state.store.with_workspace(|ws, _| {
        ws.channel_messages(auth.user_id, query.channel_id, query.start)
    })?;
    Ok(Json(page))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<ChannelIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, now| ws.remove_channel(auth.user_id, query.channel_id, now))?;
    state.persist().await;
    Ok(Json(Empty {}))
}
