use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use treats_types::api::{
    DmCreateRequest, DmCreateResponse, DmDetailsResponse, DmIdParams, DmListResponse,
    DmMessagesQuery, Empty, MessagesPage,
};

use crate::auth::AppState;
use crate::error::{ApiResult, JsonBody, QueryParams};
use crate::middleware::AuthUser;

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<DmCreateRequest>,
) -> ApiResult<Json<DmCreateResponse>> {
    let dm_id = state
        .store
        .with_workspace_mut(|ws, now| ws.create_dm(auth.user_id, &req.u_ids, now))?;
    state.persist().await;
    Ok(Json(DmCreateResponse { dm_id }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<DmListResponse>> {
    let dms = state.store.with_workspace(|ws, _| ws.list_dms(auth.user_id))?;
    Ok(Json(DmListResponse { dms }))
}

pub async fn details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<DmIdParams>,
) -> ApiResult<Json<DmDetailsResponse>> {
    let details = state
        .store
        .with_workspace(|ws, _| ws.dm_details(auth.user_id, query.dm_id))?;
    Ok(Json(details))
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): JsonBody<DmIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, now| ws.leave_dm(auth.user_id, req.dm_id, now))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<DmIdParams>,
) -> ApiResult<Json<Empty>> {
    state
        .store
        .with_workspace_mut(|ws, now| ws.remove_dm(auth.user_id, query.dm_id, now))?;
    state.persist().await;
    Ok(Json(Empty {}))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<DmMessagesQuery>,
) -> ApiResult<Json<MessagesPage>> {
    let page = state
        .store
        .with_workspace(|ws, _| ws.dm_messages(auth.user_id, query.dm_id, query.start))?;
    Ok(Json(page))
}
