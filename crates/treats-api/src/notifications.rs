use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;

use treats_types::api::{NotificationsResponse, SearchQuery, SearchResponse};

use crate::auth::AppState;
use crate::error::{ApiResult, QueryParams};
use crate::middleware::AuthUser;

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<NotificationsResponse>> {
    let notifications = state
        .store
        .with_workspace(|ws, _| ws.notifications(auth.user_id))?;
    Ok(Json(NotificationsResponse { notifications }))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Query(query), _): QueryParams<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let messages = state
        .store
        .with_workspace(|ws, _| ws.search(auth.user_id, &query.query_str))?;
    Ok(Json(SearchResponse { messages }))
}
