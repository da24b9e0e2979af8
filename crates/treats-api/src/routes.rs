use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{admin, channels, dms, messages, notifications, standups, users};

/// Every route the server answers. Cross-cutting layers (CORS, tracing) are
/// left to the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/clear", delete(admin::clear));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        // Users
        .route("/users/all", get(users::all))
        .route("/users/stats", get(users::workspace_stats))
        .route("/user/profile", get(users::profile))
        .route("/user/profile/setname", put(users::set_name))
        .route("/user/profile/setemail", put(users::set_email))
        .route("/user/profile/sethandle", put(users::set_handle))
        .route("/user/stats", get(users::user_stats))
        // Admin
        .route("/admin/userpermission/change", post(admin::change_permission))
        .route("/admin/user/remove", delete(admin::remove_user))
        // Channels
        .route("/channels/create", post(channels::create))
        .route("/channels/list", get(channels::list))
        .route("/channels/listall", get(channels::list_all))
        .route("/channel/details", get(channels::details))
        .route("/channel/join", post(channels::join))
        .route("/channel/invite", post(channels::invite))
        .route("/channel/leave", post(channels::leave))
        .route("/channel/addowner", post(channels::add_owner))
        .route("/channel/removeowner", post(channels::remove_owner))
        .route("/channel/messages", get(channels::messages))
        .route("/channel/remove", delete(channels::remove))
        // DMs
        .route("/dm/create", post(dms::create))
        .route("/dm/list", get(dms::list))
        .route("/dm/details", get(dms::details))
        .route("/dm/leave", post(dms::leave))
        .route("/dm/remove", delete(dms::remove))
        .route("/dm/messages", get(dms::messages))
        // Messages
        .route("/message/send", post(messages::send))
        .route("/message/senddm", post(messages::send_dm))
        .route("/message/sendlater", post(messages::send_later))
        .route("/message/sendlaterdm", post(messages::send_later_dm))
        .route("/message/edit", put(messages::edit))
        .route("/message/remove", delete(messages::remove))
        .route("/message/share", post(messages::share))
        .route("/message/react", post(messages::react))
        .route("/message/unreact", post(messages::unreact))
        .route("/message/pin", post(messages::pin))
        .route("/message/unpin", post(messages::unpin))
        // Standups
        .route("/standup/start", post(standups::start))
        .route("/standup/active", get(standups::active))
        .route("/standup/send", post(standups::send))
        // Notifications & search
        .route("/notifications/get", get(notifications::list))
        .route("/search", get(notifications::search))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
