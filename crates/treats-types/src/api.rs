use serde::{Deserialize, Serialize};

use crate::models::{
    ChannelId, ChannelSummary, ChannelsExistSample, ChannelsJoinedSample, DmId, DmSummary,
    DmsExistSample, DmsJoinedSample, MessageId, MessageView, MessagesExistSample,
    MessagesSentSample, Notification, UserId, UserProfile,
};

/// Body of every operation that has nothing to report: serializes as `{}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Empty {}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub auth_user_id: UserId,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub u_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersAllResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetNameRequest {
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetHandleRequest {
    pub handle_str: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub channels_joined: Vec<ChannelsJoinedSample>,
    pub dms_joined: Vec<DmsJoinedSample>,
    pub messages_sent: Vec<MessagesSentSample>,
    pub involvement_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub user_stats: UserStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    pub channels_exist: Vec<ChannelsExistSample>,
    pub dms_exist: Vec<DmsExistSample>,
    pub messages_exist: Vec<MessagesExistSample>,
    pub utilization_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStatsResponse {
    pub workspace_stats: WorkspaceStats,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PermissionChangeRequest {
    pub u_id: UserId,
    pub permission_id: u8,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChannelsCreateRequest {
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsCreateResponse {
    pub channel_id: ChannelId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelsListResponse {
    pub channels: Vec<ChannelSummary>,
}

/// Query or body carrying just a channel id (details, join, leave, remove).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelIdParams {
    pub channel_id: ChannelId,
}

/// Body naming a channel and a user (invite, addowner, removeowner).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChannelMemberRequest {
    pub channel_id: ChannelId,
    pub u_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessagesQuery {
    pub channel_id: ChannelId,
    pub start: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetailsResponse {
    pub name: String,
    pub is_public: bool,
    pub owner_members: Vec<UserProfile>,
    pub all_members: Vec<UserProfile>,
}

/// One page of a channel or DM history, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesPage {
    pub messages: Vec<MessageView>,
    pub start: usize,
    /// `start + 50`, or `-1` once the oldest message has been returned.
    pub end: i64,
}

// -- DMs --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DmCreateRequest {
    pub u_ids: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmCreateResponse {
    pub dm_id: DmId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmListResponse {
    pub dms: Vec<DmSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmIdParams {
    pub dm_id: DmId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmMessagesQuery {
    pub dm_id: DmId,
    pub start: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmDetailsResponse {
    pub name: String,
    pub members: Vec<UserProfile>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub channel_id: ChannelId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendDmRequest {
    pub dm_id: DmId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendLaterRequest {
    pub channel_id: ChannelId,
    pub message: String,
    pub time_sent: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendLaterDmRequest {
    pub dm_id: DmId,
    pub message: String,
    pub time_sent: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdResponse {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditMessageRequest {
    pub message_id: MessageId,
    pub message: String,
}

/// Query or body carrying just a message id (remove, pin, unpin).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdParams {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShareMessageRequest {
    pub og_message_id: MessageId,
    #[serde(default)]
    pub message: String,
    pub channel_id: i64,
    pub dm_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMessageResponse {
    pub shared_message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReactRequest {
    pub message_id: MessageId,
    pub react_id: u32,
}

// -- Standups --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StandupStartRequest {
    pub channel_id: ChannelId,
    pub length: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandupStartResponse {
    pub time_finish: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandupActiveResponse {
    pub is_active: bool,
    pub time_finish: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StandupSendRequest {
    pub channel_id: ChannelId,
    pub message: String,
}

// -- Notifications & search --

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query_str: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub messages: Vec<MessageView>,
}
