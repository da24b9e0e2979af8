use serde::{Deserialize, Serialize};

pub type UserId = u32;
pub type ChannelId = u32;
pub type DmId = u32;
pub type MessageId = u32;

/// The only react kind the workspace knows about.
pub const THUMBS_UP: u32 = 1;

/// Where a message lives: a channel or a direct-message group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Target {
    Channel(ChannelId),
    Dm(DmId),
}

impl Target {
    /// Builds a target from the `channelId`/`dmId` pair used on the wire, where
    /// exactly one of the two must be `-1`.
    pub fn from_wire(channel_id: i64, dm_id: i64) -> Option<Self> {
        match (channel_id, dm_id) {
            (-1, -1) => None,
            (c, -1) => u32::try_from(c).ok().map(Self::Channel),
            (-1, d) => u32::try_from(d).ok().map(Self::Dm),
            _ => None,
        }
    }

    /// `(channelId, dmId)` with `-1` standing in for the side that is unused.
    pub fn to_wire(self) -> (i64, i64) {
        match self {
            Self::Channel(id) => (i64::from(id), -1),
            Self::Dm(id) => (-1, i64::from(id)),
        }
    }
}

/// Global (workspace-wide) permission level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Permission {
    Owner,
    Member,
}

impl TryFrom<u8> for Permission {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Owner),
            2 => Ok(Self::Member),
            other => Err(format!("unknown permission id {}", other)),
        }
    }
}

impl From<Permission> for u8 {
    fn from(value: Permission) -> Self {
        match value {
            Permission::Owner => 1,
            Permission::Member => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub channel_id: i64,
    pub dm_id: i64,
    pub notification_message: String,
}

impl Notification {
    pub fn new(target: Target, notification_message: String) -> Self {
        let (channel_id, dm_id) = target.to_wire();
        Self {
            channel_id,
            dm_id,
            notification_message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub u_id: UserId,
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub handle_str: String,
    pub profile_img_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactView {
    pub react_id: u32,
    pub u_ids: Vec<UserId>,
    pub is_this_user_reacted: bool,
}

/// A message as seen by one particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message_id: MessageId,
    pub u_id: UserId,
    pub message: String,
    pub time_sent: i64,
    pub reacts: Vec<ReactView>,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub channel_id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmSummary {
    pub dm_id: DmId,
    pub name: String,
}

// -- Stat samples --
//
// Each series is append-only; the wire names differ per series.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsJoinedSample {
    pub num_channels_joined: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsJoinedSample {
    pub num_dms_joined: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesSentSample {
    pub num_messages_sent: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsExistSample {
    pub num_channels_exist: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsExistSample {
    pub num_dms_exist: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesExistSample {
    pub num_messages_exist: u32,
    pub time_stamp: i64,
}
