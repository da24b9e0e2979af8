//! Stored entity types: the shape of the in-memory graph and of the JSON
//! snapshot. Distinct from treats-types wire models so the snapshot format can
//! evolve independently of the HTTP surface.
use serde::{Deserialize, Serialize};

use treats_types::models::{
    ChannelId, DmId, MessageId, MessageView, Notification, Permission, ReactView, THUMBS_UP,
    UserId, UserProfile,
};

/// One point of an append-only counter series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub count: u32,
    pub time_stamp: i64,
}

/// Append-only `{count, timeStamp}` history. Every change appends a new
/// sample; nothing is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series(Vec<Sample>);

impl Series {
    pub fn starting_at(now: i64) -> Self {
        Self(vec![Sample {
            count: 0,
            time_stamp: now,
        }])
    }

    pub fn latest(&self) -> u32 {
        self.0.last().map_or(0, |s| s.count)
    }

    pub fn record(&mut self, delta: i64, now: i64) {
        let count = (i64::from(self.latest()) + delta).clamp(0, i64::from(u32::MAX)) as u32;
        self.0.push(Sample {
            count,
            time_stamp: now,
        });
    }

    /// Drops everything but the first sample.
    pub fn truncate_to_origin(&mut self) {
        self.0.truncate(1);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub handle: String,
    pub password_hash: String,
    pub permission: Permission,
    pub channels_joined: Series,
    pub dms_joined: Series,
    pub messages_sent: Series,
    pub notifications: Vec<Notification>,
    pub profile_img_url: String,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            u_id: self.id,
            email: self.email.clone(),
            name_first: self.name_first.clone(),
            name_last: self.name_last.clone(),
            handle_str: self.handle.clone(),
            profile_img_url: self.profile_img_url.clone(),
        }
    }
}

/// What is left of a user after an admin removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedUser {
    pub id: UserId,
    pub email: String,
    pub handle: String,
}

impl RemovedUser {
    pub fn profile(&self, profile_img_url: &str) -> UserProfile {
        UserProfile {
            u_id: self.id,
            email: self.email.clone(),
            name_first: "Removed".into(),
            name_last: "user".into(),
            handle_str: self.handle.clone(),
            profile_img_url: profile_img_url.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct React {
    pub react_id: u32,
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_id: UserId,
    pub body: String,
    pub time_sent: i64,
    pub reacts: Vec<React>,
    pub pinned: bool,
}

impl Message {
    pub fn new(id: MessageId, author_id: UserId, body: String, time_sent: i64) -> Self {
        Self {
            id,
            author_id,
            body,
            time_sent,
            reacts: vec![React {
                react_id: THUMBS_UP,
                user_ids: Vec::new(),
            }],
            pinned: false,
        }
    }

    pub fn view(&self, viewer: UserId) -> MessageView {
        MessageView {
            message_id: self.id,
            u_id: self.author_id,
            message: self.body.clone(),
            time_sent: self.time_sent,
            reacts: self
                .reacts
                .iter()
                .map(|r| ReactView {
                    react_id: r.react_id,
                    u_ids: r.user_ids.clone(),
                    is_this_user_reacted: r.user_ids.contains(&viewer),
                })
                .collect(),
            is_pinned: self.pinned,
        }
    }
}

/// Per-channel standup state. `None` fields mean "no session".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandupSession {
    pub active: bool,
    pub pending_lines: Vec<String>,
    pub aggregate_message_id: Option<MessageId>,
    pub leader_id: Option<UserId>,
    pub ends_at: Option<i64>,
}

impl StandupSession {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_led_by(&self, user_id: UserId) -> bool {
        self.active && self.leader_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub is_public: bool,
    pub owner_ids: Vec<UserId>,
    pub member_ids: Vec<UserId>,
    pub messages: Vec<Message>,
    pub standup: StandupSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dm {
    pub id: DmId,
    pub name: String,
    /// Cleared when the creator leaves; the DM lives on without one.
    pub creator_id: Option<UserId>,
    pub member_ids: Vec<UserId>,
    pub messages: Vec<Message>,
}

/// Common view over the two places messages can live.
pub trait Conversation {
    fn name(&self) -> &str;
    fn member_ids(&self) -> &[UserId];
    fn messages(&self) -> &[Message];
    fn messages_mut(&mut self) -> &mut Vec<Message>;

    fn is_member(&self, user_id: UserId) -> bool {
        self.member_ids().contains(&user_id)
    }
}

impl Conversation for Channel {
    fn name(&self) -> &str {
        &self.name
    }

    fn member_ids(&self) -> &[UserId] {
        &self.member_ids
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }
}

impl Conversation for Dm {
    fn name(&self) -> &str {
        &self.name
    }

    fn member_ids(&self) -> &[UserId] {
        &self.member_ids
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }
}
