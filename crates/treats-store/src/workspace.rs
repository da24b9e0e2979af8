use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use treats_types::models::{
    ChannelId, DmId, MessageId, Notification, Permission, Target, UserId, UserProfile,
};

use crate::error::{Error, Result, invalid};
use crate::models::{Channel, Conversation, Dm, RemovedUser, Series, User};

/// Longest message body accepted anywhere.
pub const MAX_MESSAGE_LEN: usize = 1000;

/// The whole Treats object graph. One instance lives behind the
/// [`Store`](crate::Store) lock; every operation runs to completion on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Bumped by `clear`; scheduler jobs from an older generation are void.
    pub(crate) generation: u64,
    pub(crate) next_user_id: UserId,
    pub(crate) next_channel_id: ChannelId,
    pub(crate) next_dm_id: DmId,
    pub(crate) next_message_id: MessageId,
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) removed_users: Vec<RemovedUser>,
    pub(crate) channels: Vec<Channel>,
    pub(crate) dms: Vec<Dm>,
    pub(crate) sessions: HashMap<Uuid, UserId>,
    pub(crate) channels_exist: Series,
    pub(crate) dms_exist: Series,
    pub(crate) messages_exist: Series,
    pub(crate) default_profile_img_url: String,
}

impl Workspace {
    pub fn new(default_profile_img_url: impl Into<String>, now: i64) -> Self {
        Self {
            generation: 0,
            next_user_id: 1,
            next_channel_id: 1,
            next_dm_id: 1,
            next_message_id: 1,
            users: BTreeMap::new(),
            removed_users: Vec::new(),
            channels: Vec::new(),
            dms: Vec::new(),
            sessions: HashMap::new(),
            channels_exist: Series::starting_at(now),
            dms_exist: Series::starting_at(now),
            messages_exist: Series::starting_at(now),
            default_profile_img_url: default_profile_img_url.into(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_default_profile_img_url(&mut self, url: impl Into<String>) {
        self.default_profile_img_url = url.into();
    }

    /// Resets the workspace to its initial state. Counter series keep their
    /// origin sample; everything else starts over.
    pub fn clear(&mut self) {
        let mut fresh = Self::new(std::mem::take(&mut self.default_profile_img_url), 0);
        fresh.generation = self.generation + 1;
        fresh.channels_exist = std::mem::replace(&mut self.channels_exist, Series::starting_at(0));
        fresh.dms_exist = std::mem::replace(&mut self.dms_exist, Series::starting_at(0));
        fresh.messages_exist = std::mem::replace(&mut self.messages_exist, Series::starting_at(0));
        fresh.channels_exist.truncate_to_origin();
        fresh.dms_exist.truncate_to_origin();
        fresh.messages_exist.truncate_to_origin();
        *self = fresh;
    }

    /// Standups restored from a snapshot have lost their flush timer. Returns
    /// how many sessions were closed.
    pub fn reset_stale_standups(&mut self) -> usize {
        let mut closed = 0;
        for channel in self.channels.iter_mut().filter(|c| c.standup.active) {
            warn!(
                "Closing standup in channel {} restored without a flush timer ({} pending lines lost)",
                channel.id,
                channel.standup.pending_lines.len()
            );
            channel.standup.reset();
            closed += 1;
        }
        closed
    }

    /// Hands out the next globally unique message id. Ids are never reused,
    /// whether or not a message ever materialises under them.
    pub(crate) fn allocate_message_id(&mut self) -> MessageId {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }

    // -- Lookups --

    pub(crate) fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    /// The acting user. Sessions die with their user, so a missing actor means
    /// the token outlived its session.
    pub(crate) fn actor(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or(Error::InvalidToken)
    }

    pub(crate) fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    pub(crate) fn user_by_handle(&self, handle: &str) -> Option<&User> {
        self.users.values().find(|u| u.handle == handle)
    }

    pub(crate) fn channel(&self, id: ChannelId) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| invalid("Invalid channelId"))
    }

    pub(crate) fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| invalid("Invalid channelId"))
    }

    pub(crate) fn dm(&self, id: DmId) -> Result<&Dm> {
        self.dms
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| invalid("Invalid dmId"))
    }

    pub(crate) fn dm_mut(&mut self, id: DmId) -> Result<&mut Dm> {
        self.dms
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| invalid("Invalid dmId"))
    }

    pub(crate) fn conversation(&self, target: Target) -> Result<&dyn Conversation> {
        let conversation: &dyn Conversation = match target {
            Target::Channel(id) => self.channel(id)?,
            Target::Dm(id) => self.dm(id)?,
        };
        Ok(conversation)
    }

    pub(crate) fn conversation_mut(&mut self, target: Target) -> Result<&mut dyn Conversation> {
        let conversation: &mut dyn Conversation = match target {
            Target::Channel(id) => self.channel_mut(id)?,
            Target::Dm(id) => self.dm_mut(id)?,
        };
        Ok(conversation)
    }

    pub fn target_exists(&self, target: Target) -> bool {
        self.conversation(target).is_ok()
    }

    pub fn is_member(&self, user_id: UserId, target: Target) -> bool {
        self.conversation(target)
            .map(|c| c.is_member(user_id))
            .unwrap_or(false)
    }

    pub(crate) fn is_global_owner(&self, id: UserId) -> bool {
        self.users
            .get(&id)
            .is_some_and(|u| u.permission == Permission::Owner)
    }

    /// Profile of an active or removed user.
    pub(crate) fn profile_of(&self, id: UserId) -> Option<UserProfile> {
        if let Some(user) = self.users.get(&id) {
            return Some(user.profile());
        }
        self.removed_users
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.profile(&self.default_profile_img_url))
    }

    pub(crate) fn profiles_of(&self, ids: &[UserId]) -> Vec<UserProfile> {
        ids.iter().filter_map(|&id| self.profile_of(id)).collect()
    }

    pub(crate) fn handle_of(&self, id: UserId) -> String {
        self.profile_of(id).map(|p| p.handle_str).unwrap_or_default()
    }

    // -- Counters & notifications --

    /// One more message sent by `author` (if still active) and one more
    /// message in the workspace.
    pub(crate) fn record_message_sent(&mut self, author: UserId, now: i64) {
        if let Some(user) = self.user_mut(author) {
            user.messages_sent.record(1, now);
        }
        self.messages_exist.record(1, now);
    }

    pub(crate) fn record_channels_joined(&mut self, user_id: UserId, delta: i64, now: i64) {
        if let Some(user) = self.user_mut(user_id) {
            user.channels_joined.record(delta, now);
        }
    }

    pub(crate) fn record_dms_joined(&mut self, user_id: UserId, delta: i64, now: i64) {
        if let Some(user) = self.user_mut(user_id) {
            user.dms_joined.record(delta, now);
        }
    }

    pub(crate) fn notify(&mut self, user_id: UserId, notification: Notification) {
        if let Some(user) = self.user_mut(user_id) {
            user.notifications.push(notification);
        }
    }
}

/// Length in characters, which is what every length limit counts.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn check_message_len(body: &str) -> Result<()> {
    let len = char_len(body);
    if len < 1 || len > MAX_MESSAGE_LEN {
        return Err(invalid("Message length must be between 1 and 1000"));
    }
    Ok(())
}
