use tracing::info;

use treats_types::api::{ChannelDetailsResponse, MessagesPage};
use treats_types::models::{ChannelId, ChannelSummary, Notification, Target, UserId};

use crate::error::{Result, denied, invalid};
use crate::models::{Channel, Conversation, Message, StandupSession};
use crate::workspace::{Workspace, char_len};

/// Messages per history page.
pub const PAGE_SIZE: usize = 50;

/// One page of `messages`, newest first, starting `start` messages back.
pub(crate) fn page_of(messages: &[Message], start: usize, viewer: UserId) -> Result<MessagesPage> {
    let total = messages.len();
    if start > total || (start == total && total > 0) {
        return Err(invalid("Start index is past the oldest message"));
    }

    let page: Vec<_> = messages
        .iter()
        .rev()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|m| m.view(viewer))
        .collect();
    let end = if start + PAGE_SIZE >= total {
        -1
    } else {
        (start + PAGE_SIZE) as i64
    };

    Ok(MessagesPage {
        messages: page,
        start,
        end,
    })
}

impl Workspace {
    /// Channel owners, and global owners who are members, act as owners.
    pub(crate) fn has_owner_rights(&self, channel: &Channel, user_id: UserId) -> bool {
        channel.owner_ids.contains(&user_id)
            || (self.is_global_owner(user_id) && channel.is_member(user_id))
    }

    pub fn create_channel(
        &mut self,
        actor: UserId,
        name: &str,
        is_public: bool,
        now: i64,
    ) -> Result<ChannelId> {
        self.actor(actor)?;
        if !(1..=20).contains(&char_len(name)) {
            return Err(invalid("Channel name must be between 1 and 20 characters"));
        }

        let id = self.next_channel_id;
        self.next_channel_id += 1;
        self.channels.push(Channel {
            id,
            name: name.to_string(),
            is_public,
            owner_ids: vec![actor],
            member_ids: vec![actor],
            messages: Vec::new(),
            standup: StandupSession::default(),
        });

        self.record_channels_joined(actor, 1, now);
        self.channels_exist.record(1, now);
        info!("User {} created channel {} ({})", actor, id, name);
        Ok(id)
    }

    pub fn list_channels(&self, actor: UserId) -> Result<Vec<ChannelSummary>> {
        self.actor(actor)?;
        Ok(self
            .channels
            .iter()
            .filter(|c| c.is_member(actor))
            .map(summary)
            .collect())
    }

    /// Every channel, public or private.
    pub fn list_all_channels(&self, actor: UserId) -> Result<Vec<ChannelSummary>> {
        self.actor(actor)?;
        Ok(self.channels.iter().map(summary).collect())
    }

    pub fn channel_details(&self, actor: UserId, id: ChannelId) -> Result<ChannelDetailsResponse> {
        self.actor(actor)?;
        let channel = self.channel(id)?;
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }
        Ok(ChannelDetailsResponse {
            name: channel.name.clone(),
            is_public: channel.is_public,
            owner_members: self.profiles_of(&channel.owner_ids),
            all_members: self.profiles_of(&channel.member_ids),
        })
    }

    pub fn join_channel(&mut self, actor: UserId, id: ChannelId, now: i64) -> Result<()> {
        self.actor(actor)?;
        let is_global_owner = self.is_global_owner(actor);
        let channel = self.channel_mut(id)?;
        if channel.is_member(actor) {
            return Err(invalid("Already a member of the channel"));
        }
        if !channel.is_public && !is_global_owner {
            return Err(denied("Channel is private"));
        }
        channel.member_ids.push(actor);
        self.record_channels_joined(actor, 1, now);
        Ok(())
    }

    pub fn invite_to_channel(
        &mut self,
        actor: UserId,
        id: ChannelId,
        u_id: UserId,
        now: i64,
    ) -> Result<()> {
        self.actor(actor)?;
        let channel = self.channel(id)?;
        if !self.users.contains_key(&u_id) {
            return Err(invalid("uId does not refer to a valid user"));
        }
        if channel.is_member(u_id) {
            return Err(invalid("User is already a member of the channel"));
        }
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }

        let message = format!("{} added you to {}", self.handle_of(actor), channel.name);
        self.channel_mut(id)?.member_ids.push(u_id);
        self.record_channels_joined(u_id, 1, now);
        self.notify(u_id, Notification::new(Target::Channel(id), message));
        Ok(())
    }

    /// Leaving also gives up ownership. The leader of a running standup has to
    /// wait for it to flush.
    pub fn leave_channel(&mut self, actor: UserId, id: ChannelId, now: i64) -> Result<()> {
        self.actor(actor)?;
        let channel = self.channel_mut(id)?;
        if channel.standup.is_led_by(actor) {
            return Err(invalid("Cannot leave while leading an active standup"));
        }
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }
        channel.member_ids.retain(|&m| m != actor);
        channel.owner_ids.retain(|&o| o != actor);
        self.record_channels_joined(actor, -1, now);
        Ok(())
    }

    pub fn add_channel_owner(&mut self, actor: UserId, id: ChannelId, u_id: UserId) -> Result<()> {
        self.actor(actor)?;
        let channel = self.channel(id)?;
        if !self.has_owner_rights(channel, actor) {
            return Err(denied("Not an owner of the channel"));
        }
        if !self.users.contains_key(&u_id) {
            return Err(invalid("uId does not refer to a valid user"));
        }
        if channel.owner_ids.contains(&u_id) {
            return Err(invalid("User is already an owner of the channel"));
        }
        if !channel.is_member(u_id) {
            return Err(invalid("User is not a member of the channel"));
        }
        self.channel_mut(id)?.owner_ids.push(u_id);
        Ok(())
    }

    pub fn remove_channel_owner(
        &mut self,
        actor: UserId,
        id: ChannelId,
        u_id: UserId,
    ) -> Result<()> {
        self.actor(actor)?;
        let channel = self.channel(id)?;
        if !self.has_owner_rights(channel, actor) {
            return Err(denied("Not an owner of the channel"));
        }
        if !self.users.contains_key(&u_id) {
            return Err(invalid("uId does not refer to a valid user"));
        }
        if !channel.owner_ids.contains(&u_id) || !channel.is_member(u_id) {
            return Err(invalid("User is not an owner of the channel"));
        }
        if channel.owner_ids.len() == 1 {
            return Err(invalid("A channel must keep at least one owner"));
        }
        self.channel_mut(id)?.owner_ids.retain(|&o| o != u_id);
        Ok(())
    }

    pub fn channel_messages(
        &self,
        actor: UserId,
        id: ChannelId,
        start: usize,
    ) -> Result<MessagesPage> {
        self.actor(actor)?;
        let channel = self.channel(id)?;
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }
        page_of(&channel.messages, start, actor)
    }

    /// Deletes a channel with its history and any running standup. Deferred
    /// sends still headed for it are dropped when they fire.
    pub fn remove_channel(&mut self, actor: UserId, id: ChannelId, now: i64) -> Result<()> {
        self.actor(actor)?;
        let channel = self.channel(id)?;
        if !self.has_owner_rights(channel, actor) {
            return Err(denied("Not an owner of the channel"));
        }

        let index = self.channels.iter().position(|c| c.id == id);
        let Some(channel) = index.map(|i| self.channels.remove(i)) else {
            return Err(invalid("Invalid channelId"));
        };

        for &member in &channel.member_ids {
            self.record_channels_joined(member, -1, now);
        }
        self.channels_exist.record(-1, now);
        if !channel.messages.is_empty() {
            self.messages_exist
                .record(-(channel.messages.len() as i64), now);
        }
        info!(
            "User {} removed channel {} ({} messages)",
            actor,
            id,
            channel.messages.len()
        );
        Ok(())
    }
}

fn summary(channel: &Channel) -> ChannelSummary {
    ChannelSummary {
        channel_id: channel.id,
        name: channel.name.clone(),
    }
}
