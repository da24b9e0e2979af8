use treats_types::models::{
    ChannelId, DmId, MessageId, MessageView, Notification, THUMBS_UP, Target, UserId,
};

use crate::error::{Result, denied, invalid};
use crate::models::{Conversation, Message, React};
use crate::workspace::{MAX_MESSAGE_LEN, Workspace, char_len, check_message_len};

/// Where a visible message sits: its conversation and index in the history.
#[derive(Debug, Clone, Copy)]
struct Located {
    target: Target,
    index: usize,
}

impl Workspace {
    pub fn send_message(
        &mut self,
        actor: UserId,
        channel: ChannelId,
        body: &str,
        now: i64,
    ) -> Result<MessageId> {
        self.send_to(actor, Target::Channel(channel), body, now)
    }

    pub fn send_dm(&mut self, actor: UserId, dm: DmId, body: &str, now: i64) -> Result<MessageId> {
        self.send_to(actor, Target::Dm(dm), body, now)
    }

    fn send_to(&mut self, actor: UserId, target: Target, body: &str, now: i64) -> Result<MessageId> {
        self.actor(actor)?;
        let conversation = self.conversation(target)?;
        check_message_len(body)?;
        if !conversation.is_member(actor) {
            return Err(denied("Not a member of the conversation"));
        }

        let id = self.allocate_message_id();
        self.post(target, Message::new(id, actor, body.to_string(), now), now);
        Ok(id)
    }

    /// Appends a message that has become visible and does the bookkeeping
    /// every visible message gets.
    pub(crate) fn post(&mut self, target: Target, message: Message, now: i64) -> bool {
        let author = message.author_id;
        let body = message.body.clone();
        let Ok(conversation) = self.conversation_mut(target) else {
            return false;
        };
        conversation.messages_mut().push(message);
        self.record_message_sent(author, now);
        self.scan_mentions(author, target, &body);
        true
    }

    /// Finds `message_id` in a channel or DM that `actor` has joined.
    fn locate(&self, actor: UserId, message_id: MessageId) -> Result<Located> {
        let in_dms = self.dms.iter().map(|d| (Target::Dm(d.id), d as &dyn Conversation));
        let in_channels = self
            .channels
            .iter()
            .map(|c| (Target::Channel(c.id), c as &dyn Conversation));

        in_dms
            .chain(in_channels)
            .filter(|(_, conversation)| conversation.is_member(actor))
            .find_map(|(target, conversation)| {
                conversation
                    .messages()
                    .iter()
                    .position(|m| m.id == message_id)
                    .map(|index| Located { target, index })
            })
            .ok_or_else(|| invalid("messageId does not refer to a message you can see"))
    }

    fn message_at(&self, at: Located) -> Result<&Message> {
        self.conversation(at.target)?
            .messages()
            .get(at.index)
            .ok_or_else(|| invalid("Invalid messageId"))
    }

    fn message_at_mut(&mut self, at: Located) -> Result<&mut Message> {
        self.conversation_mut(at.target)?
            .messages_mut()
            .get_mut(at.index)
            .ok_or_else(|| invalid("Invalid messageId"))
    }

    /// Channel owners (and member global owners) moderate channels; the
    /// creator moderates a DM.
    fn can_moderate(&self, actor: UserId, target: Target) -> bool {
        match target {
            Target::Channel(id) => self
                .channel(id)
                .is_ok_and(|c| self.has_owner_rights(c, actor)),
            Target::Dm(id) => self.dm(id).is_ok_and(|d| d.creator_id == Some(actor)),
        }
    }

    /// Replaces the body of a message. An empty body deletes it.
    pub fn edit_message(
        &mut self,
        actor: UserId,
        message_id: MessageId,
        body: &str,
        now: i64,
    ) -> Result<()> {
        self.actor(actor)?;
        let at = self.locate(actor, message_id)?;
        let author = self.message_at(at)?.author_id;
        if author != actor && !self.can_moderate(actor, at.target) {
            return Err(denied("Only the author or an owner can change this message"));
        }
        if char_len(body) > MAX_MESSAGE_LEN {
            return Err(invalid("Message length must be at most 1000"));
        }

        if body.is_empty() {
            self.conversation_mut(at.target)?
                .messages_mut()
                .remove(at.index);
            self.messages_exist.record(-1, now);
        } else {
            self.message_at_mut(at)?.body = body.to_string();
            self.scan_mentions(actor, at.target, body);
        }
        Ok(())
    }

    pub fn remove_message(&mut self, actor: UserId, message_id: MessageId, now: i64) -> Result<()> {
        self.edit_message(actor, message_id, "", now)
    }

    /// Reposts a visible message into a channel or DM, followed by optional
    /// extra text. `(channel_id, dm_id)` must name exactly one target.
    pub fn share_message(
        &mut self,
        actor: UserId,
        og_message_id: MessageId,
        extra: &str,
        channel_id: i64,
        dm_id: i64,
        now: i64,
    ) -> Result<MessageId> {
        self.actor(actor)?;
        let target = Target::from_wire(channel_id, dm_id)
            .ok_or_else(|| invalid("Exactly one of channelId and dmId must be -1"))?;
        self.conversation(target)?;
        if char_len(extra) > MAX_MESSAGE_LEN {
            return Err(invalid("Message length must be at most 1000"));
        }
        let og = self.locate(actor, og_message_id)?;
        if !self.is_member(actor, target) {
            return Err(denied("Not a member of the conversation"));
        }

        let body = format!("{}{}", self.message_at(og)?.body, extra);
        let id = self.allocate_message_id();
        self.post(target, Message::new(id, actor, body, now), now);
        Ok(id)
    }

    pub fn react(&mut self, actor: UserId, message_id: MessageId, react_id: u32) -> Result<()> {
        self.actor(actor)?;
        let at = self.locate(actor, message_id)?;
        if react_id != THUMBS_UP {
            return Err(invalid("Invalid reactId"));
        }
        let message = self.message_at(at)?;
        if message
            .reacts
            .iter()
            .any(|r| r.react_id == react_id && r.user_ids.contains(&actor))
        {
            return Err(invalid("Already reacted"));
        }
        let author = message.author_id;

        let message = self.message_at_mut(at)?;
        match message.reacts.iter_mut().find(|r| r.react_id == react_id) {
            Some(react) => react.user_ids.push(actor),
            None => message.reacts.push(React {
                react_id,
                user_ids: vec![actor],
            }),
        }

        if self.is_member(author, at.target) {
            let name = self.conversation(at.target)?.name().to_string();
            let text = format!("{} reacted to your message in {}", self.handle_of(actor), name);
            self.notify(author, Notification::new(at.target, text));
        }
        Ok(())
    }

    pub fn unreact(&mut self, actor: UserId, message_id: MessageId, react_id: u32) -> Result<()> {
        self.actor(actor)?;
        let at = self.locate(actor, message_id)?;
        if react_id != THUMBS_UP {
            return Err(invalid("Invalid reactId"));
        }
        let message = self.message_at_mut(at)?;
        let Some(react) = message
            .reacts
            .iter_mut()
            .find(|r| r.react_id == react_id && r.user_ids.contains(&actor))
        else {
            return Err(invalid("Not reacted"));
        };
        react.user_ids.retain(|&u| u != actor);
        Ok(())
    }

    pub fn pin(&mut self, actor: UserId, message_id: MessageId) -> Result<()> {
        self.set_pinned(actor, message_id, true)
    }

    pub fn unpin(&mut self, actor: UserId, message_id: MessageId) -> Result<()> {
        self.set_pinned(actor, message_id, false)
    }

    fn set_pinned(&mut self, actor: UserId, message_id: MessageId, pinned: bool) -> Result<()> {
        self.actor(actor)?;
        let at = self.locate(actor, message_id)?;
        if !self.can_moderate(actor, at.target) {
            return Err(denied("Only an owner can pin messages"));
        }
        let message = self.message_at_mut(at)?;
        if message.pinned == pinned {
            return Err(invalid(if pinned {
                "Message is already pinned"
            } else {
                "Message is not pinned"
            }));
        }
        message.pinned = pinned;
        Ok(())
    }

    /// Case-insensitive substring search over every conversation `actor` has
    /// joined.
    pub fn search(&self, actor: UserId, query: &str) -> Result<Vec<MessageView>> {
        self.actor(actor)?;
        check_message_len(query)?;
        let needle = query.to_lowercase();

        let channels = self.channels.iter().map(|c| c as &dyn Conversation);
        let dms = self.dms.iter().map(|d| d as &dyn Conversation);
        Ok(channels
            .chain(dms)
            .filter(|c| c.is_member(actor))
            .flat_map(|c| c.messages())
            .filter(|m| m.body.to_lowercase().contains(&needle))
            .map(|m| m.view(actor))
            .collect())
    }
}
