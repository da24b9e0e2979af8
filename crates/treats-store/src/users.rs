use treats_types::api::{UserStats, WorkspaceStats};
use treats_types::models::{
    ChannelsExistSample, ChannelsJoinedSample, DmsExistSample, DmsJoinedSample,
    MessagesExistSample, MessagesSentSample, UserId, UserProfile,
};

use crate::auth::{is_valid_email, is_valid_name};
use crate::error::{Result, invalid};
use crate::models::Conversation;
use crate::workspace::{Workspace, char_len};

impl Workspace {
    pub fn user_profile(&self, actor: UserId, u_id: UserId) -> Result<UserProfile> {
        self.actor(actor)?;
        self.profile_of(u_id)
            .ok_or_else(|| invalid("uId does not refer to a valid user"))
    }

    /// Active users only; removed users are left out.
    pub fn all_users(&self, actor: UserId) -> Result<Vec<UserProfile>> {
        self.actor(actor)?;
        Ok(self.users.values().map(|u| u.profile()).collect())
    }

    pub fn set_name(&mut self, actor: UserId, name_first: &str, name_last: &str) -> Result<()> {
        self.actor(actor)?;
        if !is_valid_name(name_first) || !is_valid_name(name_last) {
            return Err(invalid("Names must be between 1 and 50 characters"));
        }
        if let Some(user) = self.user_mut(actor) {
            user.name_first = name_first.to_string();
            user.name_last = name_last.to_string();
        }
        Ok(())
    }

    pub fn set_email(&mut self, actor: UserId, email: &str) -> Result<()> {
        self.actor(actor)?;
        if !is_valid_email(email) {
            return Err(invalid("Invalid email"));
        }
        if self.user_by_email(email).is_some() {
            return Err(invalid("Email already in use"));
        }
        if let Some(user) = self.user_mut(actor) {
            user.email = email.to_string();
        }
        Ok(())
    }

    pub fn set_handle(&mut self, actor: UserId, handle: &str) -> Result<()> {
        self.actor(actor)?;
        if !(3..=20).contains(&char_len(handle)) {
            return Err(invalid("Handle must be between 3 and 20 characters"));
        }
        if !handle.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("Handle must be alphanumeric"));
        }
        if self.user_by_handle(handle).is_some() {
            return Err(invalid("Handle already in use"));
        }
        if let Some(user) = self.user_mut(actor) {
            user.handle = handle.to_string();
        }
        Ok(())
    }

    // -- Stats --

    pub fn user_stats(&self, actor: UserId) -> Result<UserStats> {
        let user = self.actor(actor)?;

        let joined = user.channels_joined.latest() + user.dms_joined.latest();
        let involved = f64::from(joined + user.messages_sent.latest());
        let total = self.channels.len() + self.dms.len() + self.messages_exist.latest() as usize;
        let involvement_rate = if total == 0 {
            0.0
        } else {
            (involved / total as f64).min(1.0)
        };

        Ok(UserStats {
            channels_joined: user
                .channels_joined
                .samples()
                .iter()
                .map(|s| ChannelsJoinedSample {
                    num_channels_joined: s.count,
                    time_stamp: s.time_stamp,
                })
                .collect(),
            dms_joined: user
                .dms_joined
                .samples()
                .iter()
                .map(|s| DmsJoinedSample {
                    num_dms_joined: s.count,
                    time_stamp: s.time_stamp,
                })
                .collect(),
            messages_sent: user
                .messages_sent
                .samples()
                .iter()
                .map(|s| MessagesSentSample {
                    num_messages_sent: s.count,
                    time_stamp: s.time_stamp,
                })
                .collect(),
            involvement_rate,
        })
    }

    pub fn workspace_stats(&self, actor: UserId) -> Result<WorkspaceStats> {
        self.actor(actor)?;

        let engaged = self
            .users
            .keys()
            .filter(|&&id| {
                self.channels.iter().any(|c| c.is_member(id))
                    || self.dms.iter().any(|d| d.is_member(id))
            })
            .count();
        let utilization_rate = if self.users.is_empty() {
            0.0
        } else {
            engaged as f64 / self.users.len() as f64
        };

        Ok(WorkspaceStats {
            channels_exist: self
                .channels_exist
                .samples()
                .iter()
                .map(|s| ChannelsExistSample {
                    num_channels_exist: s.count,
                    time_stamp: s.time_stamp,
                })
                .collect(),
            dms_exist: self
                .dms_exist
                .samples()
                .iter()
                .map(|s| DmsExistSample {
                    num_dms_exist: s.count,
                    time_stamp: s.time_stamp,
                })
                .collect(),
            messages_exist: self
                .messages_exist
                .samples()
                .iter()
                .map(|s| MessagesExistSample {
                    num_messages_exist: s.count,
                    time_stamp: s.time_stamp,
                })
                .collect(),
            utilization_rate,
        })
    }
}
