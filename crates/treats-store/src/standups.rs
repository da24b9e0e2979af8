use tracing::{debug, info};

use treats_types::api::StandupActiveResponse;
use treats_types::models::{ChannelId, MessageId, Target, UserId};

use crate::error::{Result, denied, invalid};
use crate::jobs::{Job, JobOutcome, ScheduledJob};
use crate::models::{Conversation, Message};
use crate::workspace::{Workspace, check_message_len};

impl Workspace {
    /// Opens a standup led by `actor` for `length` seconds. Returns the finish
    /// time and the flush job to schedule for it.
    pub fn start_standup(
        &mut self,
        actor: UserId,
        channel_id: ChannelId,
        length: i64,
        now: i64,
    ) -> Result<(i64, ScheduledJob)> {
        self.actor(actor)?;
        let channel = self.channel(channel_id)?;
        if channel.standup.active {
            return Err(invalid("A standup is already active in this channel"));
        }
        if length < 0 {
            return Err(invalid("Standup length cannot be negative"));
        }
        let ends_at = now
            .checked_add(length)
            .ok_or_else(|| invalid("Standup length too large"))?;
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }

        let aggregate_id = self.allocate_message_id();
        let generation = self.generation;
        let standup = &mut self.channel_mut(channel_id)?.standup;
        standup.active = true;
        standup.pending_lines.clear();
        standup.aggregate_message_id = Some(aggregate_id);
        standup.leader_id = Some(actor);
        standup.ends_at = Some(ends_at);

        info!(
            "Standup started in channel {} by user {}, ends at {}",
            channel_id, actor, ends_at
        );
        let job = ScheduledJob {
            generation,
            due: ends_at,
            job: Job::FlushStandup {
                channel_id,
                aggregate_id,
            },
        };
        Ok((ends_at, job))
    }

    /// Reads inactive once the finish time has passed, even if the flush has
    /// not run yet.
    pub fn standup_active(
        &self,
        actor: UserId,
        channel_id: ChannelId,
        now: i64,
    ) -> Result<StandupActiveResponse> {
        self.actor(actor)?;
        let channel = self.channel(channel_id)?;
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }

        let standup = &channel.standup;
        Ok(match standup.ends_at {
            Some(ends_at) if standup.active && now <= ends_at => StandupActiveResponse {
                is_active: true,
                time_finish: Some(ends_at),
            },
            _ => StandupActiveResponse {
                is_active: false,
                time_finish: None,
            },
        })
    }

    /// Buffers one line for the running standup. The line is attributed by
    /// first name and only becomes visible with the flush.
    pub fn standup_send(
        &mut self,
        actor: UserId,
        channel_id: ChannelId,
        line: &str,
        now: i64,
    ) -> Result<()> {
        let name_first = self.actor(actor)?.name_first.clone();
        let channel = self.channel(channel_id)?;
        if !channel.standup.active {
            return Err(invalid("No standup is active in this channel"));
        }
        check_message_len(line)?;
        if !channel.is_member(actor) {
            return Err(denied("Not a member of the channel"));
        }

        self.channel_mut(channel_id)?
            .standup
            .pending_lines
            .push(format!("{}: {}", name_first, line));
        if let Some(user) = self.user_mut(actor) {
            user.messages_sent.record(1, now);
        }
        self.scan_mentions(actor, Target::Channel(channel_id), line);
        Ok(())
    }

    /// Closes the session and posts its lines as one message under the
    /// reserved id. A flush for a session that is no longer current does
    /// nothing.
    pub(crate) fn flush_standup(
        &mut self,
        channel_id: ChannelId,
        aggregate_id: MessageId,
        now: i64,
    ) -> JobOutcome {
        let Ok(channel) = self.channel_mut(channel_id) else {
            debug!("Dropping standup flush: channel {} no longer exists", channel_id);
            return JobOutcome::Dropped;
        };
        let standup = &mut channel.standup;
        if !standup.active || standup.aggregate_message_id != Some(aggregate_id) {
            debug!(
                "Ignoring flush for superseded standup {} in channel {}",
                aggregate_id, channel_id
            );
            return JobOutcome::Stale;
        }

        let lines = std::mem::take(&mut standup.pending_lines);
        let leader = standup.leader_id;
        standup.reset();

        let Some(leader) = leader.filter(|_| !lines.is_empty()) else {
            info!("Standup in channel {} closed with no lines", channel_id);
            return JobOutcome::Flushed {
                channel_id,
                message_id: None,
            };
        };

        channel
            .messages
            .push(Message::new(aggregate_id, leader, lines.join("\n"), now));
        self.messages_exist.record(1, now);
        info!(
            "Standup in channel {} flushed {} lines as message {}",
            channel_id,
            lines.len(),
            aggregate_id
        );
        JobOutcome::Flushed {
            channel_id,
            message_id: Some(aggregate_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::workspace::fixtures::*;

    #[test]
    fn lines_flush_as_one_message_in_order() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.join_channel(alan, c, T0).unwrap();

        let (finish, job) = ws.start_standup(ada, c, 1, T0).unwrap();
        assert_eq!(finish, T0 + 1);
        ws.standup_send(ada, c, "hello", T0).unwrap();
        ws.standup_send(alan, c, "world", T0).unwrap();
        assert!(ws.channel(c).unwrap().messages.is_empty());

        let aggregate_id = ws.channel(c).unwrap().standup.aggregate_message_id.unwrap();
        assert_eq!(
            ws.run_job(job, T0 + 1),
            JobOutcome::Flushed {
                channel_id: c,
                message_id: Some(aggregate_id)
            }
        );

        let messages = &ws.channel(c).unwrap().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, aggregate_id);
        assert_eq!(messages[0].author_id, ada);
        assert_eq!(messages[0].body, "Ada: hello\nAlan: world");
        assert_eq!(messages[0].time_sent, T0 + 1);
        assert_eq!(ws.messages_exist.latest(), 1);
        assert_eq!(ws.users[&alan].messages_sent.latest(), 1);

        // session is fully reset and may start again
        assert!(!ws.standup_active(ada, c, T0 + 1).unwrap().is_active);
        ws.start_standup(alan, c, 5, T0 + 2).unwrap();
    }

    #[test]
    fn second_start_is_rejected_without_change() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.join_channel(alan, c, T0).unwrap();

        ws.start_standup(ada, c, 60, T0).unwrap();
        let before = ws.channel(c).unwrap().standup.clone();
        assert!(matches!(ws.start_standup(alan, c, 10, T0), Err(Error::InvalidInput(_))));
        let after = &ws.channel(c).unwrap().standup;
        assert_eq!(after.leader_id, before.leader_id);
        assert_eq!(after.ends_at, before.ends_at);
        assert_eq!(after.aggregate_message_id, before.aggregate_message_id);
    }

    #[test]
    fn start_and_send_preconditions() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();

        assert!(matches!(ws.start_standup(ada, c, -1, T0), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.start_standup(alan, c, 1, T0), Err(Error::AccessDenied(_))));
        assert!(matches!(ws.start_standup(ada, 99, 1, T0), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.standup_send(ada, c, "early", T0), Err(Error::InvalidInput(_))));

        ws.start_standup(ada, c, 10, T0).unwrap();
        assert!(matches!(ws.standup_send(ada, c, "", T0), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.standup_send(alan, c, "hi", T0), Err(Error::AccessDenied(_))));
        assert!(matches!(ws.standup_active(alan, c, T0), Err(Error::AccessDenied(_))));
    }

    #[test]
    fn active_reads_false_after_finish_time() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        assert_eq!(
            ws.standup_active(ada, c, T0).unwrap(),
            StandupActiveResponse {
                is_active: false,
                time_finish: None
            }
        );

        ws.start_standup(ada, c, 10, T0).unwrap();
        assert_eq!(
            ws.standup_active(ada, c, T0 + 10).unwrap(),
            StandupActiveResponse {
                is_active: true,
                time_finish: Some(T0 + 10)
            }
        );
        assert!(!ws.standup_active(ada, c, T0 + 11).unwrap().is_active);
    }

    #[test]
    fn leader_cannot_leave_until_flush() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        let (_, job) = ws.start_standup(ada, c, 1, T0).unwrap();

        assert!(matches!(ws.leave_channel(ada, c, T0), Err(Error::InvalidInput(_))));
        ws.run_job(job, T0 + 1);
        ws.leave_channel(ada, c, T0 + 1).unwrap();
    }

    #[test]
    fn empty_standup_posts_nothing() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        let (_, job) = ws.start_standup(ada, c, 1, T0).unwrap();

        assert_eq!(
            ws.run_job(job, T0 + 1),
            JobOutcome::Flushed {
                channel_id: c,
                message_id: None
            }
        );
        assert!(ws.channel(c).unwrap().messages.is_empty());
        assert!(!ws.channel(c).unwrap().standup.active);
    }

    #[test]
    fn flush_for_removed_channel_is_dropped() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        let (_, job) = ws.start_standup(ada, c, 1, T0).unwrap();
        ws.standup_send(ada, c, "lost", T0).unwrap();

        ws.remove_channel(ada, c, T0).unwrap();
        assert_eq!(ws.run_job(job, T0 + 1), JobOutcome::Dropped);
        assert_eq!(ws.messages_exist.latest(), 0);
    }

    #[test]
    fn oversized_length_is_rejected_before_reserving_an_id() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        let next_id = ws.next_message_id;

        assert!(matches!(
            ws.start_standup(ada, c, i64::MAX, T0),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(ws.next_message_id, next_id);
        assert!(!ws.channel(c).unwrap().standup.active);
    }

    #[test]
    fn removing_the_leader_closes_the_standup() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.join_channel(alan, c, T0).unwrap();
        let (_, job) = ws.start_standup(alan, c, 5, T0).unwrap();
        ws.standup_send(alan, c, "standup secret", T0).unwrap();

        ws.remove_user(ada, alan).unwrap();
        assert!(!ws.standup_active(ada, c, T0).unwrap().is_active);
        assert_eq!(ws.run_job(job, T0 + 5), JobOutcome::Stale);
        assert!(ws.channel(c).unwrap().messages.is_empty());

        // the channel is free for a new session
        ws.start_standup(ada, c, 5, T0 + 6).unwrap();
    }
}
