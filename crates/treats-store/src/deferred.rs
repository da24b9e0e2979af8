use tracing::{debug, info};

use treats_types::models::{MessageId, Target, UserId};

use crate::admin::REMOVED_USER_BODY;
use crate::error::{Result, denied, invalid};
use crate::jobs::{DeferredSend, Job, JobOutcome, ScheduledJob};
use crate::models::Message;
use crate::workspace::{Workspace, check_message_len};

impl Workspace {
    /// Accepts a message for delivery at `time_sent`. The id is reserved now
    /// and returned together with the job to hand to the scheduler; nothing
    /// becomes visible until the job runs.
    pub fn schedule_send(
        &mut self,
        actor: UserId,
        target: Target,
        body: &str,
        time_sent: i64,
        now: i64,
    ) -> Result<(MessageId, ScheduledJob)> {
        self.actor(actor)?;
        let conversation = self.conversation(target)?;
        check_message_len(body)?;
        if !conversation.is_member(actor) {
            return Err(denied("Not a member of the conversation"));
        }
        if time_sent < now {
            return Err(invalid("timeSent is in the past"));
        }

        let message_id = self.allocate_message_id();
        info!(
            "User {} scheduled message {} into {:?} for {}",
            actor, message_id, target, time_sent
        );
        let job = ScheduledJob {
            generation: self.generation,
            due: time_sent,
            job: Job::Deliver(DeferredSend {
                target,
                author_id: actor,
                body: body.to_string(),
                time_sent,
                message_id,
            }),
        };
        Ok((message_id, job))
    }

    /// Makes a deferred message visible, unless its target has gone away in
    /// the meantime.
    pub(crate) fn deliver(&mut self, send: DeferredSend, now: i64) -> JobOutcome {
        let DeferredSend {
            target,
            author_id,
            body,
            time_sent,
            message_id,
        } = send;
        // Written before its author was removed.
        let body = if self.users.contains_key(&author_id) {
            body
        } else {
            REMOVED_USER_BODY.to_string()
        };

        if !self.post(target, Message::new(message_id, author_id, body, time_sent), now) {
            debug!(
                "Dropping deferred message {}: {:?} no longer exists",
                message_id, target
            );
            return JobOutcome::Dropped;
        }
        JobOutcome::Delivered { target, message_id }
    }
}
