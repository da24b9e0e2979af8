//! Work the scheduler hands back to the workspace once its time has come.
//!
//! Jobs are plain data. They capture everything needed at scheduling time and
//! are re-validated against the live workspace when they fire: the target may
//! have been removed, or the whole workspace cleared, in the meantime.
use serde::{Deserialize, Serialize};
use tracing::debug;

use treats_types::models::{ChannelId, MessageId, Target, UserId};

use crate::workspace::Workspace;

/// A message accepted now and made visible at `time_sent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredSend {
    pub target: Target,
    pub author_id: UserId,
    pub body: String,
    pub time_sent: i64,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Job {
    Deliver(DeferredSend),
    FlushStandup {
        channel_id: ChannelId,
        aggregate_id: MessageId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    /// Workspace generation the job was created in.
    pub generation: u64,
    /// Unix seconds at which the job becomes due.
    pub due: i64,
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Delivered {
        target: Target,
        message_id: MessageId,
    },
    /// `message_id` is `None` when nobody sent a line.
    Flushed {
        channel_id: ChannelId,
        message_id: Option<MessageId>,
    },
    /// The target no longer exists.
    Dropped,
    /// Cleared workspace or superseded standup session.
    Stale,
}

impl JobOutcome {
    pub fn changed_state(&self) -> bool {
        matches!(self, Self::Delivered { .. } | Self::Flushed { .. })
    }
}

impl Workspace {
    pub fn run_job(&mut self, scheduled: ScheduledJob, now: i64) -> JobOutcome {
        if scheduled.generation != self.generation {
            debug!(
                "Discarding job from generation {} (now {})",
                scheduled.generation, self.generation
            );
            return JobOutcome::Stale;
        }

        match scheduled.job {
            Job::Deliver(send) => self.deliver(send, now),
            Job::FlushStandup {
                channel_id,
                aggregate_id,
            } => self.flush_standup(channel_id, aggregate_id, now),
        }
    }
}
