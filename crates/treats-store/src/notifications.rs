use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use treats_types::models::{Notification, Target, UserId};

use crate::error::Result;
use crate::workspace::Workspace;

/// How many notifications a user gets back, newest first.
const NOTIFICATION_PAGE: usize = 20;

/// How much of a tagging message is quoted in the notification.
const MENTION_PREVIEW_LEN: usize = 20;

static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(\w+)").expect("static regex"));

impl Workspace {
    pub fn notifications(&self, actor: UserId) -> Result<Vec<Notification>> {
        let user = self.actor(actor)?;
        Ok(user
            .notifications
            .iter()
            .rev()
            .take(NOTIFICATION_PAGE)
            .cloned()
            .collect())
    }

    /// Notifies every distinct `@handle` in `body` that names a member of
    /// `target`. Unknown handles and non-members are skipped.
    pub(crate) fn scan_mentions(&mut self, author: UserId, target: Target, body: &str) {
        if !body.contains('@') {
            return;
        }
        let Ok(conversation) = self.conversation(target) else {
            return;
        };

        let preview: String = body.chars().take(MENTION_PREVIEW_LEN).collect();
        let message = format!(
            "{} tagged you in {}: {}",
            self.handle_of(author),
            conversation.name(),
            preview
        );

        let mut seen = HashSet::new();
        let tagged: Vec<UserId> = MENTION
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|handle| seen.insert(*handle))
            .filter_map(|handle| self.user_by_handle(handle))
            .map(|u| u.id)
            .filter(|&id| conversation.is_member(id))
            .collect();

        for user_id in tagged {
            self.notify(user_id, Notification::new(target, message.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use treats_types::models::Target;

    use crate::workspace::fixtures::*;

    #[test]
    fn mentions_notify_members_once() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let grace = register(&mut ws, "Grace", "Hopper");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.join_channel(alan, c, T0).unwrap();

        ws.send_message(
            ada,
            c,
            "@alanturing @alanturing @gracehopper @nobody look at this",
            T0,
        )
        .unwrap();

        let alan_notes = ws.notifications(alan).unwrap();
        assert_eq!(alan_notes.len(), 1);
        assert_eq!(
            alan_notes[0].notification_message,
            "adalovelace tagged you in general: @alanturing @alantur"
        );
        assert_eq!(alan_notes[0].channel_id, i64::from(c));
        assert_eq!(alan_notes[0].dm_id, -1);

        // grace is not in the channel
        assert!(ws.notifications(grace).unwrap().is_empty());
    }

    #[test]
    fn only_twenty_newest_are_returned() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.join_channel(alan, c, T0).unwrap();

        for i in 0..25 {
            ws.scan_mentions(ada, Target::Channel(c), &format!("@alanturing {}", i));
        }

        let notes = ws.notifications(alan).unwrap();
        assert_eq!(notes.len(), 20);
        assert!(notes[0].notification_message.ends_with("@alanturing 24"));
        assert!(notes[19].notification_message.ends_with("@alanturing 5"));
    }
}
