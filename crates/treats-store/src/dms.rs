use std::collections::HashSet;

use tracing::info;

use treats_types::api::{DmDetailsResponse, MessagesPage};
use treats_types::models::{DmId, DmSummary, Notification, Target, UserId};

use crate::channels::page_of;
use crate::error::{Result, denied, invalid};
use crate::models::{Conversation, Dm};
use crate::workspace::Workspace;

impl Workspace {
    /// Opens a DM between `actor` and `u_ids`. The name is the members'
    /// handles in alphabetical order, fixed at creation.
    pub fn create_dm(&mut self, actor: UserId, u_ids: &[UserId], now: i64) -> Result<DmId> {
        self.actor(actor)?;

        let mut member_ids = u_ids.to_vec();
        member_ids.push(actor);
        let mut seen = HashSet::new();
        if !member_ids.iter().all(|id| seen.insert(*id)) {
            return Err(invalid("Duplicate uIds"));
        }
        if !member_ids.iter().all(|id| self.users.contains_key(id)) {
            return Err(invalid("uId does not refer to a valid user"));
        }

        let mut handles: Vec<String> = member_ids.iter().map(|&id| self.handle_of(id)).collect();
        handles.sort();
        let name = handles.join(", ");

        let id = self.next_dm_id;
        self.next_dm_id += 1;

        let message = format!("{} added you to {}", self.handle_of(actor), name);
        for &member in &member_ids {
            if member != actor {
                self.notify(member, Notification::new(Target::Dm(id), message.clone()));
            }
            self.record_dms_joined(member, 1, now);
        }
        self.dms_exist.record(1, now);

        self.dms.push(Dm {
            id,
            name,
            creator_id: Some(actor),
            member_ids,
            messages: Vec::new(),
        });
        info!("User {} created DM {}", actor, id);
        Ok(id)
    }

    pub fn list_dms(&self, actor: UserId) -> Result<Vec<DmSummary>> {
        self.actor(actor)?;
        Ok(self
            .dms
            .iter()
            .filter(|d| d.is_member(actor))
            .map(|d| DmSummary {
                dm_id: d.id,
                name: d.name.clone(),
            })
            .collect())
    }

    pub fn dm_details(&self, actor: UserId, id: DmId) -> Result<DmDetailsResponse> {
        self.actor(actor)?;
        let dm = self.dm(id)?;
        if !dm.is_member(actor) {
            return Err(denied("Not a member of the DM"));
        }
        Ok(DmDetailsResponse {
            name: dm.name.clone(),
            members: self.profiles_of(&dm.member_ids),
        })
    }

    /// The DM outlives its creator leaving; it just has no creator any more.
    pub fn leave_dm(&mut self, actor: UserId, id: DmId, now: i64) -> Result<()> {
        self.actor(actor)?;
        let dm = self.dm_mut(id)?;
        if !dm.is_member(actor) {
            return Err(denied("Not a member of the DM"));
        }
        dm.member_ids.retain(|&m| m != actor);
        if dm.creator_id == Some(actor) {
            dm.creator_id = None;
        }
        self.record_dms_joined(actor, -1, now);
        Ok(())
    }

    /// Creator only. Deferred sends still headed for the DM are dropped when
    /// they fire.
    pub fn remove_dm(&mut self, actor: UserId, id: DmId, now: i64) -> Result<()> {
        self.actor(actor)?;
        let dm = self.dm(id)?;
        if !dm.is_member(actor) {
            return Err(denied("Not a member of the DM"));
        }
        if dm.creator_id != Some(actor) {
            return Err(denied("Only the DM creator can remove it"));
        }

        let index = self.dms.iter().position(|d| d.id == id);
        let Some(dm) = index.map(|i| self.dms.remove(i)) else {
            return Err(invalid("Invalid dmId"));
        };

        for &member in &dm.member_ids {
            self.record_dms_joined(member, -1, now);
        }
        self.dms_exist.record(-1, now);
        if !dm.messages.is_empty() {
            self.messages_exist.record(-(dm.messages.len() as i64), now);
        }
        info!("User {} removed DM {}", actor, id);
        Ok(())
    }

    pub fn dm_messages(&self, actor: UserId, id: DmId, start: usize) -> Result<MessagesPage> {
        self.actor(actor)?;
        let dm = self.dm(id)?;
        if !dm.is_member(actor) {
            return Err(denied("Not a member of the DM"));
        }
        page_of(&dm.messages, start, actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::workspace::fixtures::*;

    #[test]
    fn dm_name_is_sorted_handles() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let grace = register(&mut ws, "Grace", "Hopper");

        let dm = ws.create_dm(grace, &[alan, ada], T0).unwrap();
        let details = ws.dm_details(ada, dm).unwrap();
        assert_eq!(details.name, "adalovelace, alanturing, gracehopper");
        assert_eq!(details.members.len(), 3);

        let notes = ws.notifications(alan).unwrap();
        assert_eq!(
            notes[0].notification_message,
            "gracehopper added you to adalovelace, alanturing, gracehopper"
        );
        assert_eq!(notes[0].channel_id, -1);
        assert!(ws.notifications(grace).unwrap().is_empty());
    }

    #[test]
    fn rejects_duplicate_and_unknown_members() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");

        assert!(matches!(ws.create_dm(ada, &[alan, alan], T0), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.create_dm(ada, &[ada], T0), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.create_dm(ada, &[77], T0), Err(Error::InvalidInput(_))));
        assert!(ws.dms.is_empty());
    }

    #[test]
    fn creator_leaving_blocks_removal() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let dm = ws.create_dm(ada, &[alan], T0).unwrap();

        assert!(matches!(ws.remove_dm(alan, dm, T0), Err(Error::AccessDenied(_))));
        ws.leave_dm(ada, dm, T0).unwrap();
        assert_eq!(ws.dm(dm).unwrap().creator_id, None);
        assert!(matches!(ws.remove_dm(ada, dm, T0), Err(Error::AccessDenied(_))));
        assert_eq!(ws.list_dms(alan).unwrap().len(), 1);
        assert!(ws.list_dms(ada).unwrap().is_empty());
    }

    #[test]
    fn removal_updates_every_member() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let dm = ws.create_dm(ada, &[alan], T0).unwrap();
        ws.send_dm(alan, dm, "hello", T0).unwrap();

        ws.remove_dm(ada, dm, T0 + 1).unwrap();
        assert!(matches!(ws.dm_messages(ada, dm, 0), Err(Error::InvalidInput(_))));
        assert_eq!(ws.users[&alan].dms_joined.latest(), 0);
        assert_eq!(ws.dms_exist.latest(), 0);
        assert_eq!(ws.messages_exist.latest(), 0);
    }
}
