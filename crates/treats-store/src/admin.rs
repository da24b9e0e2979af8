use tracing::info;

use treats_types::models::{Permission, UserId};

use crate::error::{Result, denied, invalid};
use crate::models::RemovedUser;
use crate::workspace::Workspace;

/// Body left behind in every message a removed user wrote.
pub const REMOVED_USER_BODY: &str = "Removed user";

impl Workspace {
    fn global_owner_count(&self) -> usize {
        self.users
            .values()
            .filter(|u| u.permission == Permission::Owner)
            .count()
    }

    pub fn change_permission(&mut self, actor: UserId, u_id: UserId, permission_id: u8) -> Result<()> {
        self.actor(actor)?;
        let Some(target) = self.users.get(&u_id) else {
            return Err(invalid("uId does not refer to a valid user"));
        };
        let permission =
            Permission::try_from(permission_id).map_err(|_| invalid("Invalid permissionId"))?;
        if target.permission == permission {
            return Err(invalid("User already has that permission"));
        }
        if target.permission == Permission::Owner && self.global_owner_count() == 1 {
            return Err(invalid("Cannot demote the only global owner"));
        }
        if !self.is_global_owner(actor) {
            return Err(denied("Not a global owner"));
        }

        if let Some(user) = self.user_mut(u_id) {
            user.permission = permission;
        }
        info!("User {} set permission of {} to {:?}", actor, u_id, permission);
        Ok(())
    }

    /// Removes a user from the workspace. Their messages stay, with the body
    /// replaced; their profile stays reachable under a placeholder name.
    pub fn remove_user(&mut self, actor: UserId, u_id: UserId) -> Result<()> {
        self.actor(actor)?;
        let Some(target) = self.users.get(&u_id) else {
            return Err(invalid("uId does not refer to a valid user"));
        };
        if target.permission == Permission::Owner && self.global_owner_count() == 1 {
            return Err(invalid("Cannot remove the only global owner"));
        }
        if !self.is_global_owner(actor) {
            return Err(denied("Not a global owner"));
        }

        for channel in &mut self.channels {
            if channel.standup.is_led_by(u_id) {
                info!("Closing standup in channel {} led by removed user {}", channel.id, u_id);
                channel.standup.reset();
            }
            channel.member_ids.retain(|&m| m != u_id);
            channel.owner_ids.retain(|&o| o != u_id);
            for message in channel.messages.iter_mut().filter(|m| m.author_id == u_id) {
                message.body = REMOVED_USER_BODY.to_string();
            }
        }
        for dm in &mut self.dms {
            dm.member_ids.retain(|&m| m != u_id);
            if dm.creator_id == Some(u_id) {
                dm.creator_id = None;
            }
            for message in dm.messages.iter_mut().filter(|m| m.author_id == u_id) {
                message.body = REMOVED_USER_BODY.to_string();
            }
        }

        self.close_sessions_of(u_id);
        if let Some(user) = self.users.remove(&u_id) {
            self.removed_users.push(RemovedUser {
                id: user.id,
                email: user.email,
                handle: user.handle,
            });
        }
        info!("User {} removed user {}", actor, u_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NewUser;
    use crate::error::Error;
    use crate::workspace::fixtures::*;

    #[test]
    fn permission_changes() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");

        assert!(matches!(ws.change_permission(ada, ada, 2), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.change_permission(ada, alan, 2), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.change_permission(ada, alan, 3), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.change_permission(ada, 50, 1), Err(Error::InvalidInput(_))));
        assert!(matches!(ws.change_permission(alan, alan, 1), Err(Error::AccessDenied(_))));

        ws.change_permission(ada, alan, 1).unwrap();
        ws.change_permission(alan, ada, 2).unwrap();
        assert!(!ws.is_global_owner(ada));
    }

    #[test]
    fn removal_scrubs_messages_and_frees_identity() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let c = ws.create_channel(ada, "general", true, T0).unwrap();
        ws.join_channel(alan, c, T0).unwrap();
        let dm = ws.create_dm(alan, &[ada], T0).unwrap();
        ws.send_message(alan, c, "in channel", T0).unwrap();
        ws.send_dm(alan, dm, "in dm", T0).unwrap();
        let sid = ws.open_session(alan);

        assert!(matches!(ws.remove_user(alan, ada), Err(Error::InvalidInput(_))));
        ws.remove_user(ada, alan).unwrap();

        assert_eq!(ws.session_user(sid), Err(Error::InvalidToken));
        assert_eq!(ws.channel(c).unwrap().messages[0].body, REMOVED_USER_BODY);
        assert_eq!(ws.dm(dm).unwrap().messages[0].body, REMOVED_USER_BODY);
        assert!(!ws.channel(c).unwrap().member_ids.contains(&alan));

        let profile = ws.user_profile(ada, alan).unwrap();
        assert_eq!(profile.name_first, "Removed");
        assert_eq!(profile.name_last, "user");
        assert_eq!(ws.all_users(ada).unwrap().len(), 1);

        // email and handle can be taken again
        let again = ws
            .register(
                NewUser {
                    email: "alan.turing@example.com".into(),
                    name_first: "Alan".into(),
                    name_last: "Turing".into(),
                    password_hash: "hash".into(),
                },
                T0,
            )
            .unwrap();
        assert_eq!(ws.users[&again].handle, "alanturing");
    }

    #[test]
    fn removing_dm_creator_clears_creator() {
        let mut ws = workspace();
        let ada = register(&mut ws, "Ada", "Lovelace");
        let alan = register(&mut ws, "Alan", "Turing");
        let dm = ws.create_dm(alan, &[ada], T0).unwrap();

        ws.remove_user(ada, alan).unwrap();
        assert_eq!(ws.dm(dm).unwrap().creator_id, None);
        assert_eq!(ws.dm(dm).unwrap().member_ids, vec![ada]);
    }
}
