use std::sync::LazyLock;

use regex::Regex;
use tracing::info;
use uuid::Uuid;

use treats_types::models::{Permission, UserId};

use crate::error::{Error, Result, invalid};
use crate::models::{Series, User};
use crate::workspace::{Workspace, char_len};

const MAX_HANDLE_LEN: usize = 20;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

/// Registration details. The password arrives already hashed: hashing is the
/// HTTP layer's concern.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub password_hash: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    (1..=50).contains(&char_len(name))
}

impl Workspace {
    // -- Accounts --

    /// Creates an account. The first account in an empty workspace becomes a
    /// global owner.
    pub fn register(&mut self, new: NewUser, now: i64) -> Result<UserId> {
        if !is_valid_name(&new.name_first) {
            return Err(invalid("First name must be between 1 and 50 characters"));
        }
        if !is_valid_name(&new.name_last) {
            return Err(invalid("Last name must be between 1 and 50 characters"));
        }
        if !is_valid_email(&new.email) {
            return Err(invalid("Invalid email"));
        }
        if self.user_by_email(&new.email).is_some() {
            return Err(invalid("Email already in use"));
        }

        let id = self.next_user_id;
        self.next_user_id += 1;

        let permission = if self.users.is_empty() {
            Permission::Owner
        } else {
            Permission::Member
        };
        let handle = self.generate_handle(&new.name_first, &new.name_last);

        self.users.insert(
            id,
            User {
                id,
                email: new.email,
                name_first: new.name_first,
                name_last: new.name_last,
                handle,
                password_hash: new.password_hash,
                permission,
                channels_joined: Series::starting_at(now),
                dms_joined: Series::starting_at(now),
                messages_sent: Series::starting_at(now),
                notifications: Vec::new(),
                profile_img_url: self.default_profile_img_url.clone(),
            },
        );

        info!("Registered user {} ({:?})", id, permission);
        Ok(id)
    }

    /// Returns `(userId, passwordHash)` for a login attempt.
    pub fn credentials(&self, email: &str) -> Result<(UserId, String)> {
        self.user_by_email(email)
            .map(|u| (u.id, u.password_hash.clone()))
            .ok_or_else(|| invalid("No account associated with email"))
    }

    /// Lowercase alphanumerics of first+last name, cut to 20 characters, with
    /// the smallest integer suffix that makes it unique.
    fn generate_handle(&self, name_first: &str, name_last: &str) -> String {
        let base: String = name_first
            .chars()
            .chain(name_last.chars())
            .flat_map(char::to_lowercase)
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_HANDLE_LEN)
            .collect();

        if self.user_by_handle(&base).is_none() {
            return base;
        }
        (0u32..)
            .map(|n| format!("{}{}", base, n))
            .find(|candidate| self.user_by_handle(candidate).is_none())
            .unwrap_or(base)
    }

    // -- Sessions --

    pub fn open_session(&mut self, user_id: UserId) -> Uuid {
        let sid = Uuid::new_v4();
        self.sessions.insert(sid, user_id);
        sid
    }

    /// Resolves a live session to its user.
    pub fn session_user(&self, sid: Uuid) -> Result<UserId> {
        let user_id = *self.sessions.get(&sid).ok_or(Error::InvalidToken)?;
        self.actor(user_id)?;
        Ok(user_id)
    }

    pub fn close_session(&mut self, sid: Uuid) -> Result<()> {
        self.sessions.remove(&sid).ok_or(Error::InvalidToken)?;
        Ok(())
    }

    pub(crate) fn close_sessions_of(&mut self, user_id: UserId) {
        self.sessions.retain(|_, uid| *uid != user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::fixtures::*;

    fn new_user(email: &str, first: &str, last: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name_first: first.into(),
            name_last: last.into(),
            password_hash: "hash".into(),
        }
    }

    #[test]
    fn first_user_is_global_owner() {
        let mut ws = workspace();
        let a = register(&mut ws, "Ada", "Lovelace");
        let b = register(&mut ws, "Alan", "Turing");
        assert!(ws.is_global_owner(a));
        assert!(!ws.is_global_owner(b));
    }

    #[test]
    fn handles_are_deduplicated_with_suffix() {
        let mut ws = workspace();
        ws.register(new_user("a@x.com", "Jo", "Smith"), T0).unwrap();
        ws.register(new_user("b@x.com", "Jo", "Smith"), T0).unwrap();
        ws.register(new_user("c@x.com", "Jo", "Smith"), T0).unwrap();
        let handles: Vec<_> = ws.users.values().map(|u| u.handle.clone()).collect();
        assert_eq!(handles, vec!["josmith", "josmith0", "josmith1"]);
    }

    #[test]
    fn handle_strips_symbols_and_truncates() {
        let mut ws = workspace();
        let id = ws
            .register(new_user("a@x.com", "Jean-Luc", "Picard-Of-The-Enterprise"), T0)
            .unwrap();
        assert_eq!(ws.users[&id].handle, "jeanlucpicardoftheen");
    }

    #[test]
    fn rejects_bad_registrations() {
        let mut ws = workspace();
        ws.register(new_user("a@x.com", "Ada", "Lovelace"), T0).unwrap();

        for bad in [
            new_user("a@x.com", "Ada", "Again"),
            new_user("not-an-email", "Ada", "Lovelace"),
            new_user("b@x.com", "", "Lovelace"),
            new_user("b@x.com", "Ada", &"x".repeat(51)),
        ] {
            assert!(matches!(ws.register(bad, T0), Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn sessions_open_and_close() {
        let mut ws = workspace();
        let id = register(&mut ws, "Ada", "Lovelace");
        let sid = ws.open_session(id);
        assert_eq!(ws.session_user(sid).unwrap(), id);

        ws.close_session(sid).unwrap();
        assert_eq!(ws.session_user(sid), Err(Error::InvalidToken));
        assert_eq!(ws.close_session(sid), Err(Error::InvalidToken));
    }
}
