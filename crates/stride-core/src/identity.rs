//! Who the current user is. A local convenience toggle; nothing here checks a
//! credential or gates a command.

use crate::error::{Result, StrideError};
use crate::model::{Role, User};

#[derive(Debug, Clone)]
pub struct IdentityContext {
    users: Vec<User>,
    current: usize,
}

impl IdentityContext {
    /// Start with the first user of a fixed, non-empty list.
    pub fn new(users: Vec<User>) -> Result<Self> {
        if users.is_empty() {
            return Err(StrideError::InvalidInput(
                "identity context needs at least one user".into(),
            ));
        }
        Ok(Self { users, current: 0 })
    }

    pub fn current(&self) -> &User {
        &self.users[self.current]
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Switch to the first user holding `role`. Returns `false`, leaving the
    /// current user as is, when nobody has that role.
    pub fn switch_role(&mut self, role: Role) -> bool {
        match self.users.iter().position(|u| u.role == role) {
            Some(idx) => {
                self.current = idx;
                tracing::debug!(user_id = %self.users[idx].id, %role, "identity: switched role");
                true
            }
            None => false,
        }
    }

    pub fn set_current(&mut self, user_id: &str) -> Result<&User> {
        let idx = self
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| StrideError::NotFound(format!("user {user_id}")))?;
        self.current = idx;
        Ok(&self.users[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<User> {
        vec![
            User::new("1", "Sarah Johnson", "sarah@example.com", Role::Client),
            User::new("2", "Mike Chen", "mike@example.com", Role::Trainer),
            User::new("3", "Emma Davis", "emma@example.com", Role::Client),
        ]
    }

    #[test]
    fn test_starts_with_first_user() {
        let ctx = IdentityContext::new(users()).unwrap();
        assert_eq!(ctx.current().id, "1");
        assert_eq!(ctx.users().len(), 3);
    }

    #[test]
    fn test_empty_user_list_rejected() {
        assert!(IdentityContext::new(Vec::new()).is_err());
    }

    #[test]
    fn test_switch_role_to_existing_role() {
        let mut ctx = IdentityContext::new(users()).unwrap();
        assert!(ctx.switch_role(Role::Trainer));
        assert_eq!(ctx.current().id, "2");

        assert!(ctx.switch_role(Role::Client));
        assert_eq!(ctx.current().id, "1", "first client wins");
    }

    #[test]
    fn test_switch_role_missing_role_is_noop() {
        let mut ctx = IdentityContext::new(users()).unwrap();
        ctx.switch_role(Role::Trainer);
        assert!(!ctx.switch_role(Role::Admin));
        assert_eq!(ctx.current().id, "2");
    }

    #[test]
    fn test_set_current() {
        let mut ctx = IdentityContext::new(users()).unwrap();
        assert_eq!(ctx.set_current("3").unwrap().name, "Emma Davis");
        assert!(matches!(ctx.set_current("99"), Err(StrideError::NotFound(_))));
        assert_eq!(ctx.current().id, "3");
    }
}
