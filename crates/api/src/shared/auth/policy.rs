use serde::{Deserialize, Serialize};

/// A Policy travels in the json web token of a user and decides which actions
/// the token can be used for.
///
/// Every `UseCase` that changes a `Reminder` contains a list of `Permission`s that
/// is required to execute it. If the `Policy` is not authorized some of these
/// `Permission`s the request will be rejected. Tokens without a `Policy` are
/// allowed everything on the reminders of their own user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Policy {
    /// `Permission`s allowed by the `Policy`
    allow: Option<Vec<Permission>>,
    /// `Permission`s rejected by the `Policy`
    reject: Option<Vec<Permission>>,
}

impl Policy {
    pub fn allow_all() -> Self {
        Self {
            allow: Some(vec![Permission::All]),
            reject: None,
        }
    }

    /// Checks if this `Policy` has the right to list of `Permission`s
    pub fn authorize(&self, permissions: &[Permission]) -> bool {
        if permissions.is_empty() {
            return true;
        }

        if let Some(rejected) = &self.reject {
            for rejected_permission in rejected {
                if *rejected_permission == Permission::All {
                    return false;
                }
                if permissions.contains(rejected_permission) {
                    return false;
                }
            }
        }

        if let Some(allowed) = &self.allow {
            // First loop to check if All exists
            if allowed.contains(&Permission::All) {
                return true;
            }

            // Check that all permissions are in allowed
            for permission in permissions {
                if !allowed.contains(permission) {
                    return false;
                }
            }

            return true;
        }

        false
    }
}

/// `Permission` are different kind of actions that can be performed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Permission {
    #[serde(rename = "*")]
    All,
    CreateReminder,
    UpdateReminder,
    DeleteReminder,
    /// Mark done, snooze and dismiss
    ChangeReminderStatus,
    /// Claim due reminders, either by polling or by listening to the stream
    ReceiveReminders,
}

#[cfg(test)]
mod test {
    use super::*;

    fn policy(json: &str) -> Policy {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_policy_only_allows_unprotected_actions() {
        let policy = Policy::default();
        assert!(policy.authorize(&[]));
        assert!(!policy.authorize(&[Permission::CreateReminder]));
    }

    #[test]
    fn allow_all_covers_every_reminder_action() {
        let policy = Policy::allow_all();
        assert!(policy.authorize(&[
            Permission::CreateReminder,
            Permission::UpdateReminder,
            Permission::DeleteReminder,
            Permission::ChangeReminderStatus,
            Permission::ReceiveReminders,
        ]));
    }

    #[test]
    fn rejections_win_over_allowances() {
        let no_deletes = policy(r#"{ "allow": ["*"], "reject": ["DeleteReminder"] }"#);
        assert!(no_deletes.authorize(&[Permission::UpdateReminder]));
        assert!(!no_deletes.authorize(&[Permission::DeleteReminder]));
        assert!(!no_deletes.authorize(&[
            Permission::UpdateReminder,
            Permission::DeleteReminder
        ]));

        let nothing = policy(r#"{ "allow": ["CreateReminder"], "reject": ["*"] }"#);
        assert!(!nothing.authorize(&[Permission::CreateReminder]));
    }

    #[test]
    fn notification_only_token() {
        let listener = policy(r#"{ "allow": ["ReceiveReminders", "ChangeReminderStatus"] }"#);
        assert!(listener.authorize(&[Permission::ReceiveReminders]));
        assert!(listener.authorize(&[Permission::ChangeReminderStatus]));
        assert!(!listener.authorize(&[Permission::CreateReminder]));
        assert!(!listener.authorize(&[
            Permission::ReceiveReminders,
            Permission::DeleteReminder
        ]));
    }
}
