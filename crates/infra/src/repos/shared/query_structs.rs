use tickler_domain::{ReminderStatusKind, ID};

/// Page of an owner's `Reminder`s, ordered by due time
#[derive(Debug, Clone)]
pub struct ReminderFindQuery {
    pub owner_id: ID,
    pub status: Option<ReminderStatusKind>,
    pub skip: usize,
    pub limit: usize,
}
