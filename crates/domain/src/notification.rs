use crate::{reminder::Reminder, shared::entity::ID};

/// Something that happened to a `Reminder` that its owner's open sessions
/// should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderNotification {
    /// The `Reminder` became due and was claimed for delivery
    Due(Reminder),
    Completed(Reminder),
    Snoozed(Reminder),
    Dismissed(Reminder),
    Deleted { reminder_id: ID },
}

impl ReminderNotification {
    /// Name used for the event on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Due(_) => "due",
            Self::Completed(_) => "completed",
            Self::Snoozed(_) => "snoozed",
            Self::Dismissed(_) => "dismissed",
            Self::Deleted { .. } => "deleted",
        }
    }

    pub fn reminder_id(&self) -> &ID {
        match self {
            Self::Due(r) | Self::Completed(r) | Self::Snoozed(r) | Self::Dismissed(r) => &r.id,
            Self::Deleted { reminder_id } => reminder_id,
        }
    }
}
