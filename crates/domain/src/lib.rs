mod notification;
mod reminder;
mod shared;
mod stats;

pub use notification::ReminderNotification;
pub use reminder::{
    delivery_order, sort_for_delivery, validate_due_at, validate_note, InvalidReminderField,
    LinkedEntity, Reminder, ReminderChanges, ReminderKind, ReminderPriority, ReminderStatus,
    ReminderStatusKind, ReminderTombstone, ReminderTransitionError, ReminderValidationError, TransitionOutcome,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
pub use stats::ReminderStats;
