mod base;
mod reminder;
mod status;

pub(crate) use base::BaseClient;
pub use base::{APIError, APIErrorVariant, APIResponse};
use reminder::ReminderClient;
pub use reminder::{
    CreateReminderInput, GetRemindersInput, ReminderStream, SnoozeReminderInput,
    UpdateReminderInput,
};
use status::StatusClient;
use std::sync::Arc;
pub use tickler_api_structs::dtos::*;
pub use tickler_domain::{
    ReminderKind, ReminderPriority, ReminderStats, ReminderStatus, ReminderStatusKind, ID,
};

// Domain
pub use tickler_api_structs::dtos::ReminderDTO as Reminder;
pub use tickler_api_structs::dtos::ReminderNotificationDTO as ReminderNotification;

/// Tickler SDK
///
/// The SDK contains methods for interacting with the Tickler server API
/// on behalf of one user.
#[derive(Clone)]
pub struct TicklerSDK {
    pub reminder: ReminderClient,
    pub status: StatusClient,
}

impl TicklerSDK {
    pub fn new<T: Into<String>>(address: String, token: T) -> Self {
        let mut base = BaseClient::new(address);
        base.set_token(token.into());
        let base = Arc::new(base);

        Self {
            reminder: ReminderClient::new(base.clone()),
            status: StatusClient::new(base),
        }
    }

    /// Client without credentials, only useful for the public endpoints
    pub fn anonymous(address: String) -> Self {
        let base = Arc::new(BaseClient::new(address));
        Self {
            reminder: ReminderClient::new(base.clone()),
            status: StatusClient::new(base),
        }
    }
}
