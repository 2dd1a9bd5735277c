use crate::dtos::ReminderDTO;
use serde::{Deserialize, Serialize};
use tickler_domain::{Reminder, ID};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub reminder: ReminderDTO,
}

impl ReminderResponse {
    pub fn new(reminder: Reminder) -> Self {
        Self {
            reminder: ReminderDTO::new(reminder),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersResponse {
    pub reminders: Vec<ReminderDTO>,
}

impl RemindersResponse {
    pub fn new(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: reminders.into_iter().map(ReminderDTO::new).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReminderPathParams {
    pub reminder_id: ID,
}

/// Body of the status transitions that take nothing but the version that was read
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRequestBody {
    pub version: Option<i64>,
}

pub mod create_reminder {
    use super::*;
    use tickler_domain::{ReminderKind, ReminderPriority};

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub note: String,
        #[serde(alias = "dueAt")]
        pub remind_at: i64,
        #[serde(default)]
        pub priority: Option<ReminderPriority>,
        #[serde(default, rename = "type")]
        pub kind: Option<ReminderKind>,
        #[serde(default)]
        pub client_id: Option<ID>,
        #[serde(default)]
        pub lead_id: Option<ID>,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod get_reminder {
    use super::*;

    pub type PathParams = ReminderPathParams;

    pub type APIResponse = ReminderResponse;
}

pub mod get_reminders {
    use super::*;
    use tickler_domain::ReminderStatusKind;

    #[derive(Debug, Default, Deserialize, Serialize)]
    pub struct QueryParams {
        pub page: Option<usize>,
        pub limit: Option<usize>,
        pub status: Option<ReminderStatusKind>,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub reminders: Vec<ReminderDTO>,
        pub page: usize,
        pub limit: usize,
        pub total: i64,
    }

    impl APIResponse {
        pub fn new(reminders: Vec<Reminder>, page: usize, limit: usize, total: i64) -> Self {
            Self {
                reminders: reminders.into_iter().map(ReminderDTO::new).collect(),
                page,
                limit,
                total,
            }
        }
    }
}

pub mod update_reminder {
    use super::*;
    use tickler_domain::{ReminderKind, ReminderPriority};

    pub type PathParams = ReminderPathParams;

    #[derive(Debug, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        #[serde(default)]
        pub note: Option<String>,
        #[serde(default, alias = "dueAt")]
        pub remind_at: Option<i64>,
        #[serde(default)]
        pub priority: Option<ReminderPriority>,
        #[serde(default, rename = "type")]
        pub kind: Option<ReminderKind>,
        #[serde(default)]
        pub client_id: Option<ID>,
        #[serde(default)]
        pub lead_id: Option<ID>,
        /// Removes the link to a client or lead
        #[serde(default)]
        pub unlink: Option<bool>,
        #[serde(default)]
        pub version: Option<i64>,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod mark_reminder_done {
    use super::*;

    pub type PathParams = ReminderPathParams;

    pub type RequestBody = VersionedRequestBody;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub reminder: ReminderDTO,
        /// The reminder was completed before this request
        pub already_done: bool,
    }

    impl APIResponse {
        pub fn new(reminder: Reminder, already_done: bool) -> Self {
            Self {
                reminder: ReminderDTO::new(reminder),
                already_done,
            }
        }
    }
}

pub mod snooze_reminder {
    use super::*;

    pub type PathParams = ReminderPathParams;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub until: i64,
        #[serde(default)]
        pub version: Option<i64>,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod dismiss_reminder {
    use super::*;

    pub type PathParams = ReminderPathParams;

    pub type RequestBody = VersionedRequestBody;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub reminder: ReminderDTO,
        pub already_dismissed: bool,
    }

    impl APIResponse {
        pub fn new(reminder: Reminder, already_dismissed: bool) -> Self {
            Self {
                reminder: ReminderDTO::new(reminder),
                already_dismissed,
            }
        }
    }
}

pub mod delete_reminder {
    use super::*;

    pub type PathParams = ReminderPathParams;

    pub type APIResponse = ReminderResponse;
}

pub mod get_due_reminders {
    use super::*;

    pub type APIResponse = RemindersResponse;
}

pub mod poll_reminders {
    use super::*;

    pub type APIResponse = RemindersResponse;
}

pub mod get_reminder_stats {
    pub type APIResponse = tickler_domain::ReminderStats;
}

pub mod get_reminder_changes {
    use super::*;
    use tickler_domain::ReminderTombstone;

    #[derive(Debug, Default, Deserialize, Serialize)]
    pub struct QueryParams {
        /// Cursor returned by the previous call. Everything when missing.
        pub since: Option<i64>,
    }

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct APIResponse {
        pub reminders: Vec<ReminderDTO>,
        pub deleted_ids: Vec<ID>,
        /// Pass as `since` on the next call
        pub cursor: i64,
    }

    impl APIResponse {
        pub fn new(
            reminders: Vec<Reminder>,
            tombstones: Vec<ReminderTombstone>,
            cursor: i64,
        ) -> Self {
            Self {
                reminders: reminders.into_iter().map(ReminderDTO::new).collect(),
                deleted_ids: tombstones.into_iter().map(|t| t.reminder_id).collect(),
                cursor,
            }
        }
    }
}

pub mod stream_reminders {
    use super::*;

    #[derive(Debug, Default, Deserialize, Serialize)]
    pub struct QueryParams {
        /// Alternative to the `Authorization` header for `EventSource` clients
        pub token: Option<String>,
    }
}

/// What the delivery job posts to the configured webhook
pub mod reminders_webhook {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub owner_id: ID,
        pub reminders: Vec<ReminderDTO>,
    }
}
