use serde::{Deserialize, Serialize};
use tickler_domain::{
    Reminder, ReminderKind, ReminderNotification, ReminderPriority, ReminderStatus, ID,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDTO {
    pub id: ID,
    pub owner_id: ID,
    pub note: String,
    pub remind_at: i64,
    pub status: ReminderStatus,
    /// `remindAt`, or the snooze time while snoozed
    pub effective_due_at: i64,
    pub priority: ReminderPriority,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub client_id: Option<ID>,
    pub lead_id: Option<ID>,
    pub version: i64,
    pub created: i64,
    pub updated: i64,
}

impl ReminderDTO {
    pub fn new(reminder: Reminder) -> Self {
        Self {
            effective_due_at: reminder.effective_due_at(),
            client_id: reminder.linked_entity.client_id().cloned(),
            lead_id: reminder.linked_entity.lead_id().cloned(),
            id: reminder.id,
            owner_id: reminder.owner_id,
            note: reminder.note,
            remind_at: reminder.due_at,
            status: reminder.status,
            priority: reminder.priority,
            kind: reminder.kind,
            version: reminder.version,
            created: reminder.created,
            updated: reminder.updated,
        }
    }
}

/// Payload of one server sent event
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReminderNotificationDTO {
    pub event: String,
    pub reminder_id: ID,
    /// Missing for deleted reminders
    pub reminder: Option<ReminderDTO>,
}

impl ReminderNotificationDTO {
    pub fn new(notification: ReminderNotification) -> Self {
        let event = notification.name().to_string();
        let reminder_id = notification.reminder_id().clone();
        let reminder = match notification {
            ReminderNotification::Due(r)
            | ReminderNotification::Completed(r)
            | ReminderNotification::Snoozed(r)
            | ReminderNotification::Dismissed(r) => Some(ReminderDTO::new(r)),
            ReminderNotification::Deleted { .. } => None,
        };
        Self {
            event,
            reminder_id,
            reminder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_reminder_for_clients() {
        let mut reminder = Reminder::new(ID::default(), "Call the seller".into(), 1000, 0);
        reminder.kind = ReminderKind::FollowUp;
        reminder.snooze(5000, 10).unwrap();

        let json = serde_json::to_value(ReminderDTO::new(reminder)).unwrap();
        assert_eq!(json["remindAt"], 1000);
        assert_eq!(json["effectiveDueAt"], 5000);
        assert_eq!(json["type"], "follow_up");
        assert_eq!(json["priority"], "medium");
        assert_eq!(
            json["status"],
            serde_json::json!({ "state": "snoozed", "until": 5000 })
        );
        assert!(json["clientId"].is_null());
    }

    #[test]
    fn deleted_notification_has_no_reminder() {
        let reminder_id = ID::default();
        let dto = ReminderNotificationDTO::new(ReminderNotification::Deleted {
            reminder_id: reminder_id.clone(),
        });
        assert_eq!(dto.event, "deleted");
        assert_eq!(dto.reminder_id, reminder_id);
        assert!(dto.reminder.is_none());
    }
}
