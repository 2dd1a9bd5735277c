use super::{
    delete_reminder::DeleteReminderUseCase, dismiss_reminder::DismissReminderUseCase,
    mark_reminder_done::MarkReminderDoneUseCase, snooze_reminder::SnoozeReminderUseCase,
    StatusChange,
};
use crate::shared::usecase::Subscriber;
use tickler_domain::{Reminder, ReminderNotification};
use tickler_infra::TicklerContext;
use tracing::debug;

/// Lets the other open sessions of the owner close their popups
fn publish_status_change(
    change: &StatusChange,
    notification: fn(Reminder) -> ReminderNotification,
    ctx: &TicklerContext,
) {
    if !change.changed() {
        return;
    }
    let receivers = ctx.hub.publish(
        &change.reminder.owner_id,
        notification(change.reminder.clone()),
    );
    debug!(
        "Status change of reminder {} sent to {} sessions",
        change.reminder.id, receivers
    );
}

pub struct NotifyOnReminderCompleted;

#[async_trait::async_trait(?Send)]
impl Subscriber<MarkReminderDoneUseCase> for NotifyOnReminderCompleted {
    async fn notify(&self, e: &StatusChange, ctx: &TicklerContext) {
        publish_status_change(e, ReminderNotification::Completed, ctx);
    }
}

pub struct NotifyOnReminderSnoozed;

#[async_trait::async_trait(?Send)]
impl Subscriber<SnoozeReminderUseCase> for NotifyOnReminderSnoozed {
    async fn notify(&self, e: &StatusChange, ctx: &TicklerContext) {
        publish_status_change(e, ReminderNotification::Snoozed, ctx);
    }
}

pub struct NotifyOnReminderDismissed;

#[async_trait::async_trait(?Send)]
impl Subscriber<DismissReminderUseCase> for NotifyOnReminderDismissed {
    async fn notify(&self, e: &StatusChange, ctx: &TicklerContext) {
        publish_status_change(e, ReminderNotification::Dismissed, ctx);
    }
}

pub struct NotifyOnReminderDeleted;

#[async_trait::async_trait(?Send)]
impl Subscriber<DeleteReminderUseCase> for NotifyOnReminderDeleted {
    async fn notify(&self, e: &Reminder, ctx: &TicklerContext) {
        ctx.hub.publish(
            &e.owner_id,
            ReminderNotification::Deleted {
                reminder_id: e.id.clone(),
            },
        );
    }
}
