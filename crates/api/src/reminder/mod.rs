mod create_reminder;
mod delete_reminder;
pub mod deliver_due_reminders;
mod dismiss_reminder;
mod get_due_reminders;
mod get_reminder;
mod get_reminder_changes;
mod get_reminder_stats;
mod get_reminders;
mod mark_reminder_done;
mod poll_reminders;
mod snooze_reminder;
mod stream_reminders;
mod subscribers;
mod update_reminder;

use actix_web::web;
use create_reminder::create_reminder_controller;
use delete_reminder::delete_reminder_controller;
use dismiss_reminder::dismiss_reminder_controller;
use get_due_reminders::get_due_reminders_controller;
use get_reminder::get_reminder_controller;
use get_reminder_changes::get_reminder_changes_controller;
use get_reminder_stats::get_reminder_stats_controller;
use get_reminders::get_reminders_controller;
use mark_reminder_done::mark_reminder_done_controller;
use poll_reminders::poll_reminders_controller;
use snooze_reminder::snooze_reminder_controller;
use stream_reminders::stream_reminders_controller;
use tickler_domain::{Reminder, TransitionOutcome, ID};
use tickler_infra::TicklerContext;
use update_reminder::update_reminder_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/reminders", web::get().to(get_reminders_controller));
    cfg.route("/reminders", web::post().to(create_reminder_controller));

    // Static segments before `{reminder_id}`
    cfg.route("/reminders/due", web::get().to(get_due_reminders_controller));
    cfg.route("/reminders/poll", web::post().to(poll_reminders_controller));
    cfg.route(
        "/reminders/stats",
        web::get().to(get_reminder_stats_controller),
    );
    cfg.route(
        "/reminders/changes",
        web::get().to(get_reminder_changes_controller),
    );
    cfg.route(
        "/reminders/stream",
        web::get().to(stream_reminders_controller),
    );

    cfg.route(
        "/reminders/{reminder_id}",
        web::get().to(get_reminder_controller),
    );
    cfg.route(
        "/reminders/{reminder_id}",
        web::put().to(update_reminder_controller),
    );
    cfg.route(
        "/reminders/{reminder_id}",
        web::delete().to(delete_reminder_controller),
    );
    cfg.route(
        "/reminders/{reminder_id}/done",
        web::patch().to(mark_reminder_done_controller),
    );
    cfg.route(
        "/reminders/{reminder_id}/snooze",
        web::patch().to(snooze_reminder_controller),
    );
    cfg.route(
        "/reminders/{reminder_id}/dismiss",
        web::patch().to(dismiss_reminder_controller),
    );
}

/// Response of the status transitions
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub reminder: Reminder,
    pub outcome: TransitionOutcome,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.outcome == TransitionOutcome::Changed
    }
}

/// Finds a `Reminder` owned by `owner_id`. Reminders of other users are
/// treated as missing so that their existence does not leak.
async fn find_owned_reminder(
    reminder_id: &ID,
    owner_id: &ID,
    ctx: &TicklerContext,
) -> Option<Reminder> {
    ctx.repos
        .reminders
        .find(reminder_id)
        .await
        .filter(|reminder| reminder.owner_id == *owner_id)
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Arc;
    use tickler_domain::{Reminder, ID};
    use tickler_infra::{ControlledSys, TicklerContext};

    pub fn setup(now: i64) -> (TicklerContext, Arc<ControlledSys>) {
        let mut ctx = TicklerContext::create_inmemory();
        ctx.config.webhook = None;
        let sys = Arc::new(ControlledSys::new(now));
        ctx.sys = sys.clone();
        (ctx, sys)
    }

    pub async fn insert_reminder(ctx: &TicklerContext, owner_id: &ID, due_at: i64) -> Reminder {
        let reminder = Reminder::new(owner_id.clone(), "Follow up on the offer".into(), due_at, 0);
        ctx.repos.reminders.insert(&reminder).await.unwrap();
        reminder
    }
}
