use crate::reminder::{Reminder, ReminderStatus};
use serde::{Deserialize, Serialize};

/// Aggregated counts over the `Reminder`s of one owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderStats {
    pub total: i64,
    pub pending: i64,
    pub snoozed: i64,
    pub dismissed: i64,
    pub done: i64,
    /// Active reminders past their effective due time, see `Reminder::is_overdue`
    pub overdue: i64,
}

impl ReminderStats {
    pub fn from_reminders<'a>(
        reminders: impl IntoIterator<Item = &'a Reminder>,
        now: i64,
        overdue_grace_millis: i64,
    ) -> Self {
        let mut stats = Self::default();
        for reminder in reminders {
            stats.total += 1;
            match reminder.status {
                ReminderStatus::Pending => stats.pending += 1,
                ReminderStatus::Snoozed { .. } => stats.snoozed += 1,
                ReminderStatus::Dismissed { .. } => stats.dismissed += 1,
                ReminderStatus::Done { .. } => stats.done += 1,
            }
            if reminder.is_overdue(now, overdue_grace_millis) {
                stats.overdue += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ID;

    #[test]
    fn counts_reminders() {
        let owner = ID::default();
        let overdue = Reminder::new(owner.clone(), "a".into(), 100, 0);
        let upcoming = Reminder::new(owner.clone(), "b".into(), 10_000, 0);
        let mut done = Reminder::new(owner.clone(), "c".into(), 100, 0);
        done.mark_done(200).unwrap();
        let mut snoozed = Reminder::new(owner, "d".into(), 100, 0);
        snoozed.snooze(400, 200).unwrap();

        let stats = ReminderStats::from_reminders(&[overdue, upcoming, done, snoozed], 1000, 0);
        assert_eq!(
            stats,
            ReminderStats {
                total: 4,
                pending: 2,
                snoozed: 1,
                dismissed: 0,
                done: 1,
                overdue: 2,
            }
        );
    }
}
