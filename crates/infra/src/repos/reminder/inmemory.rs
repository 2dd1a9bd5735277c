use super::IReminderRepo;
use crate::repos::shared::{inmemory_repo::*, query_structs::ReminderFindQuery};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
};
use tickler_domain::{
    delivery_order, sort_for_delivery, Reminder, ReminderChanges, ReminderStats,
    ReminderStatusKind, ReminderTombstone, ID,
};

/// Every writer holds the `reminders` lock while it takes its change sequence
/// number, so readers holding that lock never see a gap in the change feed.
pub struct InMemoryReminderRepo {
    reminders: Mutex<Vec<Reminder>>,
    tombstones: Mutex<Vec<ReminderTombstone>>,
    change_seqs: Mutex<HashMap<ID, i64>>,
    last_change_seq: AtomicI64,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: Mutex::new(Vec::new()),
            tombstones: Mutex::new(Vec::new()),
            change_seqs: Mutex::new(HashMap::new()),
            last_change_seq: AtomicI64::new(0),
        }
    }

    fn next_change_seq(&self) -> i64 {
        self.last_change_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record_change(&self, reminder_id: &ID) {
        let seq = self.next_change_seq();
        self.change_seqs
            .lock()
            .unwrap()
            .insert(reminder_id.clone(), seq);
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        let mut reminders = self.reminders.lock().unwrap();
        reminders.push(reminder.clone());
        self.record_change(&reminder.id);
        Ok(())
    }

    async fn save_if_version(
        &self,
        reminder: &Reminder,
        expected_version: i64,
    ) -> anyhow::Result<bool> {
        let mut reminders = self.reminders.lock().unwrap();
        match reminders.iter_mut().find(|stored| stored.id == reminder.id) {
            Some(stored) if stored.version == expected_version => {
                let delivered_for = stored.delivered_for;
                *stored = reminder.clone();
                stored.delivered_for = delivered_for;
                self.record_change(&reminder.id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        find(reminder_id, &self.reminders)
    }

    async fn find_by_owner(&self, query: &ReminderFindQuery) -> anyhow::Result<Vec<Reminder>> {
        let mut reminders = find_by(&self.reminders, |r| {
            r.owner_id == query.owner_id
                && query
                    .status
                    .map(|status| status.matches(&r.status))
                    .unwrap_or(true)
        });
        reminders.sort_by(|r1, r2| r1.due_at.cmp(&r2.due_at).then_with(|| r1.id.cmp(&r2.id)));
        Ok(reminders
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .collect())
    }

    async fn count_by_owner(
        &self,
        owner_id: &ID,
        status: Option<ReminderStatusKind>,
    ) -> anyhow::Result<i64> {
        let count = count_by(&self.reminders, |r| {
            r.owner_id == *owner_id && status.map(|s| s.matches(&r.status)).unwrap_or(true)
        });
        Ok(count as i64)
    }

    async fn find_due(&self, owner_id: &ID, now: i64) -> anyhow::Result<Vec<Reminder>> {
        let mut reminders = find_by(&self.reminders, |r| r.owner_id == *owner_id && r.is_due(now));
        sort_for_delivery(&mut reminders);
        Ok(reminders)
    }

    async fn claim_due(
        &self,
        owner_id: Option<&ID>,
        now: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<Reminder>> {
        // Selecting and claiming happens under one lock so that concurrent
        // claimers never see the same due transition
        let mut reminders = self.reminders.lock().unwrap();
        let mut newly_due = reminders
            .iter_mut()
            .filter(|r| owner_id.map(|id| r.owner_id == *id).unwrap_or(true))
            .filter(|r| r.is_newly_due(now))
            .collect::<Vec<_>>();
        newly_due.sort_by(|r1, r2| delivery_order(r1, r2));

        Ok(newly_due
            .into_iter()
            .take(limit)
            .map(|r| {
                r.claim();
                r.clone()
            })
            .collect())
    }

    async fn release_claims(&self, reminders: &[Reminder]) -> anyhow::Result<()> {
        for released in reminders {
            update_many(
                &self.reminders,
                |r| r.id == released.id && r.delivered_for == released.delivered_for,
                |r| r.delivered_for = None,
            );
        }
        Ok(())
    }

    async fn delete(&self, reminder_id: &ID, deleted_at: i64) -> Option<Reminder> {
        let mut reminders = self.reminders.lock().unwrap();
        let index = reminders.iter().position(|r| r.id == *reminder_id)?;
        let deleted = reminders.remove(index);

        self.change_seqs.lock().unwrap().remove(reminder_id);
        insert(
            &ReminderTombstone {
                reminder_id: deleted.id.clone(),
                owner_id: deleted.owner_id.clone(),
                deleted_at,
                change_seq: self.next_change_seq(),
            },
            &self.tombstones,
        );
        Some(deleted)
    }

    async fn stats(
        &self,
        owner_id: &ID,
        now: i64,
        overdue_grace_millis: i64,
    ) -> anyhow::Result<ReminderStats> {
        let reminders = find_by(&self.reminders, |r| r.owner_id == *owner_id);
        Ok(ReminderStats::from_reminders(
            &reminders,
            now,
            overdue_grace_millis,
        ))
    }

    async fn find_changes_since(
        &self,
        owner_id: &ID,
        since: i64,
    ) -> anyhow::Result<ReminderChanges> {
        let reminders = self.reminders.lock().unwrap();
        let change_seqs = self.change_seqs.lock().unwrap();

        let mut changed = reminders
            .iter()
            .filter(|r| r.owner_id == *owner_id)
            .filter_map(|r| {
                let seq = *change_seqs.get(&r.id)?;
                (seq > since).then(|| (seq, r.clone()))
            })
            .collect::<Vec<_>>();
        changed.sort_by_key(|(seq, _)| *seq);

        let tombstones = find_by(&self.tombstones, |t| {
            t.owner_id == *owner_id && t.change_seq > since
        });

        let cursor = changed
            .iter()
            .map(|(seq, _)| *seq)
            .chain(tombstones.iter().map(|t| t.change_seq))
            .max()
            .unwrap_or_else(|| since.max(0));

        Ok(ReminderChanges {
            reminders: changed.into_iter().map(|(_, r)| r).collect(),
            tombstones,
            cursor,
        })
    }
}
