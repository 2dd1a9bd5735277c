mod inmemory;
mod postgres;

use crate::repos::shared::query_structs::ReminderFindQuery;
pub use inmemory::InMemoryReminderRepo;
pub use postgres::PostgresReminderRepo;
use tickler_domain::{Reminder, ReminderChanges, ReminderStats, ReminderStatusKind, ID};

#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()>;
    /// Stores the `Reminder` only if the stored version still equals
    /// `expected_version`. Returns `false` when the write was stale.
    /// Never touches the delivery bookkeeping (`delivered_for`).
    async fn save_if_version(
        &self,
        reminder: &Reminder,
        expected_version: i64,
    ) -> anyhow::Result<bool>;
    async fn find(&self, reminder_id: &ID) -> Option<Reminder>;
    async fn find_by_owner(&self, query: &ReminderFindQuery) -> anyhow::Result<Vec<Reminder>>;
    async fn count_by_owner(
        &self,
        owner_id: &ID,
        status: Option<ReminderStatusKind>,
    ) -> anyhow::Result<i64>;
    /// The due set of an owner in delivery order. Does not claim anything.
    async fn find_due(&self, owner_id: &ID, now: i64) -> anyhow::Result<Vec<Reminder>>;
    /// Atomically claims up to `limit` newly due `Reminder`s, for one owner or
    /// for everyone, and returns them in delivery order. A due transition is
    /// only ever claimed once.
    async fn claim_due(
        &self,
        owner_id: Option<&ID>,
        now: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<Reminder>>;
    /// Undoes claims that could not be delivered. Claims that were replaced by a
    /// newer due transition in the meantime are left alone.
    async fn release_claims(&self, reminders: &[Reminder]) -> anyhow::Result<()>;
    /// Hard delete that leaves a tombstone for incremental sync
    async fn delete(&self, reminder_id: &ID, deleted_at: i64) -> Option<Reminder>;
    async fn stats(
        &self,
        owner_id: &ID,
        now: i64,
        overdue_grace_millis: i64,
    ) -> anyhow::Result<ReminderStats>;
    /// What the owner inserted, changed or deleted after the change feed
    /// position `since`, read from one consistent view of the store. Claims
    /// are not changes.
    async fn find_changes_since(&self, owner_id: &ID, since: i64)
        -> anyhow::Result<ReminderChanges>;
}

#[cfg(test)]
mod tests {
    use crate::{setup_context, ReminderFindQuery, TicklerContext};
    use tickler_domain::{
        LinkedEntity, Reminder, ReminderPriority, ReminderStatus, ReminderStatusKind, ID,
    };

    /// Creates inmemory and postgres context when DATABASE_URL is set,
    /// otherwise it will create two inmemory
    async fn create_contexts() -> Vec<TicklerContext> {
        vec![TicklerContext::create_inmemory(), setup_context().await]
    }

    fn reminder(owner_id: &ID, due_at: i64) -> Reminder {
        Reminder::new(owner_id.clone(), "Show unit 4B".into(), due_at, 0)
    }

    #[tokio::test]
    async fn create_find_and_delete() {
        for ctx in create_contexts().await {
            let owner = ID::default();
            let mut r = reminder(&owner, 1000);
            r.linked_entity = LinkedEntity::Lead(ID::default());
            r.priority = ReminderPriority::High;

            assert!(ctx.repos.reminders.insert(&r).await.is_ok());

            let found = ctx.repos.reminders.find(&r.id).await.unwrap();
            assert_eq!(found, r);

            let deleted = ctx.repos.reminders.delete(&r.id, 50).await;
            assert_eq!(deleted.unwrap(), r);
            assert!(ctx.repos.reminders.find(&r.id).await.is_none());

            let changes = ctx
                .repos
                .reminders
                .find_changes_since(&owner, 0)
                .await
                .unwrap();
            assert!(changes.reminders.is_empty());
            assert_eq!(changes.tombstones.len(), 1);
            assert_eq!(changes.tombstones[0].reminder_id, r.id);
            assert_eq!(changes.tombstones[0].deleted_at, 50);
            assert_eq!(changes.cursor, changes.tombstones[0].change_seq);
            assert!(ctx
                .repos
                .reminders
                .find_changes_since(&owner, changes.cursor)
                .await
                .unwrap()
                .tombstones
                .is_empty());
        }
    }

    #[tokio::test]
    async fn rejects_stale_writes() {
        for ctx in create_contexts().await {
            let owner = ID::default();
            let r = reminder(&owner, 1000);
            ctx.repos.reminders.insert(&r).await.unwrap();

            let mut first = r.clone();
            first.mark_done(10).unwrap();
            let mut second = r.clone();
            second.dismiss(11).unwrap();

            assert!(ctx
                .repos
                .reminders
                .save_if_version(&first, r.version)
                .await
                .unwrap());
            assert!(!ctx
                .repos
                .reminders
                .save_if_version(&second, r.version)
                .await
                .unwrap());

            let stored = ctx.repos.reminders.find(&r.id).await.unwrap();
            assert_eq!(stored.status, ReminderStatus::Done { at: 10 });
            assert_eq!(stored.version, 2);
        }
    }

    #[tokio::test]
    async fn claims_each_due_transition_once() {
        for ctx in create_contexts().await {
            let owner = ID::default();
            let due = reminder(&owner, 1000);
            let future = reminder(&owner, 5000);
            ctx.repos.reminders.insert(&due).await.unwrap();
            ctx.repos.reminders.insert(&future).await.unwrap();

            let claimed = ctx
                .repos
                .reminders
                .claim_due(Some(&owner), 2000, 100)
                .await
                .unwrap();
            assert_eq!(claimed.len(), 1);
            assert_eq!(claimed[0].id, due.id);
            assert_eq!(claimed[0].delivered_for, Some(1000));

            // Still due, but already delivered
            let due_set = ctx.repos.reminders.find_due(&owner, 2000).await.unwrap();
            assert_eq!(due_set.len(), 1);
            assert!(ctx
                .repos
                .reminders
                .claim_due(Some(&owner), 2000, 100)
                .await
                .unwrap()
                .is_empty());

            // Releasing makes it claimable again
            ctx.repos.reminders.release_claims(&claimed).await.unwrap();
            let claimed = ctx
                .repos
                .reminders
                .claim_due(Some(&owner), 2000, 100)
                .await
                .unwrap();
            assert_eq!(claimed.len(), 1);
            assert_eq!(claimed[0].id, due.id);
        }
    }

    #[tokio::test]
    async fn saving_keeps_delivery_bookkeeping() {
        for ctx in create_contexts().await {
            let owner = ID::default();
            let r = reminder(&owner, 1000);
            ctx.repos.reminders.insert(&r).await.unwrap();
            ctx.repos
                .reminders
                .claim_due(Some(&owner), 1000, 10)
                .await
                .unwrap();

            // Edit based on a read from before the claim
            let mut edited = r.clone();
            edited.note = "Show unit 5C".into();
            edited.touch(1100);
            assert!(ctx
                .repos
                .reminders
                .save_if_version(&edited, r.version)
                .await
                .unwrap());

            let stored = ctx.repos.reminders.find(&r.id).await.unwrap();
            assert_eq!(stored.note, "Show unit 5C");
            assert_eq!(stored.delivered_for, Some(1000));
        }
    }

    #[tokio::test]
    async fn paginates_and_counts() {
        for ctx in create_contexts().await {
            let owner = ID::default();
            for i in 0..5 {
                let mut r = reminder(&owner, 1000 + i);
                if i % 2 == 0 {
                    r.mark_done(10).unwrap();
                }
                ctx.repos.reminders.insert(&r).await.unwrap();
            }
            // Someone else's reminder
            ctx.repos
                .reminders
                .insert(&reminder(&ID::default(), 1000))
                .await
                .unwrap();

            let page = ctx
                .repos
                .reminders
                .find_by_owner(&ReminderFindQuery {
                    owner_id: owner.clone(),
                    status: None,
                    skip: 2,
                    limit: 2,
                })
                .await
                .unwrap();
            assert_eq!(page.len(), 2);
            assert_eq!(page[0].due_at, 1002);
            assert_eq!(page[1].due_at, 1003);

            assert_eq!(
                ctx.repos.reminders.count_by_owner(&owner, None).await.unwrap(),
                5
            );
            assert_eq!(
                ctx.repos
                    .reminders
                    .count_by_owner(&owner, Some(ReminderStatusKind::Done))
                    .await
                    .unwrap(),
                3
            );

            let stats = ctx.repos.reminders.stats(&owner, 1003, 0).await.unwrap();
            assert_eq!(stats.total, 5);
            assert_eq!(stats.done, 3);
            assert_eq!(stats.pending, 2);
            // Only the pending one due at 1001 is past its due time
            assert_eq!(stats.overdue, 1);
        }
    }

    #[tokio::test]
    async fn change_feed_does_not_depend_on_the_clock() {
        for ctx in create_contexts().await {
            let owner = ID::default();
            let mut first = reminder(&owner, 1000);
            first.updated = 100;
            ctx.repos.reminders.insert(&first).await.unwrap();

            let synced = ctx
                .repos
                .reminders
                .find_changes_since(&owner, 0)
                .await
                .unwrap();
            assert_eq!(synced.reminders.len(), 1);
            assert!(synced.cursor > 0);

            // Written after the sync within the same millisecond
            let mut second = reminder(&owner, 1000);
            second.updated = 100;
            ctx.repos.reminders.insert(&second).await.unwrap();
            // Stamped before the last sync but written after it
            let mut edited = first.clone();
            edited.note = "Show unit 4C".into();
            edited.touch(50);
            assert!(ctx
                .repos
                .reminders
                .save_if_version(&edited, first.version)
                .await
                .unwrap());
            // Claims are not changes
            ctx.repos
                .reminders
                .claim_due(Some(&owner), 2000, 10)
                .await
                .unwrap();

            let changes = ctx
                .repos
                .reminders
                .find_changes_since(&owner, synced.cursor)
                .await
                .unwrap();
            let changed = changes
                .reminders
                .iter()
                .map(|r| r.id.clone())
                .collect::<Vec<_>>();
            assert_eq!(changed, vec![second.id.clone(), first.id.clone()]);
            assert_eq!(changes.reminders[1].note, "Show unit 4C");
            assert!(changes.cursor > synced.cursor);

            let nothing = ctx
                .repos
                .reminders
                .find_changes_since(&owner, changes.cursor)
                .await
                .unwrap();
            assert!(nothing.reminders.is_empty());
            assert!(nothing.tombstones.is_empty());
            assert_eq!(nothing.cursor, changes.cursor);
        }
    }
}
