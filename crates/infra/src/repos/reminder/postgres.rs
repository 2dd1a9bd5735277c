use super::IReminderRepo;
use crate::repos::shared::query_structs::ReminderFindQuery;
use sqlx::{types::Uuid, FromRow, PgPool, Postgres, Transaction};
use std::convert::TryFrom;
use tickler_domain::{
    sort_for_delivery, LinkedEntity, Reminder, ReminderChanges, ReminderStats, ReminderStatus,
    ReminderStatusKind, ReminderTombstone, ID,
};
use tracing::error;

pub struct PostgresReminderRepo {
    pool: PgPool,
}

/// Advisory lock that orders writers against change feed readers. Writers
/// hold it shared until they commit and readers take it exclusively, so a
/// reader never skips a change sequence number that commits after it.
const CHANGE_FEED_LOCK: i64 = 0x7469_636b_6c65_72;

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Starts a transaction for a write that takes a change sequence number
    async fn begin_change(&self) -> anyhow::Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock_shared($1)")
            .bind(CHANGE_FEED_LOCK)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    reminder_uid: Uuid,
    owner_uid: Uuid,
    note: String,
    due_at: i64,
    status: String,
    status_at: Option<i64>,
    client_uid: Option<Uuid>,
    lead_uid: Option<Uuid>,
    priority: String,
    kind: String,
    version: i64,
    delivered_for: Option<i64>,
    created: i64,
    updated: i64,
    change_seq: i64,
}

impl TryFrom<ReminderRaw> for Reminder {
    type Error = anyhow::Error;

    fn try_from(e: ReminderRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: e.reminder_uid.into(),
            owner_id: e.owner_uid.into(),
            note: e.note,
            due_at: e.due_at,
            status: ReminderStatus::from_parts(&e.status, e.status_at)?,
            linked_entity: LinkedEntity::from_ids(
                e.client_uid.map(ID::from),
                e.lead_uid.map(ID::from),
            )?,
            priority: e.priority.parse()?,
            kind: e.kind.parse()?,
            version: e.version,
            delivered_for: e.delivered_for,
            created: e.created,
            updated: e.updated,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReminderTombstoneRaw {
    reminder_uid: Uuid,
    owner_uid: Uuid,
    deleted_at: i64,
    change_seq: i64,
}

impl From<ReminderTombstoneRaw> for ReminderTombstone {
    fn from(e: ReminderTombstoneRaw) -> Self {
        Self {
            reminder_id: e.reminder_uid.into(),
            owner_id: e.owner_uid.into(),
            deleted_at: e.deleted_at,
            change_seq: e.change_seq,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReminderStatsRaw {
    total: i64,
    pending: i64,
    snoozed: i64,
    dismissed: i64,
    done: i64,
    overdue: i64,
}

/// Maps rows into `Reminder`s, skipping (and logging) rows that are not valid
fn into_reminders(rows: Vec<ReminderRaw>) -> Vec<Reminder> {
    rows.into_iter()
        .filter_map(|raw| {
            let reminder_uid = raw.reminder_uid;
            match Reminder::try_from(raw) {
                Ok(reminder) => Some(reminder),
                Err(e) => {
                    error!("Invalid reminder row {}: {:?}", reminder_uid, e);
                    None
                }
            }
        })
        .collect()
}

/// Sorts highest priority first inside of SQL
const PRIORITY_RANK: &str =
    "CASE priority WHEN 'high' THEN 2 WHEN 'medium' THEN 1 ELSE 0 END";

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        let mut tx = self.begin_change().await?;
        sqlx::query(
            r#"
            INSERT INTO reminders(
                reminder_uid, owner_uid, note, due_at, status, status_at,
                client_uid, lead_uid, priority, kind, version, delivered_for,
                created, updated
            )
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.owner_id.inner_ref())
        .bind(&reminder.note)
        .bind(reminder.due_at)
        .bind(reminder.status.as_str())
        .bind(reminder.status.timestamp())
        .bind(reminder.linked_entity.client_id().map(|id| *id.inner_ref()))
        .bind(reminder.linked_entity.lead_id().map(|id| *id.inner_ref()))
        .bind(reminder.priority.as_str())
        .bind(reminder.kind.as_str())
        .bind(reminder.version)
        .bind(reminder.delivered_for)
        .bind(reminder.created)
        .bind(reminder.updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Unable to insert reminder: {:?}", e);
            e
        })?;
        tx.commit().await?;

        Ok(())
    }

    async fn save_if_version(
        &self,
        reminder: &Reminder,
        expected_version: i64,
    ) -> anyhow::Result<bool> {
        let mut tx = self.begin_change().await?;
        let rows_affected = sqlx::query(
            r#"
            UPDATE reminders
            SET note = $3,
            due_at = $4,
            status = $5,
            status_at = $6,
            client_uid = $7,
            lead_uid = $8,
            priority = $9,
            kind = $10,
            version = $11,
            updated = $12,
            change_seq = nextval('reminder_changes')
            WHERE reminder_uid = $1 AND version = $2
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(expected_version)
        .bind(&reminder.note)
        .bind(reminder.due_at)
        .bind(reminder.status.as_str())
        .bind(reminder.status.timestamp())
        .bind(reminder.linked_entity.client_id().map(|id| *id.inner_ref()))
        .bind(reminder.linked_entity.lead_id().map(|id| *id.inner_ref()))
        .bind(reminder.priority.as_str())
        .bind(reminder.kind.as_str())
        .bind(reminder.version)
        .bind(reminder.updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Unable to update reminder: {:?}", e);
            e
        })?
        .rows_affected();
        tx.commit().await?;

        Ok(rows_affected == 1)
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        let raw: ReminderRaw = match sqlx::query_as(
            r#"
            SELECT * FROM reminders
            WHERE reminder_uid = $1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_one(&self.pool)
        .await
        {
            Ok(raw) => raw,
            Err(_) => return None,
        };
        match Reminder::try_from(raw) {
            Ok(reminder) => Some(reminder),
            Err(e) => {
                error!("Invalid reminder row {}: {:?}", reminder_id, e);
                None
            }
        }
    }

    async fn find_by_owner(&self, query: &ReminderFindQuery) -> anyhow::Result<Vec<Reminder>> {
        let rows: Vec<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders
            WHERE owner_uid = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY due_at, reminder_uid
            LIMIT $3
            OFFSET $4
            "#,
        )
        .bind(query.owner_id.inner_ref())
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.limit as i64)
        .bind(query.skip as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(into_reminders(rows))
    }

    async fn count_by_owner(
        &self,
        owner_id: &ID,
        status: Option<ReminderStatusKind>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM reminders
            WHERE owner_uid = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(owner_id.inner_ref())
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_due(&self, owner_id: &ID, now: i64) -> anyhow::Result<Vec<Reminder>> {
        let rows: Vec<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders
            WHERE owner_uid = $1
                AND status IN ('pending', 'snoozed')
                AND effective_due_at <= $2
            "#,
        )
        .bind(owner_id.inner_ref())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut reminders = into_reminders(rows);
        sort_for_delivery(&mut reminders);
        Ok(reminders)
    }

    async fn claim_due(
        &self,
        owner_id: Option<&ID>,
        now: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<Reminder>> {
        // SKIP LOCKED lets concurrent claimers pick disjoint rows instead of
        // claiming the same due transition twice
        let rows: Vec<ReminderRaw> = sqlx::query_as(&format!(
            r#"
            UPDATE reminders AS r
            SET delivered_for = r.effective_due_at
            FROM (
                SELECT reminder_uid FROM reminders
                WHERE ($1::uuid IS NULL OR owner_uid = $1)
                    AND status IN ('pending', 'snoozed')
                    AND effective_due_at <= $2
                    AND delivered_for IS DISTINCT FROM effective_due_at
                ORDER BY {} DESC, effective_due_at, reminder_uid
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            ) AS due
            WHERE r.reminder_uid = due.reminder_uid
            RETURNING r.*
            "#,
            PRIORITY_RANK
        ))
        .bind(owner_id.map(|id| *id.inner_ref()))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Unable to claim due reminders: {:?}", e);
            e
        })?;

        let mut reminders = into_reminders(rows);
        sort_for_delivery(&mut reminders);
        Ok(reminders)
    }

    async fn release_claims(&self, reminders: &[Reminder]) -> anyhow::Result<()> {
        for reminder in reminders {
            sqlx::query(
                r#"
                UPDATE reminders
                SET delivered_for = NULL
                WHERE reminder_uid = $1 AND delivered_for = $2
                "#,
            )
            .bind(reminder.id.inner_ref())
            .bind(reminder.delivered_for)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn delete(&self, reminder_id: &ID, deleted_at: i64) -> Option<Reminder> {
        let mut tx = match self.begin_change().await {
            Ok(tx) => tx,
            Err(e) => {
                error!("Unable to start transaction for deleting reminder: {:?}", e);
                return None;
            }
        };

        let raw: ReminderRaw = match sqlx::query_as(
            r#"
            DELETE FROM reminders
            WHERE reminder_uid = $1
            RETURNING *
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_one(&mut *tx)
        .await
        {
            Ok(raw) => raw,
            Err(_) => return None,
        };

        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO reminder_tombstones(reminder_uid, owner_uid, deleted_at)
            VALUES($1, $2, $3)
            "#,
        )
        .bind(raw.reminder_uid)
        .bind(raw.owner_uid)
        .bind(deleted_at)
        .execute(&mut *tx)
        .await
        {
            error!("Unable to store reminder tombstone: {:?}", e);
            return None;
        }

        if let Err(e) = tx.commit().await {
            error!("Unable to commit reminder deletion: {:?}", e);
            return None;
        }

        match Reminder::try_from(raw) {
            Ok(reminder) => Some(reminder),
            Err(e) => {
                error!("Deleted an invalid reminder row {}: {:?}", reminder_id, e);
                None
            }
        }
    }

    async fn stats(
        &self,
        owner_id: &ID,
        now: i64,
        overdue_grace_millis: i64,
    ) -> anyhow::Result<ReminderStats> {
        let raw: ReminderStatsRaw = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'snoozed') AS snoozed,
                COUNT(*) FILTER (WHERE status = 'dismissed') AS dismissed,
                COUNT(*) FILTER (WHERE status = 'done') AS done,
                COUNT(*) FILTER (
                    WHERE status IN ('pending', 'snoozed')
                        AND $2 - effective_due_at > $3
                ) AS overdue
            FROM reminders
            WHERE owner_uid = $1
            "#,
        )
        .bind(owner_id.inner_ref())
        .bind(now)
        .bind(overdue_grace_millis)
        .fetch_one(&self.pool)
        .await?;

        Ok(ReminderStats {
            total: raw.total,
            pending: raw.pending,
            snoozed: raw.snoozed,
            dismissed: raw.dismissed,
            done: raw.done,
            overdue: raw.overdue,
        })
    }

    async fn find_changes_since(
        &self,
        owner_id: &ID,
        since: i64,
    ) -> anyhow::Result<ReminderChanges> {
        // No writer is in flight while the exclusive lock is held, so both
        // reads see every change numbered up to the returned cursor
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CHANGE_FEED_LOCK)
            .execute(&mut *tx)
            .await?;

        let rows: Vec<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders
            WHERE owner_uid = $1 AND change_seq > $2
            ORDER BY change_seq
            "#,
        )
        .bind(owner_id.inner_ref())
        .bind(since)
        .fetch_all(&mut *tx)
        .await?;

        let tombstones: Vec<ReminderTombstoneRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminder_tombstones
            WHERE owner_uid = $1 AND change_seq > $2
            ORDER BY change_seq
            "#,
        )
        .bind(owner_id.inner_ref())
        .bind(since)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let cursor = rows
            .iter()
            .map(|r| r.change_seq)
            .chain(tombstones.iter().map(|t| t.change_seq))
            .max()
            .unwrap_or_else(|| since.max(0));

        Ok(ReminderChanges {
            reminders: into_reminders(rows),
            tombstones: tombstones.into_iter().map(|t| t.into()).collect(),
            cursor,
        })
    }
}
