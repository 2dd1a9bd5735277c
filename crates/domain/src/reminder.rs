use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt::Display, str::FromStr};
use thiserror::Error;

/// A `Reminder` is a note that should be brought to the attention of its
/// owner once `due_at` has passed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: ID,
    /// The user that created the `Reminder`. Never changes.
    pub owner_id: ID,
    pub note: String,
    /// Timestamp in millis at which the `Reminder` becomes due
    pub due_at: i64,
    pub status: ReminderStatus,
    pub linked_entity: LinkedEntity,
    pub priority: ReminderPriority,
    pub kind: ReminderKind,
    /// Optimistic concurrency token. Incremented on every write made by a user.
    pub version: i64,
    /// The effective due timestamp this `Reminder` was last delivered for.
    /// A `Reminder` is newly due when this differs from `effective_due_at`.
    pub delivered_for: Option<i64>,
    pub created: i64,
    pub updated: i64,
}

/// Lifecycle of a `Reminder`. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReminderStatus {
    Pending,
    Snoozed { until: i64 },
    Dismissed { at: i64 },
    Done { at: i64 },
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Snoozed { .. } => "snoozed",
            Self::Dismissed { .. } => "dismissed",
            Self::Done { .. } => "done",
        }
    }

    /// Rebuilds a status from its stored name and the timestamp stored beside it
    pub fn from_parts(name: &str, timestamp: Option<i64>) -> Result<Self, InvalidReminderField> {
        let ts = || timestamp.ok_or_else(|| InvalidReminderField::new("status", name));
        match name {
            "pending" => Ok(Self::Pending),
            "snoozed" => Ok(Self::Snoozed { until: ts()? }),
            "dismissed" => Ok(Self::Dismissed { at: ts()? }),
            "done" => Ok(Self::Done { at: ts()? }),
            _ => Err(InvalidReminderField::new("status", name)),
        }
    }

    /// The timestamp carried by the variant, if any
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::Pending => None,
            Self::Snoozed { until } => Some(*until),
            Self::Dismissed { at } | Self::Done { at } => Some(*at),
        }
    }
}

impl Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filter on the name of a `ReminderStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatusKind {
    Pending,
    Snoozed,
    Dismissed,
    Done,
}

impl ReminderStatusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Snoozed => "snoozed",
            Self::Dismissed => "dismissed",
            Self::Done => "done",
        }
    }

    pub fn matches(&self, status: &ReminderStatus) -> bool {
        self.as_str() == status.as_str()
    }
}

/// Advisory priority. Only affects the order in which due reminders are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderPriority {
    Low,
    Medium,
    High,
}

impl Default for ReminderPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl ReminderPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for ReminderPriority {
    type Err = InvalidReminderField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(InvalidReminderField::new("priority", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    General,
    Call,
    Meeting,
    FollowUp,
    Visit,
    Email,
}

impl Default for ReminderKind {
    fn default() -> Self {
        Self::General
    }
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Call => "call",
            Self::Meeting => "meeting",
            Self::FollowUp => "follow_up",
            Self::Visit => "visit",
            Self::Email => "email",
        }
    }
}

impl FromStr for ReminderKind {
    type Err = InvalidReminderField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "call" => Ok(Self::Call),
            "meeting" => Ok(Self::Meeting),
            "follow_up" => Ok(Self::FollowUp),
            "visit" => Ok(Self::Visit),
            "email" => Ok(Self::Email),
            _ => Err(InvalidReminderField::new("type", s)),
        }
    }
}

/// The CRM record a `Reminder` is about. At most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum LinkedEntity {
    None,
    Client(ID),
    Lead(ID),
}

impl Default for LinkedEntity {
    fn default() -> Self {
        Self::None
    }
}

impl LinkedEntity {
    /// Builds a link from the two optional foreign keys used on the wire and in storage
    pub fn from_ids(client_id: Option<ID>, lead_id: Option<ID>) -> Result<Self, ReminderValidationError> {
        match (client_id, lead_id) {
            (Some(_), Some(_)) => Err(ReminderValidationError::MultipleLinkedEntities),
            (Some(client_id), None) => Ok(Self::Client(client_id)),
            (None, Some(lead_id)) => Ok(Self::Lead(lead_id)),
            (None, None) => Ok(Self::None),
        }
    }

    pub fn client_id(&self) -> Option<&ID> {
        match self {
            Self::Client(id) => Some(id),
            _ => None,
        }
    }

    pub fn lead_id(&self) -> Option<&ID> {
        match self {
            Self::Lead(id) => Some(id),
            _ => None,
        }
    }
}

/// A stored value that could not be mapped back into the domain
#[derive(Error, Debug, PartialEq)]
#[error("Invalid value `{value}` for reminder field `{field}`")]
pub struct InvalidReminderField {
    pub field: &'static str,
    pub value: String,
}

impl InvalidReminderField {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ReminderValidationError {
    #[error("The note can not be empty")]
    EmptyNote,
    #[error("The note can not be longer than {0} characters")]
    NoteTooLong(usize),
    #[error("The reminder time must be in the future")]
    DueAtNotInFuture,
    #[error("A reminder can be linked to either a client or a lead, not both")]
    MultipleLinkedEntities,
}

#[derive(Error, Debug, PartialEq)]
pub enum ReminderTransitionError {
    #[error("Can not {operation} a reminder that is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: &'static str,
    },
    #[error("The snooze time must be in the future")]
    SnoozeNotInFuture,
}

/// Result of a status transition that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The status changed and the `Reminder` has to be persisted
    Changed,
    /// The `Reminder` was already in the requested state
    Unchanged,
}

/// Trims the note and checks that it is non-empty and not too long
pub fn validate_note(note: &str, max_len: usize) -> Result<String, ReminderValidationError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(ReminderValidationError::EmptyNote);
    }
    if note.chars().count() > max_len {
        return Err(ReminderValidationError::NoteTooLong(max_len));
    }
    Ok(note.to_string())
}

pub fn validate_due_at(due_at: i64, now: i64) -> Result<i64, ReminderValidationError> {
    if due_at <= now {
        return Err(ReminderValidationError::DueAtNotInFuture);
    }
    Ok(due_at)
}

impl Reminder {
    pub fn new(owner_id: ID, note: String, due_at: i64, now: i64) -> Self {
        Self {
            id: Default::default(),
            owner_id,
            note,
            due_at,
            status: ReminderStatus::Pending,
            linked_entity: LinkedEntity::None,
            priority: Default::default(),
            kind: Default::default(),
            version: 1,
            delivered_for: None,
            created: now,
            updated: now,
        }
    }

    /// The time from which the `Reminder` is due, taking snoozing into account
    pub fn effective_due_at(&self) -> i64 {
        match self.status {
            ReminderStatus::Snoozed { until } => until,
            _ => self.due_at,
        }
    }

    /// Pending and snoozed reminders can still become due
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ReminderStatus::Pending | ReminderStatus::Snoozed { .. }
        )
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.is_active() && self.effective_due_at() <= now
    }

    /// Due and not yet delivered for the current due transition
    pub fn is_newly_due(&self, now: i64) -> bool {
        self.is_due(now) && self.delivered_for != Some(self.effective_due_at())
    }

    /// The single rule for what counts as overdue
    pub fn is_overdue(&self, now: i64, grace_millis: i64) -> bool {
        self.is_active() && now - self.effective_due_at() > grace_millis
    }

    /// Records that the current due transition has been delivered
    pub fn claim(&mut self) {
        self.delivered_for = Some(self.effective_due_at());
    }

    pub fn mark_done(&mut self, now: i64) -> Result<TransitionOutcome, ReminderTransitionError> {
        match self.status {
            ReminderStatus::Done { .. } => Ok(TransitionOutcome::Unchanged),
            _ => {
                self.status = ReminderStatus::Done { at: now };
                self.touch(now);
                Ok(TransitionOutcome::Changed)
            }
        }
    }

    pub fn snooze(
        &mut self,
        until: i64,
        now: i64,
    ) -> Result<TransitionOutcome, ReminderTransitionError> {
        if let ReminderStatus::Done { .. } = self.status {
            return Err(ReminderTransitionError::InvalidTransition {
                operation: "snooze",
                status: self.status.as_str(),
            });
        }
        if until <= now {
            return Err(ReminderTransitionError::SnoozeNotInFuture);
        }
        if self.status == (ReminderStatus::Snoozed { until }) {
            return Ok(TransitionOutcome::Unchanged);
        }
        self.status = ReminderStatus::Snoozed { until };
        self.touch(now);
        Ok(TransitionOutcome::Changed)
    }

    pub fn dismiss(&mut self, now: i64) -> Result<TransitionOutcome, ReminderTransitionError> {
        match self.status {
            ReminderStatus::Done { .. } => Err(ReminderTransitionError::InvalidTransition {
                operation: "dismiss",
                status: self.status.as_str(),
            }),
            ReminderStatus::Dismissed { .. } => Ok(TransitionOutcome::Unchanged),
            _ => {
                self.status = ReminderStatus::Dismissed { at: now };
                self.touch(now);
                Ok(TransitionOutcome::Changed)
            }
        }
    }

    /// Bumps the version and the updated timestamp after a user visible change
    pub fn touch(&mut self, now: i64) {
        self.version += 1;
        self.updated = now;
    }
}

impl Entity for Reminder {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// Delivery order: highest priority first, then the one that has been due the longest
pub fn delivery_order(r1: &Reminder, r2: &Reminder) -> Ordering {
    r2.priority
        .cmp(&r1.priority)
        .then_with(|| r1.effective_due_at().cmp(&r2.effective_due_at()))
        .then_with(|| r1.id.cmp(&r2.id))
}

pub fn sort_for_delivery(reminders: &mut [Reminder]) {
    reminders.sort_by(delivery_order);
}

/// What is left of a `Reminder` after it has been deleted. Only used to let
/// clients that sync incrementally know that it is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderTombstone {
    pub reminder_id: ID,
    pub owner_id: ID,
    pub deleted_at: i64,
    /// Position of the deletion in the change feed
    pub change_seq: i64,
}

/// Everything of one owner that changed after a position in the change feed.
///
/// Every insert, user write and deletion takes the next number of a single
/// sequence, so the feed is ordered even when the clock is not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderChanges {
    /// Current state of the changed `Reminder`s, oldest change first
    pub reminders: Vec<Reminder>,
    pub tombstones: Vec<ReminderTombstone>,
    /// Position to continue from on the next sync
    pub cursor: i64,
}
