use super::find_owned_reminder;
use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{update_reminder::*, Envelope};
use tickler_domain::{
    validate_due_at, validate_note, LinkedEntity, Reminder, ReminderKind, ReminderPriority,
    ReminderStatus, ReminderTransitionError, ReminderValidationError, ID,
};
use tickler_infra::TicklerContext;

pub async fn update_reminder_controller(
    http_req: actix_web::HttpRequest,
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let body = body.0;
    let usecase = UpdateReminderUseCase {
        owner_id: user_id,
        reminder_id: path.reminder_id.clone(),
        note: body.note,
        due_at: body.remind_at,
        priority: body.priority,
        kind: body.kind,
        client_id: body.client_id,
        lead_id: body.lead_id,
        unlink: body.unlink.unwrap_or(false),
        version: body.version,
    };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|reminder| {
            HttpResponse::Ok().json(
                Envelope::ok(APIResponse::new(reminder)).with_message("Reminder updated"),
            )
        })
        .map_err(TicklerError::from)
}

#[derive(Debug, Default)]
pub struct UpdateReminderUseCase {
    pub owner_id: ID,
    pub reminder_id: ID,
    pub note: Option<String>,
    pub due_at: Option<i64>,
    pub priority: Option<ReminderPriority>,
    pub kind: Option<ReminderKind>,
    pub client_id: Option<ID>,
    pub lead_id: Option<ID>,
    /// Removes the current link. Can not be combined with a new link.
    pub unlink: bool,
    /// The version the client based its changes on
    pub version: Option<i64>,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    InvalidReminder(ReminderValidationError),
    ConflictingLink,
    InvalidTransition(ReminderTransitionError),
    StaleVersion,
    StorageError,
}

impl From<ReminderValidationError> for UseCaseError {
    fn from(e: ReminderValidationError) -> Self {
        Self::InvalidReminder(e)
    }
}

impl From<UseCaseError> for TicklerError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(reminder_id) => Self::NotFound(format!(
                "The reminder with id: {}, was not found.",
                reminder_id
            )),
            UseCaseError::InvalidReminder(e) => Self::BadClientData(e.to_string()),
            UseCaseError::ConflictingLink => Self::BadClientData(
                "A reminder can not be unlinked and linked in the same request".into(),
            ),
            UseCaseError::InvalidTransition(e) => Self::InvalidTransition(e.to_string()),
            UseCaseError::StaleVersion => Self::StaleVersion,
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for UpdateReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "UpdateReminder";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let mut reminder = find_owned_reminder(&self.reminder_id, &self.owner_id, ctx)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))?;
        let read_version = reminder.version;
        if matches!(self.version, Some(version) if version != read_version) {
            return Err(UseCaseError::StaleVersion);
        }

        if let Some(note) = &self.note {
            reminder.note = validate_note(note, ctx.config.note_max_length)?;
        }
        if let Some(due_at) = self.due_at {
            if due_at != reminder.due_at {
                // Closed reminders never fire again, so a new due time would be lost
                if let ReminderStatus::Done { .. } | ReminderStatus::Dismissed { .. } =
                    reminder.status
                {
                    return Err(UseCaseError::InvalidTransition(
                        ReminderTransitionError::InvalidTransition {
                            operation: "reschedule",
                            status: reminder.status.as_str(),
                        },
                    ));
                }
                reminder.due_at = validate_due_at(due_at, now)?;
            }
        }
        if let Some(priority) = self.priority {
            reminder.priority = priority;
        }
        if let Some(kind) = self.kind {
            reminder.kind = kind;
        }

        let relink = self.client_id.is_some() || self.lead_id.is_some();
        if self.unlink && relink {
            return Err(UseCaseError::ConflictingLink);
        }
        if self.unlink {
            reminder.linked_entity = LinkedEntity::None;
        } else if relink {
            reminder.linked_entity =
                LinkedEntity::from_ids(self.client_id.take(), self.lead_id.take())?;
        }

        reminder.touch(now);
        let saved = ctx
            .repos
            .reminders
            .save_if_version(&reminder, read_version)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !saved {
            return Err(UseCaseError::StaleVersion);
        }

        Ok(reminder)
    }
}

impl PermissionBoundary for UpdateReminderUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::UpdateReminder]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_helpers::{insert_reminder, setup};
    use crate::shared::usecase::execute;

    #[actix_web::main]
    #[test]
    async fn updates_content_and_bumps_version() {
        let (ctx, _) = setup(500);
        let owner = ID::default();
        let reminder = insert_reminder(&ctx, &owner, 1000).await;
        let lead_id = ID::default();

        let updated = execute(
            UpdateReminderUseCase {
                owner_id: owner.clone(),
                reminder_id: reminder.id.clone(),
                note: Some("Send the contract".into()),
                due_at: Some(2000),
                priority: Some(ReminderPriority::High),
                lead_id: Some(lead_id.clone()),
                version: Some(1),
                ..Default::default()
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(updated.note, "Send the contract");
        assert_eq!(updated.due_at, 2000);
        assert_eq!(updated.priority, ReminderPriority::High);
        assert_eq!(updated.linked_entity, LinkedEntity::Lead(lead_id));
        assert_eq!(updated.version, 2);
        assert_eq!(updated.updated, 500);

        let unlinked = execute(
            UpdateReminderUseCase {
                owner_id: owner,
                reminder_id: reminder.id.clone(),
                unlink: true,
                ..Default::default()
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(unlinked.linked_entity, LinkedEntity::None);
        assert_eq!(unlinked.version, 3);
    }

    #[actix_web::main]
    #[test]
    async fn rejects_stale_version() {
        let (ctx, _) = setup(500);
        let owner = ID::default();
        let reminder = insert_reminder(&ctx, &owner, 1000).await;

        let usecase = || UpdateReminderUseCase {
            owner_id: owner.clone(),
            reminder_id: reminder.id.clone(),
            note: Some("First edit wins".into()),
            version: Some(1),
            ..Default::default()
        };
        assert!(execute(usecase(), &ctx).await.is_ok());
        assert!(matches!(
            execute(usecase(), &ctx).await,
            Err(UseCaseError::StaleVersion)
        ));
    }

    #[actix_web::main]
    #[test]
    async fn rejects_invalid_updates() {
        let (ctx, _) = setup(500);
        let owner = ID::default();
        let mut reminder = insert_reminder(&ctx, &owner, 1000).await;

        let res = execute(
            UpdateReminderUseCase {
                owner_id: owner.clone(),
                reminder_id: reminder.id.clone(),
                due_at: Some(100),
                ..Default::default()
            },
            &ctx,
        )
        .await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidReminder(
                ReminderValidationError::DueAtNotInFuture
            ))
        ));

        let res = execute(
            UpdateReminderUseCase {
                owner_id: owner.clone(),
                reminder_id: reminder.id.clone(),
                client_id: Some(ID::default()),
                unlink: true,
                ..Default::default()
            },
            &ctx,
        )
        .await;
        assert!(matches!(res, Err(UseCaseError::ConflictingLink)));

        reminder.mark_done(600).unwrap();
        ctx.repos
            .reminders
            .save_if_version(&reminder, 1)
            .await
            .unwrap();
        let res = execute(
            UpdateReminderUseCase {
                owner_id: owner.clone(),
                reminder_id: reminder.id.clone(),
                due_at: Some(5000),
                ..Default::default()
            },
            &ctx,
        )
        .await;
        assert!(matches!(res, Err(UseCaseError::InvalidTransition(_))));

        let res = execute(
            UpdateReminderUseCase {
                owner_id: ID::default(),
                reminder_id: reminder.id.clone(),
                note: Some("Not mine".into()),
                ..Default::default()
            },
            &ctx,
        )
        .await;
        assert!(matches!(res, Err(UseCaseError::NotFound(_))));
    }

    #[actix_web::main]
    #[test]
    async fn rejects_rescheduling_dismissed_reminders() {
        let (ctx, _) = setup(500);
        let owner = ID::default();
        let mut reminder = insert_reminder(&ctx, &owner, 1000).await;
        reminder.dismiss(600).unwrap();
        ctx.repos
            .reminders
            .save_if_version(&reminder, 1)
            .await
            .unwrap();

        let usecase = |due_at| UpdateReminderUseCase {
            owner_id: owner.clone(),
            reminder_id: reminder.id.clone(),
            due_at: Some(due_at),
            note: Some("Call back after lunch".into()),
            ..Default::default()
        };
        let res = execute(usecase(5000), &ctx).await;
        assert!(matches!(res, Err(UseCaseError::InvalidTransition(_))));
        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.due_at, 1000);
        assert_eq!(stored.note, reminder.note);

        // Sending the unchanged due time along with other edits is fine
        let updated = execute(usecase(1000), &ctx).await.unwrap();
        assert_eq!(updated.note, "Call back after lunch");
        assert!(matches!(updated.status, ReminderStatus::Dismissed { .. }));
    }
}
