use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{create_reminder::*, Envelope};
use tickler_domain::{
    validate_due_at, validate_note, LinkedEntity, Reminder, ReminderKind, ReminderPriority,
    ReminderValidationError, ID,
};
use tickler_infra::TicklerContext;

pub async fn create_reminder_controller(
    http_req: actix_web::HttpRequest,
    body: web::Json<RequestBody>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let body = body.0;
    let usecase = CreateReminderUseCase {
        owner_id: user_id,
        note: body.note,
        due_at: body.remind_at,
        priority: body.priority,
        kind: body.kind,
        client_id: body.client_id,
        lead_id: body.lead_id,
    };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|reminder| {
            HttpResponse::Created().json(
                Envelope::ok(APIResponse::new(reminder)).with_message("Reminder created"),
            )
        })
        .map_err(TicklerError::from)
}

#[derive(Debug)]
pub struct CreateReminderUseCase {
    pub owner_id: ID,
    pub note: String,
    pub due_at: i64,
    pub priority: Option<ReminderPriority>,
    pub kind: Option<ReminderKind>,
    pub client_id: Option<ID>,
    pub lead_id: Option<ID>,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidReminder(ReminderValidationError),
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
            UseCaseError::InvalidReminder(e) => Self::BadClientData(e.to_string()),
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateReminder";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let note = validate_note(&self.note, ctx.config.note_max_length)?;
        let due_at = validate_due_at(self.due_at, now)?;
        let linked_entity = LinkedEntity::from_ids(self.client_id.take(), self.lead_id.take())?;

        let mut reminder = Reminder::new(self.owner_id.clone(), note, due_at, now);
        reminder.linked_entity = linked_entity;
        reminder.priority = self.priority.unwrap_or_default();
        reminder.kind = self.kind.unwrap_or_default();

        ctx.repos
            .reminders
            .insert(&reminder)
            .await
            .map(|_| reminder)
            .map_err(|_| UseCaseError::StorageError)
    }
}

impl PermissionBoundary for CreateReminderUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::CreateReminder]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_helpers::setup;
    use crate::shared::usecase::execute;
    use tickler_domain::ReminderStatus;

    fn usecase(owner_id: &ID, note: &str, due_at: i64) -> CreateReminderUseCase {
        CreateReminderUseCase {
            owner_id: owner_id.clone(),
            note: note.into(),
            due_at,
            priority: None,
            kind: None,
            client_id: None,
            lead_id: None,
        }
    }

    #[actix_web::main]
    #[test]
    async fn creates_pending_reminder() {
        let (ctx, _) = setup(1000);
        let owner = ID::default();
        let mut usecase = usecase(&owner, "  Call the landlord  ", 61_000);
        usecase.kind = Some(ReminderKind::Call);
        usecase.client_id = Some(ID::default());

        let reminder = execute(usecase, &ctx).await.unwrap();
        assert_eq!(reminder.note, "Call the landlord");
        assert_eq!(reminder.status, ReminderStatus::Pending);
        assert_eq!(reminder.priority, ReminderPriority::Medium);
        assert_eq!(reminder.kind, ReminderKind::Call);
        assert!(reminder.linked_entity.client_id().is_some());
        assert_eq!(reminder.version, 1);
        assert_eq!(reminder.created, 1000);
        assert!(ctx.repos.reminders.find(&reminder.id).await.is_some());
    }

    #[actix_web::main]
    #[test]
    async fn rejects_invalid_reminders() {
        let (ctx, _) = setup(1000);
        let owner = ID::default();

        let res = execute(usecase(&owner, "   ", 61_000), &ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidReminder(ReminderValidationError::EmptyNote))
        ));

        let long_note = "a".repeat(ctx.config.note_max_length + 1);
        let res = execute(usecase(&owner, &long_note, 61_000), &ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidReminder(ReminderValidationError::NoteTooLong(_)))
        ));

        let res = execute(usecase(&owner, "Past", 1000), &ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidReminder(
                ReminderValidationError::DueAtNotInFuture
            ))
        ));

        let mut both_linked = usecase(&owner, "Linked twice", 61_000);
        both_linked.client_id = Some(ID::default());
        both_linked.lead_id = Some(ID::default());
        let res = execute(both_linked, &ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidReminder(
                ReminderValidationError::MultipleLinkedEntities
            ))
        ));
    }
}
