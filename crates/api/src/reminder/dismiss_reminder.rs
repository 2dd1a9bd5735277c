use super::{find_owned_reminder, subscribers::NotifyOnReminderDismissed, StatusChange};
use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, Subscriber, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{dismiss_reminder::*, Envelope};
use tickler_domain::{ReminderTransitionError, TransitionOutcome, ID};
use tickler_infra::TicklerContext;

pub async fn dismiss_reminder_controller(
    http_req: actix_web::HttpRequest,
    path: web::Path<PathParams>,
    body: Option<web::Json<RequestBody>>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let usecase = DismissReminderUseCase {
        owner_id: user_id,
        reminder_id: path.reminder_id.clone(),
        version: body.and_then(|body| body.version),
    };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|res| {
            let already_dismissed = !res.changed();
            HttpResponse::Ok().json(
                Envelope::ok(APIResponse::new(res.reminder, already_dismissed))
                    .with_message("Reminder dismissed"),
            )
        })
        .map_err(TicklerError::from)
}

/// Dismissing is persisted. A dismissed `Reminder` is never due again unless
/// it is snoozed.
#[derive(Debug)]
pub struct DismissReminderUseCase {
    pub owner_id: ID,
    pub reminder_id: ID,
    pub version: Option<i64>,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
    InvalidTransition(ReminderTransitionError),
    StaleVersion,
    StorageError,
}

impl From<UseCaseError> for TicklerError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(reminder_id) => Self::NotFound(format!(
                "The reminder with id: {}, was not found.",
                reminder_id
            )),
            UseCaseError::InvalidTransition(e) => Self::InvalidTransition(e.to_string()),
            UseCaseError::StaleVersion => Self::StaleVersion,
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for DismissReminderUseCase {
    type Response = StatusChange;

    type Error = UseCaseError;

    const NAME: &'static str = "DismissReminder";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let mut reminder = find_owned_reminder(&self.reminder_id, &self.owner_id, ctx)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))?;
        let read_version = reminder.version;

        let outcome = reminder
            .dismiss(now)
            .map_err(UseCaseError::InvalidTransition)?;
        if outcome == TransitionOutcome::Unchanged {
            return Ok(StatusChange { reminder, outcome });
        }
        if matches!(self.version, Some(version) if version != read_version) {
            return Err(UseCaseError::StaleVersion);
        }

        let saved = ctx
            .repos
            .reminders
            .save_if_version(&reminder, read_version)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if !saved {
            return Err(UseCaseError::StaleVersion);
        }

        Ok(StatusChange { reminder, outcome })
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(NotifyOnReminderDismissed)]
    }
}

impl PermissionBoundary for DismissReminderUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::ChangeReminderStatus]
    }
}
