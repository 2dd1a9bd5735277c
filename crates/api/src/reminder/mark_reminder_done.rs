use super::{find_owned_reminder, subscribers::NotifyOnReminderCompleted, StatusChange};
use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, Subscriber, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{mark_reminder_done::*, Envelope};
use tickler_domain::{ReminderStatus, TransitionOutcome, ID};
use tickler_infra::TicklerContext;

pub async fn mark_reminder_done_controller(
    http_req: actix_web::HttpRequest,
    path: web::Path<PathParams>,
    body: Option<web::Json<RequestBody>>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let usecase = MarkReminderDoneUseCase {
        owner_id: user_id,
        reminder_id: path.reminder_id.clone(),
        version: body.and_then(|body| body.version),
    };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|res| {
            let already_done = !res.changed();
            let message = if already_done {
                "Reminder was already done"
            } else {
                "Reminder marked as done"
            };
            HttpResponse::Ok()
                .json(Envelope::ok(APIResponse::new(res.reminder, already_done)).with_message(message))
        })
        .map_err(TicklerError::from)
}

/// Completes a `Reminder`. Completing it again is not an error but reported as
/// `TransitionOutcome::Unchanged`.
#[derive(Debug)]
pub struct MarkReminderDoneUseCase {
    pub owner_id: ID,
    pub reminder_id: ID,
    pub version: Option<i64>,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
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
            UseCaseError::StaleVersion => Self::StaleVersion,
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for MarkReminderDoneUseCase {
    type Response = StatusChange;

    type Error = UseCaseError;

    const NAME: &'static str = "MarkReminderDone";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let mut reminder = find_owned_reminder(&self.reminder_id, &self.owner_id, ctx)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))?;
        let read_version = reminder.version;

        // Infallible, done is reachable from every status
        let outcome = reminder
            .mark_done(now)
            .unwrap_or(TransitionOutcome::Unchanged);
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
        if saved {
            return Ok(StatusChange { reminder, outcome });
        }

        // Lost a race. If the other writer completed it the caller still got what it wanted.
        match ctx.repos.reminders.find(&self.reminder_id).await {
            Some(current) if matches!(current.status, ReminderStatus::Done { .. }) => {
                Ok(StatusChange {
                    reminder: current,
                    outcome: TransitionOutcome::Unchanged,
                })
            }
            Some(_) => Err(UseCaseError::StaleVersion),
            None => Err(UseCaseError::NotFound(self.reminder_id.clone())),
        }
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(NotifyOnReminderCompleted)]
    }
}

impl PermissionBoundary for MarkReminderDoneUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::ChangeReminderStatus]
    }
}
