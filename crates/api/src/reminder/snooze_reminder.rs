use super::{find_owned_reminder, subscribers::NotifyOnReminderSnoozed, StatusChange};
use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, Subscriber, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{snooze_reminder::*, Envelope};
use tickler_domain::{ReminderTransitionError, TransitionOutcome, ID};
use tickler_infra::TicklerContext;

pub async fn snooze_reminder_controller(
    http_req: actix_web::HttpRequest,
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let usecase = SnoozeReminderUseCase {
        owner_id: user_id,
        reminder_id: path.reminder_id.clone(),
        until: body.until,
        version: body.version,
    };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(
                Envelope::ok(APIResponse::new(res.reminder)).with_message("Reminder snoozed"),
            )
        })
        .map_err(TicklerError::from)
}

#[derive(Debug)]
pub struct SnoozeReminderUseCase {
    pub owner_id: ID,
    pub reminder_id: ID,
    /// Timestamp in millis at which the `Reminder` becomes due again
    pub until: i64,
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
            UseCaseError::InvalidTransition(e @ ReminderTransitionError::SnoozeNotInFuture) => {
                Self::BadClientData(e.to_string())
            }
            UseCaseError::InvalidTransition(e) => Self::InvalidTransition(e.to_string()),
            UseCaseError::StaleVersion => Self::StaleVersion,
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SnoozeReminderUseCase {
    type Response = StatusChange;

    type Error = UseCaseError;

    const NAME: &'static str = "SnoozeReminder";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let mut reminder = find_owned_reminder(&self.reminder_id, &self.owner_id, ctx)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))?;
        let read_version = reminder.version;

        let outcome = reminder
            .snooze(self.until, now)
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
        vec![Box::new(NotifyOnReminderSnoozed)]
    }
}

impl PermissionBoundary for SnoozeReminderUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::ChangeReminderStatus]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_helpers::{insert_reminder, setup};
    use crate::shared::usecase::execute;
    use tickler_domain::ReminderStatus;

    fn usecase(owner_id: &ID, reminder_id: &ID, until: i64) -> SnoozeReminderUseCase {
        SnoozeReminderUseCase {
            owner_id: owner_id.clone(),
            reminder_id: reminder_id.clone(),
            until,
            version: None,
        }
    }

    #[actix_web::main]
    #[test]
    async fn snoozes_due_reminder() {
        let (ctx, _) = setup(2000);
        let owner = ID::default();
        let reminder = insert_reminder(&ctx, &owner, 1000).await;

        let res = execute(usecase(&owner, &reminder.id, 10_000), &ctx)
            .await
            .unwrap();
        assert!(res.changed());
        assert_eq!(res.reminder.status, ReminderStatus::Snoozed { until: 10_000 });
        assert!(ctx
            .repos
            .reminders
            .find_due(&owner, 2000)
            .await
            .unwrap()
            .is_empty());
    }

    #[actix_web::main]
    #[test]
    async fn rejects_snooze_into_the_past() {
        let (ctx, _) = setup(2000);
        let owner = ID::default();
        let reminder = insert_reminder(&ctx, &owner, 1000).await;

        let res = execute(usecase(&owner, &reminder.id, 2000), &ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidTransition(
                ReminderTransitionError::SnoozeNotInFuture
            ))
        ));
    }

    #[actix_web::main]
    #[test]
    async fn can_not_snooze_done_reminder() {
        let (ctx, _) = setup(2000);
        let owner = ID::default();
        let mut reminder = insert_reminder(&ctx, &owner, 1000).await;
        reminder.mark_done(1500).unwrap();
        ctx.repos
            .reminders
            .save_if_version(&reminder, 1)
            .await
            .unwrap();

        let res = execute(usecase(&owner, &reminder.id, 10_000), &ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseError::InvalidTransition(
                ReminderTransitionError::InvalidTransition { .. }
            ))
        ));
        let e: TicklerError = res.unwrap_err().into();
        assert_eq!(e.code(), "INVALID_TRANSITION");
    }
}
