use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{poll_reminders::*, Envelope};
use tickler_domain::{Reminder, ID};
use tickler_infra::TicklerContext;

pub async fn poll_reminders_controller(
    http_req: actix_web::HttpRequest,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let usecase = PollRemindersUseCase { owner_id: user_id };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|reminders| HttpResponse::Ok().json(Envelope::ok(APIResponse::new(reminders))))
        .map_err(TicklerError::from)
}

/// Claims and returns the `Reminder`s of the owner that became due since the
/// last poll. Every due transition is returned by exactly one poll.
#[derive(Debug)]
pub struct PollRemindersUseCase {
    pub owner_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

impl From<UseCaseError> for TicklerError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for PollRemindersUseCase {
    type Response = Vec<Reminder>;

    type Error = UseCaseError;

    const NAME: &'static str = "PollReminders";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .reminders
            .claim_due(
                Some(&self.owner_id),
                ctx.sys.get_timestamp_millis(),
                ctx.config.delivery_batch_size,
            )
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}

impl PermissionBoundary for PollRemindersUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::ReceiveReminders]
    }
}
