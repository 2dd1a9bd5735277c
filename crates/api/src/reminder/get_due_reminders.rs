use crate::error::TicklerError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{get_due_reminders::*, Envelope};
use tickler_domain::{Reminder, ID};
use tickler_infra::TicklerContext;

pub async fn get_due_reminders_controller(
    http_req: actix_web::HttpRequest,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, _policy) = protect_route(&http_req, &ctx)?;

    let usecase = GetDueRemindersUseCase { owner_id: user_id };

    execute(usecase, &ctx)
        .await
        .map(|reminders| HttpResponse::Ok().json(Envelope::ok(APIResponse::new(reminders))))
        .map_err(TicklerError::from)
}

/// Everything that is due right now, delivered or not. Does not claim anything.
#[derive(Debug)]
pub struct GetDueRemindersUseCase {
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
impl UseCase for GetDueRemindersUseCase {
    type Response = Vec<Reminder>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetDueReminders";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .reminders
            .find_due(&self.owner_id, ctx.sys.get_timestamp_millis())
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}
