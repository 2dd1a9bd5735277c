use super::find_owned_reminder;
use crate::error::TicklerError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{get_reminder::*, Envelope};
use tickler_domain::{Reminder, ID};
use tickler_infra::TicklerContext;

pub async fn get_reminder_controller(
    http_req: actix_web::HttpRequest,
    path: web::Path<PathParams>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, _policy) = protect_route(&http_req, &ctx)?;

    let usecase = GetReminderUseCase {
        owner_id: user_id,
        reminder_id: path.reminder_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(Envelope::ok(APIResponse::new(reminder))))
        .map_err(TicklerError::from)
}

#[derive(Debug)]
pub struct GetReminderUseCase {
    pub owner_id: ID,
    pub reminder_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {
    NotFound(ID),
}

impl From<UseCaseError> for TicklerError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(reminder_id) => Self::NotFound(format!(
                "The reminder with id: {}, was not found.",
                reminder_id
            )),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "GetReminder";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        find_owned_reminder(&self.reminder_id, &self.owner_id, ctx)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))
    }
}
