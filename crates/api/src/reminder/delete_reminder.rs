use super::{find_owned_reminder, subscribers::NotifyOnReminderDeleted};
use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, Subscriber, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{delete_reminder::*, Envelope};
use tickler_domain::{Reminder, ID};
use tickler_infra::TicklerContext;

pub async fn delete_reminder_controller(
    http_req: actix_web::HttpRequest,
    path: web::Path<PathParams>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_route(&http_req, &ctx)?;

    let usecase = DeleteReminderUseCase {
        owner_id: user_id,
        reminder_id: path.reminder_id.clone(),
    };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|reminder| {
            HttpResponse::Ok().json(
                Envelope::ok(APIResponse::new(reminder)).with_message("Reminder deleted"),
            )
        })
        .map_err(TicklerError::from)
}

#[derive(Debug)]
pub struct DeleteReminderUseCase {
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
impl UseCase for DeleteReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "DeleteReminder";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let reminder = find_owned_reminder(&self.reminder_id, &self.owner_id, ctx)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))?;

        ctx.repos
            .reminders
            .delete(&reminder.id, ctx.sys.get_timestamp_millis())
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(NotifyOnReminderDeleted)]
    }
}

impl PermissionBoundary for DeleteReminderUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::DeleteReminder]
    }
}
