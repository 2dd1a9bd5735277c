use crate::error::TicklerError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{get_reminder_changes::*, Envelope};
use tickler_domain::{Reminder, ReminderTombstone, ID};
use tickler_infra::TicklerContext;

pub async fn get_reminder_changes_controller(
    http_req: actix_web::HttpRequest,
    query: web::Query<QueryParams>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, _policy) = protect_route(&http_req, &ctx)?;

    let usecase = GetReminderChangesUseCase {
        owner_id: user_id,
        since: query.since,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(Envelope::ok(APIResponse::new(
                res.reminders,
                res.tombstones,
                res.cursor,
            )))
        })
        .map_err(TicklerError::from)
}

/// Incremental sync. Returns what changed or was deleted after the cursor and
/// the cursor to continue from.
#[derive(Debug)]
pub struct GetReminderChangesUseCase {
    pub owner_id: ID,
    pub since: Option<i64>,
}

#[derive(Debug)]
pub struct UseCaseResponse {
    pub reminders: Vec<Reminder>,
    pub tombstones: Vec<ReminderTombstone>,
    pub cursor: i64,
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
impl UseCase for GetReminderChangesUseCase {
    type Response = UseCaseResponse;

    type Error = UseCaseError;

    const NAME: &'static str = "GetReminderChanges";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let changes = ctx
            .repos
            .reminders
            .find_changes_since(&self.owner_id, self.since.unwrap_or(0))
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(UseCaseResponse {
            reminders: changes.reminders,
            tombstones: changes.tombstones,
            cursor: changes.cursor,
        })
    }
}
