use crate::error::TicklerError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::Envelope;
use tickler_domain::{ReminderStats, ID};
use tickler_infra::TicklerContext;

pub async fn get_reminder_stats_controller(
    http_req: actix_web::HttpRequest,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, _policy) = protect_route(&http_req, &ctx)?;

    let usecase = GetReminderStatsUseCase { owner_id: user_id };

    execute(usecase, &ctx)
        .await
        .map(|stats| HttpResponse::Ok().json(Envelope::ok(stats)))
        .map_err(TicklerError::from)
}

#[derive(Debug)]
pub struct GetReminderStatsUseCase {
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
impl UseCase for GetReminderStatsUseCase {
    type Response = ReminderStats;

    type Error = UseCaseError;

    const NAME: &'static str = "GetReminderStats";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .reminders
            .stats(
                &self.owner_id,
                ctx.sys.get_timestamp_millis(),
                ctx.config.overdue_grace_millis,
            )
            .await
            .map_err(|_| UseCaseError::StorageError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_helpers::{insert_reminder, setup};

    #[actix_web::main]
    #[test]
    async fn counts_overdue_with_grace() {
        let (mut ctx, sys) = setup(0);
        let owner = ID::default();
        insert_reminder(&ctx, &owner, 1000).await;
        insert_reminder(&ctx, &owner, 5000).await;

        sys.set(3000);
        let stats = execute(
            GetReminderStatsUseCase {
                owner_id: owner.clone(),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.overdue, 1);

        ctx.config.overdue_grace_millis = 5000;
        let stats = execute(GetReminderStatsUseCase { owner_id: owner }, &ctx)
            .await
            .unwrap();
        assert_eq!(stats.overdue, 0);
    }
}
