use crate::error::TicklerError;
use crate::shared::{
    auth::protect_route,
    usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use tickler_api_structs::{get_reminders::*, Envelope};
use tickler_domain::{Reminder, ReminderStatusKind, ID};
use tickler_infra::{ReminderFindQuery, TicklerContext};

pub async fn get_reminders_controller(
    http_req: actix_web::HttpRequest,
    query: web::Query<QueryParams>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, _policy) = protect_route(&http_req, &ctx)?;

    let usecase = GetRemindersUseCase {
        owner_id: user_id,
        page: query.page,
        limit: query.limit,
        status: query.status,
    };

    execute(usecase, &ctx)
        .await
        .map(|res| {
            HttpResponse::Ok().json(Envelope::ok(APIResponse::new(
                res.reminders,
                res.page,
                res.limit,
                res.total,
            )))
        })
        .map_err(TicklerError::from)
}

#[derive(Debug)]
pub struct GetRemindersUseCase {
    pub owner_id: ID,
    /// Starts at 1
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<ReminderStatusKind>,
}

#[derive(Debug)]
pub struct UseCaseResponse {
    pub reminders: Vec<Reminder>,
    pub page: usize,
    pub limit: usize,
    pub total: i64,
}

#[derive(Debug)]
pub enum UseCaseError {
    InvalidPage,
    InvalidLimit(usize),
    StorageError,
}

impl From<UseCaseError> for TicklerError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidPage => {
                Self::BadClientData("The page starts at 1 and has to be in range".into())
            }
            UseCaseError::InvalidLimit(max) => {
                Self::BadClientData(format!("The limit has to be between 1 and {}", max))
            }
            UseCaseError::StorageError => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetRemindersUseCase {
    type Response = UseCaseResponse;

    type Error = UseCaseError;

    const NAME: &'static str = "GetReminders";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(UseCaseError::InvalidPage);
        }
        let limit = self.limit.unwrap_or(ctx.config.default_page_size);
        if limit == 0 || limit > ctx.config.max_page_size {
            return Err(UseCaseError::InvalidLimit(ctx.config.max_page_size));
        }

        // The offset has to fit into a postgres bigint
        let skip = (page - 1)
            .checked_mul(limit)
            .filter(|skip| i64::try_from(*skip).is_ok())
            .ok_or(UseCaseError::InvalidPage)?;

        let query = ReminderFindQuery {
            owner_id: self.owner_id.clone(),
            status: self.status,
            skip,
            limit,
        };
        let reminders = ctx
            .repos
            .reminders
            .find_by_owner(&query)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        let total = ctx
            .repos
            .reminders
            .count_by_owner(&self.owner_id, self.status)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(UseCaseResponse {
            reminders,
            page,
            limit,
            total,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_helpers::{insert_reminder, setup};

    #[actix_web::main]
    #[test]
    async fn paginates_reminders_of_owner() {
        let (ctx, _) = setup(0);
        let owner = ID::default();
        for i in 0..5 {
            insert_reminder(&ctx, &owner, 1000 * (i + 1)).await;
        }
        insert_reminder(&ctx, &ID::default(), 1000).await;

        let res = execute(
            GetRemindersUseCase {
                owner_id: owner.clone(),
                page: Some(2),
                limit: Some(2),
                status: None,
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(res.total, 5);
        assert_eq!(res.page, 2);
        assert_eq!(
            res.reminders.iter().map(|r| r.due_at).collect::<Vec<_>>(),
            vec![3000, 4000]
        );

        let res = execute(
            GetRemindersUseCase {
                owner_id: owner,
                page: None,
                limit: None,
                status: Some(ReminderStatusKind::Done),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(res.total, 0);
        assert_eq!(res.limit, ctx.config.default_page_size);
    }

    #[actix_web::main]
    #[test]
    async fn rejects_bad_paging() {
        let (ctx, _) = setup(0);
        let usecase = |page, limit| GetRemindersUseCase {
            owner_id: ID::default(),
            page,
            limit,
            status: None,
        };

        assert!(matches!(
            execute(usecase(Some(0), None), &ctx).await,
            Err(UseCaseError::InvalidPage)
        ));
        assert!(matches!(
            execute(usecase(Some(usize::MAX), Some(100)), &ctx).await,
            Err(UseCaseError::InvalidPage)
        ));
        assert!(matches!(
            execute(usecase(Some(usize::MAX / 2), Some(2)), &ctx).await,
            Err(UseCaseError::InvalidPage)
        ));
        assert!(matches!(
            execute(usecase(None, Some(0)), &ctx).await,
            Err(UseCaseError::InvalidLimit(_))
        ));
        assert!(matches!(
            execute(usecase(None, Some(ctx.config.max_page_size + 1)), &ctx).await,
            Err(UseCaseError::InvalidLimit(_))
        ));
    }
}
