use crate::error::TicklerError;
use crate::shared::{
    auth::{protect_stream_route, Permission},
    usecase::{execute_with_policy, PermissionBoundary, UseCase},
};
use actix_web::{
    http::header,
    rt::time::{interval_at, Instant, Interval},
    web::{self, Bytes},
    HttpResponse,
};
use futures::{stream, Stream};
use std::{convert::Infallible, time::Duration};
use tickler_api_structs::{dtos::ReminderNotificationDTO, stream_reminders::*};
use tickler_domain::{ReminderNotification, ID};
use tickler_infra::TicklerContext;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, warn};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub async fn stream_reminders_controller(
    http_req: actix_web::HttpRequest,
    query: web::Query<QueryParams>,
    ctx: web::Data<TicklerContext>,
) -> Result<HttpResponse, TicklerError> {
    let (user_id, policy) = protect_stream_route(&http_req, query.token.as_deref(), &ctx)?;

    let usecase = StreamRemindersUseCase { owner_id: user_id };

    execute_with_policy(usecase, &policy, &ctx)
        .await
        .map(|receiver| {
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .insert_header((header::CACHE_CONTROL, "no-cache"))
                .streaming(notification_stream(receiver, KEEP_ALIVE_INTERVAL))
        })
        .map_err(TicklerError::from)
}

/// Opens a notification session for the owner. Due reminders are pushed to
/// the session by the delivery job.
#[derive(Debug)]
pub struct StreamRemindersUseCase {
    pub owner_id: ID,
}

#[derive(Debug)]
pub enum UseCaseError {}

impl From<UseCaseError> for TicklerError {
    fn from(e: UseCaseError) -> Self {
        match e {}
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for StreamRemindersUseCase {
    type Response = broadcast::Receiver<ReminderNotification>;

    type Error = UseCaseError;

    const NAME: &'static str = "StreamReminders";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        Ok(ctx.hub.subscribe(&self.owner_id))
    }
}

impl PermissionBoundary for StreamRemindersUseCase {
    fn permissions(&self) -> Vec<Permission> {
        vec![Permission::ReceiveReminders]
    }
}

/// Server sent event frame for one notification
fn encode_frame(notification: ReminderNotification) -> Option<Bytes> {
    let event = notification.name();
    match serde_json::to_string(&ReminderNotificationDTO::new(notification)) {
        Ok(data) => Some(Bytes::from(format!("event: {}\ndata: {}\n\n", event, data))),
        Err(e) => {
            error!("Unable to serialize reminder notification: {:?}", e);
            None
        }
    }
}

struct Session {
    receiver: broadcast::Receiver<ReminderNotification>,
    keep_alive: Interval,
    opened: bool,
}

/// Turns the session into an endless stream of frames. Sessions that fall
/// behind skip the notifications they missed.
fn notification_stream(
    receiver: broadcast::Receiver<ReminderNotification>,
    keep_alive: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let session = Session {
        receiver,
        keep_alive: interval_at(Instant::now() + keep_alive, keep_alive),
        opened: false,
    };

    stream::unfold(session, |mut session| async move {
        if !session.opened {
            session.opened = true;
            return Some((Ok(Bytes::from_static(b": connected\n\n")), session));
        }
        loop {
            tokio::select! {
                res = session.receiver.recv() => match res {
                    Ok(notification) => {
                        if let Some(frame) = encode_frame(notification) {
                            return Some((Ok(frame), session));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Reminder session lagged behind and skipped {} notifications", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                },
                _ = session.keep_alive.tick() => {
                    return Some((Ok(Bytes::from_static(b": keep-alive\n\n")), session));
                }
            }
        }
    })
}
