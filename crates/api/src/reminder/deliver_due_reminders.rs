use crate::shared::usecase::UseCase;
use actix_web::rt::time::sleep;
use awc::Client;
use std::{collections::HashMap, time::Duration};
use tickler_api_structs::{dtos::ReminderDTO, reminders_webhook::RequestBody};
use tickler_domain::{Reminder, ReminderNotification, ID};
use tickler_infra::{TicklerContext, WebhookConfig};
use tracing::{error, info, warn};

/// Pushes newly due `Reminder`s to their owners.
///
/// Owners with an open session get them over the stream. What is left goes to
/// the webhook when one is configured. Claims that could not be delivered are
/// released so that the next run, or a poll, picks them up again.
#[derive(Debug)]
pub struct DeliverDueRemindersUseCase;

#[derive(Debug, Default, PartialEq)]
pub struct DeliveryReport {
    pub sent_to_sessions: usize,
    pub sent_to_webhook: usize,
    pub released: usize,
}

#[derive(Debug)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeliverDueRemindersUseCase {
    type Response = DeliveryReport;

    type Error = UseCaseError;

    const NAME: &'static str = "DeliverDueReminders";

    async fn execute(&mut self, ctx: &TicklerContext) -> Result<Self::Response, Self::Error> {
        let mut report = DeliveryReport::default();
        deliver_to_sessions(ctx, &mut report).await?;
        if let Some(webhook) = &ctx.config.webhook {
            deliver_to_webhook(webhook, ctx, &mut report).await?;
        }
        Ok(report)
    }
}

async fn release(
    reminders: &[Reminder],
    ctx: &TicklerContext,
    report: &mut DeliveryReport,
) -> Result<(), UseCaseError> {
    if reminders.is_empty() {
        return Ok(());
    }
    ctx.repos
        .reminders
        .release_claims(reminders)
        .await
        .map_err(|e| {
            error!("Unable to release reminder claims: {:?}", e);
            UseCaseError::StorageError
        })?;
    report.released += reminders.len();
    Ok(())
}

async fn deliver_to_sessions(
    ctx: &TicklerContext,
    report: &mut DeliveryReport,
) -> Result<(), UseCaseError> {
    let now = ctx.sys.get_timestamp_millis();
    for owner_id in ctx.hub.active_owners() {
        let claimed = ctx
            .repos
            .reminders
            .claim_due(Some(&owner_id), now, ctx.config.delivery_batch_size)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let mut undelivered = Vec::new();
        for reminder in claimed {
            let receivers = ctx
                .hub
                .publish(&owner_id, ReminderNotification::Due(reminder.clone()));
            if receivers > 0 {
                report.sent_to_sessions += 1;
            } else {
                // The last session closed after the owner was looked up
                undelivered.push(reminder);
            }
        }
        release(&undelivered, ctx, report).await?;
    }
    Ok(())
}

async fn deliver_to_webhook(
    webhook: &WebhookConfig,
    ctx: &TicklerContext,
    report: &mut DeliveryReport,
) -> Result<(), UseCaseError> {
    let now = ctx.sys.get_timestamp_millis();
    let claimed = ctx
        .repos
        .reminders
        .claim_due(None, now, ctx.config.delivery_batch_size)
        .await
        .map_err(|_| UseCaseError::StorageError)?;
    if claimed.is_empty() {
        return Ok(());
    }

    let mut reminders_by_owner: HashMap<ID, Vec<Reminder>> = HashMap::new();
    for reminder in claimed {
        reminders_by_owner
            .entry(reminder.owner_id.clone())
            .or_default()
            .push(reminder);
    }

    let client = Client::new();
    for (owner_id, reminders) in reminders_by_owner {
        let body = RequestBody {
            owner_id,
            reminders: reminders.iter().cloned().map(ReminderDTO::new).collect(),
        };
        let delivered = post_with_retries(
            &client,
            webhook,
            &body,
            ctx.config.webhook_max_attempts,
            ctx.config.webhook_initial_backoff_millis,
        )
        .await;
        if delivered {
            report.sent_to_webhook += reminders.len();
        } else {
            error!(
                "Giving up on webhook delivery of {} reminders for owner {}",
                reminders.len(),
                body.owner_id
            );
            release(&reminders, ctx, report).await?;
        }
    }
    Ok(())
}

/// Posts the body until the receiver answers with a success status. The wait
/// between attempts doubles after every failure.
async fn post_with_retries(
    client: &Client,
    webhook: &WebhookConfig,
    body: &RequestBody,
    max_attempts: u32,
    initial_backoff_millis: u64,
) -> bool {
    let max_attempts = max_attempts.max(1);
    let mut backoff = Duration::from_millis(initial_backoff_millis);
    for attempt in 1..=max_attempts {
        match client
            .post(webhook.url.as_str())
            .insert_header(("tickler-webhook-key", webhook.key.as_str()))
            .send_json(body)
            .await
        {
            Ok(res) if res.status().is_success() => {
                info!(
                    "Sent {} due reminders of owner {} to the webhook",
                    body.reminders.len(),
                    body.owner_id
                );
                return true;
            }
            Ok(res) => warn!(
                "Webhook answered with status {} on attempt {}/{}",
                res.status(),
                attempt,
                max_attempts
            ),
            Err(e) => warn!(
                "Webhook request failed on attempt {}/{}: {}",
                attempt, max_attempts, e
            ),
        }
        if attempt < max_attempts {
            sleep(backoff).await;
            backoff *= 2;
        }
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_helpers::{insert_reminder, setup};
    use crate::shared::usecase::execute;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use std::net::TcpListener;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[actix_web::main]
    #[test]
    async fn pushes_due_reminders_to_open_sessions() {
        let (ctx, sys) = setup(0);
        let owner = ID::default();
        let reminder = insert_reminder(&ctx, &owner, 1000).await;
        let offline_owner = ID::default();
        let offline = insert_reminder(&ctx, &offline_owner, 1000).await;
        let mut session = ctx.hub.subscribe(&owner);

        sys.set(2000);
        let report = execute(DeliverDueRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(report.sent_to_sessions, 1);
        assert!(matches!(
            session.try_recv(),
            Ok(ReminderNotification::Due(r)) if r.id == reminder.id
        ));

        // Nothing new the second time
        let report = execute(DeliverDueRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(report, DeliveryReport::default());

        // Without a session or webhook the reminder stays claimable by polling
        let polled = ctx
            .repos
            .reminders
            .claim_due(Some(&offline_owner), 2000, 10)
            .await
            .unwrap();
        assert_eq!(polled.len(), 1);
        assert_eq!(polled[0].id, offline.id);
    }

    #[actix_web::main]
    #[test]
    async fn releases_claims_when_webhook_keeps_failing() {
        let (mut ctx, sys) = setup(0);
        // Nothing listens on port 9
        ctx.config.webhook = Some(WebhookConfig {
            url: "http://127.0.0.1:9/reminders".into(),
            key: "whk_test".into(),
        });
        ctx.config.webhook_max_attempts = 2;
        ctx.config.webhook_initial_backoff_millis = 1;
        let owner = ID::default();
        insert_reminder(&ctx, &owner, 1000).await;

        sys.set(2000);
        let report = execute(DeliverDueRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(report.sent_to_webhook, 0);
        assert_eq!(report.released, 1);

        let claimable = ctx
            .repos
            .reminders
            .claim_due(Some(&owner), 2000, 10)
            .await
            .unwrap();
        assert_eq!(claimable.len(), 1);
    }

    async fn receive_webhook(
        req: HttpRequest,
        body: web::Json<serde_json::Value>,
        received: web::Data<Arc<AtomicUsize>>,
    ) -> HttpResponse {
        let key = req
            .headers()
            .get("tickler-webhook-key")
            .and_then(|key| key.to_str().ok());
        if key != Some("whk_test") {
            return HttpResponse::Unauthorized().finish();
        }
        let count = body["reminders"].as_array().map(|r| r.len()).unwrap_or(0);
        received.fetch_add(count, Ordering::SeqCst);
        HttpResponse::Ok().finish()
    }

    #[actix_web::main]
    #[test]
    async fn sends_due_reminders_to_webhook() {
        let received = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let data = received.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(data.clone()))
                .route("/reminders", web::post().to(receive_webhook))
        })
        .listen(listener)
        .unwrap()
        .workers(1)
        .run();
        actix_web::rt::spawn(server);

        let (mut ctx, sys) = setup(0);
        ctx.config.webhook = Some(WebhookConfig {
            url: format!("http://127.0.0.1:{}/reminders", port),
            key: "whk_test".into(),
        });
        let first_owner = ID::default();
        let second_owner = ID::default();
        insert_reminder(&ctx, &first_owner, 1000).await;
        insert_reminder(&ctx, &first_owner, 1500).await;
        insert_reminder(&ctx, &second_owner, 1000).await;
        insert_reminder(&ctx, &second_owner, 9000).await;

        sys.set(2000);
        let report = execute(DeliverDueRemindersUseCase, &ctx).await.unwrap();
        assert_eq!(report.sent_to_webhook, 3);
        assert_eq!(report.released, 0);
        assert_eq!(received.load(Ordering::SeqCst), 3);
    }
}
