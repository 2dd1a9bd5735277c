use crate::base::{APIError, APIErrorVariant, APIResponse, BaseClient};
use crate::ReminderNotificationDTO;
use reqwest::{Response, StatusCode};
use std::sync::Arc;
use tickler_api_structs::*;
use tickler_domain::{ReminderKind, ReminderPriority, ReminderStatusKind, ID};

#[derive(Clone)]
pub struct ReminderClient {
    base: Arc<BaseClient>,
}

pub struct CreateReminderInput {
    pub note: String,
    pub remind_at: i64,
    pub priority: Option<ReminderPriority>,
    pub kind: Option<ReminderKind>,
    pub client_id: Option<ID>,
    pub lead_id: Option<ID>,
}

#[derive(Default)]
pub struct GetRemindersInput {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub status: Option<ReminderStatusKind>,
}

pub struct UpdateReminderInput {
    pub reminder_id: ID,
    pub note: Option<String>,
    pub remind_at: Option<i64>,
    pub priority: Option<ReminderPriority>,
    pub kind: Option<ReminderKind>,
    pub client_id: Option<ID>,
    pub lead_id: Option<ID>,
    pub unlink: Option<bool>,
    pub version: Option<i64>,
}

pub struct SnoozeReminderInput {
    pub reminder_id: ID,
    pub until: i64,
    pub version: Option<i64>,
}

impl ReminderClient {
    pub(crate) fn new(base: Arc<BaseClient>) -> Self {
        Self { base }
    }

    pub async fn create(
        &self,
        input: CreateReminderInput,
    ) -> APIResponse<create_reminder::APIResponse> {
        let body = create_reminder::RequestBody {
            note: input.note,
            remind_at: input.remind_at,
            priority: input.priority,
            kind: input.kind,
            client_id: input.client_id,
            lead_id: input.lead_id,
        };
        self.base
            .post(body, "reminders".into(), StatusCode::CREATED)
            .await
    }

    pub async fn get(&self, reminder_id: ID) -> APIResponse<get_reminder::APIResponse> {
        self.base
            .get(format!("reminders/{}", reminder_id), StatusCode::OK)
            .await
    }

    pub async fn list(&self, input: GetRemindersInput) -> APIResponse<get_reminders::APIResponse> {
        let query = get_reminders::QueryParams {
            page: input.page,
            limit: input.limit,
            status: input.status,
        };
        self.base
            .get_with_query(&query, "reminders".into(), StatusCode::OK)
            .await
    }

    pub async fn update(
        &self,
        input: UpdateReminderInput,
    ) -> APIResponse<update_reminder::APIResponse> {
        let body = update_reminder::RequestBody {
            note: input.note,
            remind_at: input.remind_at,
            priority: input.priority,
            kind: input.kind,
            client_id: input.client_id,
            lead_id: input.lead_id,
            unlink: input.unlink,
            version: input.version,
        };
        self.base
            .put(
                body,
                format!("reminders/{}", input.reminder_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn mark_done(
        &self,
        reminder_id: ID,
        version: Option<i64>,
    ) -> APIResponse<mark_reminder_done::APIResponse> {
        self.base
            .patch(
                VersionedRequestBody { version },
                format!("reminders/{}/done", reminder_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn snooze(
        &self,
        input: SnoozeReminderInput,
    ) -> APIResponse<snooze_reminder::APIResponse> {
        let body = snooze_reminder::RequestBody {
            until: input.until,
            version: input.version,
        };
        self.base
            .patch(
                body,
                format!("reminders/{}/snooze", input.reminder_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn dismiss(
        &self,
        reminder_id: ID,
        version: Option<i64>,
    ) -> APIResponse<dismiss_reminder::APIResponse> {
        self.base
            .patch(
                VersionedRequestBody { version },
                format!("reminders/{}/dismiss", reminder_id),
                StatusCode::OK,
            )
            .await
    }

    pub async fn delete(&self, reminder_id: ID) -> APIResponse<delete_reminder::APIResponse> {
        self.base
            .delete(format!("reminders/{}", reminder_id), StatusCode::OK)
            .await
    }

    /// Everything that is currently due, without claiming anything
    pub async fn due(&self) -> APIResponse<get_due_reminders::APIResponse> {
        self.base
            .get("reminders/due".into(), StatusCode::OK)
            .await
    }

    /// Only the `Reminder`s that became due since the last poll
    pub async fn poll(&self) -> APIResponse<poll_reminders::APIResponse> {
        self.base
            .post((), "reminders/poll".into(), StatusCode::OK)
            .await
    }

    pub async fn stats(&self) -> APIResponse<get_reminder_stats::APIResponse> {
        self.base
            .get("reminders/stats".into(), StatusCode::OK)
            .await
    }

    pub async fn changes(
        &self,
        since: Option<i64>,
    ) -> APIResponse<get_reminder_changes::APIResponse> {
        let query = get_reminder_changes::QueryParams { since };
        self.base
            .get_with_query(&query, "reminders/changes".into(), StatusCode::OK)
            .await
    }

    pub async fn stream(&self) -> APIResponse<ReminderStream> {
        let res = self.base.open_stream("reminders/stream".into()).await?;
        Ok(ReminderStream {
            res,
            frames: FrameBuffer::default(),
        })
    }
}

/// Open server sent event stream of `Reminder` notifications
pub struct ReminderStream {
    res: Response,
    frames: FrameBuffer,
}

impl ReminderStream {
    /// Waits for the next notification. Comments like keep-alives are skipped.
    /// Returns `None` when the server closed the stream.
    pub async fn next_notification(&mut self) -> APIResponse<Option<ReminderNotificationDTO>> {
        loop {
            while let Some(frame) = self.frames.next_frame()? {
                if let Some(notification) = parse_frame(&frame)? {
                    return Ok(Some(notification));
                }
            }

            match self.res.chunk().await {
                Ok(Some(bytes)) => self.frames.push(&bytes),
                Ok(None) => return Ok(None),
                Err(e) => {
                    return Err(APIError {
                        variant: APIErrorVariant::Network,
                        message: e.to_string(),
                        code: None,
                        retryable: true,
                    })
                }
            }
        }
    }
}

/// Raw bytes of the event stream. Chunks can end in the middle of a
/// character, so only complete frames are decoded.
#[derive(Default)]
struct FrameBuffer {
    bytes: Vec<u8>,
}

impl FrameBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn next_frame(&mut self) -> APIResponse<Option<String>> {
        let end = match self.bytes.windows(2).position(|w| w == b"\n\n") {
            Some(end) => end,
            None => return Ok(None),
        };
        let frame: Vec<u8> = self.bytes.drain(..end + 2).collect();
        String::from_utf8(frame).map(Some).map_err(|e| APIError {
            variant: APIErrorVariant::MalformedResponse,
            message: e.to_string(),
            code: None,
            retryable: false,
        })
    }
}

fn parse_frame(frame: &str) -> APIResponse<Option<ReminderNotificationDTO>> {
    let data = match frame.lines().find_map(|line| line.strip_prefix("data: ")) {
        Some(data) => data,
        None => return Ok(None),
    };
    serde_json::from_str(data).map(Some).map_err(|e| APIError {
        variant: APIErrorVariant::MalformedResponse,
        message: e.to_string(),
        code: None,
        retryable: false,
    })
}
