use serde::{Deserialize, Serialize};

/// Every response body is wrapped in an `Envelope`. Failed requests carry a
/// machine readable `code` and tell the client whether retrying could help.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            retryable: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn error(code: &str, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: Some(code.to_string()),
            retryable: Some(retryable),
        }
    }
}
