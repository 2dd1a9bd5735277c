use actix_web::{http::StatusCode, HttpResponse};
use thiserror::Error;
use tickler_api_structs::Envelope;

#[derive(Error, Debug)]
pub enum TicklerError {
    #[error("Internal server error")]
    InternalError,
    #[error("Invalid data provided: Error message: `{0}`")]
    BadClientData(String),
    #[error("Unauthorized request. Error message: `{0}`")]
    Unauthorized(String),
    #[error("404 Not found. Error message: `{0}`")]
    NotFound(String),
    #[error("The requested status change is not allowed. Error message: `{0}`")]
    InvalidTransition(String),
    #[error("The reminder was changed by someone else. Reload it and try again.")]
    StaleVersion,
}

impl TicklerError {
    /// Machine readable code sent in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::InternalError => "INTERNAL_ERROR",
            Self::BadClientData(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::StaleVersion => "STALE_VERSION",
        }
    }

    /// Only storage failures are worth retrying without changing the request
    pub fn retryable(&self) -> bool {
        matches!(self, Self::InternalError)
    }
}

impl actix_web::error::ResponseError for TicklerError {
    fn status_code(&self) -> StatusCode {
        match *self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadClientData(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) | Self::StaleVersion => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(Envelope::error(
            self.code(),
            self.to_string(),
            self.retryable(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, ResponseError};

    #[actix_web::main]
    #[test]
    async fn renders_error_envelope() {
        let res = TicklerError::StaleVersion.error_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let body = to_bytes(res.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "STALE_VERSION");
        assert_eq!(body["retryable"], false);
        assert!(body["data"].is_null());
    }

    #[test]
    fn only_internal_errors_are_retryable() {
        assert!(TicklerError::InternalError.retryable());
        assert!(!TicklerError::NotFound("".into()).retryable());
        assert!(!TicklerError::BadClientData("".into()).retryable());
        assert_eq!(
            TicklerError::InvalidTransition("".into()).status_code(),
            StatusCode::CONFLICT
        );
    }
}
