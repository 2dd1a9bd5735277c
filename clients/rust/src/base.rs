use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tickler_api_structs::Envelope;

pub(crate) struct BaseClient {
    address: String,
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum APIErrorVariant {
    Network,
    MalformedResponse,
    Unauthorized,
    BadClientData,
    NotFound,
    /// Invalid status transition or stale version
    Conflict,
    UnexpectedStatusCode(StatusCode),
}

#[derive(Debug, Clone)]
pub struct APIError {
    pub variant: APIErrorVariant,
    pub message: String,
    /// Error code from the response envelope, e.g. `STALE_VERSION`
    pub code: Option<String>,
    pub retryable: bool,
}

impl APIError {
    fn new(variant: APIErrorVariant, message: impl Into<String>) -> Self {
        Self {
            variant,
            message: message.into(),
            code: None,
            retryable: false,
        }
    }
}

pub type APIResponse<T> = Result<T, APIError>;

impl BaseClient {
    pub fn new(address: String) -> Self {
        Self {
            address,
            token: None,
        }
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn get_client(&self, method: Method, path: String) -> RequestBuilder {
        let client = Client::new();
        let url = format!("{}/api/v1/{}", self.address, path);
        let builder = client.request(method, &url);

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn handle_api_response<T: for<'de> Deserialize<'de>>(
        &self,
        res: Response,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let status = res.status();
        let envelope = res.json::<Envelope<T>>().await.map_err(|_| {
            APIError::new(
                if status == expected_status_code {
                    APIErrorVariant::MalformedResponse
                } else {
                    APIErrorVariant::UnexpectedStatusCode(status)
                },
                format!("Unable to parse response with status {}", status),
            )
        })?;

        if status != expected_status_code || !envelope.success {
            let variant = match status {
                StatusCode::BAD_REQUEST => APIErrorVariant::BadClientData,
                StatusCode::UNAUTHORIZED => APIErrorVariant::Unauthorized,
                StatusCode::NOT_FOUND => APIErrorVariant::NotFound,
                StatusCode::CONFLICT => APIErrorVariant::Conflict,
                _ => APIErrorVariant::UnexpectedStatusCode(status),
            };
            return Err(APIError {
                variant,
                message: envelope.message.unwrap_or_default(),
                code: envelope.code,
                retryable: envelope.retryable.unwrap_or(false),
            });
        }

        envelope
            .data
            .ok_or_else(|| APIError::new(APIErrorVariant::MalformedResponse, "Missing data"))
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        builder: RequestBuilder,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        let res = match builder.send().await {
            Ok(res) => res,
            Err(e) => return Err(APIError::new(APIErrorVariant::Network, e.to_string())),
        };
        self.handle_api_response(res, expected_status_code).await
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(self.get_client(Method::GET, path), expected_status_code)
            .await
    }

    pub async fn get_with_query<T: for<'de> Deserialize<'de>, Q: Serialize>(
        &self,
        query: &Q,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(
            self.get_client(Method::GET, path).query(query),
            expected_status_code,
        )
        .await
    }

    pub async fn delete<T: for<'de> Deserialize<'de>>(
        &self,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(self.get_client(Method::DELETE, path), expected_status_code)
            .await
    }

    pub async fn put<T: for<'de> Deserialize<'de>, S: Serialize>(
        &self,
        body: S,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(
            self.get_client(Method::PUT, path).json(&body),
            expected_status_code,
        )
        .await
    }

    pub async fn patch<T: for<'de> Deserialize<'de>, S: Serialize>(
        &self,
        body: S,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(
            self.get_client(Method::PATCH, path).json(&body),
            expected_status_code,
        )
        .await
    }

    pub async fn post<T: for<'de> Deserialize<'de>, S: Serialize>(
        &self,
        body: S,
        path: String,
        expected_status_code: StatusCode,
    ) -> APIResponse<T> {
        self.send(
            self.get_client(Method::POST, path).json(&body),
            expected_status_code,
        )
        .await
    }

    /// Opens a long lived response that is read chunk by chunk
    pub async fn open_stream(&self, path: String) -> APIResponse<Response> {
        let res = self
            .get_client(Method::GET, path)
            .send()
            .await
            .map_err(|e| APIError::new(APIErrorVariant::Network, e.to_string()))?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            return Err(APIError::new(
                APIErrorVariant::UnexpectedStatusCode(status),
                format!("Unable to open stream, got status {}", status),
            ));
        }
        Ok(res)
    }
}
