use super::Policy;
use crate::error::TicklerError;
use actix_web::HttpRequest;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tickler_domain::ID;
use tickler_infra::TicklerContext;

/// Claims of the HS256 signed json web tokens that identify a user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Expiration time (as UTC timestamp in seconds)
    pub exp: usize,
    /// Issued at (as UTC timestamp in seconds)
    pub iat: usize,
    /// Owner of every reminder the token is used on
    pub user_id: String,
    pub policy: Option<Policy>,
}

fn parse_authtoken_header(token_header_value: &str) -> String {
    token_header_value
        .replace("Bearer", "")
        .replace("bearer", "")
        .trim()
        .to_string()
}

fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let claims = decode::<Claims>(token, &decoding_key, &Validation::new(Algorithm::HS256))?.claims;

    Ok(claims)
}

fn auth_token(token: &str, ctx: &TicklerContext) -> Result<(ID, Policy), TicklerError> {
    let claims = decode_token(&ctx.config.jwt_secret, token).map_err(|e| {
        TicklerError::Unauthorized(format!("Invalid bearer token provided: {}", e))
    })?;
    let user_id = claims.user_id.parse::<ID>().map_err(|_| {
        TicklerError::Unauthorized("The token does not contain a valid userId".into())
    })?;

    Ok((user_id, claims.policy.unwrap_or_else(Policy::allow_all)))
}

/// Authenticates the user from the `Authorization` bearer token
pub fn protect_route(req: &HttpRequest, ctx: &TicklerContext) -> Result<(ID, Policy), TicklerError> {
    let token = match req.headers().get("authorization") {
        Some(token) => match token.to_str() {
            Ok(token) => parse_authtoken_header(token),
            Err(_) => {
                return Err(TicklerError::Unauthorized(
                    "Malformed authorization header provided".into(),
                ))
            }
        },
        None => {
            return Err(TicklerError::Unauthorized(
                "Unable to find bearer token in authorization header".into(),
            ))
        }
    };

    auth_token(&token, ctx)
}

/// Like `protect_route` but also accepts the token as a query parameter, as
/// browsers can not set headers on an `EventSource`
pub fn protect_stream_route(
    req: &HttpRequest,
    query_token: Option<&str>,
    ctx: &TicklerContext,
) -> Result<(ID, Policy), TicklerError> {
    match query_token {
        Some(token) if req.headers().get("authorization").is_none() => auth_token(token, ctx),
        _ => protect_route(req, ctx),
    }
}
