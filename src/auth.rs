use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use uuid::Uuid;

use crate::{error::GameError, AppState};

const ACCESS_TOKEN_COOKIE: &str = "accessToken";
const ACCESS_TOKEN_TYPE: &str = "access";

/// Access token payload issued by the identity provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    #[serde(rename = "type", default)]
    pub token_type: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Validate an access token, returning the caller it identifies
pub fn decode_access_token(token: &str, secret: &str) -> Option<AuthenticatedUser> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .ok()?;

    if token_data
        .claims
        .token_type
        .as_deref()
        .is_some_and(|t| t != ACCESS_TOKEN_TYPE)
    {
        return None;
    }

    let user_id = token_data.claims.user_id.parse::<Uuid>().ok()?;
    Some(AuthenticatedUser {
        user_id,
        email: token_data.claims.email,
    })
}

/// Find the access token in the Authorization header, the access token
/// cookie, or a `token` query parameter, in that order
fn token_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(String::from)
        .or_else(|| {
            parts
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|h| h.to_str().ok())
                .flat_map(|cookies| cookies.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
                .map(|(_, value)| value.to_string())
        })
        .or_else(|| {
            parts
                .uri
                .query()
                .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
                .and_then(|params| {
                    params
                        .into_iter()
                        .find(|(k, _)| k == "token")
                        .map(|(_, v)| v)
                })
        })
}

/// Extractor for routes that require a signed-in caller
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = GameError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = Arc::<AppState>::from_ref(state);
        let token = token_from_parts(parts);

        async move {
            let token = token.ok_or(GameError::Unauthorized)?;
            decode_access_token(&token, &app_state.config.security.access_token_secret)
                .ok_or(GameError::Unauthorized)
        }
    }
}

/// Anonymous play is allowed: a missing or invalid token yields `None`
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Option<Self>, Self::Rejection>> + Send {
        let app_state = Arc::<AppState>::from_ref(state);
        let token = token_from_parts(parts);

        async move {
            Ok(token.and_then(|token| {
                decode_access_token(&token, &app_state.config.security.access_token_secret)
            }))
        }
    }
}
