//! Extractors whose rejections become `GameError::Validation`, so malformed
//! input gets the same JSON error body as every other failure.

use std::future::Future;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, OptionalFromRequest, Path, Query, Request,
    },
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::GameError;

/// JSON request body
pub struct ApiJson<T>(pub T);

/// Query string parameters
pub struct ApiQuery<T>(pub T);

/// Path parameters
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for GameError {
    fn from(rejection: JsonRejection) -> Self {
        GameError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for GameError {
    fn from(rejection: QueryRejection) -> Self {
        GameError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for GameError {
    fn from(rejection: PathRejection) -> Self {
        GameError::Validation(rejection.body_text())
    }
}

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GameError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

/// A request without a content type carries no body: `None`
impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = GameError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl Future<Output = Result<Option<Self>, Self::Rejection>> + Send {
        let has_body = req.headers().contains_key(header::CONTENT_TYPE);

        async move {
            if !has_body {
                return Ok(None);
            }
            <Self as FromRequest<S>>::from_request(req, state)
                .await
                .map(Some)
        }
    }
}

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = GameError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = Query::<T>::try_from_uri(&parts.uri)
            .map(|Query(value)| Self(value))
            .map_err(GameError::from);

        async move { result }
    }
}

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = GameError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
            Ok(Self(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request as HttpRequest};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Limit {
        limit: Option<i64>,
    }

    fn parts(uri: &str) -> Parts {
        HttpRequest::builder()
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_query_rejection_is_validation_error() {
        let mut ok = parts("/api/leaderboard?limit=5");
        let ApiQuery(query) = ApiQuery::<Limit>::from_request_parts(&mut ok, &())
            .await
            .unwrap();
        assert_eq!(query.limit, Some(5));

        let mut bad = parts("/api/leaderboard?limit=lots");
        let err = ApiQuery::<Limit>::from_request_parts(&mut bad, &())
            .await
            .err()
            .expect("malformed limit is rejected");
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[tokio::test]
    async fn test_optional_json_without_body_is_none() {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let payload = <ApiJson<Limit> as OptionalFromRequest<()>>::from_request(req, &())
            .await
            .unwrap();
        assert!(payload.is_none());

        let req = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"limit": 3}"#))
            .unwrap();
        let payload = <ApiJson<Limit> as OptionalFromRequest<()>>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(payload.map(|ApiJson(l)| l.limit), Some(Some(3)));

        let req = HttpRequest::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = <ApiJson<Limit> as OptionalFromRequest<()>>::from_request(req, &())
            .await
            .err()
            .expect("malformed body is rejected");
        assert!(matches!(err, GameError::Validation(_)));
    }
}
