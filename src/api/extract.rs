//! Request extractors whose rejections answer like every other error.
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies (and `422` for JSON that
//! parses but does not fit the target type). These wrappers turn every rejection into
//! [`Error::Validation`], so malformed input gets a `400` with a `{"message"}` body.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

/// JSON request body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

/// Query string parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::{body::Body, http};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Amount {
        value: i32,
    }

    #[tokio::test]
    async fn test_json_rejection_is_validation() {
        let request = http::Request::builder()
            .header("content-type", "application/json")
            .body(Body::from(r#"{"value":"ten"}"#))
            .unwrap();
        let result = ApiJson::<Amount>::from_request(request, &()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation() {
        let request = http::Request::builder().body(Body::from(r#"{"value":1}"#)).unwrap();
        let result = ApiJson::<Amount>::from_request(request, &()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_query_parses_and_rejects() {
        let (mut parts, ()) = http::Request::builder()
            .uri("/x?value=3")
            .body(())
            .unwrap()
            .into_parts();
        let ApiQuery(amount) = ApiQuery::<Amount>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(amount.value, 3);

        let (mut parts, ()) = http::Request::builder()
            .uri("/x?value=three")
            .body(())
            .unwrap()
            .into_parts();
        let result = ApiQuery::<Amount>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }
}
