//! Body and query extractors that reject with the error envelope
//!
//! axum's own `Json` and `Query` answer a bad request with plain text.
//! These wrappers hand the rejection to [`AppError`] instead, so clients
//! always get `{code, message, details}`.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body, rejected as a validation error
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string, rejected as a validation error
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::IdQuery;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    fn post(body: &str, content_type: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/x");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_json_rejections_become_validation_errors() {
        let ok = ValidJson::<Named>::from_request(post(r#"{"name":"a"}"#, Some("application/json")), &())
            .await
            .unwrap();
        assert_eq!(ok.0.name, "a");

        let cases = [
            post("{not json", Some("application/json")),
            post(r#"{"other":1}"#, Some("application/json")),
            post(r#"{"name":"a"}"#, None),
        ];
        for req in cases {
            let err = ValidJson::<Named>::from_request(req, &()).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_query_rejection_names_the_field() {
        let req = axum::http::Request::builder().uri("/x?id=oops").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        match ValidQuery::<IdQuery>::from_request_parts(&mut parts, &()).await {
            Err(AppError::Validation(msg)) => assert!(msg.contains("id")),
            other => panic!("unexpected: {:?}", other.map(|q| q.0.id)),
        }

        let req = axum::http::Request::builder().uri("/x?id=7").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let ValidQuery(query) = ValidQuery::<IdQuery>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(query.id, 7);
    }
}
