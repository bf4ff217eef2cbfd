use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

/// JSON extractor that runs `validator` rules before the handler sees
/// the payload.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            let body = json!({ "error": format!("Json parse error: {}", e) });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        })?;

        value.validate().map_err(|e| {
            let body = json!({ "error": format!("Validation error: {}", e) });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        })?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[derive(serde::Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 3))]
        name: String,
    }

    fn json_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn rejection_status(body: &str) -> StatusCode {
        match ValidatedJson::<Payload>::from_request(json_request(body), &()).await {
            Ok(_) => panic!("expected a rejection"),
            Err(rejection) => rejection.status(),
        }
    }

    #[tokio::test]
    async fn valid_payload_passes_through() {
        match ValidatedJson::<Payload>::from_request(json_request(r#"{"name":"abc"}"#), &()).await
        {
            Ok(ValidatedJson(payload)) => assert_eq!(payload.name, "abc"),
            Err(_) => panic!("expected the payload to pass"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_400() {
        assert_eq!(rejection_status("{").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_validation_is_a_422() {
        assert_eq!(
            rejection_status(r#"{"name":"ab"}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
