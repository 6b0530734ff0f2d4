use crate::error::AppError;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
};
use serde_json::{Map, Value};

/// Raw JSON request body.
///
/// The value is handed to the service untyped so that validation can report
/// missing, null and mistyped fields individually. An empty body reads as an
/// empty object.
#[derive(Debug)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::MalformedBody(e.body_text()))?;

        if bytes.is_empty() {
            return Ok(JsonBody(Value::Object(Map::new())));
        }

        if !is_json_content_type(&content_type) {
            return Err(AppError::UnsupportedMediaType(content_type));
        }

        let value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::MalformedBody(e.to_string()))?;

        Ok(JsonBody(value))
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[test]
    fn json_content_types() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/merge-patch+json"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type(""));
    }

    #[tokio::test]
    async fn parses_json_object() {
        let JsonBody(value) = JsonBody::from_request(
            request(Some("application/json"), r#"{"username":"ann"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(value["username"], "ann");
    }

    #[tokio::test]
    async fn empty_body_is_empty_object() {
        let JsonBody(value) = JsonBody::from_request(request(None, ""), &())
            .await
            .unwrap();
        assert_eq!(value, Value::Object(Map::new()));
    }

    #[tokio::test]
    async fn rejects_wrong_media_type() {
        let err = JsonBody::from_request(request(Some("text/plain"), "x"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType(ref t) if t == "text/plain"));
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let err = JsonBody::from_request(request(Some("application/json"), "{oops"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedBody(_)));
    }
}
