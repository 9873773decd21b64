//! Shared HTTP plumbing for the Google clients.

use reqwest::{Client, Response};
use serde::Deserialize;

use orgshare_common::{Error, Result, Service};

/// Build the HTTP client every component uses.
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("orgshare/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Best human-readable message for a failed response.
///
/// Prefers Google's `{"error": {"message": ..}}` envelope, then the raw body,
/// then the status reason.
pub(crate) async fn error_message(response: Response) -> String {
    let reason = response
        .status()
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string();
    let body = response.text().await.unwrap_or_default();

    if let Some(message) = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.message)
    {
        return message;
    }
    if body.trim().is_empty() {
        reason
    } else {
        body
    }
}

/// Error for a failed API call, without an HTTP status.
pub(crate) fn transport_error(
    service: Service,
    operation: &'static str,
    target: Option<&str>,
    err: reqwest::Error,
) -> Error {
    Error::Api {
        service,
        operation,
        status: None,
        target: target.map(String::from),
        message: err.to_string(),
    }
}

/// Pass a successful response through, turn anything else into `Error::Api`.
pub(crate) async fn check(
    response: Response,
    service: Service,
    operation: &'static str,
    target: Option<&str>,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(Error::Api {
        service,
        operation,
        status: Some(status.as_u16()),
        target: target.map(String::from),
        message: error_message(response).await,
    })
}

/// Decode a successful JSON body.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: Response,
    service: Service,
    operation: &'static str,
    target: Option<&str>,
) -> Result<T> {
    response.json().await.map_err(|e| {
        let target = target.map(|t| format!(" for {}", t)).unwrap_or_default();
        Error::Serialization(format!(
            "Failed to parse {} {} response{}: {}",
            service, operation, target, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn respond(template: ResponseTemplate) -> (MockServer, Response) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(template)
            .mount(&server)
            .await;
        let response = build_client()
            .unwrap()
            .get(server.uri())
            .send()
            .await
            .unwrap();
        (server, response)
    }

    #[tokio::test]
    async fn test_error_message_prefers_envelope() {
        let (_server, response) = respond(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "Rate limit exceeded" }
        })))
        .await;
        assert_eq!(error_message(response).await, "Rate limit exceeded");
    }

    #[tokio::test]
    async fn test_error_message_falls_back_to_reason() {
        let (_server, response) = respond(ResponseTemplate::new(502)).await;
        assert_eq!(error_message(response).await, "Bad Gateway");
    }

    #[tokio::test]
    async fn test_check_maps_status() {
        let (_server, response) = respond(ResponseTemplate::new(404).set_body_string("gone")).await;
        let err = check(response, Service::Drive, "get_file", Some("f1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Drive get_file failed for f1 (status 404): gone");
    }

    #[tokio::test]
    async fn test_decode_malformed_body() {
        let (_server, response) = respond(ResponseTemplate::new(200).set_body_string("<html>")).await;
        let err = decode::<serde_json::Value>(response, Service::YouTube, "playlist_videos", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
