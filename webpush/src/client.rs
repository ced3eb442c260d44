use reqwest::header;
use url::Url;

use crate::error::WebPushError;

/// Deliveries are held by the push service for up to a day and flagged high
/// urgency so devices wake for them.
const TTL_SECONDS: u32 = 86_400;
const URGENCY: &str = "high";

/// A fully prepared delivery: where to POST, the signed VAPID header and the
/// encrypted body.
#[derive(Debug)]
pub struct WebPushMessage {
    pub endpoint: Url,
    pub authorization: String,
    pub body: Vec<u8>,
}

/// Shared HTTP client for talking to push services. Cheap to clone, one
/// connection pool underneath.
#[derive(Debug, Clone, Default)]
pub struct WebPushClient {
    http: reqwest::Client,
}

impl WebPushClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// POSTs one encrypted message to its push service. Success means the
    /// service accepted the message for delivery, not that the device has
    /// seen it.
    #[tracing::instrument(skip(self, message), fields(endpoint = %message.endpoint))]
    pub async fn send(&self, message: WebPushMessage) -> Result<(), WebPushError> {
        let response = self
            .http
            .post(message.endpoint.clone())
            .header(header::AUTHORIZATION, &message.authorization)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_ENCODING, "aes128gcm")
            .header("TTL", TTL_SECONDS.to_string())
            .header("Urgency", URGENCY)
            .body(message.body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("push service accepted the message");
            return Ok(());
        }

        match status.as_u16() {
            // The subscription no longer exists; retrying can never succeed.
            404 | 410 => Err(WebPushError::EndpointGone(status.as_u16())),
            code => Err(WebPushError::EndpointError {
                status: code,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn message_for(server_uri: &str) -> WebPushMessage {
        WebPushMessage {
            endpoint: Url::parse(&format!("{server_uri}/push/v1/sub-1")).unwrap(),
            authorization: "vapid t=token, k=key".to_string(),
            body: vec![1, 2, 3],
        }
    }

    #[tokio::test]
    async fn accepted_delivery_reports_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/v1/sub-1"))
            .and(header("Content-Type", "application/octet-stream"))
            .and(header("Content-Encoding", "aes128gcm"))
            .and(header("TTL", "86400"))
            .and(header("Urgency", "high"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let result = WebPushClient::new().send(message_for(&server.uri())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn gone_endpoint_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let err = WebPushClient::new()
            .send(message_for(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, WebPushError::EndpointGone(410)));
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn unknown_endpoint_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = WebPushClient::new()
            .send(message_for(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, WebPushError::EndpointGone(404)));
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn push_service_failures_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("relay on fire"))
            .mount(&server)
            .await;

        let err = WebPushClient::new()
            .send(message_for(&server.uri()))
            .await
            .unwrap_err();
        match err {
            WebPushError::EndpointError { status, ref body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "relay on fire");
            }
            other => panic!("expected EndpointError, got {other:?}"),
        }
        assert!(!err.is_terminal());
    }

    #[tokio::test]
    async fn rate_limiting_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = WebPushClient::new()
            .send(message_for(&server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, WebPushError::EndpointError { status: 429, .. }));
        assert!(!err.is_terminal());
    }
}
