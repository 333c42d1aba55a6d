//! HTTP client for the presence service.
//!
//! Wraps the service's session and lookup endpoints:
//! - `GET /v1/session` verifies the API token and returns the account
//! - `DELETE /v1/session` ends the session
//! - `GET /v1/users/resolve?phone=...|user_id=...` returns the entity and its status
//!
//! [`PresenceClient`] implements [`PresenceResolver`], mapping HTTP 404 to
//! [`ResolveError::NotFound`] and every other failure to
//! [`ResolveError::Transient`].

mod wire;

use std::fmt;
use std::time::Duration;

use pt_core::{Identifier, PresenceResolver, RawPresenceRecord, ResolveError};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::wire::WireEntity;

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Presence service client errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The provided API token was invalid.
    #[error("invalid API token: {reason}")]
    InvalidToken { reason: &'static str },
    /// The service URL is not an http(s) URL.
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The service rejected the credentials.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    /// The identifier did not resolve.
    #[error("not found: {0}")]
    NotFound(String),
    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<RemoteError> for ResolveError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(what) => Self::NotFound(what),
            other => Self::Transient(other.to_string()),
        }
    }
}

/// The authenticated account, as returned by `open`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Presence service client.
///
/// Safe to share by reference; the underlying HTTP connection pool is reused
/// across lookups.
pub struct PresenceClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl fmt::Debug for PresenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PresenceClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, the URL is
    /// not http(s), or the HTTP client fails to build.
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(RemoteError::InvalidToken {
                reason: "API token cannot be empty",
            });
        }
        if api_token.trim().is_empty() {
            return Err(RemoteError::InvalidToken {
                reason: "API token cannot be whitespace-only",
            });
        }

        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(RemoteError::InvalidUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verifies the credentials and returns the authenticated account.
    pub async fn open(&self) -> Result<Account, RemoteError> {
        let response = self
            .http
            .get(format!("{}/v1/session", self.base_url))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let body = read_success(response).await?;
        let account: Account = serde_json::from_str(&body)
            .map_err(|err| RemoteError::InvalidResponse(err.to_string()))?;
        tracing::debug!(account_id = account.id, "presence session opened");
        Ok(account)
    }

    /// Ends the session on the service side.
    pub async fn close(&self) -> Result<(), RemoteError> {
        let response = self
            .http
            .delete(format!("{}/v1/session", self.base_url))
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        read_success(response).await?;
        tracing::debug!("presence session closed");
        Ok(())
    }

    /// Looks up the entity behind `identifier` and its current status.
    pub async fn lookup(&self, identifier: &Identifier) -> Result<RawPresenceRecord, RemoteError> {
        let request = self
            .http
            .get(format!("{}/v1/users/resolve", self.base_url))
            .bearer_auth(&self.api_token);
        let request = match identifier {
            Identifier::Phone(phone) => request.query(&[("phone", phone.as_str())]),
            Identifier::UserId(id) => request.query(&[("user_id", id)]),
        };

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(identifier.to_string()));
        }
        let body = read_success(response).await?;
        let entity: WireEntity = serde_json::from_str(&body)
            .map_err(|err| RemoteError::InvalidResponse(err.to_string()))?;
        Ok(entity.into())
    }
}

impl PresenceResolver for PresenceClient {
    async fn resolve(&self, identifier: &Identifier) -> Result<RawPresenceRecord, ResolveError> {
        self.lookup(identifier).await.map_err(ResolveError::from)
    }
}

/// Returns the body of a 2xx response, or the mapped error.
async fn read_success(response: reqwest::Response) -> Result<String, RemoteError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    let message = parse_api_error(&body).unwrap_or_else(|| body.clone());
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RemoteError::Unauthorized { message });
    }
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pt_core::{EntityKind, RawStatus};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves a single canned HTTP response and returns the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn client(base_url: &str) -> PresenceClient {
        PresenceClient::new(base_url, "test-token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn client_rejects_empty_token() {
        assert!(matches!(
            PresenceClient::new("https://presence.example", "", DEFAULT_TIMEOUT),
            Err(RemoteError::InvalidToken { .. })
        ));
    }

    #[test]
    fn client_rejects_whitespace_token() {
        assert!(matches!(
            PresenceClient::new("https://presence.example", "   ", DEFAULT_TIMEOUT),
            Err(RemoteError::InvalidToken { .. })
        ));
    }

    #[test]
    fn client_rejects_non_http_url() {
        assert!(matches!(
            PresenceClient::new("ftp://presence.example", "token", DEFAULT_TIMEOUT),
            Err(RemoteError::InvalidUrl(_))
        ));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = client("https://presence.example/");
        assert_eq!(client.base_url(), "https://presence.example");
    }

    #[test]
    fn client_debug_redacts_token() {
        let debug = format!("{:?}", client("https://presence.example"));
        assert!(!debug.contains("test-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn not_found_maps_to_resolve_not_found() {
        let err: ResolveError = RemoteError::NotFound("42".to_string()).into();
        assert_eq!(err, ResolveError::NotFound("42".to_string()));
    }

    #[test]
    fn other_errors_map_to_transient() {
        let err: ResolveError = RemoteError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        }
        .into();
        assert!(matches!(err, ResolveError::Transient(msg) if msg.contains("bad gateway")));
    }

    #[test]
    fn parse_api_error_reads_message() {
        assert_eq!(
            parse_api_error(r#"{"error":{"message":"flood wait"}}"#).as_deref(),
            Some("flood wait")
        );
        assert_eq!(parse_api_error("oops"), None);
    }

    #[tokio::test]
    async fn resolve_by_user_id_sends_query_and_token() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"kind":"user","id":42,"first_name":"Ada","status":{"type":"recently"}}"#,
        )
        .await;

        let record = client(&url)
            .resolve(&Identifier::UserId(42))
            .await
            .unwrap();
        assert_eq!(record.entity, EntityKind::User);
        assert_eq!(record.user_id, Some(42));
        assert_eq!(record.status, RawStatus::Recently);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /v1/users/resolve?user_id=42 "), "{request}");
        assert!(request.contains("authorization: bearer test-token"), "{request}");
    }

    #[tokio::test]
    async fn resolve_by_phone_encodes_plus() {
        let (url, server) = serve_once("200 OK", r#"{"id":1}"#).await;

        client(&url)
            .resolve(&Identifier::Phone("+15551234567".to_string()))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.contains("phone=%2B15551234567"), "{request}");
    }

    #[tokio::test]
    async fn resolve_404_is_not_found() {
        let (url, _server) = serve_once("404 Not Found", r#"{"error":{"message":"no such user"}}"#).await;

        let err = client(&url)
            .resolve(&Identifier::UserId(7))
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::NotFound("7".to_string()));
    }

    #[tokio::test]
    async fn resolve_server_error_is_transient() {
        let (url, _server) = serve_once("503 Service Unavailable", r#"{"error":{"message":"maintenance"}}"#).await;

        let err = client(&url)
            .resolve(&Identifier::UserId(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Transient(msg) if msg.contains("maintenance")));
    }

    #[tokio::test]
    async fn open_returns_account() {
        let (url, _server) = serve_once("200 OK", r#"{"id":1001,"username":"tracker"}"#).await;

        let account = client(&url).open().await.unwrap();
        assert_eq!(
            account,
            Account {
                id: 1001,
                username: Some("tracker".to_string())
            }
        );
    }

    #[tokio::test]
    async fn open_with_bad_token_is_unauthorized() {
        let (url, _server) = serve_once("401 Unauthorized", r#"{"error":{"message":"bad token"}}"#).await;

        let err = client(&url).open().await.unwrap_err();
        assert!(matches!(err, RemoteError::Unauthorized { message } if message == "bad token"));
    }
}
