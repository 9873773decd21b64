//! Single-slot access-token cache over a refresh-token grant.

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use orgshare_common::{Error, RefreshError, Result, Secret};

use super::clock::{Clock, SystemClock};
use super::token::{TokenGrant, TokenRecord};
use super::{TokenSource, GOOGLE_TOKEN_URL};
use crate::http::build_client;

/// Credentials for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: Secret,
    pub refresh_token: Secret,
    /// Token endpoint receiving the grant.
    pub token_url: String,
}

impl OAuthCredentials {
    /// Credentials against Google's token endpoint.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<Secret>,
        refresh_token: impl Into<Secret>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Point the grant at another token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Check that every credential is present.
    ///
    /// # Errors
    /// - `Configuration` listing the missing fields
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.is_empty() {
            missing.push("client_secret");
        }
        if self.refresh_token.is_empty() {
            missing.push("refresh_token");
        }
        if self.token_url.trim().is_empty() {
            missing.push("token_url");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "Missing required OAuth configuration parameters: {}",
                missing.join(", ")
            )))
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, std::result::Result<String, RefreshError>>>;

#[derive(Default)]
struct CacheState {
    record: Option<TokenRecord>,
    /// The single outstanding refresh, shared by every waiting caller.
    in_flight: Option<SharedRefresh>,
}

/// OAuth2 access-token cache with de-duplicated refreshes.
///
/// Cloning is cheap and shares the cached slot.
#[derive(Clone)]
pub struct TokenCache {
    credentials: Arc<OAuthCredentials>,
    http: Client,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<CacheState>>,
}

impl TokenCache {
    /// Create a new token cache.
    ///
    /// # Errors
    /// - `Configuration` when a credential is missing or the HTTP client
    ///   cannot be built
    pub fn new(credentials: OAuthCredentials) -> Result<Self> {
        Self::with_clock(credentials, Arc::new(SystemClock))
    }

    /// Create a token cache reading time from `clock`.
    pub fn with_clock(credentials: OAuthCredentials, clock: Arc<dyn Clock>) -> Result<Self> {
        if let Err(e) = credentials.validate() {
            error!("Missing required OAuth configuration parameters");
            return Err(e);
        }

        let http = build_client()?;

        Ok(Self {
            credentials: Arc::new(credentials),
            http,
            clock,
            state: Arc::new(Mutex::new(CacheState::default())),
        })
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// # Postconditions
    /// - The returned token has more than the refresh buffer left
    /// - Concurrent callers during one refresh share its outcome
    ///
    /// # Errors
    /// - `Refresh` when the grant fails; the next call tries again
    pub async fn get_valid_token(&self) -> Result<String> {
        let refresh = {
            let mut state = self.state.lock().await;

            if let Some(record) = &state.record {
                if record.is_usable(self.clock.now()) {
                    debug!("Using cached token");
                    return Ok(record.access_token.clone());
                }
            }

            match state.in_flight.clone() {
                Some(refresh) => {
                    debug!("Waiting for in-progress token refresh");
                    refresh
                }
                None => {
                    let refresh = self.start_refresh();
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await.map_err(Error::from)
    }

    /// Drop the cached token so the next call refreshes.
    pub async fn invalidate(&self) {
        info!("Invalidating current token");
        self.state.lock().await.record = None;
    }

    /// Expiry of the cached token, if one is cached.
    pub async fn cached_expiry(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.state.lock().await.record.as_ref().map(|r| r.expires_at)
    }

    fn start_refresh(&self) -> SharedRefresh {
        let http = self.http.clone();
        let credentials = self.credentials.clone();
        let clock = self.clock.clone();
        let state: Weak<Mutex<CacheState>> = Arc::downgrade(&self.state);

        async move {
            let result = request_grant(&http, &credentials).await;

            let Some(state) = state.upgrade() else {
                return result.map(|grant| grant.access_token);
            };
            let mut state = state.lock().await;
            state.in_flight = None;

            match result {
                Ok(grant) => {
                    let record = TokenRecord::from_grant(&grant, clock.now());
                    info!(
                        expires_in = grant.expires_in,
                        scope = grant.scope.as_deref().unwrap_or(""),
                        "Token refreshed successfully"
                    );
                    let token = record.access_token.clone();
                    state.record = Some(record);
                    Ok(token)
                }
                Err(e) => {
                    error!(status = ?e.status, error = %e.message, "Token refresh failed");
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Exchange the refresh token for a new access token.
async fn request_grant(
    http: &Client,
    credentials: &OAuthCredentials,
) -> std::result::Result<TokenGrant, RefreshError> {
    info!("Refreshing access token");

    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.expose()),
        ("refresh_token", credentials.refresh_token.expose()),
        ("grant_type", "refresh_token"),
    ];

    let response = http
        .post(&credentials.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| RefreshError {
            status: None,
            message: e.to_string(),
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| RefreshError {
        status: Some(status.as_u16()),
        message: format!("Failed to read token response: {}", e),
    })?;

    if !status.is_success() {
        return Err(RefreshError {
            status: Some(status.as_u16()),
            message: body,
        });
    }

    serde_json::from_str(&body).map_err(|e| RefreshError {
        status: Some(status.as_u16()),
        message: format!("Malformed token response: {}", e),
    })
}

#[async_trait::async_trait]
impl TokenSource for TokenCache {
    async fn token(&self) -> Result<String> {
        self.get_valid_token().await
    }

    async fn invalidate(&self) {
        TokenCache::invalidate(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::clock::ManualClock;
    use chrono::Duration;
    use std::time::Duration as StdDuration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(server: &MockServer) -> OAuthCredentials {
        OAuthCredentials::new("client-id", "client-secret", "refresh-token")
            .with_token_url(format!("{}/token", server.uri()))
    }

    fn grant_body(token: &str, expires_in: i64) -> serde_json::Value {
        serde_json::json!({
            "access_token": token,
            "expires_in": expires_in,
            "token_type": "Bearer",
            "scope": "https://www.googleapis.com/auth/drive.file"
        })
    }

    #[test]
    fn test_missing_credentials_fail_at_construction() {
        let creds = OAuthCredentials::new("", "secret", "");
        match TokenCache::new(creds) {
            Err(Error::Configuration(msg)) => {
                assert!(msg.contains("client_id"));
                assert!(msg.contains("refresh_token"));
                assert!(!msg.contains("client_secret"));
            }
            _ => panic!("expected configuration error"),
        }
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = OAuthCredentials::new("id", "shh", "rt-value");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("rt-value"));
    }

    #[tokio::test]
    async fn test_first_call_refreshes_then_hits_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("client_secret=client-secret"))
            .and(body_string_contains("refresh_token=refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("abc", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new());
        let cache = TokenCache::with_clock(credentials(&server), clock.clone()).unwrap();

        assert_eq!(cache.get_valid_token().await.unwrap(), "abc");

        // 3600s - 600s still leaves more than the 300s buffer.
        clock.advance(Duration::minutes(10));
        assert_eq!(cache.get_valid_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_token_inside_buffer_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("short", 200)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();
        assert_eq!(cache.get_valid_token().await.unwrap(), "short");
        assert_eq!(cache.get_valid_token().await.unwrap(), "short");
    }

    #[tokio::test]
    async fn test_expiry_after_clock_advance_triggers_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("first", 3600)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("second", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new());
        let cache = TokenCache::with_clock(credentials(&server), clock.clone()).unwrap();

        assert_eq!(cache.get_valid_token().await.unwrap(), "first");
        clock.advance(Duration::minutes(56));
        assert_eq!(cache.get_valid_token().await.unwrap(), "second");
        assert_eq!(cache.get_valid_token().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_already_expired_grant_is_never_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("stale", -30)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();
        cache.get_valid_token().await.unwrap();
        cache.get_valid_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(grant_body("shared", 3600))
                    .set_delay(StdDuration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();
        let calls = (0..10).map(|_| {
            let cache = cache.clone();
            async move { cache.get_valid_token().await }
        });

        let results = futures::future::join_all(calls).await;
        assert_eq!(results.len(), 10);
        for result in results {
            assert_eq!(result.unwrap(), "shared");
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(503)
                    .set_body_string("backend unavailable")
                    .set_delay(StdDuration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();
        let calls = (0..5).map(|_| {
            let cache = cache.clone();
            async move { cache.get_valid_token().await }
        });

        for result in futures::future::join_all(calls).await {
            match result {
                Err(Error::Refresh(e)) => {
                    assert_eq!(e.status, Some(503));
                    assert_eq!(e.message, "backend unavailable");
                }
                other => panic!("expected refresh error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_is_not_sticky() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("recovered", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();

        let err = cache.get_valid_token().await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("invalid_grant"));
        assert!(cache.cached_expiry().await.is_none());

        assert_eq!(cache.get_valid_token().await.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_malformed_body_is_refresh_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();
        match cache.get_valid_token().await {
            Err(Error::Refresh(e)) => {
                assert_eq!(e.status, Some(200));
                assert!(e.message.contains("Malformed token response"));
            }
            other => panic!("expected refresh error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_has_no_status() {
        let creds = OAuthCredentials::new("id", "secret", "refresh")
            .with_token_url("http://127.0.0.1:9/token");
        let cache = TokenCache::new(creds).unwrap();

        match cache.get_valid_token().await {
            Err(Error::Refresh(e)) => assert_eq!(e.status, None),
            other => panic!("expected refresh error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("abc", 3600)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();
        cache.get_valid_token().await.unwrap();
        assert!(cache.cached_expiry().await.is_some());

        cache.invalidate().await;
        assert!(cache.cached_expiry().await.is_none());
        cache.get_valid_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_waiter_completes_refresh_when_starter_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(grant_body("survivor", 3600))
                    .set_delay(StdDuration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = TokenCache::new(credentials(&server)).unwrap();

        let starter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_valid_token().await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        let waiter = cache.get_valid_token();
        starter.abort();

        assert_eq!(waiter.await.unwrap(), "survivor");
        assert!(cache.cached_expiry().await.is_some());
    }

    #[tokio::test]
    async fn test_token_source_impl() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(grant_body("via-trait", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let source: Arc<dyn TokenSource> = Arc::new(TokenCache::new(credentials(&server)).unwrap());
        assert_eq!(source.token().await.unwrap(), "via-trait");
        assert_eq!(source.token().await.unwrap(), "via-trait");
    }
}
