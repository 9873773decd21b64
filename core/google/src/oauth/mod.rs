//! OAuth2 access tokens for Google APIs.
//!
//! - `TokenCache` keeps one access token per credential set and refreshes it
//!   through the refresh-token grant, sharing a single in-flight refresh
//! - `ConsentFlow` obtains the long-lived refresh token in the first place

pub mod cache;
pub mod clock;
pub mod consent;
pub mod token;

pub use cache::{OAuthCredentials, TokenCache};
pub use clock::{Clock, SystemClock};
pub use consent::ConsentFlow;
pub use token::{TokenGrant, TokenRecord, REFRESH_BUFFER_MS};

use async_trait::async_trait;

use orgshare_common::{Error, Result, Secret};

/// OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Drive scope limited to files the app created or opened.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
/// YouTube scope for playlist management.
pub const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// Anything that can hand out a bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Get a token valid for at least the next request.
    async fn token(&self) -> Result<String>;

    /// Forget the current token (e.g. after a 401).
    async fn invalidate(&self) {}
}

/// A fixed bearer token obtained elsewhere.
#[derive(Debug, Clone)]
pub struct StaticToken(Secret);

impl StaticToken {
    /// # Errors
    /// - `NoToken` if `token` is empty
    pub fn new(token: impl Into<Secret>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::NoToken);
        }
        Ok(Self(token))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.expose().to_string())
    }
}
