//! Authorization-code flow for obtaining a refresh token.

use reqwest::Client;
use url::Url;

use orgshare_common::{Error, RefreshError, Result, Secret};

use super::token::TokenGrant;
use super::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};
use crate::http::build_client;

/// One-time consent flow producing the refresh token a `TokenCache` runs on.
pub struct ConsentFlow {
    http: Client,
    client_id: String,
    client_secret: Secret,
    redirect_url: String,
    auth_url: String,
    token_url: String,
}

impl ConsentFlow {
    /// Create a consent flow against Google's endpoints.
    ///
    /// # Errors
    /// - `Configuration` if any argument is empty or the redirect URL is invalid
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<Secret>,
        redirect_url: impl Into<String>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let redirect_url = redirect_url.into();

        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::Configuration(
                "Client ID and client secret are required".to_string(),
            ));
        }
        Url::parse(&redirect_url)
            .map_err(|e| Error::Configuration(format!("Invalid redirect URL: {}", e)))?;

        let http = build_client()?;

        Ok(Self {
            http,
            client_id,
            client_secret,
            redirect_url,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    /// Override the authorization and token endpoints.
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Build the URL the user visits to grant offline access.
    ///
    /// `state` is echoed back on the redirect and should be checked by the caller.
    pub fn authorization_url(&self, scopes: &[&str], state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| Error::Configuration(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url)
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Postconditions
    /// - The returned grant carries a refresh token
    ///
    /// # Errors
    /// - `Refresh` if the endpoint rejects the code or omits the refresh token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| RefreshError {
                status: None,
                message: format!("Token exchange failed: {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RefreshError {
                status: Some(status.as_u16()),
                message: body,
            }
            .into());
        }

        let grant: TokenGrant = serde_json::from_str(&body).map_err(|e| RefreshError {
            status: Some(status.as_u16()),
            message: format!("Malformed token response: {}", e),
        })?;

        if grant.refresh_token.as_deref().unwrap_or_default().is_empty() {
            return Err(RefreshError {
                status: Some(status.as_u16()),
                message: "No refresh token received. Ensure 'offline' access and 'consent' prompt were requested.".to_string(),
            }
            .into());
        }

        Ok(grant)
    }
}
