//! Cached access tokens and the token endpoint's grant response.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Safety margin before expiry, in milliseconds (5 minutes).
pub const REFRESH_BUFFER_MS: i64 = 300_000;

/// Safety margin before expiry inside which a token is refreshed.
pub fn refresh_buffer() -> Duration {
    Duration::milliseconds(REFRESH_BUFFER_MS)
}

/// Successful answer of an OAuth2 token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds, relative to the moment the grant was issued.
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Only present on authorization-code exchanges (and rotations).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// An access token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record from a grant received at `now`.
    pub fn from_grant(grant: &TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            access_token: grant.access_token.clone(),
            expires_at: now + Duration::seconds(grant.expires_in),
        }
    }

    /// Whether the token can still be handed out at `now`.
    ///
    /// A token is usable only while more than the refresh buffer remains.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > refresh_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_in: i64) -> TokenGrant {
        TokenGrant {
            access_token: "abc".to_string(),
            expires_in,
            token_type: Some("Bearer".to_string()),
            scope: None,
            refresh_token: None,
        }
    }

    #[test]
    fn test_record_expiry_from_grant() {
        let now = Utc::now();
        let record = TokenRecord::from_grant(&grant(3600), now);
        assert_eq!(record.expires_at, now + Duration::hours(1));
        assert_eq!(record.access_token, "abc");
    }

    #[test]
    fn test_usable_outside_buffer() {
        let now = Utc::now();
        let record = TokenRecord::from_grant(&grant(3600), now);
        assert!(record.is_usable(now));
        assert!(record.is_usable(now + Duration::minutes(10)));
        assert!(!record.is_usable(now + Duration::minutes(56)));
    }

    #[test]
    fn test_buffer_boundary_is_not_usable() {
        let now = Utc::now();
        let record = TokenRecord {
            access_token: "abc".to_string(),
            expires_at: now + refresh_buffer(),
        };
        assert!(!record.is_usable(now));

        let record = TokenRecord {
            access_token: "abc".to_string(),
            expires_at: now + refresh_buffer() + Duration::milliseconds(1),
        };
        assert!(record.is_usable(now));
    }

    #[test]
    fn test_already_expired_is_not_usable() {
        let now = Utc::now();
        let record = TokenRecord::from_grant(&grant(-10), now);
        assert!(!record.is_usable(now));
    }

    #[test]
    fn test_grant_parsing_with_optional_fields() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"ya29","expires_in":3599}"#).unwrap();
        assert_eq!(grant.access_token, "ya29");
        assert_eq!(grant.expires_in, 3599);
        assert!(grant.scope.is_none());
        assert!(grant.refresh_token.is_none());

        assert!(serde_json::from_str::<TokenGrant>(r#"{"expires_in":3599}"#).is_err());
    }
}
