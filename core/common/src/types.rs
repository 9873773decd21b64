//! Common types used throughout orgshare.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Credential string that zeroizes on drop and never prints its value.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw credential.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

/// An organization signing up for shared storage and playlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    name: String,
    email: String,
}

impl Organization {
    /// Create a new organization.
    ///
    /// # Preconditions
    /// - `name` must be non-empty (after trimming) and contain no '/'
    /// - `email` must have exactly one '@' with text on both sides
    ///
    /// # Errors
    /// - Returns `InvalidInput` naming the offending field
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> crate::Result<Self> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();

        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Organization name cannot be empty".to_string(),
            ));
        }
        if name.contains('/') {
            return Err(crate::Error::InvalidInput(
                "Organization name cannot contain '/'".to_string(),
            ));
        }
        if !is_plausible_email(&email) {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid organization email: {}",
                email
            )));
        }

        Ok(Self { name, email })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Drive folder receiving raw uploads.
    pub fn raw_folder_name(&self) -> String {
        format!("{} - Raw Content", self.name)
    }

    /// Drive folder holding processed content.
    pub fn processed_folder_name(&self) -> String {
        format!("{} - Processed", self.name)
    }

    /// Unlisted playlist for raw footage.
    pub fn raw_playlist_title(&self) -> String {
        format!("{} - raw content and uploads", self.name)
    }

    /// Public playlist for finished content.
    pub fn public_playlist_title(&self) -> String {
        self.name.clone()
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        assert_eq!(format!("{:?}", secret), "Secret([REDACTED])");
        assert_eq!(secret.expose(), "super-secret");
    }

    #[test]
    fn test_secret_serde_transparent() {
        let secret: Secret = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(secret.expose(), "abc");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_organization_names() {
        let org = Organization::new("Food Bank", "ops@foodbank.org").unwrap();
        assert_eq!(org.raw_folder_name(), "Food Bank - Raw Content");
        assert_eq!(org.processed_folder_name(), "Food Bank - Processed");
        assert_eq!(org.raw_playlist_title(), "Food Bank - raw content and uploads");
        assert_eq!(org.public_playlist_title(), "Food Bank");
    }

    #[test]
    fn test_organization_trims_input() {
        let org = Organization::new("  Shelter  ", " info@shelter.org ").unwrap();
        assert_eq!(org.name(), "Shelter");
        assert_eq!(org.email(), "info@shelter.org");
    }

    #[test]
    fn test_organization_rejects_invalid() {
        assert!(Organization::new("", "a@b.org").is_err());
        assert!(Organization::new("   ", "a@b.org").is_err());
        assert!(Organization::new("a/b", "a@b.org").is_err());
        assert!(Organization::new("Org", "no-at-sign").is_err());
        assert!(Organization::new("Org", "two@@b.org").is_err());
        assert!(Organization::new("Org", "@b.org").is_err());
        assert!(Organization::new("Org", "a@").is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_names_produce_prefixed_folders(name in "[A-Za-z0-9][A-Za-z0-9 ]{0,30}") {
            let org = Organization::new(name.clone(), "team@example.org").unwrap();
            let trimmed = name.trim();
            prop_assert!(org.raw_folder_name().starts_with(trimmed));
            prop_assert!(org.processed_folder_name().starts_with(trimmed));
        }
    }
}
