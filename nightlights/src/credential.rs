use crate::NightlightsError;
use chrono::{DateTime, Utc};
use std::fmt;

/// An Earthdata bearer token.
///
/// The secret is only ever handed to the HTTP layer; `Debug` output
/// redacts it.
#[derive(Clone)]
pub struct BearerToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().trim().to_string(),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns an error if this token can't be used at `now`.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), NightlightsError> {
        if self.secret.is_empty() {
            return Err(NightlightsError::Credential("is empty"));
        }
        match self.expires_at {
            Some(expires_at) if expires_at <= now => Err(NightlightsError::Credential("has expired")),
            _ => Ok(()),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
