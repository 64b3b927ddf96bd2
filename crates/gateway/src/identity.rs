//! Forwarded end-user identity.

use common::UserId;

/// End-user identity forwarded to providers on every call.
///
/// Providers use this for attribution (`X-User-Id`, `X-User-Email`,
/// `X-User-Name` headers), never for agency-side authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Identity {
    /// Creates an identity with just a user id.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
        }
    }

    /// Attaches an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attaches a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
