//! Caller identity extraction from request headers.

use axum::extract::FromRequestParts;
use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use common::UserId;
use gateway::Identity;

use crate::error::ApiError;

/// The authenticated caller, as asserted by the upstream auth layer.
///
/// `X-User-Id` is required on every identity-scoped route; `X-User-Email`
/// and `X-User-Name` ride along to the providers. `X-Admin: true` marks
/// administrative callers.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Identity,
    pub is_admin: bool,
}

impl Caller {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id: UserId = headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing X-User-Id header".to_string()))?
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid X-User-Id header".to_string()))?;

        let mut identity = Identity::new(user_id);
        if let Some(email) = headers.get("x-user-email").and_then(|v| v.to_str().ok()) {
            identity = identity.with_email(email);
        }
        if let Some(name) = headers.get("x-user-name").and_then(|v| v.to_str().ok()) {
            identity = identity.with_name(name);
        }

        let is_admin = headers
            .get("x-admin")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        Ok(Self { identity, is_admin })
    }

    /// Fails with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::try_from(*k).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_requires_user_id() {
        assert!(Caller::from_headers(&headers(&[])).is_err());
        assert!(Caller::from_headers(&headers(&[("x-user-id", "abc")])).is_err());
    }

    #[test]
    fn test_full_identity() {
        let caller = Caller::from_headers(&headers(&[
            ("x-user-id", "42"),
            ("x-user-email", "ada@example.com"),
            ("x-user-name", "Ada"),
            ("x-admin", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(caller.identity.user_id, UserId::new(42));
        assert_eq!(caller.identity.email.as_deref(), Some("ada@example.com"));
        assert_eq!(caller.identity.name.as_deref(), Some("Ada"));
        assert!(caller.is_admin);
    }

    #[test]
    fn test_admin_defaults_off() {
        let caller = Caller::from_headers(&headers(&[("x-user-id", "1")])).unwrap();
        assert!(!caller.is_admin);
        assert!(caller.require_admin().is_err());
    }
}
