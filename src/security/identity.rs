//! Caller identity handed to the forwarder.
//!
//! The proxy never derives identity from inbound request data. A host
//! application supplies it through an [`IdentityResolver`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dashboard role injected alongside the user email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match only; role names are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Editor" => Ok(Role::Editor),
            "Viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User identity as supplied by the caller.
///
/// Values are kept raw; the forwarder validates them on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub role: String,
}

impl Identity {
    pub fn new(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: role.into(),
        }
    }
}

/// Email must contain `@` and no whitespace or control characters.
///
/// The value ends up in an HTTP header, so anything that could split or
/// terminate a header line is refused.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty()
        && email.contains('@')
        && !email.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Errors from identity resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authenticated user")]
    Unauthenticated,

    #[error("identity lookup failed: {0}")]
    Lookup(String),
}

/// Host-application hook that maps an inbound request to a trusted identity.
///
/// Implementations typically consult a session store. Whatever they return
/// is injected verbatim into the upstream request.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, request: &Parts) -> Result<Identity, AuthError>;
}

/// Resolver that hands out one fixed identity, e.g. a kiosk service account.
#[derive(Debug, Clone)]
pub struct StaticIdentityResolver {
    identity: Option<Identity>,
}

impl StaticIdentityResolver {
    pub fn new(identity: Option<Identity>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, _request: &Parts) -> Result<Identity, AuthError> {
        self.identity.clone().ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Viewer".parse::<Role>().unwrap(), Role::Viewer);
        assert!("admin".parse::<Role>().is_err());
        assert!("Owner".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("ab.com"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a @b.com"));
        assert!(!is_valid_email("a@b.com\r\nX-WEBAUTH-ROLE: Admin"));
        assert!(!is_valid_email("a@b\0.com"));
        assert!(!is_valid_email("a@b.com\t"));
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();

        let resolver = StaticIdentityResolver::new(Some(Identity::new("kiosk@example.com", "Viewer")));
        let identity = resolver.resolve(&parts).await.unwrap();
        assert_eq!(identity.email, "kiosk@example.com");

        let empty = StaticIdentityResolver::new(None);
        assert!(matches!(empty.resolve(&parts).await, Err(AuthError::Unauthenticated)));
    }
}
