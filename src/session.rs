use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, header, request::Parts},
};
use tracing::debug;

use crate::{models::Role, storage::SessionStorage};

// --- Storage Keys ---

/// Key the login flow stores the access token under.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Older clients stored the token under this key.
pub const LEGACY_TOKEN_KEY: &str = "token";
/// Key holding the plain role string.
pub const USER_ROLE_KEY: &str = "user_role";

/// Request header carrying the stored role to the page gate. The gate echoes the
/// role back under the same name when navigation changed it.
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");

/// SessionCredentials
///
/// The `(token, role)` pair describing who is navigating. It is passed explicitly
/// to the guard, which only reads it except for the seller promotion.
///
/// The token is opaque: only its presence matters here. Empty strings count as
/// absent, and unknown role strings parse to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCredentials {
    pub token: Option<String>,
    pub role: Option<Role>,
}

impl SessionCredentials {
    /// No token, no role.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self::from_raw(Some(token.into()), Some(role.as_str()))
    }

    /// Builds credentials from the raw stored strings.
    pub fn from_raw(token: Option<String>, role: Option<&str>) -> Self {
        let token = token.filter(|token| !token.is_empty());
        let role = role.and_then(|raw| match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(_) => {
                debug!(stored_role = raw, "ignoring unrecognised stored role");
                None
            }
        });
        Self { token, role }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Reads the session out of key-value storage. With `legacy_token_key`, an
    /// absent `access_token` falls back to the old `token` key.
    pub fn load(storage: &dyn SessionStorage, legacy_token_key: bool) -> Self {
        let token = storage
            .get_item(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .or_else(|| {
                legacy_token_key
                    .then(|| storage.get_item(LEGACY_TOKEN_KEY))
                    .flatten()
            });
        let role = storage.get_item(USER_ROLE_KEY);
        Self::from_raw(token, role.as_deref())
    }

    /// Writes the role back to storage. Only the role is ever persisted; the token
    /// belongs to the login flow.
    pub fn persist_role(&self, storage: &dyn SessionStorage) {
        match self.role {
            Some(role) => storage.set_item(USER_ROLE_KEY, role.as_str()),
            None => storage.remove_item(USER_ROLE_KEY),
        }
    }
}

/// SessionCredentials Extractor Implementation
///
/// Lets page handlers receive the visitor's credentials as an argument:
/// 1. Token: the `Authorization: Bearer <token>` header, presence only.
/// 2. Role: the raw `x-user-role` header.
///
/// Never rejects; a request without either header is simply anonymous.
impl<S> FromRequestParts<S> for SessionCredentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());

        let role = parts
            .headers
            .get(&USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok());

        Ok(Self::from_raw(token, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySessionStorage;

    #[test]
    fn empty_and_unknown_values_are_absent() {
        let credentials = SessionCredentials::from_raw(Some(String::new()), Some("student"));
        assert_eq!(credentials, SessionCredentials::anonymous());

        let credentials = SessionCredentials::from_raw(None, Some("Admin"));
        assert_eq!(credentials.role, None);
    }

    #[test]
    fn loads_access_token_before_legacy_key() {
        let storage = MemorySessionStorage::with_items([
            (ACCESS_TOKEN_KEY, "fresh"),
            (LEGACY_TOKEN_KEY, "stale"),
            (USER_ROLE_KEY, "seller"),
        ]);
        let credentials = SessionCredentials::load(&storage, true);
        assert_eq!(credentials.token.as_deref(), Some("fresh"));
        assert_eq!(credentials.role, Some(Role::Seller));
    }

    #[test]
    fn legacy_key_only_read_when_enabled() {
        let storage = MemorySessionStorage::with_items([(LEGACY_TOKEN_KEY, "stale")]);
        assert_eq!(
            SessionCredentials::load(&storage, true).token.as_deref(),
            Some("stale")
        );
        assert!(!SessionCredentials::load(&storage, false).has_token());
    }

    #[test]
    fn empty_access_token_falls_back_to_legacy_key() {
        let storage =
            MemorySessionStorage::with_items([(ACCESS_TOKEN_KEY, ""), (LEGACY_TOKEN_KEY, "old")]);
        assert_eq!(
            SessionCredentials::load(&storage, true).token.as_deref(),
            Some("old")
        );
    }

    #[test]
    fn persist_role_writes_or_clears() {
        let storage = MemorySessionStorage::with_items([(USER_ROLE_KEY, "user")]);

        SessionCredentials::new("t", Role::Seller).persist_role(&storage);
        assert_eq!(storage.get_item(USER_ROLE_KEY).as_deref(), Some("seller"));

        SessionCredentials::anonymous().persist_role(&storage);
        assert_eq!(storage.get_item(USER_ROLE_KEY), None);
    }
}
