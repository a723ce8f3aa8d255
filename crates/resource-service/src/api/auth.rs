//! Caller resolution from bearer tokens.
//!
//! A request without an `Authorization` header is anonymous. A header that is
//! not `Bearer <token>`, or names a token nobody holds, is rejected outright
//! rather than downgraded to anonymous.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use resource_framework::Caller;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use crate::config::{ConfigError, ServerConfig};

const TOKEN_KEYWORD: &str = "Bearer";

/// Token → caller table.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    tokens: HashMap<String, Caller>,
}

impl Authenticator {
    pub fn new(tokens: impl IntoIterator<Item = (String, Caller)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.callers()?))
    }

    /// Resolves the caller behind a request's headers.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<Option<Caller>, ApiError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.split_once(' '))
            .filter(|(keyword, _)| keyword.eq_ignore_ascii_case(TOKEN_KEYWORD))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthenticated("Invalid token header.".to_string()))?;

        match self.tokens.get(token) {
            Some(caller) => Ok(Some(caller.clone())),
            None => {
                debug!("Unknown token");
                Err(ApiError::Unauthenticated("Invalid token.".to_string()))
            }
        }
    }
}

/// The caller making the current request, `None` when anonymous.
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Option<Caller>);

impl CurrentCaller {
    pub fn caller(&self) -> Option<&Caller> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<Arc<Authenticator>>()
            .ok_or_else(|| {
                ApiError::Rejected(resource_framework::Rejection::Internal(
                    "authenticator not installed".to_string(),
                ))
            })?;
        auth.resolve(&parts.headers).map(CurrentCaller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn authenticator() -> Authenticator {
        Authenticator::new([
            ("s3cret".to_string(), Caller::ordinary("alice")),
            ("r00t".to_string(), Caller::elevated("admin")),
        ])
    }

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert_eq!(authenticator().resolve(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_known_tokens_resolve() {
        let auth = authenticator();
        assert_eq!(
            auth.resolve(&headers("Bearer s3cret")).unwrap(),
            Some(Caller::ordinary("alice"))
        );
        assert_eq!(
            auth.resolve(&headers("bearer r00t")).unwrap(),
            Some(Caller::elevated("admin"))
        );
    }

    #[test]
    fn test_bad_tokens_are_rejected() {
        let auth = authenticator();
        for value in ["Bearer nope", "Bearer", "Basic s3cret", "s3cret"] {
            assert!(
                matches!(auth.resolve(&headers(value)), Err(ApiError::Unauthenticated(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_config() {
        let auth = Authenticator::from_config(&ServerConfig::for_testing()).unwrap();
        assert_eq!(
            auth.resolve(&headers("Bearer bob-token")).unwrap(),
            Some(Caller::ordinary("bob"))
        );
    }
}
