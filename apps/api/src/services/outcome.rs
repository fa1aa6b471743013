//! Result types for calls to external providers.
//!
//! Provider clients return [`ProviderResult`]. Pipeline steps turn those into an
//! [`Outcome`], which makes the degrade path an explicit branch for the caller.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// A credential or endpoint needed for the call is not configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network failure, non-success status or malformed payload.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::ServiceUnavailable(err.to_string())
    }
}

/// What a pipeline step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    /// The preferred path failed and a fallback value was produced instead.
    Degraded { value: T, reason: ProviderError },
    Failure(ProviderError),
}

impl<T> Outcome<T> {
    /// Use `fallback` to produce a degraded value when `result` failed.
    pub fn or_fallback(result: ProviderResult<T>, fallback: impl FnOnce() -> T) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(reason) => Outcome::Degraded {
                value: fallback(),
                reason,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&ProviderError> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Degraded { reason, .. } | Outcome::Failure(reason) => Some(reason),
        }
    }
}

impl<T> From<ProviderResult<T>> for Outcome<T> {
    fn from(result: ProviderResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(reason) => Outcome::Failure(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_only_runs_on_error() {
        let ok: Outcome<&str> = Outcome::or_fallback(Ok("ai"), || panic!("not needed"));
        assert_eq!(ok, Outcome::Success("ai"));

        let degraded = Outcome::or_fallback(
            Err(ProviderError::Configuration("no key".into())),
            || "basic",
        );
        assert_eq!(degraded.value(), Some(&"basic"));
        assert!(!degraded.is_success());
        assert_eq!(
            degraded.reason(),
            Some(&ProviderError::Configuration("no key".into()))
        );
    }

    #[test]
    fn test_failure_has_no_value() {
        let failed: Outcome<Vec<f32>> =
            Err(ProviderError::ServiceUnavailable("503".into())).into();
        assert!(failed.value().is_none());
        assert!(failed.into_value().is_none());
    }
}
