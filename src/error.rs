use std::fmt;

use http::Method;

/// Errors raised while building a routing table or reading request state.
///
/// A path that matches no route is *not* an error: [`crate::router::Router::match_route`]
/// reports it as a [`crate::router::MatchResult`] without handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The same pattern (compared case-insensitively) was registered twice for one method.
    ///
    /// The tree is left exactly as it was before the failing call.
    RouteConflict {
        /// HTTP method of the rejected registration
        method: Method,
        /// Pattern as passed to `register`
        pattern: String,
    },
    /// The pattern uses a token shape the compiler does not understand.
    MalformedPattern {
        /// Pattern as passed to `register`
        pattern: String,
        /// Human readable description of the problem
        reason: String,
    },
    /// Registration with a method outside the supported set (e.g. `CONNECT`).
    UnsupportedMethod(Method),
    /// `Keys::must_get` was called for a key that was never set.
    MissingKey(String),
    /// A path parameter could not be converted to the requested type.
    InvalidParam {
        /// Parameter name
        key: String,
        /// Raw value captured from the path
        value: String,
    },
}

impl RouterError {
    pub(crate) fn malformed(pattern: &str, reason: impl Into<String>) -> Self {
        RouterError::MalformedPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::RouteConflict { method, pattern } => {
                write!(
                    f,
                    "route conflict: {} {} is already registered",
                    method, pattern
                )
            }
            RouterError::MalformedPattern { pattern, reason } => {
                write!(f, "malformed route pattern '{}': {}", pattern, reason)
            }
            RouterError::UnsupportedMethod(method) => {
                write!(f, "unsupported HTTP method: {}", method)
            }
            RouterError::MissingKey(key) => write!(f, "key \"{}\" does not exist", key),
            RouterError::InvalidParam { key, value } => {
                write!(f, "path parameter '{}' has invalid value '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for RouterError {}
