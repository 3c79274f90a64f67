//! Shared utility functions for backend adapters.

use pl_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Read an API key from the named environment variable.
///
/// Unset and blank variables both yield `None`, which means "send no auth
/// header" (the usual case for a local model server).
pub fn api_key_from_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        Ok(_) => {
            tracing::debug!(env_var = %var, "API key env var is blank, ignoring");
            None
        }
        Err(_) => None,
    }
}
