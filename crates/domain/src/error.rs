/// Shared error type used across all parley crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Caller passed something unusable (empty query, zero `k`, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation is not allowed in the current session/log state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("backend {backend} unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::BackendUnavailable`] from any displayable cause.
    pub fn backend(backend: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::BackendUnavailable {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Re-tag any failure raised while talking to `backend` as
    /// [`Error::BackendUnavailable`], keeping its message.
    pub fn into_backend(self, backend: &str) -> Self {
        match self {
            Error::BackendUnavailable { .. } => self,
            other => Error::backend(backend, other),
        }
    }

    /// True for failures that originate in a collaborator (model, embedder,
    /// transport) rather than in caller misuse.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            Error::BackendUnavailable { .. } | Error::Http(_) | Error::Timeout(_)
        )
    }

    /// True for errors that indicate misuse by the caller.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_helper_formats_message() {
        let err = Error::backend("embedder", "connection refused");
        assert_eq!(
            err.to_string(),
            "backend embedder unavailable: connection refused"
        );
        assert!(err.is_backend());
        assert!(!err.is_caller_error());
    }

    #[test]
    fn into_backend_wraps_transport_errors() {
        let err = Error::Http("connection refused".into()).into_backend("openai-compat");
        assert!(matches!(
            &err,
            Error::BackendUnavailable { backend, message }
                if backend == "openai-compat" && message == "HTTP: connection refused"
        ));

        let already = Error::backend("embedder", "503").into_backend("openai-compat");
        assert!(matches!(
            already,
            Error::BackendUnavailable { backend, .. } if backend == "embedder"
        ));
    }

    #[test]
    fn transport_errors_count_as_backend() {
        assert!(Error::Http("502".into()).is_backend());
        assert!(Error::Timeout("30s".into()).is_backend());
        assert!(!Error::NotFound("a.pdf".into()).is_backend());
    }

    #[test]
    fn caller_errors() {
        assert!(Error::InvalidArgument("k".into()).is_caller_error());
        assert!(Error::InvalidState("idle".into()).is_caller_error());
        assert!(!Error::Other("x".into()).is_caller_error());
    }
}
