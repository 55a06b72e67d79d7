use thiserror::Error;

/// Failure of a single gateway request. Every variant is scoped to that one
/// request; none is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No response reached us (connect, timeout, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("remote error {status}: {body}")]
    Remote { status: u16, body: String },

    /// 404 on a patient-scoped lookup.
    #[error("{resource} `{id}` not found")]
    NotFound { resource: &'static str, id: String },

    /// 2xx response whose body does not match the expected schema.
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Transport(_) | Self::Decode { .. } => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_reported_for_http_failures() {
        let remote = GatewayError::Remote {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(remote.status(), Some(503));
        assert_eq!(remote.to_string(), "remote error 503: maintenance");

        let missing = GatewayError::NotFound {
            resource: "patient",
            id: "P404".into(),
        };
        assert_eq!(missing.status(), Some(404));
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "patient `P404` not found");

        assert_eq!(GatewayError::Transport("refused".into()).status(), None);
    }
}
