use std::fmt;

use vitalwatch_ports::GatewayError;

/// A failed refresh as seen by readers of the sync state: a generic
/// user-facing message plus the gateway error that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub message: String,
    pub cause: GatewayError,
}

impl SyncFailure {
    pub fn new(message: impl Into<String>, cause: GatewayError) -> Self {
        Self {
            message: message.into(),
            cause,
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.cause)
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
