//! Shared error taxonomy for the gateway. Kept as a typed enum (not `anyhow`)
//! because HTTP handlers and the booking core both need to match on error
//! *kind* to pick a status code or retry policy.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("booking not permitted: {0}")]
    PolicyDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("declined by room calendar")]
    DeclinedByRoom,

    #[error("upstream exchange gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("internal inconsistency: {0}")]
    Inconsistent(String),
}

impl GatewayError {
    /// HTTP status this error should be rendered as.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 400,
            GatewayError::PolicyDenied(_) => 403,
            GatewayError::NotFound(_) => 404,
            GatewayError::DeclinedByRoom => 403,
            GatewayError::GatewayUnavailable(_) => 429,
            GatewayError::Inconsistent(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation",
            GatewayError::PolicyDenied(_) => "policy_denied",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::DeclinedByRoom => "declined",
            GatewayError::GatewayUnavailable(_) => "gateway_unavailable",
            GatewayError::Inconsistent(_) => "inconsistent",
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(GatewayError::Validation("x".into()).status_code(), 400);
        assert_eq!(GatewayError::PolicyDenied("x".into()).status_code(), 403);
        assert_eq!(GatewayError::NotFound("x".into()).status_code(), 404);
        assert_eq!(GatewayError::DeclinedByRoom.status_code(), 403);
        assert_eq!(
            GatewayError::GatewayUnavailable("x".into()).status_code(),
            429
        );
        assert_eq!(GatewayError::Inconsistent("x".into()).status_code(), 500);
    }
}
