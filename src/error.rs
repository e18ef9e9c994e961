use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors surfaced by the board core, the data-access layer and the ticker feed.
///
/// The `Display` form of the HTTP variants is the message string the UI shows,
/// e.g. `request_failed_500` or `unauthorized_or_forbidden`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("network_error: {0}")]
    Network(String),

    #[error("request_failed_{status}")]
    RequestFailed { status: u16 },

    #[error("unauthorized_or_forbidden")]
    Unauthorized { status: u16 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

impl BoardError {
    /// Maps a non-2xx HTTP status to the matching error variant.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            _ => Self::RequestFailed { status },
        }
    }

    /// HTTP status carried by the error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status } | Self::Unauthorized { status } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::RequestFailed { status: 404 }
        )
    }
}

impl From<serde_json::Error> for BoardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for BoardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Serialization(err.to_string());
        }
        match err.status() {
            Some(status) => Self::from_status(status.as_u16()),
            None => Self::Network(err.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BoardError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages() {
        assert_eq!(
            BoardError::from_status(500).to_string(),
            "request_failed_500"
        );
        assert_eq!(
            BoardError::from_status(401).to_string(),
            "unauthorized_or_forbidden"
        );
        assert_eq!(
            BoardError::from_status(403),
            BoardError::Unauthorized { status: 403 }
        );
    }

    #[test]
    fn test_status_and_not_found() {
        assert_eq!(BoardError::from_status(422).status(), Some(422));
        assert_eq!(BoardError::Validation("x".into()).status(), None);
        assert!(BoardError::from_status(404).is_not_found());
        assert!(BoardError::NotFound("b1".into()).is_not_found());
        assert!(!BoardError::from_status(500).is_not_found());
    }
}
