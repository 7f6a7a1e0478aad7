use thiserror::Error;

/// Every failure a client action can end in. None are retried; the
/// message is shown inline to the user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("Network error: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    /// Rejected before any request was sent.
    #[error("{0}")]
    ValidationFailure(String),

    /// The gateway answered 401. If the rejected token was still current,
    /// the session has been expired.
    #[error("{0}")]
    AuthFailure(String),

    /// Non-2xx with a JSON body.
    #[error("{message}")]
    ServerFailure {
        status: u16,
        message: String,
        payload: serde_json::Value,
    },

    /// A body that is not the JSON we expected. `body` is truncated.
    #[error("Unexpected response (HTTP {status}): {body}")]
    MalformedResponse { status: u16, body: String },

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::ValidationFailure(msg.into())
    }

    /// Text for inline display.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthFailure(_) => Some(401),
            ClientError::ServerFailure { status, .. }
            | ClientError::MalformedResponse { status, .. } => Some(*status),
            ClientError::NetworkFailure(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::AuthFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
