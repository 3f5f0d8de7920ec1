use std::time::Duration;

use http::StatusCode;

/// Rejections raised while reading the inbound request, before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Invalid user ID provided.")]
    InvalidUserId,
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RequestError::InvalidUserId => StatusCode::BAD_REQUEST,
        }
    }
}

/// Anything that went wrong between us and Discord.
///
/// Callers only ever see a single "not found" message for these; the variants
/// exist so the operational log says what actually happened.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("discord request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("discord answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error("asked for user {requested} but discord returned {returned}")]
    IdMismatch { requested: String, returned: String },
    #[error("session was not ready after {0:?}")]
    ReadyTimeout(Duration),
    #[error("session handshake failed: {0}")]
    SessionFailed(String),
    #[error("session is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("DISCORD_BOT_TOKEN is not set")]
    MissingToken,
    #[error("DISCORD_BOT_TOKEN does not look like a bot token")]
    MalformedToken,
    #[error("unknown session lifecycle {0:?}, expected `persistent` or `per-invocation`")]
    UnknownLifecycle(String),
    #[error("{name} has invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}
