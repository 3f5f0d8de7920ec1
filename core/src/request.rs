use std::fmt;

use http::Method;

use crate::error::RequestError;

pub const DEFAULT_ROUTE_PREFIX: &str = "/.netlify/functions/avatar/";

/// A Discord user id exactly as the caller sent it.
///
/// Kept as a string so an 18-20 digit snowflake never goes through a lossy
/// numeric conversion on its way back into the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RequestError::InvalidUserId);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks method and route, then pulls the user id out of the last path segment.
pub fn validate(method: &Method, path: &str, prefix: &str) -> Result<UserId, RequestError> {
    if *method != Method::GET || !path.starts_with(prefix) {
        return Err(RequestError::MethodNotAllowed);
    }

    let last = path.rsplit('/').next().unwrap_or_default();
    UserId::parse(last)
}
