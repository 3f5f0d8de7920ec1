use http::{
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE},
    StatusCode,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{discord::DiscordUser, error::RequestError};

pub const NOT_FOUND_MESSAGE: &str = "Could not find a user with that ID.";

/// What a successful lookup returns to the caller.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    pub discriminator: String,
    /// The raw upstream record, only when explicitly enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Profile {
    pub fn from_user(user: DiscordUser, avatar_size: u16, include_raw: bool) -> Self {
        let avatar_url = user.display_avatar_url(avatar_size);
        Self {
            avatar_url,
            body: include_raw.then_some(user.raw),
            id: user.id,
            username: user.username,
            discriminator: user.discriminator,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn ok(profile: &Profile) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!(profile),
        }
    }

    pub fn rejected(err: &RequestError) -> Self {
        Self::error(err.status(), &err.to_string())
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    /// Every reply is JSON and readable from any origin.
    pub fn into_response(self) -> Result<http::Response<String>, http::Error> {
        http::Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(self.body.to_string())
    }
}
