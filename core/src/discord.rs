use std::{future::Future, sync::Arc};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    avatar,
    config::{BotToken, Config},
    error::UpstreamError,
    request::UserId,
    session::{Connector, Session},
};

const USER_AGENT: &str = concat!("DiscordBot (", env!("CARGO_PKG_NAME"), ", ", env!("CARGO_PKG_VERSION"), ")");

/// A user record as returned by `GET /users/{id}`.
#[derive(Deserialize, Debug, Clone)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default = "legacy_discriminator")]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// The whole record, untouched.
    #[serde(skip)]
    pub raw: Value,
}

fn legacy_discriminator() -> String {
    "0".to_string()
}

impl DiscordUser {
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        let mut user: DiscordUser = serde_json::from_value(raw.clone())?;
        user.raw = raw;
        Ok(user)
    }

    pub fn display_avatar_url(&self, size: u16) -> String {
        avatar::display_avatar_url(&self.id, self.avatar.as_deref(), &self.discriminator, size)
    }
}

/// Logs in to the Discord REST API with a bot token.
#[derive(Debug, Clone)]
pub struct DiscordConnector {
    api_base: Arc<String>,
    token: BotToken,
}

impl DiscordConnector {
    pub fn new(api_base: impl Into<String>, token: BotToken) -> Self {
        Self {
            api_base: Arc::new(api_base.into()),
            token,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_base.clone(), config.bot_token.clone())
    }

    fn build_client(&self) -> Result<reqwest::Client, UpstreamError> {
        let mut auth = HeaderValue::from_str(&format!("Bot {}", self.token.expose()))
            .map_err(|_| UpstreamError::SessionFailed("bot token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        Ok(reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?)
    }
}

impl Connector for DiscordConnector {
    type Session = DiscordSession;

    fn connect(&self) -> impl Future<Output = Result<DiscordSession, UpstreamError>> + Send {
        async move {
            let client = self.build_client()?;

            let res = client
                .get(format!("{}/users/@me", self.api_base))
                .send()
                .await
                .map_err(|e| UpstreamError::SessionFailed(e.to_string()))?;
            let me = read_json(res)
                .await
                .and_then(|raw| Ok(DiscordUser::from_raw(raw)?))
                .map_err(|e| UpstreamError::SessionFailed(e.to_string()))?;

            info!(bot_id = %me.id, bot = %me.username, "logged in to discord");

            Ok(DiscordSession {
                client,
                api_base: self.api_base.clone(),
                bot_id: me.id,
            })
        }
    }
}

/// An authenticated client. Dropping it releases its connection pool.
#[derive(Debug)]
pub struct DiscordSession {
    client: reqwest::Client,
    api_base: Arc<String>,
    bot_id: String,
}

impl Session for DiscordSession {
    fn fetch_user(&self, id: &UserId) -> impl Future<Output = Result<DiscordUser, UpstreamError>> + Send {
        async move {
            let res = self
                .client
                .get(format!("{}/users/{}", self.api_base, id))
                .send()
                .await?;
            let user = DiscordUser::from_raw(read_json(res).await?)?;

            if user.id != id.as_str() {
                return Err(UpstreamError::IdMismatch {
                    requested: id.to_string(),
                    returned: user.id,
                });
            }

            Ok(user)
        }
    }

    fn close(self) -> impl Future<Output = ()> + Send {
        async move {
            debug!(bot_id = %self.bot_id, "closing discord session");
            drop(self.client);
        }
    }
}

async fn read_json(res: reqwest::Response) -> Result<Value, UpstreamError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<Value>().await?);
    }

    let body = res.json::<Value>().await.unwrap_or_default();
    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();

    Err(UpstreamError::Status { status, message })
}
