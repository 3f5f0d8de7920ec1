//! Discord avatar lookup behind a single `GET {prefix}{user_id}` route.
//!
//! [`AvatarService`] validates the request, fetches the user through a Discord
//! session (shared or per invocation, see [`SessionLifecycle`]) and turns the
//! outcome into a JSON [`Reply`]. The HTTP runtimes (lambda, local axum server)
//! only translate their request types in and the reply out.

pub mod avatar;
pub mod config;
pub mod discord;
pub mod error;
pub mod request;
pub mod response;
pub mod service;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{BotToken, Config, SessionLifecycle};
pub use discord::{DiscordConnector, DiscordSession, DiscordUser};
pub use error::{ConfigError, RequestError, UpstreamError};
pub use request::{validate, UserId};
pub use response::{Profile, Reply};
pub use service::AvatarService;
pub use session::{Connector, Session, SessionManager, SessionPhase};
