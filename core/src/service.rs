use std::sync::Arc;

use http::Method;
use tracing::{debug, error};

use crate::{
    config::{Config, SessionLifecycle},
    discord::DiscordConnector,
    error::UpstreamError,
    request::{validate, UserId},
    response::{Profile, Reply},
    session::{Connector, Session, SessionManager, SessionPhase},
};

enum Sessions<C: Connector> {
    Persistent(Arc<SessionManager<C>>),
    PerInvocation(C),
}

/// The avatar endpoint: validate, look the user up, format the reply.
pub struct AvatarService<C: Connector> {
    sessions: Sessions<C>,
    route_prefix: String,
    avatar_size: u16,
    include_raw_profile: bool,
}

impl AvatarService<DiscordConnector> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, DiscordConnector::from_config(config))
    }
}

impl<C: Connector> AvatarService<C> {
    pub fn new(config: &Config, connector: C) -> Self {
        let sessions = match config.lifecycle {
            SessionLifecycle::Persistent => {
                Sessions::Persistent(SessionManager::new(connector, config.ready_timeout))
            }
            SessionLifecycle::PerInvocation => Sessions::PerInvocation(connector),
        };

        Self {
            sessions,
            route_prefix: config.route_prefix.clone(),
            avatar_size: config.avatar_size,
            include_raw_profile: config.include_raw_profile,
        }
    }

    /// `None` when sessions are per invocation.
    pub fn session_phase(&self) -> Option<SessionPhase> {
        match &self.sessions {
            Sessions::Persistent(manager) => Some(manager.phase()),
            Sessions::PerInvocation(_) => None,
        }
    }

    /// Starts the shared login at cold start so the first request does not pay for it alone.
    pub fn warm_up(&self) {
        if let Sessions::Persistent(manager) = &self.sessions {
            manager.start();
        }
    }

    pub async fn shutdown(&self) {
        if let Sessions::Persistent(manager) = &self.sessions {
            manager.shutdown().await;
        }
    }

    pub async fn handle(&self, method: &Method, path: &str) -> Reply {
        let user_id = match validate(method, path, &self.route_prefix) {
            Ok(user_id) => user_id,
            Err(e) => {
                debug!(%method, path, error = %e, "rejected request");
                return Reply::rejected(&e);
            }
        };

        match self.lookup(&user_id).await {
            Ok(profile) => Reply::ok(&profile),
            Err(e) => {
                error!(%user_id, error = %e, "failed to fetch user");
                Reply::not_found()
            }
        }
    }

    pub async fn lookup(&self, user_id: &UserId) -> Result<Profile, UpstreamError> {
        let user = match &self.sessions {
            Sessions::Persistent(manager) => manager.session().await?.fetch_user(user_id).await?,
            Sessions::PerInvocation(connector) => {
                let session = connector.connect().await?;
                let fetched = session.fetch_user(user_id).await;
                session.close().await;
                fetched?
            }
        };

        Ok(Profile::from_user(user, self.avatar_size, self.include_raw_profile))
    }
}
