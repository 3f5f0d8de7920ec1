//! Discord session lifecycle.
//!
//! A [`Connector`] performs the login handshake and hands back a [`Session`]
//! that can look users up. [`SessionManager`] keeps one session alive for the
//! whole process: the first caller after a cold start (or after a failed
//! handshake) triggers the login, everyone else waits on the readiness signal
//! for at most `ready_timeout`. A login still running when that wait expires is
//! abandoned, so the next caller starts a fresh one.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{discord::DiscordUser, error::UpstreamError, request::UserId};

pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    fn connect(&self) -> impl Future<Output = Result<Self::Session, UpstreamError>> + Send;
}

pub trait Session: Send + Sync + 'static {
    /// Exactly one upstream call.
    fn fetch_user(&self, id: &UserId) -> impl Future<Output = Result<DiscordUser, UpstreamError>> + Send;

    fn close(self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Connecting,
    Ready,
    Failed,
}

enum Slot<S> {
    Uninitialized,
    /// Login attempt in flight, tagged with its attempt number.
    Connecting(u64),
    Ready(Arc<S>),
    Failed(String),
}

impl<S> Slot<S> {
    fn phase(&self) -> SessionPhase {
        match self {
            Slot::Uninitialized => SessionPhase::Uninitialized,
            Slot::Connecting(_) => SessionPhase::Connecting,
            Slot::Ready(_) => SessionPhase::Ready,
            Slot::Failed(_) => SessionPhase::Failed,
        }
    }

    fn attempt(&self) -> Option<u64> {
        match self {
            Slot::Connecting(attempt) => Some(*attempt),
            _ => None,
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self, Slot::Ready(_) | Slot::Failed(_))
    }
}

pub struct SessionManager<C: Connector> {
    connector: C,
    slot: watch::Sender<Slot<C::Session>>,
    attempts: AtomicU64,
    ready_timeout: Duration,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(connector: C, ready_timeout: Duration) -> Arc<Self> {
        let (slot, _) = watch::channel(Slot::Uninitialized);
        Arc::new(Self {
            connector,
            slot,
            attempts: AtomicU64::new(0),
            ready_timeout,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.slot.borrow().phase()
    }

    /// Kicks off the login in the background if nobody has yet.
    pub fn start(self: &Arc<Self>) {
        if let Some(attempt) = self.claim() {
            self.spawn_connect(attempt);
        }
    }

    /// Returns the shared session, logging in first when there is none.
    pub async fn session(self: &Arc<Self>) -> Result<Arc<C::Session>, UpstreamError> {
        if let Some(attempt) = self.claim() {
            debug!(attempt, "no live discord session, logging in");
            self.spawn_connect(attempt);
        }

        let mut rx = self.slot.subscribe();
        let awaited = rx.borrow().attempt();
        let settled = tokio::time::timeout(self.ready_timeout, rx.wait_for(Slot::is_settled)).await;

        match settled {
            Err(_) => {
                if let Some(attempt) = awaited {
                    self.abandon(attempt);
                }
                Err(UpstreamError::ReadyTimeout(self.ready_timeout))
            }
            Ok(Err(_)) => Err(UpstreamError::Closed),
            Ok(Ok(slot)) => match &*slot {
                Slot::Ready(session) => Ok(Arc::clone(session)),
                Slot::Failed(reason) => Err(UpstreamError::SessionFailed(reason.clone())),
                Slot::Uninitialized | Slot::Connecting(_) => Err(UpstreamError::Closed),
            },
        }
    }

    /// Closes the live session, if any. The next caller logs in again.
    pub async fn shutdown(&self) {
        let previous = self.slot.send_replace(Slot::Uninitialized);
        if let Slot::Ready(session) = previous {
            match Arc::try_unwrap(session) {
                Ok(session) => session.close().await,
                Err(_) => debug!("discord session still in use, dropping our handle"),
            }
        }
    }

    /// Moves `Uninitialized`/`Failed` to `Connecting`. Only one caller wins.
    fn claim(&self) -> Option<u64> {
        let mut claimed = None;
        self.slot.send_if_modified(|slot| match slot {
            Slot::Uninitialized | Slot::Failed(_) => {
                let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                *slot = Slot::Connecting(attempt);
                claimed = Some(attempt);
                true
            }
            Slot::Connecting(_) | Slot::Ready(_) => false,
        });
        claimed
    }

    /// Gives up on `attempt` if it is still the one in flight.
    fn abandon(&self, attempt: u64) {
        let timeout = self.ready_timeout;
        let abandoned = self.slot.send_if_modified(|slot| match slot {
            Slot::Connecting(current) if *current == attempt => {
                *slot = Slot::Failed(format!("login did not finish within {timeout:?}"));
                true
            }
            _ => false,
        });
        if abandoned {
            warn!(attempt, ?timeout, "discord login timed out, next request logs in again");
        }
    }

    fn spawn_connect(self: &Arc<Self>, attempt: u64) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut outcome = Some(manager.connector.connect().await);

            // Only the attempt still in flight may publish; a shutdown or a
            // timeout in the meantime makes this result stale.
            let published = manager.slot.send_if_modified(|slot| {
                if slot.attempt() != Some(attempt) {
                    return false;
                }
                *slot = match outcome.take() {
                    Some(Ok(session)) => {
                        info!(attempt, "discord session ready");
                        Slot::Ready(Arc::new(session))
                    }
                    Some(Err(e)) => {
                        error!(attempt, error = %e, "discord login failed");
                        Slot::Failed(e.to_string())
                    }
                    None => return false,
                };
                true
            });

            if !published {
                if let Some(Ok(session)) = outcome {
                    debug!(attempt, "discarding session from a stale login");
                    session.close().await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDiscord;

    fn id(raw: &str) -> UserId {
        UserId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_login() {
        let discord = FakeDiscord::new()
            .with_user("42", "ferris", None, "0")
            .with_handshake_delay(Duration::from_millis(20));
        let manager = SessionManager::new(discord.clone(), Duration::from_secs(5));
        manager.start();
        assert_eq!(manager.phase(), SessionPhase::Connecting);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                let session = manager.session().await.unwrap();
                session.fetch_user(&id("42")).await.unwrap().username
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "ferris");
        }

        assert_eq!(discord.connects(), 1);
        assert_eq!(manager.phase(), SessionPhase::Ready);
    }

    #[tokio::test]
    async fn logs_in_lazily_without_start() {
        let discord = FakeDiscord::new();
        let manager = SessionManager::new(discord.clone(), Duration::from_secs(5));
        assert_eq!(manager.phase(), SessionPhase::Uninitialized);

        manager.session().await.unwrap();
        manager.session().await.unwrap();

        assert_eq!(discord.connects(), 1);
    }

    #[tokio::test]
    async fn failed_login_does_not_hang_and_is_retried_by_next_caller() {
        let discord = FakeDiscord::new().failing_handshakes(1);
        let manager = SessionManager::new(discord.clone(), Duration::from_secs(5));
        manager.start();

        let err = manager.session().await.unwrap_err();
        assert!(matches!(err, UpstreamError::SessionFailed(_)), "{err:?}");
        assert_eq!(manager.phase(), SessionPhase::Failed);

        manager.session().await.unwrap();
        assert_eq!(discord.connects(), 2);
        assert_eq!(manager.phase(), SessionPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_login_times_out_and_next_caller_logs_in_again() {
        let discord = FakeDiscord::new().with_user("42", "ferris", None, "0").hanging_handshakes(1);
        let manager = SessionManager::new(discord.clone(), Duration::from_millis(250));
        manager.start();

        let err = manager.session().await.unwrap_err();
        assert!(matches!(err, UpstreamError::ReadyTimeout(d) if d == Duration::from_millis(250)));
        assert_eq!(manager.phase(), SessionPhase::Failed);

        let session = manager.session().await.unwrap();
        assert_eq!(session.fetch_user(&id("42")).await.unwrap().username, "ferris");
        assert_eq!(discord.connects(), 2);
        assert_eq!(manager.phase(), SessionPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn late_login_after_timeout_is_discarded() {
        let discord = FakeDiscord::new().with_handshake_delay(Duration::from_secs(1));
        let manager = SessionManager::new(discord.clone(), Duration::from_millis(250));
        manager.start();

        assert!(manager.session().await.is_err());
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(manager.phase(), SessionPhase::Failed);
        assert_eq!(discord.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_login_does_not_resurrect_the_session() {
        let discord = FakeDiscord::new().with_handshake_delay(Duration::from_millis(50));
        let manager = SessionManager::new(discord.clone(), Duration::from_secs(5));
        manager.start();
        assert_eq!(manager.phase(), SessionPhase::Connecting);

        manager.shutdown().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(manager.phase(), SessionPhase::Uninitialized);
        assert_eq!(discord.connects(), 1);
        assert_eq!(discord.closes(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_the_session() {
        let discord = FakeDiscord::new();
        let manager = SessionManager::new(discord.clone(), Duration::from_secs(5));
        manager.session().await.unwrap();

        manager.shutdown().await;

        assert_eq!(discord.closes(), 1);
        assert_eq!(manager.phase(), SessionPhase::Uninitialized);
    }
}
