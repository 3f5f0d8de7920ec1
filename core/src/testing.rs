//! In-memory stand-in for Discord used by the unit tests.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use http::StatusCode;
use serde_json::json;

use crate::{
    discord::DiscordUser,
    error::UpstreamError,
    request::UserId,
    session::{Connector, Session},
};

#[derive(Debug, Default)]
struct Inner {
    users: Mutex<HashMap<String, DiscordUser>>,
    handshake_delay: Mutex<Duration>,
    failing_handshakes: AtomicUsize,
    hanging_handshakes: AtomicUsize,
    connects: AtomicUsize,
    fetches: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDiscord {
    inner: Arc<Inner>,
}

impl FakeDiscord {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_user(self, id: &str, username: &str, avatar: Option<&str>, discriminator: &str) -> Self {
        let raw = json!({
            "id": id,
            "username": username,
            "avatar": avatar,
            "discriminator": discriminator,
            "global_name": null,
            "public_flags": 0
        });
        let user = DiscordUser::from_raw(raw).unwrap();
        self.inner.users.lock().unwrap().insert(id.to_string(), user);
        self
    }

    pub(crate) fn with_handshake_delay(self, delay: Duration) -> Self {
        *self.inner.handshake_delay.lock().unwrap() = delay;
        self
    }

    pub(crate) fn failing_handshakes(self, count: usize) -> Self {
        self.inner.failing_handshakes.store(count, Ordering::SeqCst);
        self
    }

    /// The next `count` logins never finish.
    pub(crate) fn hanging_handshakes(self, count: usize) -> Self {
        self.inner.hanging_handshakes.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn fetches(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }
}

impl Connector for FakeDiscord {
    type Session = FakeSession;

    fn connect(&self) -> impl Future<Output = Result<FakeSession, UpstreamError>> + Send {
        async move {
            self.inner.connects.fetch_add(1, Ordering::SeqCst);
            if take_one(&self.inner.hanging_handshakes) {
                std::future::pending::<()>().await;
            }
            let delay = *self.inner.handshake_delay.lock().unwrap();
            tokio::time::sleep(delay).await;

            if take_one(&self.inner.failing_handshakes) {
                return Err(UpstreamError::SessionFailed("discord answered 401 Unauthorized".into()));
            }

            Ok(FakeSession {
                inner: self.inner.clone(),
            })
        }
    }
}

#[derive(Debug)]
pub(crate) struct FakeSession {
    inner: Arc<Inner>,
}

impl Session for FakeSession {
    fn fetch_user(&self, id: &UserId) -> impl Future<Output = Result<DiscordUser, UpstreamError>> + Send {
        async move {
            self.inner.fetches.fetch_add(1, Ordering::SeqCst);
            let found = self.inner.users.lock().unwrap().get(id.as_str()).cloned();
            found.ok_or_else(|| UpstreamError::Status {
                status: StatusCode::NOT_FOUND,
                message: "Unknown User".into(),
            })
        }
    }

    fn close(self) -> impl Future<Output = ()> + Send {
        async move {
            self.inner.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
