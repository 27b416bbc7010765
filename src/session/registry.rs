use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use chrono::{DateTime, Utc};
use om_core::{SessionConfig, TickOutcome};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use super::{CoachSession, SessionError, SessionSnapshot};
use crate::config::SessionSettings;
use crate::services::Services;

pub type SharedSession = Arc<Mutex<CoachSession>>;

/// Source of the current time. Swapped out in tests to drive sessions
/// through their schedule without waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct SessionEntry {
    session: SharedSession,
    ticker: Option<JoinHandle<()>>,
}

struct RegistryInner {
    sessions: StdMutex<HashMap<Uuid, SessionEntry>>,
    services: Services,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
}

/// All sessions served by this process, keyed by id.
///
/// Each session lives behind its own async mutex, so requests and the
/// periodic tick for one session are serialized while different sessions
/// proceed independently.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        Self::with_clock(services, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(services: Services, settings: SessionSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: StdMutex::new(HashMap::new()),
                services,
                settings,
                clock,
            }),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub fn create(&self) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(CoachSession::new(
            id,
            self.inner.services.clone(),
            self.inner.settings.clone(),
            self.now(),
        )));
        self.sessions().insert(
            id,
            SessionEntry {
                session: session.clone(),
                ticker: None,
            },
        );
        tracing::debug!(session = %id, "Session created");
        (id, session)
    }

    pub fn get(&self, id: Uuid) -> Result<SharedSession, SessionError> {
        self.sessions()
            .get(&id)
            .map(|entry| entry.session.clone())
            .ok_or(SessionError::NotFound)
    }

    /// Drop a session and stop its ticker. Returns false if it did not exist.
    pub fn remove(&self, id: Uuid) -> bool {
        match self.sessions().remove(&id) {
            Some(entry) => {
                if let Some(ticker) = entry.ticker {
                    ticker.abort();
                }
                tracing::debug!(session = %id, "Session removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a periodic tick is currently driving this session.
    pub fn is_ticking(&self, id: Uuid) -> bool {
        self.sessions()
            .get(&id)
            .and_then(|entry| entry.ticker.as_ref())
            .is_some_and(|ticker| !ticker.is_finished())
    }

    /// Start or restart a session, from `config` or from its setup draft, and
    /// begin ticking it. Any earlier ticker for the session is stopped first.
    pub async fn start(
        &self,
        id: Uuid,
        config: Option<SessionConfig>,
    ) -> Result<SessionSnapshot, SessionError> {
        let shared = self.get(id)?;
        let mut session = shared.lock().await;
        let config = match config {
            Some(config) => config,
            None => session.draft().to_config()?,
        };

        self.stop_ticker(id);
        let now = self.now();
        session.start(config, now).await;
        let snapshot = session.snapshot(now);
        drop(session);

        let ticker = self.spawn_ticker(id, Arc::downgrade(&shared));
        if let Some(entry) = self.sessions().get_mut(&id) {
            entry.ticker = Some(ticker);
        } else {
            ticker.abort();
        }
        Ok(snapshot)
    }

    fn stop_ticker(&self, id: Uuid) {
        if let Some(ticker) = self.sessions().get_mut(&id).and_then(|e| e.ticker.take()) {
            ticker.abort();
        }
    }

    fn spawn_ticker(&self, id: Uuid, session: Weak<Mutex<CoachSession>>) -> JoinHandle<()> {
        let clock = self.inner.clock.clone();
        let period = self.inner.settings.tick_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the session was just started.
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                let outcome = session.lock().await.tick(clock.now()).await;
                if matches!(
                    outcome,
                    TickOutcome::Finished { .. } | TickOutcome::AlreadyFinished | TickOutcome::Idle
                ) {
                    tracing::debug!(session = %id, "Ticker stopped");
                    break;
                }
            }
        })
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        let sessions = self
            .sessions
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for entry in sessions.values_mut() {
            if let Some(ticker) = entry.ticker.take() {
                ticker.abort();
            }
        }
    }
}
