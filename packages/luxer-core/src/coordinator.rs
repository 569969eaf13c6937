//! Pending-package poller.
//!
//! A [`Coordinator`] fetches the account's locations once, then refreshes the
//! pending deliveries on a fixed interval and publishes a [`LocationView`]
//! after every successful tick. Consumers hold a [`CoordinatorHandle`].

use crate::api::config::DEFAULT_POLL_INTERVAL_MINUTES;
use crate::api::LuxerClient;
use crate::error::PollError;
use crate::model::{Location, LocationView};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Time between refresh ticks.
    pub interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_MINUTES * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Locations not fetched yet.
    Uninitialized,
    /// Locations known; refresh ticks are running.
    Ready,
    /// The token was rejected. Terminal for this coordinator.
    AuthRequired,
}

/// What consumers see after each refresh attempt.
#[derive(Debug, Clone)]
pub struct PollSnapshot {
    pub state: CoordinatorState,
    /// Last successfully built view; `None` until the first refresh succeeds.
    pub view: Option<Arc<LocationView>>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Refresh attempts completed so far.
    pub attempts: u64,
}

impl PollSnapshot {
    fn initial() -> Self {
        Self {
            state: CoordinatorState::Ready,
            view: None,
            last_update_success: true,
            last_error: None,
            last_success_at: None,
            attempts: 0,
        }
    }
}

pub struct Coordinator {
    client: LuxerClient,
    config: CoordinatorConfig,
    state: CoordinatorState,
    locations: Arc<Vec<Location>>,
}

impl Coordinator {
    /// `client` must already carry a token.
    pub fn new(client: LuxerClient, config: CoordinatorConfig) -> Self {
        if client.token().is_none() {
            tracing::warn!("Coordinator created without an API token");
        }
        Self {
            client,
            config,
            state: CoordinatorState::Uninitialized,
            locations: Arc::new(Vec::new()),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Fetch the location list. Runs once per coordinator; a transport
    /// failure here is not retried automatically.
    pub async fn setup(&mut self) -> Result<(), PollError> {
        match self.client.locations().await {
            Ok(locations) => {
                tracing::info!("Found {} locker locations", locations.len());
                self.locations = Arc::new(locations);
                self.state = CoordinatorState::Ready;
                Ok(())
            }
            Err(e) => {
                let err = PollError::classify("locations", e);
                if err.is_auth_required() {
                    self.state = CoordinatorState::AuthRequired;
                }
                tracing::error!("Setup failed: {}", err);
                Err(err)
            }
        }
    }

    /// Fetch pending deliveries and group them by the known locations.
    pub async fn refresh(&self) -> Result<LocationView, PollError> {
        let deliveries = self
            .client
            .pending_deliveries()
            .await
            .map_err(|e| PollError::classify("deliveries", e))?;

        Ok(LocationView::group(&self.locations, deliveries))
    }

    /// Run setup, then poll in the background until shut down or the token is
    /// rejected.
    pub async fn start(
        client: LuxerClient,
        config: CoordinatorConfig,
    ) -> Result<CoordinatorHandle, PollError> {
        let mut coordinator = Coordinator::new(client, config);
        coordinator.setup().await?;
        Ok(coordinator.spawn())
    }

    fn spawn(self) -> CoordinatorHandle {
        let (tx, rx) = watch::channel(PollSnapshot::initial());
        let cancel = CancellationToken::new();
        let locations = self.locations.clone();

        let task = tokio::spawn(self.run(tx, cancel.clone()));

        CoordinatorHandle {
            locations,
            updates: rx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(self, tx: watch::Sender<PollSnapshot>, cancel: CancellationToken) {
        // First tick fires immediately, which is the post-setup refresh.
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Polling pending deliveries every {} seconds",
            self.config.interval.as_secs()
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = self.refresh().await;
            let auth_required = matches!(outcome, Err(PollError::AuthRequired));

            // The cancel check sits inside the send so a shutdown observed
            // before publishing always wins.
            let published = tx.send_if_modified(|snap| {
                if cancel.is_cancelled() {
                    return false;
                }
                apply_outcome(snap, outcome);
                true
            });

            if !published {
                tracing::debug!("Discarding refresh result after shutdown");
                break;
            }
            if auth_required {
                tracing::warn!("API token rejected, stopping poller");
                break;
            }
        }

        tracing::info!("Poller stopped");
    }
}

fn apply_outcome(snap: &mut PollSnapshot, outcome: Result<LocationView, PollError>) {
    snap.attempts += 1;
    match outcome {
        Ok(view) => {
            tracing::info!(
                "Refresh complete: {} pending packages across {} locations",
                view.total_pending(),
                view.len()
            );
            snap.view = Some(Arc::new(view));
            snap.last_update_success = true;
            snap.last_error = None;
            snap.last_success_at = Some(Utc::now());
        }
        Err(e) => {
            if e.is_auth_required() {
                snap.state = CoordinatorState::AuthRequired;
            } else {
                tracing::warn!("Refresh failed: {}", e);
            }
            snap.last_update_success = false;
            snap.last_error = Some(e.to_string());
        }
    }
}

/// Consumer side of a running coordinator.
///
/// Dropping the handle stops polling.
#[derive(Debug)]
pub struct CoordinatorHandle {
    locations: Arc<Vec<Location>>,
    updates: watch::Receiver<PollSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CoordinatorHandle {
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn snapshot(&self) -> PollSnapshot {
        self.updates.borrow().clone()
    }

    pub fn view(&self) -> Option<Arc<LocationView>> {
        self.updates.borrow().view.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        self.updates.borrow().state
    }

    /// Receiver notified after every refresh attempt, successful or not.
    /// Closed once polling has stopped.
    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.updates.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Poller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
