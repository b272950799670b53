use biodome_core::{StatusMessage, TokenMessage};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::cache::StatusCache;
use crate::config::PollConfig;
use crate::models::Recorder;
use crate::upstream::Upstream;
use flight::SingleFlight;

mod flight;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// Id of the stored row
    Stored(i32),
    /// The previous run is still in flight
    Skipped,
    Failed,
}

pub struct Poller {
    upstream: Arc<dyn Upstream>,
    recorder: Arc<dyn Recorder>,
    cache: Arc<StatusCache>,
    sensor_interval: Duration,
    token_interval: Duration,
    sensor_flight: Option<SingleFlight>,
    token_flight: Option<SingleFlight>,
}

impl Poller {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        recorder: Arc<dyn Recorder>,
        cache: Arc<StatusCache>,
        sensor: PollConfig,
        token: PollConfig,
    ) -> Self {
        let flight = |name, config: PollConfig| {
            config
                .single_flight
                .then(|| SingleFlight::new(name, config.max_in_flight))
        };
        Poller {
            upstream,
            recorder,
            cache,
            sensor_interval: sensor.interval,
            token_interval: token.interval,
            sensor_flight: flight("sensor", sensor),
            token_flight: flight("token", token),
        }
    }

    /// Fetches the status, refreshes the cache and stores the reading
    #[tracing::instrument(skip(self))]
    pub async fn poll_sensor(&self) -> PollOutcome {
        let _guard = match self.sensor_flight.as_ref().map(SingleFlight::try_begin) {
            Some(None) => {
                debug!("Previous sensor poll still running, skipping");
                return PollOutcome::Skipped;
            }
            Some(guard) => guard,
            None => None,
        };

        let payload = match self.upstream.fetch_status().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Sensor poll failed: {}", e);
                return PollOutcome::Failed;
            }
        };
        self.cache.put(payload.clone());

        let status = match StatusMessage::from_value(&payload) {
            Ok(status) => status,
            Err(e) => {
                warn!("Unexpected status payload: {}", e);
                return PollOutcome::Failed;
            }
        };

        let reading = match self.recorder.store_sensor_reading(&status).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Failed storing sensor reading: {}", e);
                return PollOutcome::Failed;
            }
        };
        info!(reading_id = reading.id, sol_day = ?status.sol_day, "Stored sensor reading");

        if let Some(text) = status.verdant_text() {
            match self.recorder.store_verdant_output(status.sol_day, text).await {
                Ok(Some(id)) => info!(verdant_id = id, "Stored verdant output"),
                Ok(None) => debug!("Verdant output already stored"),
                Err(e) => warn!("Failed storing verdant output: {}", e),
            }
        }
        PollOutcome::Stored(reading.id)
    }

    /// Fetches and stores the token metrics
    #[tracing::instrument(skip(self))]
    pub async fn poll_token(&self) -> PollOutcome {
        let _guard = match self.token_flight.as_ref().map(SingleFlight::try_begin) {
            Some(None) => {
                debug!("Previous token poll still running, skipping");
                return PollOutcome::Skipped;
            }
            Some(guard) => guard,
            None => None,
        };

        let token = match self
            .upstream
            .fetch_token()
            .await
            .map_err(|e| e.to_string())
            .and_then(|payload| TokenMessage::from_value(&payload).map_err(|e| e.to_string()))
        {
            Ok(token) => token,
            Err(e) => {
                warn!("Token poll failed: {}", e);
                return PollOutcome::Failed;
            }
        };

        match self.recorder.store_token_metrics(&token).await {
            Ok(record) => {
                debug!(token_metrics_id = record.id, "Stored token metrics");
                PollOutcome::Stored(record.id)
            }
            Err(e) => {
                warn!("Failed storing token metrics: {}", e);
                PollOutcome::Failed
            }
        }
    }

    /// Polls the status every sensor interval until `cancel` fires
    pub async fn dispatch_sensor_loop(self: Arc<Poller>, cancel: CancellationToken) {
        let period = self.sensor_interval;
        self.dispatch_loop("sensor", period, cancel, |poller| async move {
            poller.poll_sensor().await
        })
        .await
    }

    /// Polls the token metrics every token interval until `cancel` fires
    pub async fn dispatch_token_loop(self: Arc<Poller>, cancel: CancellationToken) {
        let period = self.token_interval;
        self.dispatch_loop("token", period, cancel, |poller| async move {
            poller.poll_token().await
        })
        .await
    }

    /// Ticks immediately, then every `period`. Each tick runs as its own
    /// task, in-flight ticks are awaited once cancelled.
    async fn dispatch_loop<F, Fut>(
        self: Arc<Poller>,
        name: &'static str,
        period: Duration,
        cancel: CancellationToken,
        tick: F,
    ) where
        F: Fn(Arc<Poller>) -> Fut,
        Fut: Future<Output = PollOutcome> + Send + 'static,
    {
        let tracker = TaskTracker::new();
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Start polling {} every {:?}", name, period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    tracker.spawn(tick(self.clone()));
                }
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            info!("Waiting for {} in-flight {} poll(s)", tracker.len(), name);
        }
        tracker.wait().await;
        info!("Stopped polling {}", name);
    }
}
