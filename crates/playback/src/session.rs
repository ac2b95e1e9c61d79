use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use model::{
    simulation::{LocationFix, SimulationOptions},
    timeline::Sample,
    Coordinate,
};
use serde::Serialize;
use tokio::{
    task::JoinHandle,
    time::{self, sleep_until, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::PlaybackConfig,
    sink::{self, LocationSink, ProviderOutcome, ProviderSpec},
};

/// Longest delay between the first and any later sample that is accepted for
/// playback.
pub const MAX_SAMPLE_OFFSET: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Offset of every sample from the first one, earlier timestamps clamped to
/// zero. `None` if an offset does not fit `MAX_SAMPLE_OFFSET`.
pub(crate) fn sample_offsets(samples: &[Sample]) -> Option<Vec<Duration>> {
    let Some(first) = samples.first() else {
        return Some(vec![]);
    };
    samples
        .iter()
        .map(|sample| {
            let offset_ms = (sample.timestamp_ms - first.timestamp_ms).max(0.0);
            Duration::try_from_secs_f64(offset_ms / 1000.0)
                .ok()
                .filter(|offset| *offset <= MAX_SAMPLE_OFFSET)
        })
        .collect()
}

/// Delivery counters of one session, counted per provider push.
#[derive(Debug, Default)]
pub struct SessionStats {
    delivered: AtomicUsize,
    failed: AtomicUsize,
}

impl SessionStats {
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    fn record(&self, outcomes: &[ProviderOutcome]) {
        for outcome in outcomes {
            if outcome.is_ok() {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            } else {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session: u64,
    pub delivered: usize,
    pub failed: usize,
}

/// Everything a playback task needs to hand a fix to the sink.
#[derive(Clone)]
struct Delivery {
    sink: Arc<dyn LocationSink>,
    providers: Arc<[ProviderSpec]>,
    stats: Arc<SessionStats>,
    cancellation: CancellationToken,
}

impl Delivery {
    async fn push(&self, fix: &LocationFix) {
        let outcomes = sink::push_all(self.sink.as_ref(), &self.providers, fix).await;
        self.stats.record(&outcomes);
    }

    /// Waits until `deadline`. Returns `false` if the session was cancelled first.
    async fn wait_until(&self, deadline: Instant) -> bool {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => false,
            _ = sleep_until(deadline) => true,
        }
    }
}

/// One start→stop run of the dispatcher: the pending playback tasks and the
/// token that cancels them.
pub(crate) struct Session {
    id: u64,
    cancellation: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    stats: Arc<SessionStats>,
}

impl Session {
    /// Spawns the target broadcast and the timeline playback. `timeline` pairs
    /// every sample with its offset from `sample_offsets`. Returns without
    /// waiting for any delivery.
    pub(crate) fn start(
        id: u64,
        sink: Arc<dyn LocationSink>,
        armed: Vec<ProviderSpec>,
        timeline: Vec<(Duration, Sample)>,
        options: &SimulationOptions,
        config: &PlaybackConfig,
    ) -> Self {
        let started = Instant::now();
        let cancellation = CancellationToken::new();
        let stats = Arc::new(SessionStats::default());
        let delivery = Delivery {
            sink,
            providers: armed.into(),
            stats: stats.clone(),
            cancellation: cancellation.clone(),
        };

        let mut tasks = vec![];
        if let Some(target) = options.target_coordinate {
            tasks.push(tokio::spawn(broadcast_target(
                delivery.clone(),
                target,
                config.target_interval,
                config.target_duration,
            )));
        }
        if !timeline.is_empty() {
            let lead_in = if options.has_target() {
                config.lead_in
            } else {
                Duration::ZERO
            };
            tasks.push(tokio::spawn(play_timeline(
                delivery,
                timeline,
                started + lead_in,
            )));
        }

        Self {
            id,
            cancellation,
            tasks,
            stats,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Whether any delivery of this session is still pending.
    pub(crate) fn has_pending_deliveries(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Cancels all pending deliveries and waits until the playback tasks are
    /// gone. No delivery of this session happens after this returns.
    pub(crate) async fn cancel(&mut self) {
        self.cancellation.cancel();
        for task in self.tasks.drain(..) {
            // a task stuck inside a slow sink call is dropped at its next poll
            task.abort();
            if let Err(why) = task.await {
                if why.is_panic() {
                    log::error!("playback task of session {} panicked: {:?}", self.id, why);
                }
            }
        }
    }

    /// Cancels the session and disarms `providers`.
    pub(crate) async fn shutdown(
        mut self,
        sink: &dyn LocationSink,
        providers: &[ProviderSpec],
    ) -> (SessionSummary, Vec<ProviderOutcome>) {
        self.cancel().await;
        let disarmed = sink::disarm_all(sink, providers).await;
        let summary = SessionSummary {
            session: self.id,
            delivered: self.stats.delivered(),
            failed: self.stats.failed(),
        };
        log::info!(
            "session {} stopped: {} pushes delivered, {} failed",
            summary.session,
            summary.delivered,
            summary.failed
        );
        (summary, disarmed)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

fn now_ms() -> f64 {
    Utc::now().timestamp_millis() as f64
}

/// Pushes the target immediately and then every `interval` until `duration`
/// has passed since the broadcast began. Every fix is stamped with the clock
/// at the time it is pushed.
async fn broadcast_target(
    delivery: Delivery,
    target: Coordinate,
    interval: Duration,
    duration: Duration,
) {
    let started = Instant::now();
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut repetitions = 0usize;
    loop {
        tokio::select! {
            biased;
            _ = delivery.cancellation.cancelled() => {
                log::debug!("target broadcast cancelled after {} repetitions", repetitions);
                return;
            }
            _ = ticker.tick() => {}
        }

        let fix = LocationFix::target(target, now_ms());
        log::debug!("repeat target entry -> {:?}", fix);
        delivery.push(&fix).await;
        repetitions += 1;

        if started.elapsed() >= duration {
            break;
        }
    }
    log::info!("target broadcast finished after {} repetitions", repetitions);
}

/// Pushes every sample at its offset, counted from `origin`. Deadlines are
/// absolute, so a slow push does not shift the following ones.
async fn play_timeline(delivery: Delivery, timeline: Vec<(Duration, Sample)>, origin: Instant) {
    for (index, (offset, sample)) in timeline.iter().enumerate() {
        if !delivery.wait_until(origin + *offset).await {
            log::debug!(
                "timeline playback cancelled, {} of {} samples delivered",
                index,
                timeline.len()
            );
            return;
        }
        delivery.push(&LocationFix::from(sample)).await;
    }
    log::info!("timeline playback finished after {} samples", timeline.len());
}
