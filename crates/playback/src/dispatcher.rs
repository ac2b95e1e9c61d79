use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use model::{simulation::SimulationOptions, timeline::Sample};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::{
    config::PlaybackConfig,
    session::{self, Session, SessionSummary},
    sink::{self, LocationSink, ProviderOutcome, ProviderSpec},
    DispatcherError, StartError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Idle,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// `Active` from a successful start until the next stop.
    pub state: State,
    /// Whether the target broadcast or the timeline still has deliveries to
    /// make. Always `false` while idle.
    pub deliveries_pending: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
    pub session: u64,
    pub armed: Vec<ProviderOutcome>,
    pub scheduled_samples: usize,
    pub target_broadcast: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    /// `None` if there was nothing to stop.
    pub session: Option<SessionSummary>,
    pub disarmed: Vec<ProviderOutcome>,
}

enum Command {
    Start {
        samples: Vec<Sample>,
        options: SimulationOptions,
        respond_to: oneshot::Sender<Result<StartReport, StartError>>,
    },
    Stop {
        respond_to: oneshot::Sender<StopReport>,
    },
    Status {
        respond_to: oneshot::Sender<Status>,
    },
}

/// The single scheduling authority of a process. It owns the current session
/// and handles one command at a time, so concurrent callers never race on
/// session state.
pub struct Dispatcher {
    sink: Arc<dyn LocationSink>,
    providers: Vec<ProviderSpec>,
    config: PlaybackConfig,
    session: Option<Session>,
    last_session_id: u64,
}

impl Dispatcher {
    pub fn new<S: LocationSink>(
        sink: Arc<S>,
        providers: Vec<ProviderSpec>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            sink,
            providers,
            config,
            session: None,
            last_session_id: 0,
        }
    }

    /// Runs the dispatcher on the tokio runtime. It stops, and tears down a
    /// running session, once every `DispatcherRef` has been dropped.
    pub fn spawn(mut self) -> DispatcherRef {
        let (sender, mut receiver) = mpsc::channel(self.config.mailbox_size);

        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                let result = AssertUnwindSafe(self.handle(command))
                    .catch_unwind()
                    .await;
                if let Err(why) = result {
                    log::error!("dispatcher panicked while handling a command: {:?}", why);
                }
            }
            self.stop().await;
            log::debug!("dispatcher shut down");
        });

        DispatcherRef { sender }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Start {
                samples,
                options,
                respond_to,
            } => {
                let result = self.start(samples, options).await;
                respond_to
                    .send(result)
                    .unwrap_or_else(|_| log::warn!("start requester went away"));
            }
            Command::Stop { respond_to } => {
                let report = self.stop().await;
                respond_to
                    .send(report)
                    .unwrap_or_else(|_| log::warn!("stop requester went away"));
            }
            Command::Status { respond_to } => {
                respond_to
                    .send(self.status())
                    .unwrap_or_else(|_| log::warn!("status requester went away"));
            }
        }
    }

    async fn start(
        &mut self,
        samples: Vec<Sample>,
        options: SimulationOptions,
    ) -> Result<StartReport, StartError> {
        let has_timeline = !samples.is_empty();
        let has_target = options.has_target();
        log::info!(
            "start: has_timeline={}, has_target={}, samples={}, target={:?}",
            has_timeline,
            has_target,
            samples.len(),
            options.target_coordinate
        );

        if !has_timeline && !has_target {
            log::warn!("timeline empty and no target provided");
            return Err(StartError::MissingInput);
        }
        let target_invalid = options
            .target_coordinate
            .is_some_and(|target| !target.is_finite());
        let samples_invalid = samples
            .iter()
            .any(|sample| !sample.coordinate.is_finite() || !sample.timestamp_ms.is_finite());
        if target_invalid || samples_invalid {
            log::warn!("rejecting simulation input with non-finite values");
            return Err(StartError::NonFiniteCoordinate);
        }
        let Some(offsets) = session::sample_offsets(&samples) else {
            log::warn!(
                "rejecting timeline spanning more than {:?}",
                session::MAX_SAMPLE_OFFSET
            );
            return Err(StartError::OffsetOutOfRange);
        };
        let timeline = offsets.into_iter().zip(samples).collect::<Vec<_>>();

        if let Some(previous) = self.session.take() {
            log::info!("replacing session {}", previous.id());
            previous
                .shutdown(self.sink.as_ref(), &self.providers)
                .await;
        }

        let armed = sink::arm_all(self.sink.as_ref(), &self.providers).await;
        let ready = self
            .providers
            .iter()
            .zip(armed.iter())
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(provider, _)| provider.clone())
            .collect::<Vec<_>>();
        if ready.is_empty() {
            log::error!("no location provider could be armed, nothing scheduled");
            return Err(StartError::SinkArmFailure(armed));
        }

        if options.wifi_enhancement {
            log::info!("Wi-Fi enhancement requested (not implemented)");
        }
        if options.cell_enhancement {
            log::info!("cell enhancement requested (not implemented)");
        }

        self.last_session_id += 1;
        let scheduled_samples = timeline.len();
        let session = Session::start(
            self.last_session_id,
            self.sink.clone(),
            ready,
            timeline,
            &options,
            &self.config,
        );
        log::info!(
            "session {} armed: {} samples scheduled, target broadcast {}",
            session.id(),
            scheduled_samples,
            if has_target { "on" } else { "off" }
        );
        self.session = Some(session);

        Ok(StartReport {
            session: self.last_session_id,
            armed,
            scheduled_samples,
            target_broadcast: has_target,
        })
    }

    async fn stop(&mut self) -> StopReport {
        match self.session.take() {
            Some(session) => {
                let (summary, disarmed) = session
                    .shutdown(self.sink.as_ref(), &self.providers)
                    .await;
                StopReport {
                    session: Some(summary),
                    disarmed,
                }
            }
            None => StopReport::default(),
        }
    }

    fn status(&self) -> Status {
        match &self.session {
            Some(session) => Status {
                state: State::Active,
                deliveries_pending: session.has_pending_deliveries(),
            },
            None => Status {
                state: State::Idle,
                deliveries_pending: false,
            },
        }
    }
}

/// Handle to a running `Dispatcher`.
#[derive(Clone)]
pub struct DispatcherRef {
    sender: mpsc::Sender<Command>,
}

impl DispatcherRef {
    async fn ask<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, DispatcherError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(command(respond_to))
            .await
            .map_err(|_| DispatcherError::Closed)?;
        Ok(response.await?)
    }

    /// Starts playing `samples` and, if the options carry one, broadcasting
    /// the target coordinate. A running session is stopped first.
    pub async fn start(
        &self,
        samples: Vec<Sample>,
        options: SimulationOptions,
    ) -> Result<StartReport, StartError> {
        self.ask(|respond_to| Command::Start {
            samples,
            options,
            respond_to,
        })
        .await?
    }

    /// Broadcasts only the target coordinate of `options`.
    pub async fn jump_to(&self, options: SimulationOptions) -> Result<StartReport, StartError> {
        if !options.has_target() {
            return Err(StartError::MissingInput);
        }
        self.start(vec![], options).await
    }

    pub async fn stop(&self) -> Result<StopReport, DispatcherError> {
        self.ask(|respond_to| Command::Stop { respond_to }).await
    }

    pub async fn status(&self) -> Result<Status, DispatcherError> {
        self.ask(|respond_to| Command::Status { respond_to }).await
    }
}
