use std::{error, fmt};

use tokio::sync::oneshot;

pub mod config;
pub mod dispatcher;
pub mod session;
pub mod sink;

pub use config::PlaybackConfig;
pub use dispatcher::{Dispatcher, DispatcherRef, StartReport, State, Status, StopReport};
pub use sink::{Accuracy, LocationSink, LogSink, Power, ProviderOutcome, ProviderSpec, SinkError};

/// Failures when talking to the dispatcher task itself.
#[derive(Debug)]
pub enum DispatcherError {
    /// The dispatcher task is gone and no longer accepts commands.
    Closed,
    /// The dispatcher dropped the request without answering.
    NoResponse(oneshot::error::RecvError),
}

impl fmt::Display for DispatcherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "dispatcher is not running"),
            Self::NoResponse(why) => write!(f, "dispatcher did not respond: {}", why),
        }
    }
}

impl error::Error for DispatcherError {}

impl From<oneshot::error::RecvError> for DispatcherError {
    fn from(why: oneshot::error::RecvError) -> Self {
        Self::NoResponse(why)
    }
}

/// Reasons a simulation could not be started. Nothing is scheduled when one of
/// these is returned.
#[derive(Debug)]
pub enum StartError {
    /// Neither samples nor a target coordinate were supplied.
    MissingInput,
    /// The target or a sample has a non-finite coordinate or timestamp.
    NonFiniteCoordinate,
    /// A sample lies further after the first one than playback accepts.
    OffsetOutOfRange,
    /// Not a single provider could be armed.
    SinkArmFailure(Vec<ProviderOutcome>),
    Dispatcher(DispatcherError),
}

impl StartError {
    /// Stable reason code reported to the control surface.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing input",
            Self::NonFiniteCoordinate => "non-finite coordinate",
            Self::OffsetOutOfRange => "offset out of range",
            Self::SinkArmFailure(_) => "sink arm failure",
            Self::Dispatcher(_) => "dispatcher unavailable",
        }
    }
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => write!(f, "timeline is empty and no target was provided"),
            Self::NonFiniteCoordinate => write!(f, "input contains a non-finite value"),
            Self::OffsetOutOfRange => write!(
                f,
                "a sample is scheduled more than {} days after the first one",
                session::MAX_SAMPLE_OFFSET.as_secs() / 86_400
            ),
            Self::SinkArmFailure(outcomes) => {
                write!(f, "no location provider could be armed")?;
                for outcome in outcomes {
                    if let Err(why) = &outcome.result {
                        write!(f, "; {}: {}", outcome.provider, why)?;
                    }
                }
                Ok(())
            }
            Self::Dispatcher(why) => write!(f, "{}", why),
        }
    }
}

impl error::Error for StartError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Dispatcher(why) => Some(why),
            _ => None,
        }
    }
}

impl From<DispatcherError> for StartError {
    fn from(why: DispatcherError) -> Self {
        Self::Dispatcher(why)
    }
}
