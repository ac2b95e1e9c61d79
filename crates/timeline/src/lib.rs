use std::{error, fmt};

use model::route::Segment;
use utility::id::Id;

pub mod builder;

pub use builder::{build, BuildOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// A segment point has a non-finite longitude or latitude.
    NonFiniteCoordinate { segment_id: Id<Segment>, index: usize },
    /// The supplied start time is not a finite number.
    NonFiniteStart(f64),
}

impl TimelineError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NonFiniteCoordinate { .. } => "non-finite coordinate",
            Self::NonFiniteStart(_) => "non-finite start time",
        }
    }
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteCoordinate { segment_id, index } => write!(
                f,
                "segment `{}` has a non-finite coordinate at point {}",
                segment_id, index
            ),
            Self::NonFiniteStart(start) => {
                write!(f, "start time {} is not a finite number", start)
            }
        }
    }
}

impl error::Error for TimelineError {}

pub type Result<T> = std::result::Result<T, TimelineError>;
