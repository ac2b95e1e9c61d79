use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use serde_with;
pub use utility::geo::Position;

pub mod route;
pub mod simulation;
pub mod timeline;

/// Default pace in minutes per kilometer (10 km/h).
pub const DEFAULT_PACE: f64 = 6.0;

pub trait ExampleData {
    fn example_data() -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<Position> for Coordinate {
    fn from(position: Position) -> Self {
        Self::new(position[1], position[0])
    }
}

impl From<Coordinate> for Position {
    fn from(coordinate: Coordinate) -> Self {
        [coordinate.longitude, coordinate.latitude]
    }
}

impl ExampleData for Coordinate {
    fn example_data() -> Self {
        Self::new(30.259, 120.151)
    }
}
