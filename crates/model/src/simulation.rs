use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{timeline::Sample, Coordinate, ExampleData};

/// Accuracy in meters reported with every pushed fix.
pub const FIX_ACCURACY_M: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOptions {
    #[serde(default)]
    pub target_coordinate: Option<Coordinate>,
    #[serde(default)]
    pub wifi_enhancement: bool,
    #[serde(default)]
    pub cell_enhancement: bool,
}

impl SimulationOptions {
    pub fn with_target(target: Coordinate) -> Self {
        Self {
            target_coordinate: Some(target),
            ..Default::default()
        }
    }

    pub fn has_target(&self) -> bool {
        self.target_coordinate.is_some()
    }
}

impl ExampleData for SimulationOptions {
    fn example_data() -> Self {
        Self {
            target_coordinate: Some(Coordinate::example_data()),
            wifi_enhancement: false,
            cell_enhancement: false,
        }
    }
}

/// A single position update as handed to a location sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub timestamp_ms: f64,
    pub speed_mps: f64,
    pub accuracy_m: f64,
}

impl LocationFix {
    /// A stationary fix at the target coordinate, stamped with `now_ms`.
    pub fn target(coordinate: Coordinate, now_ms: f64) -> Self {
        Self {
            coordinate,
            timestamp_ms: now_ms,
            speed_mps: 0.0,
            accuracy_m: FIX_ACCURACY_M,
        }
    }
}

impl From<&Sample> for LocationFix {
    fn from(sample: &Sample) -> Self {
        Self {
            coordinate: sample.coordinate,
            timestamp_ms: sample.timestamp_ms,
            speed_mps: sample.speed_mps,
            accuracy_m: FIX_ACCURACY_M,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn options_default_to_no_target() {
        let options: SimulationOptions = serde_json::from_value(json!({})).unwrap();
        assert!(!options.has_target());
        assert!(!options.wifi_enhancement);

        let options: SimulationOptions = serde_json::from_value(json!({
            "targetCoordinate": null,
            "wifiEnhancement": true,
            "cellEnhancement": false
        }))
        .unwrap();
        assert!(!options.has_target());
        assert!(options.wifi_enhancement);
    }

    #[test]
    fn sample_fix_keeps_its_timestamp() {
        let sample = Sample::example_data();
        let fix = LocationFix::from(&sample);
        assert_eq!(fix.timestamp_ms, sample.timestamp_ms);
        assert_eq!(fix.speed_mps, sample.speed_mps);
        assert_eq!(fix.accuracy_m, FIX_ACCURACY_M);
    }

    #[test]
    fn target_fix_is_stationary() {
        let fix = LocationFix::target(Coordinate::example_data(), 42.0);
        assert_eq!(fix.speed_mps, 0.0);
        assert_eq!(fix.timestamp_ms, 42.0);
    }
}
