use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{route::Segment, Coordinate, ExampleData, DEFAULT_PACE};

/// One scheduled, time-stamped position of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub segment_id: Id<Segment>,
    pub coordinate: Coordinate,
    pub distance_from_start_m: f64,
    pub timestamp_ms: f64,
    pub speed_mps: f64,
}

impl ExampleData for Sample {
    fn example_data() -> Self {
        Self {
            segment_id: Id::from("seg-whitecauseway"),
            coordinate: Coordinate::new(30.26021, 120.158062),
            distance_from_start_m: 0.0,
            timestamp_ms: 1_735_689_600_000.0,
            speed_mps: 1000.0 / (DEFAULT_PACE * 60.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_distance_km: f64,
    pub estimated_duration_minutes: f64,
    /// Minutes per kilometer.
    pub average_pace: f64,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            total_distance_km: 0.0,
            estimated_duration_minutes: 0.0,
            average_pace: DEFAULT_PACE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub samples: Vec<Sample>,
    pub summary: Summary,
}

impl ExampleData for Timeline {
    fn example_data() -> Self {
        Self {
            samples: vec![Sample::example_data()],
            summary: Summary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_timeline_uses_default_pace() {
        let timeline = Timeline::default();
        assert!(timeline.samples.is_empty());
        assert_eq!(timeline.summary.average_pace, DEFAULT_PACE);
    }

    #[test]
    fn sample_serializes_camel_case() {
        let value = serde_json::to_value(Sample::example_data()).unwrap();
        assert_eq!(value["segmentId"], "seg-whitecauseway");
        assert_eq!(value["coordinate"]["latitude"], 30.26021);
        assert!(value.get("distanceFromStartM").is_some());
        assert!(value.get("timestampMs").is_some());
        assert!(value.get("speedMps").is_some());
    }
}
