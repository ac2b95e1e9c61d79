use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{ExampleData, Position, DEFAULT_PACE};

/// Easing tag of a segment. It is stored and passed along, but playback is
/// always linear in time and distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    #[default]
    Linear,
    EaseInOut,
    EaseIn,
    EaseOut,
}

/// One leg of a route.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: Id<Segment>,
    #[serde(default)]
    pub label: String,
    /// `[longitude, latitude]` pairs.
    #[serde(default)]
    pub points: Vec<Position>,
    /// Minutes per kilometer.
    pub pace: Option<f64>,
    /// Pause after the segment in milliseconds. Negative or non-finite values
    /// count as no pause.
    #[serde(default)]
    pub dwell_ms: f64,
    #[serde(default)]
    pub easing: Easing,
}

impl HasId for Segment {
    type IdType = String;
}

impl Segment {
    pub fn new(id: impl Into<String>, points: Vec<Position>) -> Self {
        Self {
            id: Id::new(id.into()),
            label: String::new(),
            points,
            pace: Some(DEFAULT_PACE),
            dwell_ms: 0.0,
            easing: Easing::Linear,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_pace(mut self, pace: f64) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn with_dwell_ms(mut self, dwell_ms: f64) -> Self {
        self.dwell_ms = dwell_ms;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// The pace used for timing: absent, zero, negative or non-finite paces
    /// fall back to `DEFAULT_PACE`.
    pub fn effective_pace(&self) -> f64 {
        match self.pace {
            Some(pace) if pace.is_finite() && pace > 0.0 => pace,
            _ => DEFAULT_PACE,
        }
    }

    /// The dwell used for timing, never negative.
    pub fn effective_dwell_ms(&self) -> f64 {
        if self.dwell_ms.is_finite() && self.dwell_ms > 0.0 {
            self.dwell_ms
        } else {
            0.0
        }
    }

    /// Speed in meters per second derived from the effective pace.
    pub fn speed_mps(&self) -> f64 {
        1000.0 / (self.effective_pace() * 60.0)
    }
}

/// An authored route (called scenario by the authoring layer).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Id<Route>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "epoch")]
    #[schemars(with = "i64")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "epoch")]
    #[schemars(with = "i64")]
    pub updated_at: DateTime<Utc>,
}

impl HasId for Route {
    type IdType = String;
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Route {
    pub fn new(id: impl Into<String>, name: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            id: Id::new(id.into()),
            name: name.into(),
            description: None,
            segments,
            created_at: epoch(),
            updated_at: epoch(),
        }
    }
}

impl ExampleData for Route {
    fn example_data() -> Self {
        let timestamp = Utc
            .timestamp_millis_opt(1_735_689_600_000)
            .single()
            .unwrap_or_else(epoch);
        Self {
            id: Id::from("westlake-loop"),
            name: "West Lake morning run".to_owned(),
            description: Some("5 km paced loop from Broken Bridge to Su Causeway".to_owned()),
            segments: vec![
                Segment::new(
                    "seg-whitecauseway",
                    vec![
                        [120.158062, 30.26021],
                        [120.159812, 30.261655],
                        [120.161702, 30.26282],
                        [120.164181, 30.263863],
                    ],
                )
                .with_label("Broken Bridge -> Bai Causeway")
                .with_pace(6.0)
                .with_easing(Easing::EaseInOut),
                Segment::new(
                    "seg-sudi",
                    vec![
                        [120.164181, 30.263863],
                        [120.161345, 30.258998],
                        [120.158423, 30.254901],
                        [120.155352, 30.251244],
                    ],
                )
                .with_label("Bai Causeway -> Su Causeway")
                .with_pace(5.5)
                .with_dwell_ms(15_000.0)
                .with_easing(Easing::EaseOut),
            ],
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}
