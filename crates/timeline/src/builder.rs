use chrono::Utc;
use model::{
    route::{Route, Segment},
    timeline::{Sample, Summary, Timeline},
    Position, DEFAULT_PACE,
};
use utility::geo::{self, cumulative_lengths};

use crate::{Result, TimelineError};

/// Samples are placed at least every this many meters of path.
pub const SAMPLE_SPACING_M: f64 = 15.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Timestamp of the first sample. Defaults to the current time.
    pub start_at_ms: Option<f64>,
}

impl BuildOptions {
    pub fn starting_at(start_at_ms: f64) -> Self {
        Self {
            start_at_ms: Some(start_at_ms),
        }
    }
}

/// Converts a route into time-stamped samples and a summary.
///
/// A missing route or a route without segments yields an empty timeline.
/// Segments without length contribute neither samples, distance nor time.
/// Given a fixed `start_at_ms` the output is fully deterministic.
pub fn build(route: Option<&Route>, options: BuildOptions) -> Result<Timeline> {
    let Some(route) = route else {
        return Ok(Timeline::default());
    };
    validate(route)?;

    let start_at_ms = match options.start_at_ms {
        Some(start) if !start.is_finite() => return Err(TimelineError::NonFiniteStart(start)),
        Some(start) => start,
        None => Utc::now().timestamp_millis() as f64,
    };

    let mut samples = vec![];
    let mut cursor_ms = start_at_ms;
    let mut distance_offset_m = 0.0;
    let mut total_duration_s = 0.0;

    for segment in route.segments.iter() {
        let leg = interpolate_segment(segment, cursor_ms, distance_offset_m);
        log::debug!(
            "segment `{}`: {} samples, {:.1} m, {:.1} s",
            segment.id,
            leg.samples.len(),
            leg.length_m,
            leg.duration_s
        );
        samples.extend(leg.samples);
        cursor_ms += leg.duration_s * 1000.0;
        distance_offset_m += leg.length_m;
        total_duration_s += leg.duration_s;
    }

    Ok(Timeline {
        samples,
        summary: summarize(distance_offset_m, total_duration_s),
    })
}

fn validate(route: &Route) -> Result<()> {
    for segment in route.segments.iter() {
        if let Some(index) = segment.points.iter().position(|p| !geo::is_finite(p)) {
            return Err(TimelineError::NonFiniteCoordinate {
                segment_id: segment.id.clone(),
                index,
            });
        }
    }
    Ok(())
}

struct SegmentLeg {
    samples: Vec<Sample>,
    length_m: f64,
    /// Traversal plus dwell.
    duration_s: f64,
}

fn interpolate_segment(segment: &Segment, start_ms: f64, distance_offset_m: f64) -> SegmentLeg {
    let cumulative = cumulative_lengths(&segment.points);
    let length_m = cumulative.last().copied().unwrap_or(0.0);
    if length_m <= 0.0 {
        return SegmentLeg {
            samples: vec![],
            length_m: 0.0,
            duration_s: 0.0,
        };
    }

    let speed_mps = segment.speed_mps();
    let traversal_s = length_m / speed_mps;
    let dwell_s = segment.effective_dwell_ms() / 1000.0;
    let sample_count = ((length_m / SAMPLE_SPACING_M).ceil() as usize).max(2);
    let last_index = (sample_count - 1) as f64;

    let samples = (0..sample_count)
        .map(|index| {
            let fraction = index as f64 / last_index;
            let position = position_along(&segment.points, &cumulative, length_m * fraction);
            Sample {
                segment_id: segment.id.clone(),
                coordinate: position.into(),
                distance_from_start_m: distance_offset_m + length_m * fraction,
                timestamp_ms: start_ms + traversal_s * fraction * 1000.0,
                speed_mps,
            }
        })
        .collect();

    SegmentLeg {
        samples,
        length_m,
        duration_s: traversal_s + dwell_s,
    }
}

/// The point `distance_m` meters along the polyline. `cumulative` holds the
/// running length at every vertex.
fn position_along(points: &[Position], cumulative: &[f64], distance_m: f64) -> Position {
    let last = points.len() - 1;
    if distance_m <= 0.0 {
        return points[0];
    }
    if distance_m >= cumulative[last] {
        return points[last];
    }

    // first vertex at or beyond the requested distance, never 0 here
    let end = cumulative.partition_point(|&length| length < distance_m);
    let start = end - 1;
    let leg = cumulative[end] - cumulative[start];
    if leg <= 0.0 {
        return points[end];
    }
    geo::interpolate(
        &points[start],
        &points[end],
        (distance_m - cumulative[start]) / leg,
    )
}

fn summarize(distance_m: f64, duration_s: f64) -> Summary {
    let total_distance_km = distance_m / 1000.0;
    let estimated_duration_minutes = duration_s / 60.0;
    let average_pace = if total_distance_km > 0.0 {
        estimated_duration_minutes / total_distance_km
    } else {
        DEFAULT_PACE
    };

    Summary {
        total_distance_km: round_to(total_distance_km, 2),
        estimated_duration_minutes: round_to(estimated_duration_minutes, 1),
        average_pace: round_to(average_pace, 2),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
