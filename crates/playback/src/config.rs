use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Pause between two target broadcasts.
    pub target_interval: Duration,
    /// How long the target keeps being broadcast after a start.
    pub target_duration: Duration,
    /// Delay of the first timeline sample when a target is broadcast as well.
    pub lead_in: Duration,
    pub mailbox_size: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            target_interval: Duration::from_millis(1000),
            target_duration: Duration::from_millis(60_000),
            lead_in: Duration::from_millis(1500),
            mailbox_size: 32,
        }
    }
}

impl PlaybackConfig {
    /// Reads `PLAYBACK_TARGET_INTERVAL_MS`, `PLAYBACK_TARGET_DURATION_MS`,
    /// `PLAYBACK_LEAD_IN_MS` and `PLAYBACK_MAILBOX_SIZE`. Missing or invalid
    /// values keep their defaults.
    pub fn from_env() -> Self {
        let default = Self::default();
        let target_interval_ms: u64 =
            parse_env("PLAYBACK_TARGET_INTERVAL_MS", millis(default.target_interval));
        let target_duration_ms: u64 =
            parse_env("PLAYBACK_TARGET_DURATION_MS", millis(default.target_duration));
        let lead_in_ms: u64 = parse_env("PLAYBACK_LEAD_IN_MS", millis(default.lead_in));
        let mailbox_size: usize = parse_env("PLAYBACK_MAILBOX_SIZE", default.mailbox_size);

        Self {
            // tokio intervals must not be zero
            target_interval: if target_interval_ms == 0 {
                log::warn!("PLAYBACK_TARGET_INTERVAL_MS must be positive, using default");
                default.target_interval
            } else {
                Duration::from_millis(target_interval_ms)
            },
            target_duration: Duration::from_millis(target_duration_ms),
            lead_in: Duration::from_millis(lead_in_ms),
            mailbox_size: mailbox_size.max(1),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

fn parse_env<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            log::warn!("could not parse {}={:?}, using default", key, value);
            default
        }),
        Err(_) => default,
    }
}
