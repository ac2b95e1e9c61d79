use std::{any::Any, error, fmt, future::Future, panic::AssertUnwindSafe};

use async_trait::async_trait;
use futures::FutureExt;
use model::simulation::LocationFix;
use serde::{ser::SerializeStruct, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Accuracy {
    Fine,
    Coarse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Power {
    Low,
    High,
}

/// A named location provider inside the sink, e.g. `gps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    pub name: String,
    pub accuracy: Accuracy,
    pub power: Power,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, accuracy: Accuracy, power: Power) -> Self {
        Self {
            name: name.into(),
            accuracy,
            power,
        }
    }

    /// The providers a device location stack usually offers.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("gps", Accuracy::Fine, Power::High),
            Self::new("network", Accuracy::Coarse, Power::Low),
            Self::new("fused", Accuracy::Fine, Power::Low),
        ]
    }
}

#[derive(Debug)]
pub enum SinkError {
    /// The provider does not exist or may not be mocked.
    Unavailable(String),
    /// The provider exists but refused the request.
    Rejected(String),
    /// The sink panicked while handling the request.
    Panicked(String),
    Other(Box<dyn error::Error + Send + Sync>),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(why) => write!(f, "provider unavailable: {}", why),
            Self::Rejected(why) => write!(f, "request rejected: {}", why),
            Self::Panicked(why) => write!(f, "sink panicked: {}", why),
            Self::Other(why) => write!(f, "{}", why),
        }
    }
}

impl error::Error for SinkError {}

/// The receiving end of a simulation, usually the platform location stack.
///
/// Implementations should return quickly. Every call is made from a playback
/// task, never from the dispatcher itself, so a slow sink only delays its own
/// deliveries.
#[async_trait]
pub trait LocationSink: Send + Sync + 'static {
    /// Registers (or re-registers) the provider so it accepts mock positions.
    async fn arm(&self, provider: &ProviderSpec) -> Result<(), SinkError>;

    async fn push(&self, provider: &ProviderSpec, fix: &LocationFix) -> Result<(), SinkError>;

    async fn disarm(&self, provider: &ProviderSpec) -> Result<(), SinkError>;
}

/// Result of one sink call for one provider.
#[derive(Debug)]
pub struct ProviderOutcome {
    pub provider: String,
    pub result: Result<(), SinkError>,
}

impl ProviderOutcome {
    pub fn new(provider: impl Into<String>, result: Result<(), SinkError>) -> Self {
        Self {
            provider: provider.into(),
            result,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl Serialize for ProviderOutcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ProviderOutcome", 3)?;
        state.serialize_field("provider", &self.provider)?;
        state.serialize_field("ok", &self.result.is_ok())?;
        match &self.result {
            Ok(()) => state.skip_field("error")?,
            Err(why) => state.serialize_field("error", &why.to_string())?,
        }
        state.end()
    }
}

fn panic_message(why: &(dyn Any + Send)) -> String {
    if let Some(message) = why.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = why.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Runs a sink call and turns a panic into `SinkError::Panicked`.
pub(crate) async fn guarded<F>(call: F) -> Result<(), SinkError>
where
    F: Future<Output = Result<(), SinkError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(why) => Err(SinkError::Panicked(panic_message(why.as_ref()))),
    }
}

/// Arms every provider. A failing provider does not keep the others from
/// being armed.
pub(crate) async fn arm_all(
    sink: &dyn LocationSink,
    providers: &[ProviderSpec],
) -> Vec<ProviderOutcome> {
    let mut outcomes = Vec::with_capacity(providers.len());
    for provider in providers {
        let result = guarded(sink.arm(provider)).await;
        match &result {
            Ok(()) => log::debug!("provider `{}` armed", provider.name),
            Err(why) => log::error!("failed to arm provider `{}`: {}", provider.name, why),
        }
        outcomes.push(ProviderOutcome::new(provider.name.clone(), result));
    }
    outcomes
}

/// Disarms every provider, best effort.
pub(crate) async fn disarm_all(
    sink: &dyn LocationSink,
    providers: &[ProviderSpec],
) -> Vec<ProviderOutcome> {
    let mut outcomes = Vec::with_capacity(providers.len());
    for provider in providers {
        let result = guarded(sink.disarm(provider)).await;
        if let Err(why) = &result {
            log::warn!("failed to disarm provider `{}`: {}", provider.name, why);
        }
        outcomes.push(ProviderOutcome::new(provider.name.clone(), result));
    }
    outcomes
}

/// Pushes one fix to every provider.
pub(crate) async fn push_all(
    sink: &dyn LocationSink,
    providers: &[ProviderSpec],
    fix: &LocationFix,
) -> Vec<ProviderOutcome> {
    let mut outcomes = Vec::with_capacity(providers.len());
    for provider in providers {
        let result = guarded(sink.push(provider, fix)).await;
        match &result {
            Ok(()) => log::trace!("pushed {:?} to `{}`", fix, provider.name),
            Err(why) => log::error!("failed to push location to `{}`: {}", provider.name, why),
        }
        outcomes.push(ProviderOutcome::new(provider.name.clone(), result));
    }
    outcomes
}

/// A sink that only writes what it receives to the log. Used where no device
/// location stack is available.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl LocationSink for LogSink {
    async fn arm(&self, provider: &ProviderSpec) -> Result<(), SinkError> {
        log::info!(
            "test provider ready: {} ({:?}, {:?} power)",
            provider.name,
            provider.accuracy,
            provider.power
        );
        Ok(())
    }

    async fn push(&self, provider: &ProviderSpec, fix: &LocationFix) -> Result<(), SinkError> {
        log::info!(
            "{}: {:.6}, {:.6} at {:.0} ms, {:.2} m/s",
            provider.name,
            fix.coordinate.latitude,
            fix.coordinate.longitude,
            fix.timestamp_ms,
            fix.speed_mps
        );
        Ok(())
    }

    async fn disarm(&self, provider: &ProviderSpec) -> Result<(), SinkError> {
        log::info!("test provider disabled: {}", provider.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use model::{Coordinate, ExampleData};

    use super::*;

    struct FlakySink;

    #[async_trait]
    impl LocationSink for FlakySink {
        async fn arm(&self, provider: &ProviderSpec) -> Result<(), SinkError> {
            match provider.name.as_str() {
                "gps" => Err(SinkError::Unavailable("not a mock location app".into())),
                "fused" => panic!("fused provider exploded"),
                _ => Ok(()),
            }
        }

        async fn push(&self, _: &ProviderSpec, _: &LocationFix) -> Result<(), SinkError> {
            Err(SinkError::Rejected("provider disabled".into()))
        }

        async fn disarm(&self, _: &ProviderSpec) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn arming_continues_after_failures() {
        let outcomes = arm_all(&FlakySink, &ProviderSpec::defaults()).await;
        let results = outcomes
            .iter()
            .map(|o| (o.provider.as_str(), o.is_ok()))
            .collect::<Vec<_>>();
        assert_eq!(
            results,
            vec![("gps", false), ("network", true), ("fused", false)]
        );
        assert!(matches!(
            outcomes[2].result,
            Err(SinkError::Panicked(ref message)) if message == "fused provider exploded"
        ));
    }

    #[tokio::test]
    async fn push_failures_are_reported_per_provider() {
        let fix = LocationFix::target(Coordinate::example_data(), 0.0);
        let outcomes = push_all(&FlakySink, &ProviderSpec::defaults(), &fix).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| !o.is_ok()));
    }

    #[tokio::test]
    async fn log_sink_accepts_everything() {
        let providers = ProviderSpec::defaults();
        let fix = LocationFix::target(Coordinate::example_data(), 0.0);
        assert!(arm_all(&LogSink, &providers).await.iter().all(ProviderOutcome::is_ok));
        assert!(push_all(&LogSink, &providers, &fix).await.iter().all(ProviderOutcome::is_ok));
        assert!(disarm_all(&LogSink, &providers).await.iter().all(ProviderOutcome::is_ok));
    }

    #[test]
    fn outcomes_serialize_with_error_text() {
        let ok = serde_json::to_value(ProviderOutcome::new("gps", Ok(()))).unwrap();
        assert_eq!(ok, serde_json::json!({ "provider": "gps", "ok": true }));

        let failed = serde_json::to_value(ProviderOutcome::new(
            "network",
            Err(SinkError::Rejected("disabled".into())),
        ))
        .unwrap();
        assert_eq!(
            failed,
            serde_json::json!({
                "provider": "network",
                "ok": false,
                "error": "request rejected: disabled"
            })
        );
    }
}
