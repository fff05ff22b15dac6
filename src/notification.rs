//! Severity-based notification routing
//!
//! The dispatcher decides *whether* and *where* regressions are sent; the
//! actual delivery is a [`NotificationTransport`]. Each record goes to the
//! channels its severity maps to in `severity_channels`, restricted to the
//! allowed `channels` list. Records are grouped so that each channel receives
//! one batch per dispatch.
//!
//! Transport failures are logged and collected in the [`DispatchOutcome`];
//! they never abort a run.

use crate::regression::{RegressionRecord, Severity};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Delivery mechanism for one channel ("email", "slack", ...)
pub trait NotificationTransport: Send + Sync {
    fn send(&self, records: &[RegressionRecord], channel: &str) -> Result<()>;
}

/// Transport that only writes a log line per batch
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl NotificationTransport for LogTransport {
    fn send(&self, records: &[RegressionRecord], channel: &str) -> Result<()> {
        tracing::info!("{} notification sent for {} regressions", channel, records.len());
        for record in records {
            tracing::debug!("[{}] {} {}: {}", channel, record.severity(), record.metric(), record.description());
        }
        Ok(())
    }
}

/// `[notifications]` section of the run configuration
///
/// ```toml
/// [notifications]
/// enabled = true
/// channels = ["email", "slack"]
///
/// [notifications.severity_channels]
/// critical = ["email", "slack"]
/// medium = ["slack"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Channels that may be used at all
    pub channels: Vec<String>,
    /// Severity name → channels to notify
    pub severity_channels: BTreeMap<String, Vec<String>>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        let both = vec!["email".to_string(), "slack".to_string()];
        Self {
            enabled: true,
            channels: both.clone(),
            severity_channels: BTreeMap::from([
                ("critical".to_string(), both.clone()),
                ("high".to_string(), both),
                ("medium".to_string(), vec!["slack".to_string()]),
                ("low".to_string(), Vec::new()),
            ]),
        }
    }
}

impl NotificationConfig {
    /// Configuration that never notifies
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check that every policy key is a severity and every channel is allowed
    pub fn validate(&self) -> Result<(), String> {
        for (severity, channels) in &self.severity_channels {
            severity.parse::<Severity>()?;
            if let Some(unknown) = channels.iter().find(|c| !self.channels.contains(c)) {
                return Err(format!(
                    "channel '{}' for severity {} is not in the allowed channels {:?}",
                    unknown, severity, self.channels
                ));
            }
        }
        Ok(())
    }

    /// Allowed channels for a severity, in policy order
    pub fn channels_for(&self, severity: Severity) -> Vec<&str> {
        self.severity_channels
            .iter()
            .find(|(name, _)| name.parse::<Severity>().ok() == Some(severity))
            .map(|(_, channels)| {
                channels
                    .iter()
                    .filter(|c| self.channels.contains(c))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One successfully delivered batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub channel: String,
    pub regressions: usize,
}

/// One failed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub channel: String,
    pub error: String,
}

/// What a dispatch did, channel by channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub delivered: Vec<Delivery>,
    pub failed: Vec<DeliveryFailure>,
}

impl DispatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }

    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Routes regressions to channels according to a [`NotificationConfig`]
pub struct NotificationDispatcher {
    config: NotificationConfig,
    transport: Box<dyn NotificationTransport>,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig, transport: Box<dyn NotificationTransport>) -> Self {
        Self { config, transport }
    }

    /// Dispatcher delivering through [`LogTransport`]
    pub fn logging(config: NotificationConfig) -> Self {
        Self::new(config, Box::new(LogTransport))
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    /// Group records by target channel (channel order is sorted)
    pub fn route<'a>(&self, records: &'a [RegressionRecord]) -> BTreeMap<String, Vec<&'a RegressionRecord>> {
        let mut batches: BTreeMap<String, Vec<&RegressionRecord>> = BTreeMap::new();
        if !self.config.enabled {
            return batches;
        }
        for record in records {
            for channel in self.config.channels_for(record.severity()) {
                batches.entry(channel.to_string()).or_default().push(record);
            }
        }
        batches
    }

    pub fn dispatch(&self, records: &[RegressionRecord]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if !self.config.enabled {
            tracing::debug!("Notifications disabled, {} regressions not sent", records.len());
            return outcome;
        }

        for (channel, batch) in self.route(records) {
            let batch: Vec<RegressionRecord> = batch.into_iter().cloned().collect();
            match self.transport.send(&batch, &channel) {
                Ok(()) => outcome.delivered.push(Delivery {
                    channel,
                    regressions: batch.len(),
                }),
                Err(e) => {
                    tracing::error!("Failed to send {} notification: {:#}", channel, e);
                    outcome.failed.push(DeliveryFailure {
                        channel,
                        error: format!("{:#}", e),
                    });
                }
            }
        }
        outcome
    }
}
