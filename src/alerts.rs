//! Alerts reported by the self-monitor
mod matcher;
mod prometheus;

pub use self::matcher::{
    affected_pipelines, matches, matches_pipeline, matches_rule_name, RuleSelector,
};
pub use self::prometheus::{parse_alerts_response, PrometheusAlertGetter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// Label holding the name of the rule that produced an alert
pub const LABEL_ALERT_NAME: &str = "alertname";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Inactive,
    /// Condition holds but has not yet lasted for the rule's `for` duration
    Pending,
    Firing,
}

/// Alert as returned by the alerting API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlert {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub state: AlertState,
}

impl RawAlert {
    pub fn new(state: AlertState, labels: &[(&str, &str)]) -> Self {
        RawAlert {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            state,
        }
    }

    /// Firing alert of the given rule with additional labels
    pub fn firing(rule_name: &str, labels: &[(&str, &str)]) -> Self {
        let mut alert = RawAlert::new(AlertState::Firing, labels);
        alert
            .labels
            .insert(LABEL_ALERT_NAME.to_string(), rule_name.to_string());
        alert
    }

    pub fn rule_name(&self) -> Option<&str> {
        self.labels.get(LABEL_ALERT_NAME).map(String::as_str)
    }

    pub fn is_firing(&self) -> bool {
        self.state == AlertState::Firing
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertQueryError {
    #[error("alert query timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to query alerts: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("alerting API responded with HTTP {0}")]
    Status(u16),
    #[error("failed to decode alerts response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("alerting API returned error {error_type}: {message}")]
    Api { error_type: String, message: String },
}

/// Source of the currently active alerts
#[async_trait]
pub trait AlertGetter: Send + Sync {
    async fn alerts(&self) -> Result<Vec<RawAlert>, AlertQueryError>;
}
