//! Settings of the health probes
use crate::{
    pipeline::{Component, PipelineKind},
    workload::WorkloadIdentity,
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the self-monitor and the telemetry workloads live.
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SelfMonitorConfig {
    pub self_monitor_name: String,
    pub self_monitor_namespace: String,
    pub self_monitor_port: u16,
    /// Upper bound for a single alert query
    pub alert_query_timeout_seconds: u64,
    /// Namespace of the gateways and the agent
    pub target_namespace: String,
    pub metric_gateway_name: String,
    pub trace_gateway_name: String,
    pub log_agent_name: String,
}

impl Default for SelfMonitorConfig {
    fn default() -> Self {
        SelfMonitorConfig {
            self_monitor_name: "telemetry-self-monitor".to_string(),
            self_monitor_namespace: "kyma-system".to_string(),
            self_monitor_port: 9090,
            alert_query_timeout_seconds: 10,
            target_namespace: "kyma-system".to_string(),
            metric_gateway_name: "telemetry-metric-gateway".to_string(),
            trace_gateway_name: "telemetry-trace-gateway".to_string(),
            log_agent_name: "telemetry-fluent-bit".to_string(),
        }
    }
}

impl SelfMonitorConfig {
    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let config: SelfMonitorConfig = serde_yaml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("selfMonitorName", &self.self_monitor_name),
            ("selfMonitorNamespace", &self.self_monitor_namespace),
            ("targetNamespace", &self.target_namespace),
            ("metricGatewayName", &self.metric_gateway_name),
            ("traceGatewayName", &self.trace_gateway_name),
            ("logAgentName", &self.log_agent_name),
        ];
        if let Some((field, _)) = names.iter().find(|(_, value)| value.is_empty()) {
            return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
        }
        if self.alert_query_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "alertQueryTimeoutSeconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the self-monitor's alerting API
    pub fn prometheus_url(&self) -> String {
        format!(
            "http://{}.{}:{}",
            self.self_monitor_name, self.self_monitor_namespace, self.self_monitor_port
        )
    }

    pub fn alert_query_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_query_timeout_seconds)
    }

    /// Workload serving pipelines of `kind`
    pub fn workload_for(&self, kind: PipelineKind) -> WorkloadIdentity {
        let name = match kind {
            PipelineKind::Metric => &self.metric_gateway_name,
            PipelineKind::Trace => &self.trace_gateway_name,
            PipelineKind::Log => &self.log_agent_name,
        };
        match kind.component() {
            Component::Gateway => WorkloadIdentity::deployment(&self.target_namespace, name),
            Component::Agent => WorkloadIdentity::daemon_set(&self.target_namespace, name),
        }
    }
}
