//! User facing status conditions of a telemetry pipeline
use crate::{
    alerts::AlertQueryError,
    flow::PipelineFlowHealth,
    pipeline::{Component, PipelineKind},
    workload::FailureDiagnosis,
};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use serde::Serialize;

pub const TYPE_AGENT_HEALTHY: &str = "AgentHealthy";
pub const TYPE_GATEWAY_HEALTHY: &str = "GatewayHealthy";
pub const TYPE_FLOW_HEALTHY: &str = "TelemetryFlowHealthy";

pub const REASON_AGENT_READY: &str = "AgentReady";
pub const REASON_AGENT_NOT_READY: &str = "AgentNotReady";
pub const REASON_GATEWAY_READY: &str = "GatewayReady";
pub const REASON_GATEWAY_NOT_READY: &str = "GatewayNotReady";
pub const REASON_ROLLOUT_IN_PROGRESS: &str = "RolloutInProgress";
pub const REASON_NOT_FOUND: &str = "NotFound";

pub const REASON_FLOW_HEALTHY: &str = "FlowHealthy";
pub const REASON_ALL_DATA_DROPPED: &str = "AllDataDropped";
pub const REASON_SOME_DATA_DROPPED: &str = "SomeDataDropped";
pub const REASON_GATEWAY_THROTTLING: &str = "GatewayThrottling";
pub const REASON_NO_LOGS_DELIVERED: &str = "NoLogsDelivered";
pub const REASON_BUFFER_FILLING_UP: &str = "BufferFillingUp";
pub const REASON_QUEUE_ALMOST_FULL: &str = "QueueAlmostFull";
pub const REASON_PROBING_FAILED: &str = "ProbingFailed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::AsRefStr)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
}

impl HealthCondition {
    fn new(type_: &str, status: ConditionStatus, reason: &str, message: String) -> Self {
        HealthCondition {
            type_: type_.to_string(),
            status,
            reason: reason.to_string(),
            message,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Condition describing the workload serving pipelines of `kind`
pub fn workload_condition(kind: PipelineKind, diagnosis: &FailureDiagnosis) -> HealthCondition {
    let component = kind.component();
    let (type_, ready, not_ready) = match component {
        Component::Agent => (TYPE_AGENT_HEALTHY, REASON_AGENT_READY, REASON_AGENT_NOT_READY),
        Component::Gateway => (
            TYPE_GATEWAY_HEALTHY,
            REASON_GATEWAY_READY,
            REASON_GATEWAY_NOT_READY,
        ),
    };
    match diagnosis {
        FailureDiagnosis::Ready => HealthCondition::new(
            type_,
            ConditionStatus::True,
            ready,
            format!(
                "{} {} {} is ready",
                kind,
                component.to_string().to_lowercase(),
                component.workload_kind()
            ),
        ),
        FailureDiagnosis::RolloutInProgress => HealthCondition::new(
            type_,
            ConditionStatus::True,
            REASON_ROLLOUT_IN_PROGRESS,
            diagnosis.to_string(),
        ),
        FailureDiagnosis::NotFound { .. } => HealthCondition::new(
            type_,
            ConditionStatus::False,
            REASON_NOT_FOUND,
            diagnosis.to_string(),
        ),
        FailureDiagnosis::NoPodsScheduled
        | FailureDiagnosis::PodPending { .. }
        | FailureDiagnosis::PodFailed { .. }
        | FailureDiagnosis::ContainerNotRunning { .. }
        | FailureDiagnosis::ProbeError { .. } => HealthCondition::new(
            type_,
            ConditionStatus::False,
            not_ready,
            diagnosis.to_string(),
        ),
    }
}

/// Most significant reason among the facets
pub fn flow_reason(kind: PipelineKind, health: &PipelineFlowHealth) -> &'static str {
    let component = kind.component();
    if health.all_data_dropped {
        REASON_ALL_DATA_DROPPED
    } else if health.some_data_dropped {
        REASON_SOME_DATA_DROPPED
    } else if component == Component::Gateway && health.throttling {
        REASON_GATEWAY_THROTTLING
    } else if component == Component::Agent && health.no_data_delivered {
        REASON_NO_LOGS_DELIVERED
    } else if health.buffer_filling_up {
        REASON_BUFFER_FILLING_UP
    } else if health.queue_almost_full {
        REASON_QUEUE_ALMOST_FULL
    } else {
        REASON_FLOW_HEALTHY
    }
}

const TROUBLESHOOTING_DOCS: &str = "https://kyma-project.io/#/telemetry-manager/user/";

fn troubleshooting(kind: PipelineKind, anchor: &str) -> String {
    format!(
        "See troubleshooting: {}{}?id={}",
        TROUBLESHOOTING_DOCS,
        kind.docs_page(),
        anchor
    )
}

fn flow_message(kind: PipelineKind, reason: &str) -> String {
    let signal = kind.signal();
    let component = kind.component().to_string().to_lowercase();
    match reason {
        REASON_ALL_DATA_DROPPED => format!(
            "Backend is not reachable or rejecting {}. All {} are dropped. {}",
            signal,
            signal,
            troubleshooting(kind, &format!("no-{}-arrive-at-the-backend", signal))
        ),
        REASON_SOME_DATA_DROPPED => {
            let anchor = match kind {
                PipelineKind::Metric => "metrics-not-arriving-at-the-destination".to_string(),
                _ => format!("not-all-{}-arrive-at-the-backend", signal),
            };
            format!(
                "Backend is reachable, but rejecting {}. Some {} are dropped. {}",
                signal,
                signal,
                troubleshooting(kind, &anchor)
            )
        }
        REASON_GATEWAY_THROTTLING => format!(
            "{} gateway is unable to receive {} at current rate. {}",
            kind,
            signal,
            troubleshooting(kind, "gateway-throttling")
        ),
        REASON_NO_LOGS_DELIVERED => format!(
            "Backend is not reachable or rejecting logs. Logs are buffered and not yet dropped. {}",
            troubleshooting(kind, "no-logs-arrive-at-the-backend")
        ),
        REASON_BUFFER_FILLING_UP | REASON_QUEUE_ALMOST_FULL => format!(
            "Buffer nearing capacity. Incoming {} rate exceeds export rate. {}",
            kind.signal_singular(),
            troubleshooting(kind, &format!("{}-buffer-filling-up", component))
        ),
        REASON_PROBING_FAILED => match kind.component() {
            Component::Agent => "Could not determine the health of the telemetry flow because the self monitor probing of agent failed".to_string(),
            Component::Gateway => "Could not determine the health of the telemetry flow because the self monitor probing failed".to_string(),
        },
        _ => "No problems detected in the telemetry flow".to_string(),
    }
}

/// Condition describing the data flow of a pipeline
pub fn flow_condition(
    kind: PipelineKind,
    probe: &Result<PipelineFlowHealth, AlertQueryError>,
) -> HealthCondition {
    match probe {
        Ok(health) => {
            let reason = flow_reason(kind, health);
            let status = if health.healthy {
                ConditionStatus::True
            } else {
                ConditionStatus::False
            };
            HealthCondition::new(TYPE_FLOW_HEALTHY, status, reason, flow_message(kind, reason))
        }
        Err(_) => HealthCondition::new(
            TYPE_FLOW_HEALTHY,
            ConditionStatus::Unknown,
            REASON_PROBING_FAILED,
            flow_message(kind, REASON_PROBING_FAILED),
        ),
    }
}

/// Workload condition followed by the flow condition
pub fn compose(
    kind: PipelineKind,
    diagnosis: &FailureDiagnosis,
    probe: &Result<PipelineFlowHealth, AlertQueryError>,
) -> Vec<HealthCondition> {
    vec![workload_condition(kind, diagnosis), flow_condition(kind, probe)]
}

/// Inserts or updates the condition of the same type.
///
/// `lastTransitionTime` only moves when the status changes.
pub fn set_status_condition(
    conditions: &mut Vec<Condition>,
    condition: &HealthCondition,
    observed_generation: Option<i64>,
    now: DateTime<Utc>,
) {
    let status = condition.status.as_ref();
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status != status {
                existing.status = status.to_string();
                existing.last_transition_time = Time(now);
            }
            existing.reason = condition.reason.clone();
            existing.message = condition.message.clone();
            existing.observed_generation = observed_generation;
        }
        None => conditions.push(Condition {
            type_: condition.type_.clone(),
            status: status.to_string(),
            reason: condition.reason.clone(),
            message: condition.message.clone(),
            observed_generation,
            last_transition_time: Time(now),
        }),
    }
}
