//! Health diagnosis for telemetry pipelines.
//!
//! Workload probes tell whether the gateways and the agent are running,
//! flow probes read the self-monitor's alerts to tell whether data reaches
//! the backends. Both are folded into status conditions.
pub mod alerts;
pub mod conditions;
pub mod config;
pub mod errors;
pub mod flow;
pub mod health;
pub mod pipeline;
pub mod rules;
pub mod workload;

pub use crate::{
    alerts::{AlertGetter, AlertQueryError, PrometheusAlertGetter, RawAlert},
    conditions::{compose, set_status_condition, HealthCondition},
    config::SelfMonitorConfig,
    flow::{FlowProber, PipelineFlowHealth},
    health::HealthChecker,
    pipeline::PipelineKind,
    workload::{FailureDiagnosis, KubeWorkloadReader, WorkloadIdentity, WorkloadStatusProber},
};
