//! Pipeline kinds and the components serving them

use crate::workload::WorkloadKind;
use serde::{Deserialize, Serialize};

/// Type of telemetry a pipeline routes.
///
/// The kind is also the prefix of every alert rule name evaluated for
/// pipelines of this kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum PipelineKind {
    Metric,
    Trace,
    Log,
}

impl PipelineKind {
    /// Prefix of alert rule names
    pub fn rule_prefix(self) -> &'static str {
        match self {
            PipelineKind::Metric => "Metric",
            PipelineKind::Trace => "Trace",
            PipelineKind::Log => "Log",
        }
    }

    pub fn component(self) -> Component {
        match self {
            PipelineKind::Metric | PipelineKind::Trace => Component::Gateway,
            PipelineKind::Log => Component::Agent,
        }
    }

    /// Unit of telemetry data in plural, used in condition messages
    pub fn signal(self) -> &'static str {
        match self {
            PipelineKind::Metric => "metrics",
            PipelineKind::Trace => "spans",
            PipelineKind::Log => "logs",
        }
    }

    pub fn signal_singular(self) -> &'static str {
        match self {
            PipelineKind::Metric => "metric",
            PipelineKind::Trace => "span",
            PipelineKind::Log => "log",
        }
    }

    /// User documentation page of the pipeline kind
    pub fn docs_page(self) -> &'static str {
        match self {
            PipelineKind::Metric => "04-metrics",
            PipelineKind::Trace => "03-traces",
            PipelineKind::Log => "02-logs",
        }
    }
}

/// Collector process serving pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Component {
    /// Centralized OTel Collector
    Gateway,
    /// Per-node log agent
    Agent,
}

impl Component {
    pub fn workload_kind(self) -> WorkloadKind {
        match self {
            Component::Gateway => WorkloadKind::Deployment,
            Component::Agent => WorkloadKind::DaemonSet,
        }
    }
}
