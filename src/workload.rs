//! Readiness diagnosis for the DaemonSets and Deployments running the
//! telemetry components.
//!
//! A probe never fails: every outcome, including API errors, is reported as a
//! [`FailureDiagnosis`], so that the caller can switch over it exhaustively.
mod daemonset;
mod deployment;
mod pods;
mod reader;
mod rollout;
mod selector;

#[cfg(test)]
pub(crate) mod fake;

pub use self::reader::{KubeWorkloadReader, ReadError, WorkloadReader};
pub use self::rollout::{DaemonSetSummary, ReplicaSetSummary, Rollout, RolloutSummary};
pub use self::selector::{Selector, SelectorError};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind of workload backing a telemetry component
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum WorkloadKind {
    /// Per-node agent
    DaemonSet,
    /// Centralized gateway
    Deployment,
}

/// Identifies a single workload in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadIdentity {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl WorkloadIdentity {
    pub fn daemon_set(namespace: &str, name: &str) -> Self {
        WorkloadIdentity {
            kind: WorkloadKind::DaemonSet,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn deployment(namespace: &str, name: &str) -> Self {
        WorkloadIdentity {
            kind: WorkloadKind::Deployment,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl Display for WorkloadIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Outcome of a workload probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDiagnosis {
    /// All desired pods are updated and ready
    Ready,
    /// Pods are being started or updated, and none of them reports a problem yet
    RolloutInProgress,
    /// The workload does not exist
    NotFound { kind: WorkloadKind },
    /// The workload selects no pods at all
    NoPodsScheduled,
    /// A pod can not leave the Pending phase.
    /// `container` is None when the pod was not scheduled.
    PodPending {
        pod: String,
        container: Option<String>,
        reason: String,
        message: String,
    },
    PodFailed {
        pod: String,
        message: String,
    },
    /// A container of a running pod is waiting, e.g. in a crash loop
    ContainerNotRunning {
        pod: String,
        container: String,
        reason: Option<String>,
        message: String,
    },
    /// Workload state could not be read. Callers are expected to retry later.
    ProbeError { cause: String },
}

impl FailureDiagnosis {
    pub fn is_ready(&self) -> bool {
        matches!(self, FailureDiagnosis::Ready)
    }

    /// True for concrete, actionable pod or container problems
    pub fn is_diagnosed_problem(&self) -> bool {
        matches!(
            self,
            FailureDiagnosis::NoPodsScheduled
                | FailureDiagnosis::PodPending { .. }
                | FailureDiagnosis::PodFailed { .. }
                | FailureDiagnosis::ContainerNotRunning { .. }
        )
    }
}

impl Display for FailureDiagnosis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FailureDiagnosis::Ready => f.write_str("Pods are ready"),
            FailureDiagnosis::RolloutInProgress => f.write_str("Pods are being started/updated"),
            FailureDiagnosis::NotFound { kind } => write!(f, "{} is not yet created", kind),
            FailureDiagnosis::NoPodsScheduled => f.write_str("No Pods are scheduled"),
            FailureDiagnosis::PodPending {
                container: None,
                message,
                ..
            } => write!(f, "Pod is not scheduled: {}", message),
            FailureDiagnosis::PodPending {
                container: Some(container),
                reason,
                ..
            } => write!(
                f,
                "Pod is in the pending state because container: {} is not running due to: {}. Please check the container: {} logs.",
                container, reason, container
            ),
            FailureDiagnosis::PodFailed { message, .. } => {
                write!(f, "Pod is in the failed state due to: {}", message)
            }
            FailureDiagnosis::ContainerNotRunning {
                container,
                reason: Some(reason),
                ..
            } => write!(
                f,
                "Container: {} is not running due to: {}. Please check the container: {} logs.",
                container, reason, container
            ),
            FailureDiagnosis::ContainerNotRunning {
                container,
                reason: None,
                message,
                ..
            } => {
                if message.is_empty() {
                    write!(f, "Container: {} is not running", container)
                } else {
                    write!(f, "Container: {} is not running: {}", container, message)
                }
            }
            FailureDiagnosis::ProbeError { cause } => f.write_str(cause),
        }
    }
}

/// Decides whether telemetry workloads are ready, and if not, why.
///
/// Holds nothing but the injected reader, so one prober can be shared between
/// concurrent reconciliations.
pub struct WorkloadStatusProber<R> {
    reader: R,
}

impl<R: WorkloadReader> WorkloadStatusProber<R> {
    pub fn new(reader: R) -> Self {
        WorkloadStatusProber { reader }
    }

    #[tracing::instrument(skip(self, workload), fields(workload = %workload))]
    pub async fn is_ready(&self, workload: &WorkloadIdentity) -> FailureDiagnosis {
        let diagnosis = match workload.kind {
            WorkloadKind::DaemonSet => {
                daemonset::probe(&self.reader, &workload.namespace, &workload.name).await
            }
            WorkloadKind::Deployment => {
                deployment::probe(&self.reader, &workload.namespace, &workload.name).await
            }
        };
        match &diagnosis {
            FailureDiagnosis::ProbeError { cause } => {
                tracing::warn!("failed to probe workload: {}", cause)
            }
            other => tracing::debug!(diagnosis = ?other, "probed workload"),
        }
        diagnosis
    }
}

/// Maps a failed read to a diagnosis
fn read_failure(err: ReadError, kind: WorkloadKind, namespace: &str, name: &str) -> FailureDiagnosis {
    match err {
        ReadError::NotFound => FailureDiagnosis::NotFound { kind },
        ReadError::Other(err) => FailureDiagnosis::ProbeError {
            cause: format!("failed to get {}/{} {}: {:#}", namespace, name, kind, err),
        },
    }
}
