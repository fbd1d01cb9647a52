//! Measuring rollout progress of workload resources

use k8s_openapi::api::apps::v1::{DaemonSet, ReplicaSet};

pub trait RolloutSummary {
    /// All desired pods run the current template and are ready
    fn complete(&self) -> bool;
}

pub trait Rollout {
    type Summary: RolloutSummary;
    fn rollout(&self) -> Self::Summary;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSetSummary {
    /// number of nodes that should run the daemon pod
    pub desired: i32,
    /// number of nodes running the updated daemon pod
    pub updated: i32,
    pub ready: i32,
}

impl RolloutSummary for DaemonSetSummary {
    fn complete(&self) -> bool {
        self.updated == self.desired && self.ready >= self.desired
    }
}

impl Rollout for DaemonSet {
    type Summary = DaemonSetSummary;
    fn rollout(&self) -> DaemonSetSummary {
        match self.status.as_ref() {
            Some(status) => DaemonSetSummary {
                desired: status.desired_number_scheduled,
                updated: status.updated_number_scheduled.unwrap_or(0),
                ready: status.number_ready,
            },
            None => DaemonSetSummary {
                desired: 0,
                updated: 0,
                ready: 0,
            },
        }
    }
}

/// Progress of the ReplicaSet running the current template of a Deployment.
/// Desired replicas are taken from the Deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaSetSummary {
    pub desired: i32,
    pub ready: i32,
}

impl ReplicaSetSummary {
    pub fn new(desired: i32, replica_set: &ReplicaSet) -> Self {
        ReplicaSetSummary {
            desired,
            ready: replica_set
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0),
        }
    }
}

impl RolloutSummary for ReplicaSetSummary {
    fn complete(&self) -> bool {
        self.ready >= self.desired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DaemonSetStatus;

    fn daemon_set(desired: i32, updated: i32, ready: i32) -> DaemonSet {
        DaemonSet {
            status: Some(DaemonSetStatus {
                desired_number_scheduled: desired,
                updated_number_scheduled: Some(updated),
                number_ready: ready,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn daemon_set_rollout() {
        assert!(daemon_set(3, 3, 3).rollout().complete());
        assert!(!daemon_set(3, 2, 3).rollout().complete());
        assert!(!daemon_set(3, 3, 2).rollout().complete());
        // no eligible nodes
        assert!(daemon_set(0, 0, 0).rollout().complete());
    }
}
