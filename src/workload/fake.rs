//! In-memory cluster state and resource fixtures for tests

use super::{ReadError, Selector, WorkloadReader};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use k8s_openapi::{
    api::{
        apps::v1::{
            DaemonSet, DaemonSetSpec, DaemonSetStatus, Deployment, DeploymentSpec, ReplicaSet,
            ReplicaSetSpec, ReplicaSetStatus,
        },
        core::v1::{
            Container, ContainerState, ContainerStateTerminated, ContainerStateWaiting,
            ContainerStatus, Pod, PodCondition, PodSpec, PodStatus, PodTemplateSpec,
        },
    },
    apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference, Time},
};
use std::collections::BTreeMap;

pub(crate) const NAMESPACE: &str = "telemetry-system";

pub(crate) fn app_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "foo".to_string());
    labels
}

/// Cluster with a fixed set of objects
#[derive(Default)]
pub(crate) struct FakeReader {
    pub(crate) daemon_sets: Vec<DaemonSet>,
    pub(crate) deployments: Vec<Deployment>,
    pub(crate) replica_sets: Vec<ReplicaSet>,
    pub(crate) pods: Vec<Pod>,
    /// When set, every call fails with this message
    pub(crate) failure: Option<String>,
}

impl FakeReader {
    fn check_failure(&self) -> Result<(), ReadError> {
        match &self.failure {
            Some(message) => Err(ReadError::Other(anyhow::anyhow!("{}", message))),
            None => Ok(()),
        }
    }
}

fn find<'a, K>(
    items: &'a [K],
    meta: impl Fn(&K) -> &ObjectMeta,
    namespace: &str,
    name: &str,
) -> Option<&'a K> {
    items.iter().find(|item| {
        let m = meta(item);
        m.namespace.as_deref() == Some(namespace) && m.name.as_deref() == Some(name)
    })
}

fn select<K: Clone>(
    items: &[K],
    meta: impl Fn(&K) -> &ObjectMeta,
    namespace: &str,
    selector: &Selector,
) -> Vec<K> {
    items
        .iter()
        .filter(|item| {
            let m = meta(item);
            m.namespace.as_deref() == Some(namespace) && selector.matches(m.labels.as_ref())
        })
        .cloned()
        .collect()
}

#[async_trait]
impl WorkloadReader for FakeReader {
    async fn get_daemon_set(&self, namespace: &str, name: &str) -> Result<DaemonSet, ReadError> {
        self.check_failure()?;
        find(&self.daemon_sets, |d| &d.metadata, namespace, name)
            .cloned()
            .ok_or(ReadError::NotFound)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ReadError> {
        self.check_failure()?;
        find(&self.deployments, |d| &d.metadata, namespace, name)
            .cloned()
            .ok_or(ReadError::NotFound)
    }

    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<ReplicaSet>, ReadError> {
        self.check_failure()?;
        Ok(select(&self.replica_sets, |r| &r.metadata, namespace, selector))
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, ReadError> {
        self.check_failure()?;
        Ok(select(&self.pods, |p| &p.metadata, namespace, selector))
    }
}

pub(crate) fn daemon_set(name: &str, desired: i32, updated: i32, ready: i32) -> DaemonSet {
    DaemonSet {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(app_labels()),
                match_expressions: None,
            },
            template: pod_template("collector:1.0"),
            ..Default::default()
        }),
        status: Some(DaemonSetStatus {
            desired_number_scheduled: desired,
            updated_number_scheduled: Some(updated),
            number_ready: ready,
            ..Default::default()
        }),
    }
}

pub(crate) fn pod_template(image: &str) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(app_labels()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "collector".to_string(),
                image: Some(image.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
    }
}

pub(crate) fn deployment(name: &str, replicas: i32, image: &str) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            uid: Some(format!("{}-uid", name)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(app_labels()),
                match_expressions: None,
            },
            template: pod_template(image),
            ..Default::default()
        }),
        status: None,
    }
}

/// ReplicaSet fixture
pub(crate) struct ReplicaSetBuilder(ReplicaSet);

impl ReplicaSetBuilder {
    pub(crate) fn new(name: &str, image: &str) -> Self {
        let mut template = pod_template(image);
        if let Some(labels) = template
            .metadata
            .as_mut()
            .and_then(|meta| meta.labels.as_mut())
        {
            labels.insert("pod-template-hash".to_string(), format!("{}-hash", name));
        }
        ReplicaSetBuilder(ReplicaSet {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(NAMESPACE.to_string()),
                labels: Some(app_labels()),
                owner_references: Some(Vec::new()),
                ..Default::default()
            },
            spec: Some(ReplicaSetSpec {
                selector: LabelSelector {
                    match_labels: Some(app_labels()),
                    match_expressions: None,
                },
                template: Some(template),
                ..Default::default()
            }),
            status: None,
        })
    }

    pub(crate) fn owned_by(mut self, deployment: &Deployment) -> Self {
        let owner = OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: deployment.metadata.name.clone().unwrap_or_default(),
            uid: deployment.metadata.uid.clone().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        };
        if let Some(refs) = self.0.metadata.owner_references.as_mut() {
            refs.push(owner);
        }
        self
    }

    /// Creation time in seconds since the epoch
    pub(crate) fn created_at(mut self, secs: i64) -> Self {
        self.0.metadata.creation_timestamp = Some(Time(Utc.timestamp_opt(secs, 0).unwrap()));
        self
    }

    pub(crate) fn ready(mut self, ready: i32) -> Self {
        self.0.status = Some(ReplicaSetStatus {
            ready_replicas: Some(ready),
            replicas: ready,
            ..Default::default()
        });
        self
    }

    pub(crate) fn build(self) -> ReplicaSet {
        self.0
    }
}

/// Pod fixture. Pods get the `app=foo` label unless overridden.
pub(crate) struct PodBuilder(Pod);

impl PodBuilder {
    pub(crate) fn new(name: &str) -> Self {
        PodBuilder(Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(NAMESPACE.to_string()),
                labels: Some(app_labels()),
                ..Default::default()
            },
            spec: None,
            status: Some(PodStatus::default()),
        })
    }

    fn status(&mut self) -> &mut PodStatus {
        self.0.status.get_or_insert_with(Default::default)
    }

    fn set_condition(&mut self, type_: &str, status: &str, reason: Option<&str>, message: Option<&str>) {
        let conditions = self.status().conditions.get_or_insert_with(Vec::new);
        conditions.retain(|c| c.type_ != type_);
        conditions.push(PodCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.map(ToString::to_string),
            message: message.map(ToString::to_string),
            ..Default::default()
        });
    }

    pub(crate) fn labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.0.metadata.labels = Some(labels);
        self
    }

    pub(crate) fn running(mut self) -> Self {
        self.status().phase = Some("Running".to_string());
        self.set_condition("PodScheduled", "True", None, None);
        self.set_condition("Ready", "True", None, None);
        self
    }

    pub(crate) fn running_not_ready(mut self) -> Self {
        self.status().phase = Some("Running".to_string());
        self.set_condition("PodScheduled", "True", None, None);
        self.set_condition("Ready", "False", Some("ContainersNotReady"), None);
        self
    }

    pub(crate) fn pending(mut self) -> Self {
        self.status().phase = Some("Pending".to_string());
        self.set_condition("PodScheduled", "True", None, None);
        self
    }

    pub(crate) fn unschedulable(mut self, message: &str) -> Self {
        self.status().phase = Some("Pending".to_string());
        self.set_condition("PodScheduled", "False", Some("Unschedulable"), Some(message));
        self
    }

    pub(crate) fn failed(mut self, message: &str) -> Self {
        let status = self.status();
        status.phase = Some("Failed".to_string());
        status.reason = Some("Evicted".to_string());
        status.message = Some(message.to_string());
        self
    }

    pub(crate) fn waiting(mut self, container: &str, reason: &str) -> Self {
        let status = waiting_status(container, reason, "Back-off pulling image");
        self.status()
            .container_statuses
            .get_or_insert_with(Vec::new)
            .push(status);
        self
    }

    pub(crate) fn init_waiting(mut self, container: &str, reason: &str) -> Self {
        let status = waiting_status(container, reason, "Back-off pulling image");
        self.status()
            .init_container_statuses
            .get_or_insert_with(Vec::new)
            .push(status);
        self
    }

    /// Container restarting after it terminated with `last_reason`
    pub(crate) fn crash_loop(mut self, container: &str, last_reason: &str) -> Self {
        let mut status = waiting_status(
            container,
            "CrashLoopBackOff",
            "back-off restarting failed container",
        );
        status.last_state = Some(ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code: 137,
                reason: Some(last_reason.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        status.restart_count = 5;
        self.status()
            .container_statuses
            .get_or_insert_with(Vec::new)
            .push(status);
        self
    }

    pub(crate) fn build(self) -> Pod {
        self.0
    }
}

fn waiting_status(container: &str, reason: &str, message: &str) -> ContainerStatus {
    ContainerStatus {
        name: container.to_string(),
        image: "collector:1.0".to_string(),
        ready: false,
        state: Some(ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(reason.to_string()),
                message: Some(message.to_string()),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
