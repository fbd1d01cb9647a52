use super::{
    pods, read_failure, FailureDiagnosis, ReplicaSetSummary, RolloutSummary, Selector,
    WorkloadKind, WorkloadReader,
};
use k8s_openapi::api::{
    apps::v1::{Deployment, ReplicaSet},
    core::v1::PodTemplateSpec,
};

/// Label added by the Deployment controller to every ReplicaSet template
const POD_TEMPLATE_HASH_LABEL: &str = "pod-template-hash";

pub(super) async fn probe<R: WorkloadReader>(
    reader: &R,
    namespace: &str,
    name: &str,
) -> FailureDiagnosis {
    let deployment = match reader.get_deployment(namespace, name).await {
        Ok(d) => d,
        Err(err) => return read_failure(err, WorkloadKind::Deployment, namespace, name),
    };
    let spec = match deployment.spec.as_ref() {
        Some(spec) => spec,
        None => {
            return FailureDiagnosis::ProbeError {
                cause: format!("Deployment {}/{} has no .spec", namespace, name),
            }
        }
    };
    let selector = match Selector::from_label_selector(&spec.selector) {
        Ok(s) => s,
        Err(err) => {
            return FailureDiagnosis::ProbeError {
                cause: format!("Deployment {}/{} has invalid selector: {}", namespace, name, err),
            }
        }
    };

    let replica_sets = match reader.list_replica_sets(namespace, &selector).await {
        Ok(rs) => rs,
        Err(err) => {
            return FailureDiagnosis::ProbeError {
                cause: format!(
                    "failed to list ReplicaSets of Deployment {}/{}: {:#}",
                    namespace, name, err
                ),
            }
        }
    };
    let desired = spec.replicas.unwrap_or(1);
    match current_replica_set(&deployment, &replica_sets) {
        Some(rs) => {
            let summary = ReplicaSetSummary::new(desired, rs);
            tracing::debug!(replica_set = ?rs.metadata.name, summary = ?summary, "current ReplicaSet");
            if summary.complete() {
                return FailureDiagnosis::Ready;
            }
        }
        None => tracing::debug!("Deployment has no current ReplicaSet"),
    }

    let pods = match reader.list_pods(namespace, &selector).await {
        Ok(pods) => pods,
        Err(err) => {
            return FailureDiagnosis::ProbeError {
                cause: format!(
                    "failed to list pods of Deployment {}/{}: {:#}",
                    namespace, name, err
                ),
            }
        }
    };
    pods::diagnose(&pods).unwrap_or(FailureDiagnosis::RolloutInProgress)
}

/// Finds the ReplicaSet running the Deployment's current template.
///
/// Only ReplicaSets controlled by the Deployment are considered. If several
/// share the template, the oldest wins, then the one with the smallest name.
pub(super) fn current_replica_set<'a>(
    deployment: &Deployment,
    replica_sets: &'a [ReplicaSet],
) -> Option<&'a ReplicaSet> {
    let template = without_hash(&deployment.spec.as_ref()?.template);
    let mut candidates = replica_sets
        .iter()
        .filter(|rs| is_controlled_by(rs, deployment))
        .filter(|rs| {
            rs.spec
                .as_ref()
                .and_then(|spec| spec.template.as_ref())
                .map_or(false, |t| without_hash(t) == template)
        })
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| {
        let created_a = a.metadata.creation_timestamp.as_ref().map(|t| t.0);
        let created_b = b.metadata.creation_timestamp.as_ref().map(|t| t.0);
        // objects without timestamp go last
        (created_a.is_none(), created_a)
            .cmp(&(created_b.is_none(), created_b))
            .then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });
    candidates.into_iter().next()
}

fn without_hash(template: &PodTemplateSpec) -> PodTemplateSpec {
    let mut template = template.clone();
    if let Some(labels) = template
        .metadata
        .as_mut()
        .and_then(|meta| meta.labels.as_mut())
    {
        labels.remove(POD_TEMPLATE_HASH_LABEL);
    }
    template
}

fn is_controlled_by(replica_set: &ReplicaSet, deployment: &Deployment) -> bool {
    let owners = match replica_set.metadata.owner_references.as_ref() {
        Some(o) => o,
        None => return false,
    };
    owners.iter().any(|owner| {
        if owner.controller != Some(true) || owner.kind != "Deployment" {
            return false;
        }
        match deployment.metadata.uid.as_deref() {
            Some(uid) => owner.uid == uid,
            None => Some(&owner.name) == deployment.metadata.name.as_ref(),
        }
    })
}
