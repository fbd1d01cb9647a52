use super::FailureDiagnosis;
use k8s_openapi::api::core::v1::{ContainerStateWaiting, ContainerStatus, Pod, PodCondition};

/// Waiting reasons every pod passes through during a normal start
const TRANSIENT_WAITING_REASONS: &[&str] = &["PodInitializing", "ContainerCreating"];

/// Looks for the first pod that explains why a workload is not ready.
///
/// Returns None if every pod is either ready or still starting normally.
pub(super) fn diagnose(pods: &[Pod]) -> Option<FailureDiagnosis> {
    if pods.is_empty() {
        return Some(FailureDiagnosis::NoPodsScheduled);
    }
    let mut pods = pods.iter().collect::<Vec<_>>();
    pods.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    pods.into_iter().find_map(diagnose_pod)
}

fn diagnose_pod(pod: &Pod) -> Option<FailureDiagnosis> {
    let name = pod.metadata.name.clone().unwrap_or_default();
    match phase(pod) {
        Some("Running") if condition_is(pod, "Ready", "True") => None,
        Some("Running") => container_not_running(&name, pod),
        Some("Pending") => pending(&name, pod),
        Some("Failed") => {
            let status = pod.status.as_ref()?;
            let message = status
                .message
                .clone()
                .or_else(|| status.reason.clone())
                .unwrap_or_default();
            Some(FailureDiagnosis::PodFailed { pod: name, message })
        }
        _ => None,
    }
}

fn pending(pod_name: &str, pod: &Pod) -> Option<FailureDiagnosis> {
    if let Some(cond) = condition(pod, "PodScheduled").filter(|c| c.status == "False") {
        return Some(FailureDiagnosis::PodPending {
            pod: pod_name.to_string(),
            container: None,
            reason: cond
                .reason
                .clone()
                .unwrap_or_else(|| "Unschedulable".to_string()),
            message: cond.message.clone().unwrap_or_default(),
        });
    }
    let status = pod.status.as_ref()?;
    let init = status.init_container_statuses.iter().flatten();
    let regular = status.container_statuses.iter().flatten();
    for container in init.chain(regular) {
        let waiting = match waiting(container) {
            Some(w) => w,
            None => continue,
        };
        let reason = match waiting.reason.as_deref() {
            Some(r) if !is_transient(r) => r,
            _ => continue,
        };
        return Some(FailureDiagnosis::PodPending {
            pod: pod_name.to_string(),
            container: Some(container.name.clone()),
            reason: reason.to_string(),
            message: waiting.message.clone().unwrap_or_default(),
        });
    }
    None
}

fn container_not_running(pod_name: &str, pod: &Pod) -> Option<FailureDiagnosis> {
    let statuses = pod.status.as_ref()?.container_statuses.as_ref()?;
    for container in statuses {
        let waiting = match waiting(container) {
            Some(w) => w,
            None => continue,
        };
        if waiting.reason.as_deref().map_or(false, is_transient) {
            continue;
        }
        let last_terminated = container
            .last_state
            .as_ref()
            .and_then(|state| state.terminated.as_ref());
        let diagnosis = match last_terminated {
            Some(terminated) => FailureDiagnosis::ContainerNotRunning {
                pod: pod_name.to_string(),
                container: container.name.clone(),
                reason: terminated.reason.clone(),
                message: terminated
                    .message
                    .clone()
                    .or_else(|| waiting.message.clone())
                    .unwrap_or_default(),
            },
            None => FailureDiagnosis::ContainerNotRunning {
                pod: pod_name.to_string(),
                container: container.name.clone(),
                reason: None,
                message: waiting.message.clone().unwrap_or_default(),
            },
        };
        return Some(diagnosis);
    }
    None
}

fn phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|status| status.phase.as_deref())
}

fn condition<'a>(pod: &'a Pod, type_: &str) -> Option<&'a PodCondition> {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == type_))
}

fn condition_is(pod: &Pod, type_: &str, status: &str) -> bool {
    condition(pod, type_).map_or(false, |c| c.status == status)
}

fn waiting(container: &ContainerStatus) -> Option<&ContainerStateWaiting> {
    container
        .state
        .as_ref()
        .and_then(|state| state.waiting.as_ref())
}

fn is_transient(reason: &str) -> bool {
    TRANSIENT_WAITING_REASONS.contains(&reason)
}
