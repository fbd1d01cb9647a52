use super::{
    pods, read_failure, FailureDiagnosis, Rollout, RolloutSummary, Selector, WorkloadKind,
    WorkloadReader,
};

pub(super) async fn probe<R: WorkloadReader>(
    reader: &R,
    namespace: &str,
    name: &str,
) -> FailureDiagnosis {
    let daemon_set = match reader.get_daemon_set(namespace, name).await {
        Ok(ds) => ds,
        Err(err) => return read_failure(err, WorkloadKind::DaemonSet, namespace, name),
    };
    let spec = match daemon_set.spec.as_ref() {
        Some(spec) => spec,
        None => {
            return FailureDiagnosis::ProbeError {
                cause: format!("DaemonSet {}/{} has no .spec", namespace, name),
            }
        }
    };

    // status is missing until the controller observed the DaemonSet
    if daemon_set.status.is_some() {
        let summary = daemon_set.rollout();
        tracing::debug!(summary = ?summary, "DaemonSet rollout");
        if summary.complete() {
            return FailureDiagnosis::Ready;
        }
    }

    let selector = match Selector::from_label_selector(&spec.selector) {
        Ok(s) => s,
        Err(err) => {
            return FailureDiagnosis::ProbeError {
                cause: format!("DaemonSet {}/{} has invalid selector: {}", namespace, name, err),
            }
        }
    };
    let pods = match reader.list_pods(namespace, &selector).await {
        Ok(pods) => pods,
        Err(err) => {
            return FailureDiagnosis::ProbeError {
                cause: format!("failed to list pods of DaemonSet {}/{}: {:#}", namespace, name, err),
            }
        }
    };
    pods::diagnose(&pods).unwrap_or(FailureDiagnosis::RolloutInProgress)
}
