//! Measuring health of telemetry pipelines

use crate::{
    alerts::AlertGetter,
    conditions::{compose, HealthCondition},
    flow::FlowProber,
    workload::{WorkloadIdentity, WorkloadReader, WorkloadStatusProber},
};

/// Probes the workload serving a pipeline kind together with the flow of
/// individual pipelines.
pub struct HealthChecker<R, G> {
    workloads: WorkloadStatusProber<R>,
    flow: FlowProber<G>,
    workload: WorkloadIdentity,
}

impl<R: WorkloadReader, G: AlertGetter> HealthChecker<R, G> {
    pub fn new(reader: R, flow: FlowProber<G>, workload: WorkloadIdentity) -> Self {
        HealthChecker {
            workloads: WorkloadStatusProber::new(reader),
            flow,
            workload,
        }
    }

    /// Both probes run concurrently. Neither failure aborts the other,
    /// failures are reported as conditions.
    #[tracing::instrument(skip(self), fields(kind = %self.flow.kind()))]
    pub async fn check(&self, pipeline_name: &str) -> Vec<HealthCondition> {
        let (diagnosis, flow) = tokio::join!(
            self.workloads.is_ready(&self.workload),
            self.flow.probe(pipeline_name)
        );
        if let Err(err) = &flow {
            tracing::warn!("failed to probe telemetry flow: {}", err);
        }
        compose(self.flow.kind(), &diagnosis, &flow)
    }
}
