//! Telemetry flow health of a single pipeline, derived from firing alerts

use crate::{
    alerts::{matches, AlertGetter, AlertQueryError, RawAlert, RuleSelector},
    pipeline::{Component, PipelineKind},
    rules::BaseRule,
};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Facets of a pipeline's data flow.
///
/// `all_data_dropped` and `some_data_dropped` are never both set. Gateway
/// pipelines never report `buffer_filling_up` or `no_data_delivered`, agent
/// pipelines never report `queue_almost_full` or `throttling`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineFlowHealth {
    pub healthy: bool,
    pub all_data_dropped: bool,
    pub some_data_dropped: bool,
    pub queue_almost_full: bool,
    pub throttling: bool,
    pub buffer_filling_up: bool,
    pub no_data_delivered: bool,
}

impl PipelineFlowHealth {
    pub fn healthy() -> Self {
        PipelineFlowHealth {
            healthy: true,
            ..Default::default()
        }
    }
}

/// Evaluates the facets of `pipeline_name` from a set of alerts
pub fn evaluate(kind: PipelineKind, alerts: &[RawAlert], pipeline_name: &str) -> PipelineFlowHealth {
    let firing = |rule: BaseRule| {
        alerts
            .iter()
            .any(|alert| matches(alert, RuleSelector::Base(rule), pipeline_name, kind))
    };
    match kind.component() {
        Component::Gateway => {
            let all_data_dropped = firing(BaseRule::GatewayAllDataDropped);
            let some_data_dropped = !all_data_dropped && firing(BaseRule::GatewaySomeDataDropped);
            let queue_almost_full = firing(BaseRule::GatewayQueueAlmostFull);
            let throttling = firing(BaseRule::GatewayThrottling);
            PipelineFlowHealth {
                // a filling queue alone does not lose data
                healthy: !(all_data_dropped || some_data_dropped || throttling),
                all_data_dropped,
                some_data_dropped,
                queue_almost_full,
                throttling,
                ..Default::default()
            }
        }
        Component::Agent => {
            let all_data_dropped = firing(BaseRule::AgentAllDataDropped);
            let some_data_dropped = !all_data_dropped && firing(BaseRule::AgentSomeDataDropped);
            let buffer_filling_up = firing(BaseRule::AgentBufferInUse);
            let no_data_delivered = firing(BaseRule::AgentNoLogsDelivered);
            PipelineFlowHealth {
                healthy: !(all_data_dropped
                    || some_data_dropped
                    || buffer_filling_up
                    || no_data_delivered),
                all_data_dropped,
                some_data_dropped,
                buffer_filling_up,
                no_data_delivered,
                ..Default::default()
            }
        }
    }
}

/// Probes the flow health of pipelines of one kind
pub struct FlowProber<G> {
    getter: G,
    kind: PipelineKind,
    timeout: Duration,
}

impl<G: AlertGetter> FlowProber<G> {
    pub fn new(kind: PipelineKind, getter: G) -> Self {
        FlowProber {
            getter,
            kind,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Bounds the alert query. Exceeding it fails the probe.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    #[tracing::instrument(skip(self), fields(kind = %self.kind))]
    pub async fn probe(&self, pipeline_name: &str) -> Result<PipelineFlowHealth, AlertQueryError> {
        let alerts = match tokio::time::timeout(self.timeout, self.getter.alerts()).await {
            Ok(alerts) => alerts?,
            Err(_) => return Err(AlertQueryError::Timeout(self.timeout)),
        };
        let health = evaluate(self.kind, &alerts, pipeline_name);
        tracing::debug!(alerts = alerts.len(), ?health, "evaluated flow health");
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertState;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    enum FakeGetter {
        Alerts(Vec<RawAlert>),
        Failing(&'static str),
        Slow(Duration),
    }

    #[async_trait]
    impl AlertGetter for FakeGetter {
        async fn alerts(&self) -> Result<Vec<RawAlert>, AlertQueryError> {
            match self {
                FakeGetter::Alerts(alerts) => Ok(alerts.clone()),
                FakeGetter::Failing(msg) => Err(AlertQueryError::Api {
                    error_type: "unavailable".to_string(),
                    message: msg.to_string(),
                }),
                FakeGetter::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    async fn probe(kind: PipelineKind, alerts: Vec<RawAlert>) -> PipelineFlowHealth {
        FlowProber::new(kind, FakeGetter::Alerts(alerts))
            .probe("cls")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn no_alerts_is_healthy() {
        for kind in &[PipelineKind::Metric, PipelineKind::Trace, PipelineKind::Log] {
            assert_eq!(probe(*kind, Vec::new()).await, PipelineFlowHealth::healthy());
        }
    }

    #[tokio::test]
    async fn gateway_all_data_dropped() {
        let health = probe(
            PipelineKind::Trace,
            vec![
                RawAlert::firing("TraceGatewayAllDataDropped", &[("exporter", "otlp/cls")]),
                RawAlert::firing("TraceGatewaySomeDataDropped", &[("exporter", "otlp/cls")]),
            ],
        )
        .await;
        assert_eq!(
            health,
            PipelineFlowHealth {
                all_data_dropped: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn gateway_some_data_dropped() {
        let health = probe(
            PipelineKind::Metric,
            vec![RawAlert::firing("MetricGatewaySomeDataDropped", &[("pipeline_name", "cls")])],
        )
        .await;
        assert_eq!(
            health,
            PipelineFlowHealth {
                some_data_dropped: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn queue_almost_full_alone_stays_healthy() {
        let health = probe(
            PipelineKind::Trace,
            vec![RawAlert::firing("TraceGatewayQueueAlmostFull", &[("exporter", "otlp/cls")])],
        )
        .await;
        assert_eq!(
            health,
            PipelineFlowHealth {
                healthy: true,
                queue_almost_full: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn throttling_is_unhealthy() {
        let health = probe(
            PipelineKind::Metric,
            vec![RawAlert::firing("MetricGatewayThrottling", &[("receiver", "otlp")])],
        )
        .await;
        assert!(!health.healthy);
        assert!(health.throttling);
    }

    #[tokio::test]
    async fn agent_facets() {
        let health = probe(
            PipelineKind::Log,
            vec![
                RawAlert::firing("LogAgentBufferInUse", &[("pipeline_name", "cls")]),
                RawAlert::firing("LogAgentNoLogsDelivered", &[("pipeline_name", "cls")]),
                RawAlert::firing("LogAgentAllDataDropped", &[("pipeline_name", "other")]),
            ],
        )
        .await;
        assert_eq!(
            health,
            PipelineFlowHealth {
                buffer_filling_up: true,
                no_data_delivered: true,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn other_kinds_and_pending_alerts_are_ignored() {
        let mut pending = RawAlert::firing("LogAgentAllDataDropped", &[]);
        pending.state = AlertState::Pending;
        let health = probe(
            PipelineKind::Log,
            vec![pending, RawAlert::firing("TraceGatewayAllDataDropped", &[])],
        )
        .await;
        assert_eq!(health, PipelineFlowHealth::healthy());
    }

    #[test]
    fn dropped_facets_are_exclusive() {
        let pool = [
            RawAlert::firing("MetricGatewayAllDataDropped", &[]),
            RawAlert::firing("MetricGatewaySomeDataDropped", &[]),
            RawAlert::firing("MetricGatewayQueueAlmostFull", &[]),
            RawAlert::firing("LogAgentAllDataDropped", &[]),
            RawAlert::firing("LogAgentSomeDataDropped", &[]),
            RawAlert::firing("LogAgentBufferInUse", &[]),
        ];
        for mask in 0u32..(1 << pool.len()) {
            let alerts = pool
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, a)| a.clone())
                .collect::<Vec<_>>();
            for kind in &[PipelineKind::Metric, PipelineKind::Log] {
                let health = evaluate(*kind, &alerts, "cls");
                assert!(
                    !(health.all_data_dropped && health.some_data_dropped),
                    "{:?} {:?}",
                    kind,
                    alerts
                );
            }
        }
    }

    #[tokio::test]
    async fn query_failure_is_propagated() {
        let err = FlowProber::new(PipelineKind::Log, FakeGetter::Failing("not ready"))
            .probe("cls")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "alerting API returned error unavailable: not ready"
        );
    }

    #[tokio::test]
    async fn slow_query_times_out() {
        let err = FlowProber::new(PipelineKind::Trace, FakeGetter::Slow(Duration::from_secs(5)))
            .with_timeout(Duration::from_millis(20))
            .probe("cls")
            .await
            .unwrap_err();
        assert!(matches!(err, AlertQueryError::Timeout(_)), "{:?}", err);
    }
}
