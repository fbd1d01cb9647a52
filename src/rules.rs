//! Catalog of the alerting rules evaluated by the self-monitor.
//!
//! Every rule is generated once per pipeline kind. The rule name is the kind
//! prefix (`Metric`, `Trace`, `Log`) followed by a [`BaseRule`] name, e.g.
//! `MetricGatewayAllDataDropped`. Rules never reference a particular pipeline:
//! the pipeline-identifying label (`exporter` for gateways, `pipeline_name`
//! for the log agent) is carried by the collector metrics themselves and kept
//! by the aggregations below.
mod expr;
mod file;

pub use self::expr::{AggregateOp, BinaryOp, CompareOp, Expr};
pub use self::file::{Rule, RuleFile, RuleGroup};

use crate::pipeline::{Component, PipelineKind};
use std::time::Duration;
use strum::IntoEnumIterator;

/// Window of every `rate()` in the catalog
pub const RATE_WINDOW: Duration = Duration::from_secs(5 * 60);
/// How long a condition must hold before its alert fires
pub const FOR_DURATION: Duration = Duration::from_secs(5 * 60);
/// Fraction of the exporter queue capacity considered almost full
pub const QUEUE_ALMOST_FULL_RATIO: f64 = 0.8;
/// Filesystem buffer usage of the log agent considered critical
pub const BUFFER_IN_USE_BYTES: f64 = 300_000_000.0;

pub const LABEL_EXPORTER: &str = "exporter";
pub const LABEL_PIPELINE_NAME: &str = "pipeline_name";
const LABEL_SERVICE: &str = "service";
const LABEL_RECEIVER: &str = "receiver";
const LABEL_DATA_TYPE: &str = "data_type";

/// Rule name without the pipeline kind prefix
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum BaseRule {
    GatewayAllDataDropped,
    GatewaySomeDataDropped,
    GatewayQueueAlmostFull,
    GatewayThrottling,
    AgentAllDataDropped,
    AgentSomeDataDropped,
    AgentBufferInUse,
    AgentNoLogsDelivered,
}

impl BaseRule {
    /// Component whose metrics the rule is evaluated on
    pub fn component(self) -> Component {
        match self {
            BaseRule::GatewayAllDataDropped
            | BaseRule::GatewaySomeDataDropped
            | BaseRule::GatewayQueueAlmostFull
            | BaseRule::GatewayThrottling => Component::Gateway,
            BaseRule::AgentAllDataDropped
            | BaseRule::AgentSomeDataDropped
            | BaseRule::AgentBufferInUse
            | BaseRule::AgentNoLogsDelivered => Component::Agent,
        }
    }

    pub fn full_name(self, kind: PipelineKind) -> String {
        format!("{}{}", kind.rule_prefix(), self.as_ref())
    }

    /// Base rules generated for pipelines of the given kind
    pub fn for_kind(kind: PipelineKind) -> impl Iterator<Item = BaseRule> {
        BaseRule::iter().filter(move |rule| rule.component() == kind.component())
    }
}

/// A single named alerting rule
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRuleSpec {
    pub name: String,
    pub expression: Expr,
    pub for_duration: Duration,
}

/// Splits a full rule name into pipeline kind and base rule.
///
/// Returns None for names that are not part of the catalog.
pub fn parse_rule_name(name: &str) -> Option<(PipelineKind, BaseRule)> {
    PipelineKind::iter().find_map(|kind| {
        let base = name.strip_prefix(kind.rule_prefix())?.parse::<BaseRule>().ok()?;
        if base.component() == kind.component() {
            Some((kind, base))
        } else {
            None
        }
    })
}

/// Builds the complete rule catalog. Pure, the output only depends on the
/// constants of this module.
pub fn build_catalog() -> Vec<AlertRuleSpec> {
    let mut rules = Vec::new();
    for kind in PipelineKind::iter() {
        for base in BaseRule::for_kind(kind) {
            if let Some(expression) = expression(kind, base) {
                rules.push(AlertRuleSpec {
                    name: base.full_name(kind),
                    expression,
                    for_duration: FOR_DURATION,
                });
            }
        }
    }
    rules
}

/// Renders the catalog into a rule file with a single group
pub fn render_rule_file(rules: &[AlertRuleSpec]) -> RuleFile {
    RuleFile {
        groups: vec![RuleGroup {
            name: "default".to_string(),
            rules: rules.iter().map(Rule::from).collect(),
        }],
    }
}

/// None when the rule's component does not serve `kind`
fn expression(kind: PipelineKind, base: BaseRule) -> Option<Expr> {
    let gateway = GatewayMetrics::for_kind(kind);
    let agent = AgentMetrics;
    let expr = match base {
        BaseRule::GatewayAllDataDropped => {
            let gateway = gateway?;
            gateway.dropped().unless(gateway.sent())
        }
        BaseRule::GatewaySomeDataDropped => {
            let gateway = gateway?;
            gateway.dropped().and(gateway.sent())
        }
        BaseRule::GatewayQueueAlmostFull => gateway?.queue_almost_full(),
        BaseRule::GatewayThrottling => gateway?.receiver_refused(),
        _ if kind.component() != Component::Agent => return None,
        BaseRule::AgentAllDataDropped => agent.dropped().unless(agent.sent()),
        BaseRule::AgentSomeDataDropped => agent.dropped().and(agent.sent()),
        BaseRule::AgentBufferInUse => agent.buffer_in_use(),
        BaseRule::AgentNoLogsDelivered => agent.received().and(agent.not_sent()),
    };
    Some(expr)
}

/// Raw signals of an OTel Collector gateway
#[derive(Clone, Copy)]
struct GatewayMetrics {
    service: &'static str,
    data_type: &'static str,
}

impl GatewayMetrics {
    /// None for kinds not served by a gateway
    fn for_kind(kind: PipelineKind) -> Option<Self> {
        match kind {
            PipelineKind::Metric => Some(GatewayMetrics {
                service: "telemetry-metric-gateway-metrics",
                data_type: "metric_points_total",
            }),
            PipelineKind::Trace => Some(GatewayMetrics {
                service: "telemetry-trace-gateway-metrics",
                data_type: "spans_total",
            }),
            PipelineKind::Log => None,
        }
    }

    fn metric(&self, name: &str) -> Expr {
        Expr::metric(name).with_label(LABEL_SERVICE, self.service)
    }

    fn exporter_rate(&self, signal: &str) -> Expr {
        self.metric(&format!("otelcol_exporter_{}_{}", signal, self.data_type))
            .rate(RATE_WINDOW)
            .sum_by(&[LABEL_EXPORTER])
            .greater_than(0.0)
    }

    fn sent(&self) -> Expr {
        self.exporter_rate("sent")
    }

    /// Data the exporter failed to send, or could not even enqueue
    fn dropped(&self) -> Expr {
        self.exporter_rate("send_failed")
            .or(self.exporter_rate("enqueue_failed"))
    }

    fn queue_almost_full(&self) -> Expr {
        self.metric("otelcol_exporter_queue_size")
            .div(self.metric("otelcol_exporter_queue_capacity"))
            .ignoring(&[LABEL_DATA_TYPE])
            .max_by(&[LABEL_EXPORTER])
            .greater_than(QUEUE_ALMOST_FULL_RATIO)
    }

    fn receiver_refused(&self) -> Expr {
        self.metric(&format!("otelcol_receiver_refused_{}", self.data_type))
            .rate(RATE_WINDOW)
            .sum_by(&[LABEL_RECEIVER])
            .greater_than(0.0)
    }
}

/// Raw signals of the Fluent Bit log agent
struct AgentMetrics;

impl AgentMetrics {
    const SERVICE: &'static str = "telemetry-fluent-bit-metrics";
    const EXPORTER_SERVICE: &'static str = "telemetry-fluent-bit-exporter-metrics";

    fn rate(&self, name: &str) -> Expr {
        Expr::metric(name)
            .with_label(LABEL_SERVICE, Self::SERVICE)
            .rate(RATE_WINDOW)
            .sum_by(&[LABEL_PIPELINE_NAME])
    }

    fn sent(&self) -> Expr {
        self.rate("fluentbit_output_proc_bytes_total").greater_than(0.0)
    }

    fn not_sent(&self) -> Expr {
        self.rate("fluentbit_output_proc_bytes_total").equal_to(0.0)
    }

    fn received(&self) -> Expr {
        self.rate("fluentbit_input_bytes_total").greater_than(0.0)
    }

    fn dropped(&self) -> Expr {
        self.rate("fluentbit_output_dropped_records_total")
            .greater_than(0.0)
            .or(self.rate("fluentbit_output_retries_failed_total").greater_than(0.0))
    }

    fn buffer_in_use(&self) -> Expr {
        Expr::metric("telemetry_fsbuffer_usage_bytes")
            .with_label(LABEL_SERVICE, Self::EXPORTER_SERVICE)
            .max_by(&[LABEL_PIPELINE_NAME])
            .greater_than(BUFFER_IN_USE_BYTES)
    }
}
