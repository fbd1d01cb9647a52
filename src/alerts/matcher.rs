//! Deciding whether an alert concerns a particular pipeline

use super::{RawAlert, LABEL_ALERT_NAME};
use crate::{
    pipeline::{Component, PipelineKind},
    rules::{BaseRule, LABEL_EXPORTER, LABEL_PIPELINE_NAME},
};
use std::collections::BTreeMap;

/// Protocols of the OTLP exporters, as used in exporter ids
const OTLP_EXPORTER_PROTOCOLS: &[&str] = &["otlp", "otlphttp"];

/// Which rules of a pipeline kind to accept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSelector {
    Base(BaseRule),
    /// Every rule of the kind
    Any,
}

impl From<BaseRule> for RuleSelector {
    fn from(rule: BaseRule) -> Self {
        RuleSelector::Base(rule)
    }
}

/// Checks if a firing alert was produced by the selected rule for the given
/// pipeline.
///
/// Alerts without a pipeline-identifying label apply to every pipeline of the
/// kind. Pending alerts never match.
pub fn matches(
    alert: &RawAlert,
    rule: RuleSelector,
    pipeline_name: &str,
    kind: PipelineKind,
) -> bool {
    alert.is_firing()
        && matches_rule_name(&alert.labels, rule, kind)
        && matches_pipeline(&alert.labels, pipeline_name, kind)
}

/// An alert without `alertname` label never matches
pub fn matches_rule_name(
    labels: &BTreeMap<String, String>,
    rule: RuleSelector,
    kind: PipelineKind,
) -> bool {
    let name = match labels.get(LABEL_ALERT_NAME) {
        Some(n) => n,
        None => return false,
    };
    match rule {
        RuleSelector::Any => name.starts_with(kind.rule_prefix()),
        RuleSelector::Base(base) => {
            name.strip_prefix(kind.rule_prefix()) == Some(base.as_ref())
        }
    }
}

pub fn matches_pipeline(
    labels: &BTreeMap<String, String>,
    pipeline_name: &str,
    kind: PipelineKind,
) -> bool {
    if let Some(name) = labels.get(LABEL_PIPELINE_NAME) {
        return name == pipeline_name;
    }
    if kind.component() == Component::Gateway {
        if let Some(exporter) = labels.get(LABEL_EXPORTER) {
            return exporter_pipeline(exporter) == Some(pipeline_name);
        }
    }
    true
}

/// Pipelines of `kind` concerned by any of the alerts, given by their labels.
///
/// Alerts posted by the self-monitor are all firing, so only the rule name
/// and the pipeline labels are checked. The result keeps the order of
/// `pipeline_names` and has no duplicates.
pub fn affected_pipelines(
    kind: PipelineKind,
    alert_labels: &[BTreeMap<String, String>],
    pipeline_names: &[&str],
) -> Vec<String> {
    let mut affected: Vec<String> = Vec::new();
    for name in pipeline_names {
        if affected.iter().any(|a| a == name) {
            continue;
        }
        let concerned = alert_labels.iter().any(|labels| {
            matches_rule_name(labels, RuleSelector::Any, kind)
                && matches_pipeline(labels, name, kind)
        });
        if concerned {
            affected.push(name.to_string());
        }
    }
    affected
}

/// Extracts the pipeline name from an exporter id like `otlp/my-pipeline`
fn exporter_pipeline(exporter_id: &str) -> Option<&str> {
    let (protocol, pipeline) = exporter_id.split_once('/')?;
    if OTLP_EXPORTER_PROTOCOLS.contains(&protocol) {
        Some(pipeline)
    } else {
        None
    }
}
