//! Prometheus rule file representation

use super::{expr::format_duration, AlertRuleSpec};
use serde::{Deserialize, Serialize};

/// A set of rule groups, as stored in a rule file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFile {
    pub groups: Vec<RuleGroup>,
}

/// Sequentially evaluated alerting rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for", default, skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<String>,
}

impl From<&AlertRuleSpec> for Rule {
    fn from(spec: &AlertRuleSpec) -> Self {
        Rule {
            alert: spec.name.clone(),
            expr: spec.expression.to_string(),
            for_duration: if spec.for_duration.as_secs() == 0 {
                None
            } else {
                Some(format_duration(spec.for_duration))
            },
        }
    }
}

impl RuleFile {
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
