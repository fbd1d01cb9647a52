use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("label selector is empty")]
    Empty,
    #[error("unknown label selector operator '{0}'")]
    UnknownOperator(String),
    #[error("operator {operator} on key '{key}' requires at least one value")]
    MissingValues { key: String, operator: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(key, value) => labels.get(key) == Some(value),
            Requirement::In(key, values) => labels.get(key).map_or(false, |v| values.contains(v)),
            Requirement::NotIn(key, values) => labels.get(key).map_or(true, |v| !values.contains(v)),
            Requirement::Exists(key) => labels.contains_key(key),
            Requirement::DoesNotExist(key) => !labels.contains_key(key),
        }
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals(key, value) => write!(f, "{}={}", key, value),
            Requirement::In(key, values) => write!(f, "{} in ({})", key, values.join(",")),
            Requirement::NotIn(key, values) => write!(f, "{} notin ({})", key, values.join(",")),
            Requirement::Exists(key) => f.write_str(key),
            Requirement::DoesNotExist(key) => write!(f, "!{}", key),
        }
    }
}

/// Parsed label selector.
///
/// Display renders the query syntax accepted by the API server
/// (`app=foo,tier in (a,b),!canary`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(Vec<Requirement>);

impl Selector {
    /// Workload selectors must not be empty: an empty selector would select
    /// every pod of the namespace.
    pub fn from_label_selector(selector: &LabelSelector) -> Result<Self, SelectorError> {
        let mut requirements = Vec::new();
        if let Some(labels) = &selector.match_labels {
            for (k, v) in labels {
                requirements.push(Requirement::Equals(k.clone(), v.clone()));
            }
        }
        for expr in selector.match_expressions.iter().flatten() {
            let values = expr.values.clone().unwrap_or_default();
            let requirement = match expr.operator.as_str() {
                "In" | "NotIn" if values.is_empty() => {
                    return Err(SelectorError::MissingValues {
                        key: expr.key.clone(),
                        operator: expr.operator.clone(),
                    })
                }
                "In" => Requirement::In(expr.key.clone(), values),
                "NotIn" => Requirement::NotIn(expr.key.clone(), values),
                "Exists" => Requirement::Exists(expr.key.clone()),
                "DoesNotExist" => Requirement::DoesNotExist(expr.key.clone()),
                other => return Err(SelectorError::UnknownOperator(other.to_string())),
            };
            requirements.push(requirement);
        }
        if requirements.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Selector(requirements))
    }

    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        let empty = BTreeMap::new();
        let labels = labels.unwrap_or(&empty);
        self.0.iter().all(|r| r.matches(labels))
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for requirement in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{}", requirement)?;
        }
        Ok(())
    }
}
