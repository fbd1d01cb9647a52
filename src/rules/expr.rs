//! Immutable PromQL expression tree.
//!
//! Expressions are plain data; [`Display`] renders them to PromQL text.

use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Sum,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Greater,
    Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Samples of lhs that have a match in rhs
    And,
    Or,
    /// Samples of lhs that have no match in rhs
    Unless,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Instant vector selector with equality matchers
    Metric {
        name: String,
        selector: Vec<(String, String)>,
    },
    Rate {
        expr: Box<Expr>,
        window: Duration,
    },
    Aggregate {
        op: AggregateOp,
        by: Vec<String>,
        expr: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        expr: Box<Expr>,
        threshold: f64,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ignoring: Vec<String>,
    },
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(ToString::to_string).collect()
}

impl Expr {
    pub fn metric(name: &str) -> Expr {
        Expr::Metric {
            name: name.to_string(),
            selector: Vec::new(),
        }
    }

    /// Adds an equality matcher. Only meaningful on metric selectors,
    /// other nodes are returned unchanged.
    pub fn with_label(self, key: &str, value: &str) -> Expr {
        match self {
            Expr::Metric { name, mut selector } => {
                selector.push((key.to_string(), value.to_string()));
                Expr::Metric { name, selector }
            }
            other => other,
        }
    }

    pub fn rate(self, window: Duration) -> Expr {
        Expr::Rate {
            expr: Box::new(self),
            window,
        }
    }

    pub fn sum_by(self, labels: &[&str]) -> Expr {
        Expr::Aggregate {
            op: AggregateOp::Sum,
            by: owned(labels),
            expr: Box::new(self),
        }
    }

    pub fn max_by(self, labels: &[&str]) -> Expr {
        Expr::Aggregate {
            op: AggregateOp::Max,
            by: owned(labels),
            expr: Box::new(self),
        }
    }

    pub fn greater_than(self, threshold: f64) -> Expr {
        Expr::Compare {
            op: CompareOp::Greater,
            expr: Box::new(self),
            threshold,
        }
    }

    pub fn equal_to(self, threshold: f64) -> Expr {
        Expr::Compare {
            op: CompareOp::Equal,
            expr: Box::new(self),
            threshold,
        }
    }

    fn binary(self, op: BinaryOp, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
            ignoring: Vec::new(),
        }
    }

    pub fn and(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn unless(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Unless, rhs)
    }

    pub fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Div, rhs)
    }

    /// Sets `ignoring(...)` vector matching on a binary node
    pub fn ignoring(self, labels: &[&str]) -> Expr {
        match self {
            Expr::Binary { op, lhs, rhs, .. } => Expr::Binary {
                op,
                lhs,
                rhs,
                ignoring: owned(labels),
            },
            other => other,
        }
    }

    /// Names of all metrics the expression reads
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_metric_names(&mut names);
        names
    }

    fn collect_metric_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Metric { name, .. } => out.push(name),
            Expr::Rate { expr, .. } | Expr::Aggregate { expr, .. } | Expr::Compare { expr, .. } => {
                expr.collect_metric_names(out)
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_metric_names(out);
                rhs.collect_metric_names(out);
            }
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(self, Expr::Compare { .. } | Expr::Binary { .. })
    }
}

struct Operand<'a>(&'a Expr);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.needs_parens() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Prometheus duration literal
pub(crate) fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

impl Display for AggregateOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Max => "max",
        })
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Greater => ">",
            CompareOp::Equal => "==",
        })
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Unless => "unless",
            BinaryOp::Div => "/",
        })
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Metric { name, selector } => {
                f.write_str(name)?;
                if !selector.is_empty() {
                    let matchers = selector
                        .iter()
                        .map(|(k, v)| format!("{}=\"{}\"", k, v))
                        .collect::<Vec<_>>();
                    write!(f, "{{{}}}", matchers.join(","))?;
                }
                Ok(())
            }
            Expr::Rate { expr, window } => {
                write!(f, "rate({}[{}])", expr, format_duration(*window))
            }
            Expr::Aggregate { op, by, expr } => {
                write!(f, "{} by ({}) ({})", op, by.join(", "), expr)
            }
            Expr::Compare {
                op,
                expr,
                threshold,
            } => write!(f, "{} {} {}", Operand(expr), op, threshold),
            Expr::Binary {
                op,
                lhs,
                rhs,
                ignoring,
            } => {
                if ignoring.is_empty() {
                    write!(f, "{} {} {}", Operand(lhs), op, Operand(rhs))
                } else {
                    write!(
                        f,
                        "{} {} ignoring({}) {}",
                        Operand(lhs),
                        op,
                        ignoring.join(", "),
                        Operand(rhs)
                    )
                }
            }
        }
    }
}
