//! The compiled query model handed to executors and translators.

use serde::{Deserialize, Serialize};

/// A compiled SRQL statement.
///
/// A `Count` query never carries ordering, a limit or the `latest` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub kind: QueryKind,
    pub entity: EntityType,
    /// Filter conditions in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default)]
    pub latest: bool,
}

impl Query {
    pub fn new(kind: QueryKind, entity: EntityType) -> Self {
        Self {
            kind,
            entity,
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            latest: false,
        }
    }

    /// True when a `LIMIT` clause was present, including `LIMIT 0`.
    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Show,
    Find,
    Count,
}

/// The monitored object category a statement targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Devices,
    Flows,
    Traps,
    Connections,
    Logs,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Devices,
        EntityType::Flows,
        EntityType::Traps,
        EntityType::Connections,
        EntityType::Logs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Devices => "devices",
            EntityType::Flows => "flows",
            EntityType::Traps => "traps",
            EntityType::Connections => "connections",
            EntityType::Logs => "logs",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    Like,
    In,
    Contains,
    Between,
    Is,
}

impl Operator {
    /// SQL-style spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEquals => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEquals => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::Contains => "CONTAINS",
            Operator::Between => "BETWEEN",
            Operator::Is => "IS",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operators a single-value comparison can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEquals,
    LessThan,
    LessThanOrEquals,
    Like,
}

impl ComparisonOperator {
    pub fn as_str(self) -> &'static str {
        Operator::from(self).as_str()
    }
}

impl From<ComparisonOperator> for Operator {
    fn from(op: ComparisonOperator) -> Self {
        match op {
            ComparisonOperator::Equals => Operator::Equals,
            ComparisonOperator::NotEquals => Operator::NotEquals,
            ComparisonOperator::GreaterThan => Operator::GreaterThan,
            ComparisonOperator::GreaterThanOrEquals => Operator::GreaterThanOrEquals,
            ComparisonOperator::LessThan => Operator::LessThan,
            ComparisonOperator::LessThanOrEquals => Operator::LessThanOrEquals,
            ComparisonOperator::Like => Operator::Like,
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Operator joining this condition to the ones before it.
    /// `None` only for the first condition of a list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_op: Option<LogicalOperator>,
    pub expr: ConditionExpr,
}

/// The predicate or group a [`Condition`] holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum ConditionExpr {
    /// `field <op> value`
    Comparison {
        field: String,
        operator: ComparisonOperator,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    Contains {
        field: String,
        value: String,
    },
    /// Bounds as written; lower is not checked against upper.
    Between {
        field: String,
        lower: Value,
        upper: Value,
    },
    /// `IS NULL` when `not_null` is false, `IS NOT NULL` when true.
    Is {
        field: String,
        not_null: bool,
    },
    /// A parenthesized sub-list.
    Group { conditions: Vec<Condition> },
}

impl Condition {
    pub fn new(expr: ConditionExpr) -> Self {
        Self {
            logical_op: None,
            expr,
        }
    }

    pub fn with_logical_op(mut self, op: LogicalOperator) -> Self {
        self.logical_op = Some(op);
        self
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.expr, ConditionExpr::Group { .. })
    }

    /// Nested conditions of a group.
    pub fn complex(&self) -> Option<&[Condition]> {
        match &self.expr {
            ConditionExpr::Group { conditions } => Some(conditions),
            _ => None,
        }
    }

    /// Canonical field name; `None` for groups.
    pub fn field(&self) -> Option<&str> {
        match &self.expr {
            ConditionExpr::Comparison { field, .. }
            | ConditionExpr::In { field, .. }
            | ConditionExpr::Contains { field, .. }
            | ConditionExpr::Between { field, .. }
            | ConditionExpr::Is { field, .. } => Some(field),
            ConditionExpr::Group { .. } => None,
        }
    }

    /// Operator of a predicate; `None` for groups.
    pub fn operator(&self) -> Option<Operator> {
        match &self.expr {
            ConditionExpr::Comparison { operator, .. } => Some((*operator).into()),
            ConditionExpr::In { .. } => Some(Operator::In),
            ConditionExpr::Contains { .. } => Some(Operator::Contains),
            ConditionExpr::Between { .. } => Some(Operator::Between),
            ConditionExpr::Is { .. } => Some(Operator::Is),
            ConditionExpr::Group { .. } => None,
        }
    }

    /// The single value of a comparison, `CONTAINS` or `IS` predicate.
    ///
    /// `CONTAINS` yields its text as a string, `IS` yields `true` for
    /// `IS NOT NULL` and `false` for `IS NULL`.
    pub fn value(&self) -> Option<Value> {
        match &self.expr {
            ConditionExpr::Comparison { value, .. } => Some(value.clone()),
            ConditionExpr::Contains { value, .. } => Some(Value::String(value.clone())),
            ConditionExpr::Is { not_null, .. } => Some(Value::Boolean(*not_null)),
            _ => None,
        }
    }

    /// The value list of `IN` and `BETWEEN` predicates, empty otherwise.
    pub fn values(&self) -> Vec<&Value> {
        match &self.expr {
            ConditionExpr::In { values, .. } => values.iter().collect(),
            ConditionExpr::Between { lower, upper, .. } => vec![lower, upper],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

/// A typed literal.
///
/// Timestamps and addresses keep their surface form; quoted forms are stored
/// without their quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(String),
    IpAddress(String),
    MacAddress(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
