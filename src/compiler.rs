//! Compiles a parse tree into the [`Query`] model.
//!
//! Every function here is pure: no state is kept between calls and nothing
//! is logged. Failures are returned as [`CompileError`].

use thiserror::Error;

use crate::ast::{
    ConditionNode, ExpressionNode, FieldNode, LiteralKind, LiteralNode, OrderByNode, QueryNode,
    StatementKeyword,
};
use crate::keywords;
use crate::model::{Condition, ConditionExpr, Direction, OrderByItem, Query, QueryKind, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A literal token that cannot be read as the value it claims to be.
    #[error("cannot read literal {token:?} as {expected_kind}")]
    LiteralCoercion {
        token: String,
        expected_kind: &'static str,
    },
    /// Keyword text that is not in the matching table.
    #[error("unknown {category} keyword {text:?}")]
    UnknownKeyword {
        category: KeywordCategory,
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    Entity,
    ComparisonOperator,
    LogicalOperator,
    Direction,
}

impl std::fmt::Display for KeywordCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeywordCategory::Entity => "entity",
            KeywordCategory::ComparisonOperator => "comparison operator",
            KeywordCategory::LogicalOperator => "logical operator",
            KeywordCategory::Direction => "sort direction",
        })
    }
}

/// Builds the query for one statement.
///
/// COUNT statements never pick up ordering, a limit or `LATEST`, even when
/// the node carries them.
pub fn compile(node: &QueryNode) -> Result<Query, CompileError> {
    let kind = match node.statement {
        StatementKeyword::Show => QueryKind::Show,
        StatementKeyword::Find => QueryKind::Find,
        StatementKeyword::Count => QueryKind::Count,
    };
    let entity = keywords::entity_type(&node.entity.text)?;
    let mut query = Query::new(kind, entity);

    if let Some(condition) = &node.condition {
        query.conditions = build_conditions(condition)?;
    }

    if kind != QueryKind::Count {
        query.order_by = node
            .order_by
            .iter()
            .map(build_order_by_item)
            .collect::<Result<_, _>>()?;
        query.limit = node.limit.as_ref().map(resolve_limit).transpose()?;
        query.latest = node.latest;
    }

    Ok(query)
}

/// Turns `expr (op expr)*` into a condition list.
///
/// The first condition has no logical operator; each later one carries the
/// operator written in front of it. Order is source order.
pub fn build_conditions(node: &ConditionNode) -> Result<Vec<Condition>, CompileError> {
    let mut conditions = Vec::with_capacity(node.rest.len() + 1);
    conditions.push(Condition::new(build_condition(&node.first)?));

    for (op, expr) in &node.rest {
        let logical_op = keywords::logical_operator(&op.text)?;
        conditions.push(Condition::new(build_condition(expr)?).with_logical_op(logical_op));
    }

    Ok(conditions)
}

/// Builds the predicate or group for one expression.
pub fn build_condition(node: &ExpressionNode) -> Result<ConditionExpr, CompileError> {
    let expr = match node {
        ExpressionNode::Comparison {
            field,
            operator,
            value,
        } => ConditionExpr::Comparison {
            field: resolve_field(field),
            operator: keywords::comparison_operator(&operator.text)?,
            value: coerce_literal(value)?,
        },
        ExpressionNode::In { field, values } => ConditionExpr::In {
            field: resolve_field(field),
            values: values.iter().map(coerce_literal).collect::<Result<_, _>>()?,
        },
        ExpressionNode::Contains { field, value } => {
            // Only quoted text is accepted, whatever the token claims.
            if value.kind != LiteralKind::String {
                return Err(coercion_error(value, LiteralKind::String.as_str()));
            }
            ConditionExpr::Contains {
                field: resolve_field(field),
                value: unquote(value)?.to_string(),
            }
        }
        ExpressionNode::Group(inner) => ConditionExpr::Group {
            conditions: build_conditions(inner)?,
        },
        ExpressionNode::Between { field, lower, upper } => ConditionExpr::Between {
            field: resolve_field(field),
            lower: coerce_literal(lower)?,
            upper: coerce_literal(upper)?,
        },
        ExpressionNode::NullCheck { field, negated } => ConditionExpr::Is {
            field: resolve_field(field),
            not_null: *negated,
        },
    };
    Ok(expr)
}

/// Canonical field name: `ip` stays `ip`, `Devices.ip` becomes `devices.ip`.
///
/// Only the entity qualifier is lower-cased.
pub fn resolve_field(field: &FieldNode) -> String {
    match &field.entity {
        None => field.identifiers.join("."),
        Some(entity) => {
            let mut parts = Vec::with_capacity(field.identifiers.len() + 1);
            parts.push(entity.to_lowercase());
            parts.extend(field.identifiers.iter().cloned());
            parts.join(".")
        }
    }
}

/// Converts a literal token to its typed value.
pub fn coerce_literal(literal: &LiteralNode) -> Result<Value, CompileError> {
    let text = literal.text.as_str();
    let value = match literal.kind {
        LiteralKind::String => Value::String(unquote(literal)?.to_string()),
        LiteralKind::Timestamp => Value::Timestamp(unquote(literal)?.to_string()),
        LiteralKind::Integer => Value::Integer(
            text.parse()
                .map_err(|_| coercion_error(literal, LiteralKind::Integer.as_str()))?,
        ),
        LiteralKind::Float => Value::Float(
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| coercion_error(literal, LiteralKind::Float.as_str()))?,
        ),
        LiteralKind::Boolean => Value::Boolean(text.eq_ignore_ascii_case("true")),
        LiteralKind::IpAddress => Value::IpAddress(text.to_string()),
        LiteralKind::MacAddress => Value::MacAddress(text.to_string()),
    };
    Ok(value)
}

fn build_order_by_item(node: &OrderByNode) -> Result<OrderByItem, CompileError> {
    let direction = match &node.direction {
        Some(keyword) => keywords::direction(&keyword.text)?,
        None => Direction::Ascending,
    };
    Ok(OrderByItem {
        field: resolve_field(&node.field),
        direction,
    })
}

fn resolve_limit(literal: &LiteralNode) -> Result<u64, CompileError> {
    let expected = "non-negative integer";
    if literal.kind != LiteralKind::Integer {
        return Err(coercion_error(literal, expected));
    }
    literal
        .text
        .parse()
        .map_err(|_| coercion_error(literal, expected))
}

/// Strips exactly one quote character from each end. No escape decoding.
fn unquote(literal: &LiteralNode) -> Result<&str, CompileError> {
    let text = literal.text.as_str();
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('"' | '\'')), Some(close)) if open == close => Ok(chars.as_str()),
        _ => Err(coercion_error(literal, literal.kind.as_str())),
    }
}

fn coercion_error(literal: &LiteralNode, expected_kind: &'static str) -> CompileError {
    CompileError::LiteralCoercion {
        token: literal.text.clone(),
        expected_kind,
    }
}
