//! Keyword tables: surface text to model enums.
//!
//! Matching is case-insensitive. Text outside a table is reported as
//! [`CompileError::UnknownKeyword`] instead of mapping to a placeholder.

use std::str::FromStr;

use crate::compiler::{CompileError, KeywordCategory};
use crate::model::{ComparisonOperator, Direction, EntityType, LogicalOperator};

pub fn entity_type(text: &str) -> Result<EntityType, CompileError> {
    match text.to_ascii_lowercase().as_str() {
        "devices" => Ok(EntityType::Devices),
        "flows" => Ok(EntityType::Flows),
        "traps" => Ok(EntityType::Traps),
        "connections" => Ok(EntityType::Connections),
        "logs" => Ok(EntityType::Logs),
        _ => Err(unknown(KeywordCategory::Entity, text)),
    }
}

pub fn comparison_operator(text: &str) -> Result<ComparisonOperator, CompileError> {
    match text.to_ascii_lowercase().as_str() {
        "=" => Ok(ComparisonOperator::Equals),
        "!=" | "<>" => Ok(ComparisonOperator::NotEquals),
        ">" => Ok(ComparisonOperator::GreaterThan),
        ">=" => Ok(ComparisonOperator::GreaterThanOrEquals),
        "<" => Ok(ComparisonOperator::LessThan),
        "<=" => Ok(ComparisonOperator::LessThanOrEquals),
        "like" => Ok(ComparisonOperator::Like),
        _ => Err(unknown(KeywordCategory::ComparisonOperator, text)),
    }
}

pub fn logical_operator(text: &str) -> Result<LogicalOperator, CompileError> {
    match text.to_ascii_lowercase().as_str() {
        "and" => Ok(LogicalOperator::And),
        "or" => Ok(LogicalOperator::Or),
        _ => Err(unknown(KeywordCategory::LogicalOperator, text)),
    }
}

pub fn direction(text: &str) -> Result<Direction, CompileError> {
    match text.to_ascii_lowercase().as_str() {
        "asc" => Ok(Direction::Ascending),
        "desc" => Ok(Direction::Descending),
        _ => Err(unknown(KeywordCategory::Direction, text)),
    }
}

fn unknown(category: KeywordCategory, text: &str) -> CompileError {
    CompileError::UnknownKeyword {
        category,
        text: text.to_string(),
    }
}

impl FromStr for EntityType {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        entity_type(s)
    }
}

impl FromStr for ComparisonOperator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        comparison_operator(s)
    }
}

impl FromStr for LogicalOperator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        logical_operator(s)
    }
}

impl FromStr for Direction {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        direction(s)
    }
}
