//! Renders a compiled [`Query`] as SQL (through sea-query) or as ArangoDB AQL.
//!
//! Field names are lower-cased on the way out. A field qualified with an
//! entity name (`devices.ip`) refers to that entity's table in SQL and to the
//! current document in AQL.

use std::str::FromStr;

use sea_query::{
    Asterisk, ColumnRef, Expr, Iden, IntoColumnRef, LikeExpr, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, SelectStatement, SimpleExpr, SqliteQueryBuilder, Value as SqlValue,
};
use thiserror::Error;

use crate::config::TableMappingConfig;
use crate::model::{
    ComparisonOperator, Condition, ConditionExpr, Direction, EntityType, LogicalOperator, Query,
    QueryKind, Value,
};

/// Turns a compiled query into the text an executor runs.
pub trait Translator {
    fn translate(&self, query: &Query) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlDialect::Postgres => "postgres",
            SqlDialect::MySql => "mysql",
            SqlDialect::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown SQL dialect {0:?}, expected postgres, mysql or sqlite")]
pub struct UnknownDialect(pub String);

impl FromStr for SqlDialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            _ => Err(UnknownDialect(s.to_string())),
        }
    }
}

/// Table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Column identifier for sea-query
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Splits `devices.ip` into the entity and the rest of the path.
///
/// Returns `None` when the prefix is not an entity name.
fn split_entity(field: &str) -> Option<(EntityType, &str)> {
    let (prefix, rest) = field.split_once('.')?;
    let entity = prefix.parse::<EntityType>().ok()?;
    Some((entity, rest))
}

/// SQL translator built on sea-query's `SelectStatement`.
#[derive(Debug, Clone, Default)]
pub struct SqlTranslator {
    dialect: SqlDialect,
    mapping: TableMappingConfig,
}

impl SqlTranslator {
    pub fn new(mapping: TableMappingConfig) -> Self {
        Self {
            dialect: SqlDialect::default(),
            mapping,
        }
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn set_dialect(&mut self, dialect: SqlDialect) {
        self.dialect = dialect;
    }

    /// Builds the statement without rendering it.
    pub fn build(&self, query: &Query) -> SelectStatement {
        let mut select = SelectStatement::new();
        select.from(TableName(self.mapping.table_name(query.entity)));

        match query.kind {
            QueryKind::Count => select.expr(Expr::col(Asterisk).count()),
            QueryKind::Show | QueryKind::Find => select.column(Asterisk),
        };

        if let Some(condition) = self.compile_conditions(&query.conditions) {
            select.and_where(condition);
        }

        for item in &query.order_by {
            let order = match item.direction {
                Direction::Ascending => Order::Asc,
                Direction::Descending => Order::Desc,
            };
            select.order_by(self.column(&item.field), order);
        }

        if let Some(limit) = query.limit {
            select.limit(limit);
        }

        select
    }

    fn column(&self, field: &str) -> ColumnRef {
        let field = field.to_lowercase();
        match split_entity(&field) {
            Some((entity, column)) => (
                TableName(self.mapping.table_name(entity)),
                ColumnName(column.to_string()),
            )
                .into_column_ref(),
            None => ColumnName(field).into_column_ref(),
        }
    }

    /// Joins a condition list with AND binding tighter than OR, the same
    /// reading the AQL output gets.
    fn compile_conditions(&self, conditions: &[Condition]) -> Option<SimpleExpr> {
        let mut any_of = Vec::new();
        let mut all_of: Option<SimpleExpr> = None;

        for condition in conditions {
            let expr = self.compile_condition(condition);
            all_of = Some(match (all_of, condition.logical_op) {
                (None, _) => expr,
                (Some(run), Some(LogicalOperator::Or)) => {
                    any_of.push(run);
                    expr
                }
                (Some(run), _) => run.and(expr),
            });
        }

        any_of.extend(all_of);
        any_of.into_iter().reduce(|acc, expr| acc.or(expr))
    }

    fn compile_condition(&self, condition: &Condition) -> SimpleExpr {
        match &condition.expr {
            ConditionExpr::Comparison {
                field,
                operator,
                value,
            } => self.compile_comparison(field, *operator, value),
            ConditionExpr::In { field, values } => {
                Expr::col(self.column(field)).is_in(values.iter().map(sql_value))
            }
            ConditionExpr::Contains { field, value } => {
                let pattern = format!("%{}%", escape_like(value));
                Expr::col(self.column(field)).like(LikeExpr::new(pattern).escape('\\'))
            }
            ConditionExpr::Between { field, lower, upper } => {
                Expr::col(self.column(field)).between(sql_value(lower), sql_value(upper))
            }
            ConditionExpr::Is { field, not_null } => {
                let col = Expr::col(self.column(field));
                if *not_null {
                    col.is_not_null()
                } else {
                    col.is_null()
                }
            }
            ConditionExpr::Group { conditions } => self
                .compile_conditions(conditions)
                .unwrap_or_else(|| Expr::val(true).into()),
        }
    }

    fn compile_comparison(
        &self,
        field: &str,
        operator: ComparisonOperator,
        value: &Value,
    ) -> SimpleExpr {
        let col = Expr::col(self.column(field));

        match operator {
            ComparisonOperator::Equals => col.eq(sql_value(value)),
            ComparisonOperator::NotEquals => col.ne(sql_value(value)),
            ComparisonOperator::GreaterThan => col.gt(sql_value(value)),
            ComparisonOperator::GreaterThanOrEquals => col.gte(sql_value(value)),
            ComparisonOperator::LessThan => col.lt(sql_value(value)),
            ComparisonOperator::LessThanOrEquals => col.lte(sql_value(value)),
            ComparisonOperator::Like => col.like(value_text(value)),
        }
    }
}

impl Translator for SqlTranslator {
    fn translate(&self, query: &Query) -> String {
        let select = self.build(query);
        match self.dialect {
            SqlDialect::Postgres => select.to_string(PostgresQueryBuilder),
            SqlDialect::MySql => select.to_string(MysqlQueryBuilder),
            SqlDialect::Sqlite => select.to_string(SqliteQueryBuilder),
        }
    }
}

fn sql_value(value: &Value) -> SimpleExpr {
    match value {
        Value::Integer(n) => SqlValue::BigInt(Some(*n)).into(),
        // sea-query prints doubles without a fractional part, `2.0` as `2`.
        Value::Float(f) if f.is_finite() => Expr::cust(float_literal(*f)),
        Value::Float(f) => SqlValue::Double(Some(*f)).into(),
        Value::Boolean(b) => SqlValue::Bool(Some(*b)).into(),
        Value::String(s) | Value::Timestamp(s) | Value::IpAddress(s) | Value::MacAddress(s) => {
            SqlValue::String(Some(Box::new(s.clone()))).into()
        }
    }
}

/// A float literal that always reads back as a float: `2.0`, `0.5`, `1e21`.
fn float_literal(f: f64) -> String {
    format!("{f:?}")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => float_literal(*f),
        Value::Boolean(b) => b.to_string(),
        Value::String(s) | Value::Timestamp(s) | Value::IpAddress(s) | Value::MacAddress(s) => {
            s.clone()
        }
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// AQL translator for ArangoDB collections.
///
/// ```text
/// FOR doc IN devices
///   FILTER doc.status == 'up'
///   SORT doc.hostname DESC
///   LIMIT 50
///   RETURN doc
/// ```
#[derive(Debug, Clone, Default)]
pub struct AqlTranslator {
    mapping: TableMappingConfig,
}

impl AqlTranslator {
    pub fn new(mapping: TableMappingConfig) -> Self {
        Self { mapping }
    }

    fn filter(&self, conditions: &[Condition]) -> String {
        let mut aql = String::new();
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                let op = condition.logical_op.unwrap_or(LogicalOperator::And);
                aql.push(' ');
                aql.push_str(op.as_str());
                aql.push(' ');
            }
            aql.push_str(&self.predicate(&condition.expr));
        }
        aql
    }

    fn predicate(&self, expr: &ConditionExpr) -> String {
        match expr {
            ConditionExpr::Comparison {
                field,
                operator,
                value,
            } => {
                let path = document_path(field);
                let value = aql_value(value);
                match operator {
                    ComparisonOperator::Equals => format!("{path} == {value}"),
                    ComparisonOperator::Like => format!("LIKE({path}, {value}, true)"),
                    ComparisonOperator::NotEquals
                    | ComparisonOperator::GreaterThan
                    | ComparisonOperator::GreaterThanOrEquals
                    | ComparisonOperator::LessThan
                    | ComparisonOperator::LessThanOrEquals => format!("{path} {operator} {value}"),
                }
            }
            ConditionExpr::In { field, values } => {
                let values: Vec<_> = values.iter().map(aql_value).collect();
                format!("{} IN [{}]", document_path(field), values.join(", "))
            }
            ConditionExpr::Contains { field, value } => {
                format!("CONTAINS({}, {})", document_path(field), aql_string(value))
            }
            ConditionExpr::Between { field, lower, upper } => {
                let path = document_path(field);
                format!(
                    "({path} >= {} AND {path} <= {})",
                    aql_value(lower),
                    aql_value(upper)
                )
            }
            ConditionExpr::Is { field, not_null } => {
                let op = if *not_null { "!=" } else { "==" };
                format!("{} {op} null", document_path(field))
            }
            ConditionExpr::Group { conditions } => format!("({})", self.filter(conditions)),
        }
    }
}

impl Translator for AqlTranslator {
    fn translate(&self, query: &Query) -> String {
        let mut aql = format!("FOR doc IN {}", self.mapping.table_name(query.entity));

        if !query.conditions.is_empty() {
            aql.push_str("\n  FILTER ");
            aql.push_str(&self.filter(&query.conditions));
        }

        if !query.order_by.is_empty() {
            let items: Vec<_> = query
                .order_by
                .iter()
                .map(|item| {
                    let direction = match item.direction {
                        Direction::Ascending => "ASC",
                        Direction::Descending => "DESC",
                    };
                    format!("{} {direction}", document_path(&item.field))
                })
                .collect();
            aql.push_str("\n  SORT ");
            aql.push_str(&items.join(", "));
        }

        if let Some(limit) = query.limit {
            aql.push_str(&format!("\n  LIMIT {limit}"));
        }

        match query.kind {
            QueryKind::Count => format!("RETURN LENGTH(\n{aql}\n  RETURN 1\n)"),
            QueryKind::Show | QueryKind::Find => {
                aql.push_str("\n  RETURN doc");
                aql
            }
        }
    }
}

fn document_path(field: &str) -> String {
    let field = field.to_lowercase();
    match split_entity(&field) {
        Some((_, rest)) => format!("doc.{rest}"),
        None => format!("doc.{field}"),
    }
}

fn aql_value(value: &Value) -> String {
    match value {
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => float_literal(*f),
        Value::Boolean(b) => b.to_string(),
        Value::String(s) | Value::Timestamp(s) | Value::IpAddress(s) | Value::MacAddress(s) => {
            aql_string(s)
        }
    }
}

fn aql_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_str;

    fn mapping() -> TableMappingConfig {
        let mut config = TableMappingConfig::default();
        config.insert(EntityType::Devices, "unified_devices");
        config
    }

    fn sql(input: &str) -> String {
        SqlTranslator::new(mapping()).translate(&compile_str(input).unwrap())
    }

    fn aql(input: &str) -> String {
        AqlTranslator::new(mapping()).translate(&compile_str(input).unwrap())
    }

    #[test]
    fn test_sql_select_and_count() {
        let out = sql("show flows");
        assert_eq!(out, r#"SELECT * FROM "flows""#);

        let out = sql("count devices where status = 'up'");
        assert!(out.contains("COUNT(*)"));
        assert!(out.contains(r#"FROM "unified_devices""#));
        assert!(out.contains(r#""status" = 'up'"#));
    }

    #[test]
    fn test_sql_end_to_end() {
        let out = sql(
            r#"FIND devices WHERE (status = "up" AND region = "us-east") OR ip BETWEEN "10.0.0.1" AND "10.0.0.255" ORDER BY hostname DESC LIMIT 50"#,
        );
        assert!(out.starts_with(r#"SELECT * FROM "unified_devices" WHERE "#));
        assert!(out.contains(r#""status" = 'up'"#));
        assert!(out.contains(r#""region" = 'us-east'"#));
        assert!(out.contains(r#""ip" BETWEEN '10.0.0.1' AND '10.0.0.255'"#));
        assert!(out.contains(" OR "));
        assert!(out.contains(r#"ORDER BY "hostname" DESC"#));
        assert!(out.ends_with("LIMIT 50"));
    }

    #[test]
    fn test_and_binds_tighter_than_or_in_both_outputs() {
        let input = "show flows where a = 1 or b = 2 and c = 3";

        let sql_out = sql(input);
        assert!(sql_out.contains(r#""a" = 1 OR "#));
        assert!(sql_out.contains(r#""b" = 2 AND "c" = 3"#));
        assert!(!sql_out.contains(r#"("a" = 1 OR "b" = 2)"#));

        let aql_out = aql(input);
        assert!(aql_out.contains("FILTER doc.a == 1 OR doc.b == 2 AND doc.c == 3"));

        let sql_out = sql("show flows where a = 1 and b = 2 or c = 3 and d = 4");
        assert!(sql_out.contains(r#""a" = 1 AND "b" = 2"#));
        assert!(sql_out.contains(r#""c" = 3 AND "d" = 4"#));
        assert!(sql_out.contains(" OR "));
    }

    #[test]
    fn test_floats_stay_floats() {
        let out = sql("show devices where load = 2.0 and n = 2");
        assert!(out.contains(r#""load" = 2.0 AND "n" = 2"#));

        let out = sql("show devices where load like 2.0");
        assert!(out.contains(r#""load" LIKE '2.0'"#));

        let out = sql("show devices where load in (1.5, 2.0)");
        assert!(out.contains(r#""load" IN (1.5, 2.0)"#));

        let out = aql("show devices where load = 2.0 and n = 2");
        assert!(out.contains("FILTER doc.load == 2.0 AND doc.n == 2"));

        assert_eq!(float_literal(1e21), "1e21");
    }

    #[test]
    fn test_every_comparison_operator() {
        let out = sql("show flows where a != 1 and b > 2 and c >= 3 and d < 4 and e <= 5");
        for expected in [r#""a" <> 1"#, r#""b" > 2"#, r#""c" >= 3"#, r#""d" < 4"#, r#""e" <= 5"#] {
            assert!(out.contains(expected), "{expected} in {out}");
        }

        let out = aql("show flows where a != 1 and b > 2 and c >= 3 and d < 4 and e <= 5");
        assert!(out.contains("doc.a != 1 AND doc.b > 2 AND doc.c >= 3 AND doc.d < 4 AND doc.e <= 5"));
    }

    #[test]
    fn test_sql_groups_keep_their_parentheses() {
        let out = sql("show flows where a = 1 and (b = 2 or c = 3)");
        assert!(out.contains(r#"("b" = 2 OR "c" = 3)"#));
    }

    #[test]
    fn test_sql_predicates() {
        let out = sql(
            "show flows where port in (22, 443) and owner is null and tag is not null and Name like 'web%'",
        );
        assert!(out.contains(r#""port" IN (22, 443)"#));
        assert!(out.contains(r#""owner" IS NULL"#));
        assert!(out.contains(r#""tag" IS NOT NULL"#));
        assert!(out.contains(r#""name" LIKE 'web%'"#));
    }

    #[test]
    fn test_sql_contains_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");

        let out = sql("show logs where message contains 'timeout'");
        assert!(out.contains(r#""message" LIKE"#));
        assert!(out.contains("%timeout%"));
        assert!(out.contains("ESCAPE"));
    }

    #[test]
    fn test_sql_qualified_field() {
        let out = sql("show flows where Devices.IP = 10.0.0.1");
        assert!(out.contains(r#""unified_devices"."ip" = '10.0.0.1'"#));
    }

    #[test]
    fn test_sql_dialects() {
        let query = compile_str("show devices where up = true limit 5").unwrap();

        let mysql = SqlTranslator::new(mapping())
            .with_dialect(SqlDialect::MySql)
            .translate(&query);
        assert!(mysql.contains("`unified_devices`"));
        assert!(mysql.contains("LIMIT 5"));

        let mut translator = SqlTranslator::new(mapping());
        translator.set_dialect("SQLite".parse().unwrap());
        assert_eq!(translator.dialect(), SqlDialect::Sqlite);
        assert!(translator.translate(&query).contains(r#""unified_devices""#));

        assert_eq!(
            "oracle".parse::<SqlDialect>(),
            Err(UnknownDialect("oracle".to_string()))
        );
    }

    #[test]
    fn test_aql_find() {
        let out = aql(
            r#"FIND devices WHERE (status = "up" AND region = "us-east") OR ip BETWEEN "10.0.0.1" AND "10.0.0.255" ORDER BY hostname DESC LIMIT 50"#,
        );
        assert_eq!(
            out,
            "FOR doc IN unified_devices\n  \
             FILTER (doc.status == 'up' AND doc.region == 'us-east') OR (doc.ip >= '10.0.0.1' AND doc.ip <= '10.0.0.255')\n  \
             SORT doc.hostname DESC\n  \
             LIMIT 50\n  \
             RETURN doc"
        );
    }

    #[test]
    fn test_aql_predicates() {
        let out = aql(
            "show flows where port in (22, 443) and note contains \"it's\" and owner is null \
             and tag is not null and bytes >= 1.5 and name like 'web%'",
        );
        assert!(out.contains("doc.port IN [22, 443]"));
        assert!(out.contains(r"CONTAINS(doc.note, 'it\'s')"));
        assert!(out.contains("doc.owner == null"));
        assert!(out.contains("doc.tag != null"));
        assert!(out.contains("doc.bytes >= 1.5"));
        assert!(out.contains("LIKE(doc.name, 'web%', true)"));
    }

    #[test]
    fn test_aql_count() {
        let out = aql("count flows where Flows.Proto = 'tcp'");
        assert_eq!(
            out,
            "RETURN LENGTH(\nFOR doc IN flows\n  FILTER doc.proto == 'tcp'\n  RETURN 1\n)"
        );
    }
}
