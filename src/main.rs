use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use srql::config::TableMappingConfig;
use srql::token::Span;
use srql::translator::{AqlTranslator, SqlDialect, SqlTranslator, Translator};
use srql::{compile_str, SrqlError};

const DEFAULT_CONFIG: &str = "table_mapping.json";

/// 交互式命令行的一行输入
#[derive(Debug)]
enum Command {
    Quit,
    Dialect(SqlDialect),
    Query(String),
    Empty,
}

/// 解析一行输入, 反斜杠开头的是命令，其余是 SRQL 语句
fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if line == "\\q" {
        return Ok(Command::Quit);
    }
    if let Some(rest) = line.strip_prefix("\\dialect") {
        let dialect = rest.trim().parse::<SqlDialect>()?;
        return Ok(Command::Dialect(dialect));
    }
    if line.starts_with('\\') {
        anyhow::bail!("unknown command {line:?}, try \\q or \\dialect <postgres|mysql|sqlite>");
    }
    Ok(Command::Query(line.trim_end_matches(';').to_string()))
}

/// 生成指向错误位置的标记行
///
/// Span 是字节偏移，缩进和宽度按字符计算，保证非 ASCII 输入下对齐。
fn caret_line(input: &str, span: Span) -> String {
    let indent = input
        .get(..span.start)
        .map_or(span.start, |prefix| prefix.chars().count());
    let width = input
        .get(span.start..span.end)
        .map_or(span.end.saturating_sub(span.start), |text| text.chars().count())
        .max(1);
    format!("{}{}", " ".repeat(indent), "^".repeat(width))
}

fn print_error(input: &str, err: &SrqlError) {
    println!("✗ {err}");
    if let SrqlError::Parse(parse_err) = err {
        if let Some(span) = parse_err.span {
            println!("  {input}");
            println!("  {}", caret_line(input, span));
        }
    }
}

fn run_query(input: &str, sql: &SqlTranslator, aql: &AqlTranslator) -> Result<()> {
    let query = match compile_str(input) {
        Ok(query) => query,
        Err(e) => {
            debug!(error = ?e, "statement rejected");
            print_error(input, &e);
            return Ok(());
        }
    };

    let json = serde_json::to_string_pretty(&query).context("cannot serialize query")?;
    println!("[query]\n{json}");
    println!("\n[sql: {}]\n{}", sql.dialect(), sql.translate(&query));
    println!("\n[aql]\n{}\n", aql.translate(&query));
    Ok(())
}

fn main() -> Result<()> {
    // 日志写到 stderr, 不和查询输出混在一起
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let mapping = TableMappingConfig::load_or_default(&config_path);

    let mut sql = SqlTranslator::new(mapping.clone());
    let aql = AqlTranslator::new(mapping);

    let mut editor = DefaultEditor::new().context("cannot start line editor")?;
    println!("SRQL shell. \\q quits, \\dialect <postgres|mysql|sqlite> switches SQL output.");

    loop {
        let line = match editor.readline("srql> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("cannot read input"),
        };
        editor
            .add_history_entry(line.as_str())
            .context("cannot update history")?;

        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Empty) => {}
            Ok(Command::Dialect(dialect)) => {
                sql.set_dialect(dialect);
                info!(%dialect, "switched SQL dialect");
                println!("SQL dialect: {dialect}");
            }
            Ok(Command::Query(input)) => run_query(&input, &sql, &aql)?,
            Err(e) => println!("✗ {e}"),
        }
    }

    Ok(())
}
