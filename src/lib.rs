//! SRQL: a small query language for network monitoring data.
//!
//! ```text
//! source --lexer--> tokens --parser--> QueryNode --compiler--> Query --translator--> SQL / AQL
//! ```
//!
//! [`compile_str`] runs the first three stages in one call.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod keywords;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod token;
pub mod translator;

use thiserror::Error;

pub use compiler::{compile, CompileError, KeywordCategory};
pub use model::Query;
pub use parser::ParseError;

/// Any failure on the way from source text to a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrqlError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Parses and compiles one SRQL statement.
pub fn compile_str(input: &str) -> Result<Query, SrqlError> {
    let node = parser::parse(input)?;
    Ok(compile(&node)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityType, QueryKind};

    #[test]
    fn test_compile_str() {
        let query = compile_str("count logs where level = 'error'").unwrap();
        assert_eq!(query.kind, QueryKind::Count);
        assert_eq!(query.entity, EntityType::Logs);
        assert_eq!(query.conditions.len(), 1);
    }

    #[test]
    fn test_compile_str_errors() {
        assert!(matches!(
            compile_str("show devices where"),
            Err(SrqlError::Parse(_))
        ));
        let err = compile_str("show routers").unwrap_err();
        assert!(matches!(err, SrqlError::Compile(_)));
        assert_eq!(err.to_string(), "unknown entity keyword \"routers\"");
    }
}
