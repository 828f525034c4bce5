//! SRQL 的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ SHOW | FIND | COUNT
//!   ├─ parse_entity()
//!   ├─ WHERE → parse_condition()
//!   │            └─ parse_expression() {(AND|OR) parse_expression()}
//!   │                 ├─ "(" → parse_condition() ")"          (Group)
//!   │                 └─ parse_field() 之后是以下之一
//!   │                      ├─ 比较运算符 + 字面值              (Comparison)
//!   │                      ├─ IN "(" value {"," value} ")"    (In)
//!   │                      ├─ CONTAINS 带引号的字符串          (Contains)
//!   │                      ├─ BETWEEN value AND value         (Between)
//!   │                      └─ IS [NOT] NULL                   (NullCheck)
//!   ├─ ORDER BY → parse_order_by()        (仅 SHOW/FIND)
//!   ├─ LIMIT INTEGER                      (仅 SHOW/FIND)
//!   └─ LATEST                             (仅 SHOW/FIND)
//! ```
//!
//! 这里不处理 AND 和 OR 的优先级：条件就是按从左到右顺序排列的表达式列表，
//! 只有括号能分组。
//!
//! ## 解析示例
//!
//! ```text
//! show devices
//! find flows where src_ip = 10.0.0.1 and dst_port in (22, 443) limit 10
//! count traps where (severity = "critical" or severity = "major") and ack is null
//! show logs where message contains "timeout" order by timestamp desc latest
//! ```

use thiserror::Error;

use crate::ast::{
    ConditionNode, ExpressionNode, FieldNode, KeywordNode, LiteralKind, LiteralNode, OrderByNode,
    QueryNode, StatementKeyword,
};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

/// 允许的最大括号嵌套深度
pub const MAX_NESTING_DEPTH: usize = 64;

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self {
            message,
            span: Some(span),
        }
    }

    fn end_of_input(expected: &str) -> Self {
        Self::new(format!("Expected {expected}, but reached end of input"), None)
    }

    fn unexpected(token: Token<'_>, expected: &str) -> Self {
        let message = if token.kind == TokenKind::Illegal {
            format!("Unrecognized input {:?}", token.text)
        } else {
            format!("Expected {expected}, found {:?}", token.text)
        };
        Self::at_position(message, token.span)
    }
}

/// 对 `input` 依次进行词法分析和语法分析
pub fn parse(input: &str) -> Result<QueryNode, ParseError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    Parser::new(&tokens).parse()
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.position).copied()
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    /// 当前 token 类型匹配时消费它
    fn eat(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        match self.peek() {
            Some(token) if token.kind == kind => self.advance(),
            _ => None,
        }
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token<'a>, ParseError> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::unexpected(token, expected)),
            None => Err(ParseError::end_of_input(expected)),
        }
    }

    fn next_or(&mut self, expected: &str) -> Result<Token<'a>, ParseError> {
        self.advance()
            .ok_or_else(|| ParseError::end_of_input(expected))
    }

    pub fn parse(&mut self) -> Result<QueryNode, ParseError> {
        let first = self.next_or("SHOW, FIND or COUNT")?;
        let statement = match first.kind {
            TokenKind::Show => StatementKeyword::Show,
            TokenKind::Find => StatementKeyword::Find,
            TokenKind::Count => StatementKeyword::Count,
            _ => return Err(ParseError::unexpected(first, "SHOW, FIND or COUNT")),
        };

        let entity = self.parse_entity()?;

        let condition = match self.eat(TokenKind::Where) {
            Some(_) => Some(self.parse_condition()?),
            None => None,
        };

        let mut order_by = Vec::new();
        let mut limit = None;
        let mut latest = false;
        // COUNT 不接受排序、LIMIT 和修饰符，剩余的 token 由下面的输入结束检查报错
        if statement != StatementKeyword::Count {
            if self.eat(TokenKind::Order).is_some() {
                self.expect(TokenKind::By, "BY")?;
                order_by = self.parse_order_by()?;
            }
            if self.eat(TokenKind::Limit).is_some() {
                let token = self.expect(TokenKind::Integer, "an integer limit")?;
                limit = Some(LiteralNode::new(LiteralKind::Integer, token.text, token.span));
            }
            latest = self.eat(TokenKind::Latest).is_some();
        }

        if let Some(token) = self.peek() {
            return Err(ParseError::unexpected(token, "end of input"));
        }

        let last = self.tokens[self.position - 1].span;
        Ok(QueryNode {
            statement,
            entity,
            condition,
            order_by,
            limit,
            latest,
            span: first.span.to(last),
        })
    }

    fn parse_entity(&mut self) -> Result<KeywordNode, ParseError> {
        let token = self.next_or("an entity")?;
        match token.kind {
            // 未知实体名交给编译器拒绝
            TokenKind::Entity | TokenKind::Identifier => {
                Ok(KeywordNode::new(token.text, token.span))
            }
            _ => Err(ParseError::unexpected(token, "an entity")),
        }
    }

    /// `expression {(AND|OR) expression}`
    fn parse_condition(&mut self) -> Result<ConditionNode, ParseError> {
        let first = self.parse_expression()?;
        let mut rest = Vec::new();

        while let Some(op) = self
            .peek()
            .filter(|t| matches!(t.kind, TokenKind::And | TokenKind::Or))
        {
            self.advance();
            let expr = self.parse_expression()?;
            rest.push((KeywordNode::new(op.text, op.span), expr));
        }

        Ok(ConditionNode { first, rest })
    }

    fn parse_expression(&mut self) -> Result<ExpressionNode, ParseError> {
        if let Some(open) = self.eat(TokenKind::LParen) {
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(ParseError::at_position(
                    format!("Conditions nested deeper than {MAX_NESTING_DEPTH} levels"),
                    open.span,
                ));
            }
            self.depth += 1;
            let inner = self.parse_condition()?;
            self.depth -= 1;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(ExpressionNode::Group(Box::new(inner)));
        }

        let field = self.parse_field()?;
        let expected = "a comparison operator, IN, CONTAINS, BETWEEN or IS";
        let token = self.next_or(expected)?;

        match token.kind {
            kind if kind.is_comparison_operator() => {
                let value = self.parse_value()?;
                Ok(ExpressionNode::Comparison {
                    field,
                    operator: KeywordNode::new(token.text, token.span),
                    value,
                })
            }
            TokenKind::In => {
                let values = self.parse_value_list()?;
                Ok(ExpressionNode::In { field, values })
            }
            TokenKind::Contains => {
                let value = self.parse_quoted_string()?;
                Ok(ExpressionNode::Contains { field, value })
            }
            TokenKind::Between => {
                let lower = self.parse_value()?;
                self.expect(TokenKind::And, "AND")?;
                let upper = self.parse_value()?;
                Ok(ExpressionNode::Between { field, lower, upper })
            }
            TokenKind::Is => {
                let negated = self.eat(TokenKind::Not).is_some();
                self.expect(TokenKind::Null, "NULL")?;
                Ok(ExpressionNode::NullCheck { field, negated })
            }
            _ => Err(ParseError::unexpected(token, expected)),
        }
    }

    /// `"(" value {"," value} ")"`，至少一个值
    fn parse_value_list(&mut self) -> Result<Vec<LiteralNode>, ParseError> {
        let open = self.expect(TokenKind::LParen, "'('")?;
        if let Some(close) = self.eat(TokenKind::RParen) {
            return Err(ParseError::at_position(
                "IN list must contain at least one value".to_string(),
                open.span.to(close.span),
            ));
        }

        let mut values = vec![self.parse_value()?];
        while self.eat(TokenKind::Comma).is_some() {
            values.push(self.parse_value()?);
        }
        self.expect(TokenKind::RParen, "',' or ')'")?;
        Ok(values)
    }

    /// CONTAINS 只接受带引号的文本，带引号的时间戳在这里也按文本处理
    fn parse_quoted_string(&mut self) -> Result<LiteralNode, ParseError> {
        let token = self.next_or("a quoted string")?;
        match token.kind {
            TokenKind::String | TokenKind::Timestamp => {
                Ok(LiteralNode::new(LiteralKind::String, token.text, token.span))
            }
            _ => Err(ParseError::unexpected(token, "a quoted string")),
        }
    }

    fn parse_value(&mut self) -> Result<LiteralNode, ParseError> {
        let token = self.next_or("a literal value")?;
        let kind = match token.kind {
            TokenKind::String => LiteralKind::String,
            TokenKind::Timestamp => LiteralKind::Timestamp,
            TokenKind::Integer => LiteralKind::Integer,
            TokenKind::Float => LiteralKind::Float,
            TokenKind::Boolean => LiteralKind::Boolean,
            TokenKind::IpAddress => LiteralKind::IpAddress,
            TokenKind::MacAddress => LiteralKind::MacAddress,
            _ => return Err(ParseError::unexpected(token, "a literal value")),
        };
        Ok(LiteralNode::new(kind, token.text, token.span))
    }

    /// `IDENTIFIER | ENTITY "." name {"." name}`
    fn parse_field(&mut self) -> Result<FieldNode, ParseError> {
        let token = self.next_or("a field name")?;
        match token.kind {
            TokenKind::Identifier => Ok(FieldNode::bare(token.text, token.span)),
            TokenKind::Entity => {
                self.expect(TokenKind::Dot, "'.' after entity qualifier")?;
                let mut last = self.parse_field_segment()?;
                let mut identifiers = vec![last.text.to_string()];
                while self.eat(TokenKind::Dot).is_some() {
                    last = self.parse_field_segment()?;
                    identifiers.push(last.text.to_string());
                }
                Ok(FieldNode {
                    entity: Some(token.text.to_string()),
                    identifiers,
                    span: token.span.to(last.span),
                })
            }
            _ => Err(ParseError::unexpected(token, "a field name")),
        }
    }

    /// 点号后面的名称，允许使用关键字（`devices.count`）
    fn parse_field_segment(&mut self) -> Result<Token<'a>, ParseError> {
        let token = self.next_or("a field name")?;
        if is_identifier_shaped(token.text) {
            Ok(token)
        } else {
            Err(ParseError::unexpected(token, "a field name"))
        }
    }

    /// `field [ASC|DESC] {"," field [ASC|DESC]}`
    fn parse_order_by(&mut self) -> Result<Vec<OrderByNode>, ParseError> {
        let mut items = Vec::new();
        loop {
            let field = self.parse_field()?;
            let direction = self
                .peek()
                .filter(|t| matches!(t.kind, TokenKind::Asc | TokenKind::Desc))
                .map(|t| {
                    self.position += 1;
                    KeywordNode::new(t.text, t.span)
                });
            items.push(OrderByNode { field, direction });

            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(items)
    }
}

fn is_identifier_shaped(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
