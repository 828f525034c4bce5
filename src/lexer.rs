//! SRQL 的词法分析器

use once_cell::sync::Lazy;
use regex::Regex;

use crate::token::{Span, Token, TokenKind};

static MAC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5}|[0-9A-Fa-f]{2}(?:-[0-9A-Fa-f]{2}){5})\b")
        .unwrap()
});

static IP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}\b").unwrap());

static FLOAT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+\.\d+").unwrap());

static INTEGER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+").unwrap());

/// 整个引号内容都是时间戳时才按时间戳处理，例如 `2024-01-01 08:00:00.5+08:00`
static TIMESTAMP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?$")
        .unwrap()
});

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.input[start..self.position],
            span: Span::new(start, self.position),
        }
    }

    /// 在当前位置尝试匹配 `pattern`，成功时消费匹配的文本
    fn read_pattern(&mut self, pattern: &Regex, kind: TokenKind) -> Option<Token<'a>> {
        let start = self.position;
        let matched = pattern.find(&self.input[start..])?;
        self.position = start + matched.end();
        Some(self.token(kind, start))
    }

    /// 读取不带引号的地址或数字字面量
    fn read_bare_literal(&mut self) -> Option<Token<'a>> {
        self.read_pattern(&MAC_PATTERN, TokenKind::MacAddress)
            .or_else(|| self.read_pattern(&IP_PATTERN, TokenKind::IpAddress))
            .or_else(|| self.read_pattern(&FLOAT_PATTERN, TokenKind::Float))
            .or_else(|| self.read_pattern(&INTEGER_PATTERN, TokenKind::Integer))
    }

    /// 读取由 `quote` 包围的字面量
    /// 注意：开始的引号已经被调用者消费
    fn read_quoted(&mut self, start: usize, quote: char) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == quote {
                break;
            }
            self.bump();
        }
        if self.peek().is_none() {
            return self.token(TokenKind::Illegal, start);
        }
        let content = &self.input[content_start..self.position];
        self.bump(); // 消费结束引号

        let kind = if TIMESTAMP_PATTERN.is_match(content) {
            TokenKind::Timestamp
        } else {
            TokenKind::String
        };
        self.token(kind, start)
    }

    /// 读取标识符或关键字
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }

    /// 读取以 `first` 开头的一到两个字符的运算符
    fn read_operator(&mut self, start: usize, first: char) -> Token<'a> {
        let kind = match (first, self.peek()) {
            ('<', Some('=')) => Some(TokenKind::Lte),
            ('<', Some('>')) => Some(TokenKind::NotEq),
            ('>', Some('=')) => Some(TokenKind::Gte),
            ('!', Some('=')) => Some(TokenKind::NotEq),
            _ => None,
        };
        if let Some(kind) = kind {
            self.bump();
            return self.token(kind, start);
        }
        let kind = match first {
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            _ => TokenKind::Illegal,
        };
        self.token(kind, start)
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s.to_ascii_lowercase().as_str() {
        "show" => TokenKind::Show,
        "find" => TokenKind::Find,
        "count" => TokenKind::Count,
        "where" => TokenKind::Where,
        "order" => TokenKind::Order,
        "by" => TokenKind::By,
        "limit" => TokenKind::Limit,
        "latest" => TokenKind::Latest,
        "asc" => TokenKind::Asc,
        "desc" => TokenKind::Desc,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "between" => TokenKind::Between,
        "contains" => TokenKind::Contains,
        "is" => TokenKind::Is,
        "null" => TokenKind::Null,
        "like" => TokenKind::Like,
        "true" | "false" => TokenKind::Boolean,
        "devices" | "flows" | "traps" | "connections" | "logs" => TokenKind::Entity,
        _ => TokenKind::Identifier,
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;
        let c = self.peek()?;

        // 地址可能以字母开头（`ab:cd:...`），所以先于标识符尝试
        let starts_number = c.is_ascii_digit()
            || (c == '-' && self.peek_next().is_some_and(|n| n.is_ascii_digit()));
        if c.is_ascii_hexdigit() || starts_number {
            if let Some(token) = self.read_bare_literal() {
                return Some(token);
            }
        }

        self.bump();
        let token = match c {
            '=' => self.token(TokenKind::Eq, start),
            '.' => self.token(TokenKind::Dot, start),
            ',' => self.token(TokenKind::Comma, start),
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '<' | '>' | '!' => self.read_operator(start, c),
            '"' | '\'' => self.read_quoted(start, c),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_statement() {
        let input = "SHOW devices WHERE ip = '192.168.1.1'";
        let tokens: Vec<_> = Lexer::new(input).collect();

        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Show,
                TokenKind::Entity,
                TokenKind::Where,
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::String,
            ]
        );
        assert_eq!(tokens[5].text, "'192.168.1.1'");
        assert_eq!(tokens[5].span, Span::new(24, 37));
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        assert_eq!(
            kinds("= != <> > >= < <= ( ) , ."),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Gt,
                TokenKind::Gte,
                TokenKind::Lt,
                TokenKind::Lte,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Comma,
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("find Count oRdEr by LIMIT latest asc DESC between contains is not null like"),
            vec![
                TokenKind::Find,
                TokenKind::Count,
                TokenKind::Order,
                TokenKind::By,
                TokenKind::Limit,
                TokenKind::Latest,
                TokenKind::Asc,
                TokenKind::Desc,
                TokenKind::Between,
                TokenKind::Contains,
                TokenKind::Is,
                TokenKind::Not,
                TokenKind::Null,
                TokenKind::Like,
            ]
        );
    }

    #[test]
    fn test_entities_booleans_and_identifiers() {
        assert_eq!(
            kinds("Devices FLOWS traps connections logs TRUE false host_name _x1"),
            vec![
                TokenKind::Entity,
                TokenKind::Entity,
                TokenKind::Entity,
                TokenKind::Entity,
                TokenKind::Entity,
                TokenKind::Boolean,
                TokenKind::Boolean,
                TokenKind::Identifier,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_numbers_and_addresses() {
        let input = "42 -7 3.14 10.0.0.1 00:1A:2B:3C:4D:5E ab-cd-ef-01-23-45";
        let tokens: Vec<_> = Lexer::new(input).map(|t| (t.kind, t.text)).collect();
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Integer, "42"),
                (TokenKind::Integer, "-7"),
                (TokenKind::Float, "3.14"),
                (TokenKind::IpAddress, "10.0.0.1"),
                (TokenKind::MacAddress, "00:1A:2B:3C:4D:5E"),
                (TokenKind::MacAddress, "ab-cd-ef-01-23-45"),
            ]
        );
    }

    #[test]
    fn test_hex_looking_identifier_is_not_an_address() {
        let tokens: Vec<_> = Lexer::new("abc dead").map(|t| (t.kind, t.text)).collect();
        assert_eq!(
            tokens,
            vec![(TokenKind::Identifier, "abc"), (TokenKind::Identifier, "dead")]
        );
    }

    #[test]
    fn test_quoted_literals() {
        let input = r#""hello world" 'single' "2023-12-25 14:30:00" '2024-01-01T08:00:00Z'"#;
        let tokens: Vec<_> = Lexer::new(input).map(|t| (t.kind, t.text)).collect();
        assert_eq!(
            tokens,
            vec![
                (TokenKind::String, r#""hello world""#),
                (TokenKind::String, "'single'"),
                (TokenKind::Timestamp, r#""2023-12-25 14:30:00""#),
                (TokenKind::Timestamp, "'2024-01-01T08:00:00Z'"),
            ]
        );
    }

    #[test]
    fn test_text_starting_with_a_date_is_a_string() {
        let input = r#"message = "2024-01-01 00:00:00 disk failed" '2024-01-01 00:00:00.250+08:00'"#;
        let tokens: Vec<_> = Lexer::new(input).map(|t| (t.kind, t.text)).collect();
        assert_eq!(tokens[2], (TokenKind::String, r#""2024-01-01 00:00:00 disk failed""#));
        assert_eq!(
            tokens[3],
            (TokenKind::Timestamp, "'2024-01-01 00:00:00.250+08:00'")
        );
    }

    #[test]
    fn test_unterminated_string_is_illegal() {
        let tokens: Vec<_> = Lexer::new(r#"name = "abc"#).collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Illegal);
        assert_eq!(tokens[2].text, r#""abc"#);
    }

    #[test]
    fn test_illegal_characters() {
        assert_eq!(
            kinds("a ! b ; -"),
            vec![
                TokenKind::Identifier,
                TokenKind::Illegal,
                TokenKind::Identifier,
                TokenKind::Illegal,
                TokenKind::Illegal,
            ]
        );
    }

    #[test]
    fn test_qualified_field() {
        assert_eq!(
            kinds("devices.metadata.region"),
            vec![
                TokenKind::Entity,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
            ]
        );
    }
}
