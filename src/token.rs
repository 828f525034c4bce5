//! The token definition for SRQL.

/// A token is a single unit of the language, with a specific kind and location.
///
/// `text` is the exact source slice the token was read from. For quoted
/// literals it still includes the quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Statement keywords
    Show,
    Find,
    Count,
    Where,
    Order,
    By,
    Limit,
    Latest,
    Asc,
    Desc,

    // Condition keywords
    And,
    Or,
    Not,
    In,
    Between,
    Contains,
    Is,
    Null,
    Like,

    /// One of the entity keywords (`devices`, `flows`, ...).
    Entity,
    Identifier,

    // Literals
    String,
    Timestamp,
    Integer,
    Float,
    Boolean,
    IpAddress,
    MacAddress,

    // Punctuation
    Dot,
    Comma,
    LParen,
    RParen,

    // Operators
    Eq,    // =
    NotEq, // != or <>
    Gt,    // >
    Gte,   // >=
    Lt,    // <
    Lte,   // <=

    // Special
    Illegal, // An illegal/unknown character or an unterminated literal
}

impl TokenKind {
    pub fn is_comparison_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Gt
                | TokenKind::Gte
                | TokenKind::Lt
                | TokenKind::Lte
                | TokenKind::Like
        )
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}
