//! 语法分析器产生、编译器消费的语法树
//!
//! 关键字和字面量保留源文本，转换为类型化的值由编译器负责。
//! 每个语法分支对应一个枚举变体，一个节点只描述一种语法形式。

use crate::token::Span;

/// AST 的根节点, 代表一个完整的 SRQL 语句
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub statement: StatementKeyword,
    /// 语句关键字后面的实体名
    pub entity: KeywordNode,
    /// `WHERE` 子句
    pub condition: Option<ConditionNode>,
    /// `ORDER BY` 排序项, 没有该子句时为空
    pub order_by: Vec<OrderByNode>,
    /// `LIMIT` 后面的字面量
    pub limit: Option<LiteralNode>,
    /// 语句是否以 `LATEST` 修饰符结尾
    pub latest: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKeyword {
    Show,
    Find,
    Count,
}

/// 按原样保存的关键字或运算符, 例如：`DEVICES`, `<>`, `or`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordNode {
    pub text: String,
    pub span: Span,
}

impl KeywordNode {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self { text: text.into(), span }
    }
}

/// `expr (AND|OR expr)*`
///
/// 第一个表达式没有运算符, 之后的每个表达式都与它前面的逻辑关键字配对
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionNode {
    pub first: ExpressionNode,
    pub rest: Vec<(KeywordNode, ExpressionNode)>,
}

/// 条件列表中的一个表达式
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// `field op value`
    Comparison {
        field: FieldNode,
        operator: KeywordNode,
        value: LiteralNode,
    },
    /// `field IN (v1, v2, ...)`
    In {
        field: FieldNode,
        values: Vec<LiteralNode>,
    },
    /// `field CONTAINS "text"`
    Contains {
        field: FieldNode,
        value: LiteralNode,
    },
    /// `( condition )`
    Group(Box<ConditionNode>),
    /// `field BETWEEN lower AND upper`
    Between {
        field: FieldNode,
        lower: LiteralNode,
        upper: LiteralNode,
    },
    /// `field IS [NOT] NULL`
    NullCheck { field: FieldNode, negated: bool },
}

/// 字段引用, 例如：`ip` 或 `devices.metadata.region`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    /// 第一个点号前的实体限定名, 保留原样
    pub entity: Option<String>,
    /// 按源顺序排列的标识符, 不会为空
    pub identifiers: Vec<String>,
    pub span: Span,
}

impl FieldNode {
    pub fn bare(identifier: impl Into<String>, span: Span) -> Self {
        Self {
            entity: None,
            identifiers: vec![identifier.into()],
            span,
        }
    }
}

/// 字面量 token 的词法类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    Timestamp,
    Integer,
    Float,
    Boolean,
    IpAddress,
    MacAddress,
}

impl LiteralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LiteralKind::String => "string",
            LiteralKind::Timestamp => "timestamp",
            LiteralKind::Integer => "integer",
            LiteralKind::Float => "float",
            LiteralKind::Boolean => "boolean",
            LiteralKind::IpAddress => "ip address",
            LiteralKind::MacAddress => "mac address",
        }
    }
}

/// 字面量 token, `text` 是包含引号的原始文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralNode {
    pub kind: LiteralKind,
    pub text: String,
    pub span: Span,
}

impl LiteralNode {
    pub fn new(kind: LiteralKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByNode {
    pub field: FieldNode,
    /// 写出时为 `ASC` 或 `DESC`
    pub direction: Option<KeywordNode>,
}
