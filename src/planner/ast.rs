//! Parsed statement structures handed to the planner
//!
//! The gateway's parser produces these values; the planner only reads them.
//! Every type is serde-(de)serializable so statements can travel as JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Possibly schema-qualified table name, e.g. `information_schema.tables`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Schema qualifier, if any
    pub fn prefix(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Raw table name without qualifier
    pub fn suffix(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Column reference, optionally qualified by a table or alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
}

/// Function call in a select list or predicate, e.g. `COUNT(DISTINCT uid)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
    #[serde(default)]
    pub distinct: bool,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            distinct: false,
        }
    }
}

/// Predicate / value expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Column(ColumnRef),
    Literal {
        value: Value,
    },
    /// Positional placeholder into the bound argument list
    Param {
        index: usize,
    },
    /// `*` inside `COUNT(*)`
    Wildcard,
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        #[serde(default)]
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        #[serde(default)]
        negated: bool,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        expr: Box<Expr>,
    },
    Function(FunctionCall),
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn lit(value: Value) -> Self {
        Expr::Literal { value }
    }

    pub fn param(index: usize) -> Self {
        Expr::Param { index }
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Gt, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Lt, left, right)
    }

    pub fn in_list(expr: Expr, list: Vec<Expr>) -> Self {
        Expr::In {
            expr: Box::new(expr),
            list,
            negated: false,
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns the referenced column if this is a bare column expression
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }
}

/// One entry of the select list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectElement {
    /// `*` or `t.*`
    All {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qualifier: Option<String>,
    },
    Column {
        column: ColumnRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Function {
        func: FunctionCall,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    Expr {
        expr: Expr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

impl SelectElement {
    pub fn star() -> Self {
        SelectElement::All { qualifier: None }
    }

    pub fn column(name: impl Into<String>) -> Self {
        SelectElement::Column {
            column: ColumnRef::new(name),
            alias: None,
        }
    }

    pub fn function(func: FunctionCall, alias: Option<&str>) -> Self {
        SelectElement::Function {
            func,
            alias: alias.map(str::to_string),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            SelectElement::All { .. } => None,
            SelectElement::Column { alias, .. }
            | SelectElement::Function { alias, .. }
            | SelectElement::Expr { alias, .. } => alias.as_deref(),
        }
    }
}

/// Join flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

/// Two-way join between two table sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinNode {
    pub left: TableSource,
    pub right: TableSource,
    pub join_type: JoinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<Expr>,
}

/// What a FROM entry refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Table(TableName),
    Join(Box<JoinNode>),
    Subquery { query: Box<SelectStatement> },
}

/// FROM entry with its optional alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSource {
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl TableSource {
    pub fn table(name: TableName) -> Self {
        Self {
            source: Source::Table(name),
            alias: None,
        }
    }

    pub fn join(join: JoinNode) -> Self {
        Self {
            source: Source::Join(Box::new(join)),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The referenced table, if this source is a plain table reference
    pub fn table_name(&self) -> Option<&TableName> {
        match &self.source {
            Source::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

/// ORDER BY key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub column: ColumnRef,
    #[serde(default)]
    pub desc: bool,
}

impl OrderByItem {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: ColumnRef::new(column),
            desc: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: ColumnRef::new(column),
            desc: true,
        }
    }
}

/// LIMIT / OFFSET operand: literal or placeholder position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitValue {
    Literal(u64),
    Param(usize),
}

impl LimitValue {
    pub fn is_param(&self) -> bool {
        matches!(self, LimitValue::Param(_))
    }
}

/// `LIMIT limit [OFFSET offset]`; an absent offset means literal 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitClause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<LimitValue>,
    pub limit: LimitValue,
}

impl LimitClause {
    pub fn new(limit: LimitValue) -> Self {
        Self { offset: None, limit }
    }

    pub fn with_offset(mut self, offset: LimitValue) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn offset_value(&self) -> LimitValue {
        self.offset.unwrap_or(LimitValue::Literal(0))
    }
}

/// Parsed SELECT statement
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectStatement {
    #[serde(default)]
    pub distinct: bool,
    pub select: Vec<SelectElement>,
    #[serde(default)]
    pub from: Vec<TableSource>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<ColumnRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<Expr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitClause>,
}

impl SelectStatement {
    /// Creates a statement with the given select list and no FROM clause
    pub fn new(select: Vec<SelectElement>) -> Self {
        Self {
            select,
            ..Default::default()
        }
    }

    /// Adds a plain table to the FROM clause
    pub fn from_table(mut self, table: TableName) -> Self {
        self.from.push(TableSource::table(table));
        self
    }

    /// Adds an arbitrary FROM source
    pub fn from_source(mut self, source: TableSource) -> Self {
        self.from.push(source);
        self
    }

    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(ColumnRef::new(column));
        self
    }

    pub fn with_order_by(mut self, item: OrderByItem) -> Self {
        self.order_by.push(item);
        self
    }

    pub fn with_limit(mut self, limit: LimitClause) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the single FROM source is a join
    pub fn has_join(&self) -> bool {
        matches!(self.from.as_slice(), [TableSource { source: Source::Join(_), .. }])
    }

    /// Returns the join node if `has_join`
    pub fn join(&self) -> Option<&JoinNode> {
        match self.from.as_slice() {
            [TableSource {
                source: Source::Join(join),
                ..
            }] => Some(join),
            _ => None,
        }
    }

    /// Returns the first FROM entry's table, if it is a plain table
    pub fn first_table(&self) -> Option<&TableName> {
        self.from.first().and_then(TableSource::table_name)
    }
}

/// Statement kinds known to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

/// Any parsed statement. Only SELECT carries a body; writes are routed
/// elsewhere by the gateway and only their kind and target are kept here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    Select(SelectStatement),
    Insert { table: TableName },
    Update { table: TableName },
    Delete { table: TableName },
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert { .. } => StatementKind::Insert,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete { .. } => StatementKind::Delete,
        }
    }

    pub fn as_select(&self) -> Option<&SelectStatement> {
        match self {
            Statement::Select(s) => Some(s),
            _ => None,
        }
    }
}
