use super::error::{QueryErr, Result};
use super::lexer::{Lexer, Token};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

/// One parsed SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Select(Select),
    Insert {
        table: Box<str>,
        values: Vec<String>,
    },
    Update {
        table: Box<str>,
        assigns: Vec<(Box<str>, String)>,
        filter: Option<Predicate>,
    },
    Delete {
        table: Box<str>,
        filter: Option<Predicate>,
    },
    CreateTable {
        table: Box<str>,
        columns: Vec<ColumnSpec>,
    },
    DropTable {
        table: Box<str>,
    },
    CreateDatabase {
        name: Box<str>,
    },
    DropDatabase {
        name: Box<str>,
    },
    Use {
        name: Box<str>,
    },
    ShowTables,
    ShowDatabases,
}

impl Stmt {
    /// Whether running the statement may change data on disk.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Stmt::Insert { .. }
                | Stmt::Update { .. }
                | Stmt::Delete { .. }
                | Stmt::CreateTable { .. }
                | Stmt::DropTable { .. }
                | Stmt::CreateDatabase { .. }
                | Stmt::DropDatabase { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Stmt::Select(_) => "SELECT",
            Stmt::Insert { .. } => "INSERT",
            Stmt::Update { .. } => "UPDATE",
            Stmt::Delete { .. } => "DELETE",
            Stmt::CreateTable { .. } => "CREATE TABLE",
            Stmt::DropTable { .. } => "DROP TABLE",
            Stmt::CreateDatabase { .. } => "CREATE DATABASE",
            Stmt::DropDatabase { .. } => "DROP DATABASE",
            Stmt::Use { .. } => "USE",
            Stmt::ShowTables => "SHOW TABLES",
            Stmt::ShowDatabases => "SHOW DATABASES",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub items: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub joins: Vec<Join>,
    pub filter: Option<Predicate>,
    pub group_by: Vec<Box<str>>,
    pub having: Option<Having>,
    pub order_by: Option<OrderBy>,
}

impl Select {
    /// True when the query reads from more than one table.
    pub fn is_multi_table(&self) -> bool {
        self.from.len() > 1 || !self.joins.is_empty()
    }

    pub fn has_aggregates(&self) -> bool {
        self.items.iter().any(SelectItem::is_aggregate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column {
        column: ColumnRef,
        alias: Option<Box<str>>,
    },
    Aggregate {
        func: AggregateFunc,
        /// `None` for `COUNT(*)`.
        arg: Option<ColumnRef>,
        alias: Option<Box<str>>,
    },
}

impl SelectItem {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, SelectItem::Aggregate { .. })
    }

    /// The source text of the item, without its alias.
    pub fn expr(&self) -> String {
        match self {
            SelectItem::Wildcard => "*".to_string(),
            SelectItem::Column { column, .. } => column.to_string(),
            SelectItem::Aggregate { func, arg: None, .. } => format!("{func}(*)"),
            SelectItem::Aggregate {
                func,
                arg: Some(arg),
                ..
            } => format!("{func}({arg})"),
        }
    }

    /// Result header: the alias, else the column name or aggregate text.
    pub fn header(&self) -> String {
        match self {
            SelectItem::Column {
                alias: Some(alias), ..
            }
            | SelectItem::Aggregate {
                alias: Some(alias), ..
            } => alias.to_string(),
            SelectItem::Column { column, .. } => column.name.to_string(),
            _ => self.expr(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_uppercase().as_str() {
            "COUNT" => AggregateFunc::Count,
            "SUM" => AggregateFunc::Sum,
            "AVG" => AggregateFunc::Avg,
            "MIN" => AggregateFunc::Min,
            "MAX" => AggregateFunc::Max,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[qualifier.]name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<Box<str>>,
    pub name: Box<str>,
}

impl ColumnRef {
    pub fn bare(name: &str) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{qualifier}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: Box<str>,
    pub alias: Option<Box<str>>,
}

impl TableRef {
    /// The name columns of this table are qualified with.
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub on: Predicate,
}

/// A conjunction of comparisons. No OR, no parentheses.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub terms: Vec<Comparison>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Operand,
    pub op: CmpOp,
    pub right: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(String),
    Column(ColumnRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CmpOp {
    fn from_token(token: &Token) -> Option<Self> {
        Some(match token {
            Token::Eq => CmpOp::Eq,
            Token::Ne => CmpOp::Ne,
            Token::Gt => CmpOp::Gt,
            Token::Lt => CmpOp::Lt,
            Token::Ge => CmpOp::Ge,
            Token::Le => CmpOp::Le,
            _ => return None,
        })
    }

    /// Whether `left op right` holds given `left.cmp(right)`.
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
        }
    }
}

/// `FUNC(column) op literal`, qualifiers stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub func: AggregateFunc,
    /// `None` for `COUNT(*)`.
    pub column: Option<Box<str>>,
    pub op: CmpOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub desc: bool,
}

/// A column definition as written in CREATE TABLE.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: Box<str>,
    /// Declared type, e.g. `INTEGER` or `VARCHAR(20)`.
    pub data_type: Box<str>,
    pub nullable: bool,
    pub primary_key: bool,
    /// `(table, column)` this column references.
    pub references: Option<(Box<str>, Box<str>)>,
}

/// Parses each `;`-separated statement on its own, so a statement that
/// fails to lex or parse only fails itself.
pub fn parse_each(sql: &str) -> Vec<Result<Stmt>> {
    Lexer::new(sql)
        .tokenize_each()
        .into_iter()
        .map(|tokens| -> Result<Stmt> {
            let mut parser = Parser {
                tokens: tokens?.into(),
            };
            let stmt = parser.parse_stmt()?;
            if parser.tokens.is_empty() {
                Ok(stmt)
            } else {
                Err(parser.unexpected("';' or end of input"))
            }
        })
        .collect()
}

/// Parses exactly one statement; trailing semicolons are allowed.
pub fn parse(sql: &str) -> Result<Stmt> {
    let mut stmts = Parser::new(Lexer::new(sql))?.parse()?;
    if stmts.len() != 1 {
        return Err(QueryErr::StatementCount(stmts.len()));
    }
    Ok(stmts.remove(0))
}

pub struct Parser {
    tokens: VecDeque<Token>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self> {
        Ok(Self {
            tokens: lexer.tokenize()?.into(),
        })
    }

    /// Parses a `;`-separated sequence of statements.
    pub fn parse(mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Token::Semicolon) {}
            if self.tokens.is_empty() {
                return Ok(stmts);
            }
            stmts.push(self.parse_stmt()?);
            if !self.tokens.is_empty() {
                self.expect(Token::Semicolon, "';' or end of input")?;
            }
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    fn peek_at(&self, step: usize) -> Option<&Token> {
        self.tokens.get(step)
    }

    fn bump(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Whether the next token is the unreserved word `word`.
    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w.eq_ignore_ascii_case(word))
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str, expected: &str) -> Result<()> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Semicolon))
    }

    fn unexpected(&self, expected: &str) -> QueryErr {
        QueryErr::UnexpectedToken {
            expected: expected.to_string(),
            found: match self.peek() {
                Some(token) => token.to_string(),
                None => "end of input".to_string(),
            },
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn ident(&mut self, expected: &str) -> Result<Box<str>> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name.into()),
            Some(other) => {
                self.tokens.push_front(other);
                Err(self.unexpected(expected))
            }
            None => Err(self.unexpected(expected)),
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        if self.eat_word("USE") {
            let name = self.ident("database name")?;
            return Ok(Stmt::Use { name });
        }
        if self.eat_word("SHOW") {
            return if self.eat_word("TABLES") {
                Ok(Stmt::ShowTables)
            } else if self.eat_word("DATABASES") {
                Ok(Stmt::ShowDatabases)
            } else {
                Err(QueryErr::Invalid(
                    "expected SHOW TABLES or SHOW DATABASES".to_string(),
                ))
            };
        }
        match self.peek() {
            Some(Token::Select) => self.parse_select().map(Stmt::Select),
            Some(Token::Insert) => self.parse_insert(),
            Some(Token::Update) => self.parse_update(),
            Some(Token::Delete) => self.parse_delete(),
            Some(Token::Create) => self.parse_create(),
            Some(Token::Drop) => self.parse_drop(),
            Some(token) => Err(QueryErr::UnsupportedStatement(token.to_string())),
            None => Err(QueryErr::UnexpectedEof),
        }
    }

    fn parse_select(&mut self) -> Result<Select> {
        self.expect(Token::Select, "SELECT")?;
        let mut items = vec![self.parse_select_item()?];
        while self.eat(&Token::Comma) {
            items.push(self.parse_select_item()?);
        }
        if self.at_end() {
            return Err(QueryErr::MissingClause("FROM clause"));
        }
        self.expect(Token::From, "FROM")?;

        let mut from = vec![self.parse_table_ref()?];
        while self.eat(&Token::Comma) {
            from.push(self.parse_table_ref()?);
        }

        let mut joins = Vec::new();
        while let Some(kind) = self.parse_join_kind()? {
            let table = self.parse_table_ref()?;
            if !self.eat(&Token::On) {
                return Err(QueryErr::MissingClause("ON condition for JOIN"));
            }
            let on = self.parse_predicate()?;
            joins.push(Join { kind, table, on });
        }

        let filter = if self.eat(&Token::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat(&Token::Group) {
            self.expect(Token::By, "BY after GROUP")?;
            group_by.push(self.parse_column_ref()?.name);
            while self.eat(&Token::Comma) {
                group_by.push(self.parse_column_ref()?.name);
            }
        }

        let having = if self.eat(&Token::Having) {
            Some(self.parse_having()?)
        } else {
            None
        };

        let order_by = if self.eat(&Token::Order) {
            self.expect(Token::By, "BY after ORDER")?;
            let column = self.parse_column_ref()?;
            let desc = if self.eat_word("DESC") {
                true
            } else {
                self.eat_word("ASC");
                false
            };
            Some(OrderBy { column, desc })
        } else {
            None
        };

        Ok(Select {
            items,
            from,
            joins,
            filter,
            group_by,
            having,
            order_by,
        })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.eat(&Token::Mul) {
            return Ok(SelectItem::Wildcard);
        }
        if let Some(Token::Ident(name)) = self.peek()
            && self.peek_at(1) == Some(&Token::LParen)
        {
            let func = AggregateFunc::from_name(name)
                .ok_or_else(|| QueryErr::Invalid(format!("unknown function '{name}'")))?;
            self.bump();
            self.bump();
            let arg = self.parse_aggregate_arg(func)?;
            let alias = self.parse_alias()?;
            return Ok(SelectItem::Aggregate { func, arg, alias });
        }
        let column = self.parse_column_ref()?;
        let alias = self.parse_alias()?;
        Ok(SelectItem::Column { column, alias })
    }

    /// Parses the argument after `FUNC(` through the closing parenthesis.
    fn parse_aggregate_arg(&mut self, func: AggregateFunc) -> Result<Option<ColumnRef>> {
        let arg = if self.eat(&Token::Mul) {
            if func != AggregateFunc::Count {
                return Err(QueryErr::Invalid(format!("{func}(*) is not supported")));
            }
            None
        } else {
            Some(self.parse_column_ref()?)
        };
        self.expect(Token::RParen, "')' closing the aggregate")?;
        Ok(arg)
    }

    fn parse_alias(&mut self) -> Result<Option<Box<str>>> {
        if self.eat(&Token::As) {
            return self.ident("alias after AS").map(Some);
        }
        if let Some(Token::Ident(_)) = self.peek() {
            return self.ident("alias").map(Some);
        }
        Ok(None)
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.ident("table name")?;
        let alias = self.parse_alias()?;
        Ok(TableRef { name, alias })
    }

    fn parse_join_kind(&mut self) -> Result<Option<JoinKind>> {
        let kind = match self.peek() {
            Some(Token::Join) => JoinKind::Inner,
            Some(Token::Inner) => {
                self.bump();
                JoinKind::Inner
            }
            Some(Token::Left) => {
                self.bump();
                self.eat(&Token::Outer);
                JoinKind::Left
            }
            Some(Token::Full) => {
                self.bump();
                self.eat(&Token::Outer);
                JoinKind::Full
            }
            _ => return Ok(None),
        };
        self.expect(Token::Join, "JOIN")?;
        Ok(Some(kind))
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.ident("column name")?;
        if self.eat(&Token::Dot) {
            let name = self.ident("column name after '.'")?;
            Ok(ColumnRef {
                qualifier: Some(first),
                name,
            })
        } else {
            Ok(ColumnRef {
                qualifier: None,
                name: first,
            })
        }
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        let mut terms = vec![self.parse_comparison()?];
        loop {
            if self.eat(&Token::And) {
                terms.push(self.parse_comparison()?);
            } else if self.peek() == Some(&Token::Or) {
                return Err(QueryErr::Invalid("OR conditions are not supported".to_string()));
            } else {
                return Ok(Predicate { terms });
            }
        }
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        let left = self.parse_operand()?;
        let op = match self.peek().and_then(CmpOp::from_token) {
            Some(op) => op,
            None => {
                let near = match self.peek() {
                    Some(token) => token.to_string(),
                    None => "end of input".to_string(),
                };
                return Err(QueryErr::MissingOperator(near));
            }
        };
        self.bump();
        let right = self.parse_operand()?;
        Ok(Comparison { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        if let Some(Token::Ident(_)) = self.peek() {
            return self.parse_column_ref().map(Operand::Column);
        }
        self.parse_literal().map(Operand::Literal)
    }

    /// A literal value. `NULL` is the empty string.
    fn parse_literal(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Num(_) | Token::Text(_) | Token::Null | Token::Bool(_)) => {
                Ok(match self.bump() {
                    Some(Token::Num(num)) => num,
                    Some(Token::Text(text)) => text,
                    Some(Token::Bool(true)) => "TRUE".to_string(),
                    Some(Token::Bool(false)) => "FALSE".to_string(),
                    _ => String::new(),
                })
            }
            Some(Token::Sub) => {
                self.bump();
                match self.bump() {
                    Some(Token::Num(num)) => Ok(format!("-{num}")),
                    _ => Err(QueryErr::Invalid("expected a number after '-'".to_string())),
                }
            }
            _ => Err(self.unexpected("a literal value")),
        }
    }

    /// A value in VALUES or SET. Bare words are taken literally.
    fn parse_value(&mut self) -> Result<String> {
        if let Some(Token::Ident(_)) = self.peek() {
            return self.ident("value").map(String::from);
        }
        self.parse_literal()
    }

    fn parse_having(&mut self) -> Result<Having> {
        let name = self.ident("aggregate function in HAVING")?;
        let func = AggregateFunc::from_name(&name)
            .ok_or_else(|| QueryErr::Invalid(format!("unknown function '{name}' in HAVING")))?;
        self.expect(Token::LParen, "'(' after aggregate function")?;
        let column = self.parse_aggregate_arg(func)?.map(|column| column.name);
        let op = match self.peek().and_then(CmpOp::from_token) {
            Some(op) => op,
            None => return Err(QueryErr::MissingOperator(format!("{func}(...)"))),
        };
        self.bump();
        let value = self.parse_literal()?;
        Ok(Having {
            func,
            column,
            op,
            value,
        })
    }

    fn parse_insert(&mut self) -> Result<Stmt> {
        self.expect(Token::Insert, "INSERT")?;
        self.expect(Token::Into, "INTO")?;
        let table = self.ident("table name")?;
        // 컬럼 목록은 지원하지 않으므로 무시
        if self.eat(&Token::LParen) {
            while !self.eat(&Token::RParen) {
                if self.bump().is_none() {
                    return Err(QueryErr::UnexpectedEof);
                }
            }
        }
        if self.at_end() {
            return Err(QueryErr::MissingClause("VALUES clause"));
        }
        self.expect(Token::Values, "VALUES")?;
        self.expect(Token::LParen, "'(' after VALUES")?;
        let mut values = Vec::new();
        if !self.eat(&Token::RParen) {
            values.push(self.parse_value()?);
            while self.eat(&Token::Comma) {
                values.push(self.parse_value()?);
            }
            self.expect(Token::RParen, "')' closing VALUES")?;
        }
        Ok(Stmt::Insert { table, values })
    }

    fn parse_update(&mut self) -> Result<Stmt> {
        self.expect(Token::Update, "UPDATE")?;
        let table = self.ident("table name")?;
        if self.at_end() {
            return Err(QueryErr::MissingClause("SET clause"));
        }
        self.expect(Token::Set, "SET")?;
        let mut assigns = Vec::new();
        loop {
            let column = self.ident("column name")?;
            self.expect(Token::Eq, "'=' in SET")?;
            assigns.push((column, self.parse_value()?));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let filter = if self.eat(&Token::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };
        Ok(Stmt::Update {
            table,
            assigns,
            filter,
        })
    }

    fn parse_delete(&mut self) -> Result<Stmt> {
        self.expect(Token::Delete, "DELETE")?;
        if self.at_end() {
            return Err(QueryErr::MissingClause("FROM clause"));
        }
        self.expect(Token::From, "FROM")?;
        let table = self.ident("table name")?;
        let filter = if self.eat(&Token::Where) {
            Some(self.parse_predicate()?)
        } else {
            None
        };
        Ok(Stmt::Delete { table, filter })
    }

    fn parse_create(&mut self) -> Result<Stmt> {
        self.expect(Token::Create, "CREATE")?;
        match self.bump() {
            Some(Token::Table) => {}
            Some(Token::Database) => {
                let name = self.ident("database name")?;
                return Ok(Stmt::CreateDatabase { name });
            }
            _ => {
                return Err(QueryErr::Invalid(
                    "expected CREATE TABLE or CREATE DATABASE".to_string(),
                ));
            }
        }
        let table = self.ident("table name")?;
        if !self.eat(&Token::LParen) {
            return Err(QueryErr::MissingClause("column list"));
        }
        if self.peek() == Some(&Token::RParen) {
            return Err(QueryErr::Invalid(
                "a table needs at least one column".to_string(),
            ));
        }

        let mut columns: Vec<ColumnSpec> = Vec::new();
        loop {
            if self.eat(&Token::Foreign) {
                let (column, target) = self.parse_foreign_key()?;
                let spec = columns
                    .iter_mut()
                    .find(|spec| spec.name == column)
                    .ok_or_else(|| {
                        QueryErr::Invalid(format!(
                            "foreign key on '{column}' must follow the column's declaration"
                        ))
                    })?;
                spec.references = Some(target);
            } else {
                columns.push(self.parse_column_spec()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')' closing the column list")?;
        Ok(Stmt::CreateTable { table, columns })
    }

    /// `KEY (col) REFERENCES table(col)`, after FOREIGN.
    fn parse_foreign_key(&mut self) -> Result<(Box<str>, (Box<str>, Box<str>))> {
        self.expect_word("KEY", "KEY after FOREIGN")?;
        self.expect(Token::LParen, "'(' after FOREIGN KEY")?;
        let column = self.ident("foreign key column")?;
        self.expect(Token::RParen, "')' after foreign key column")?;
        self.expect(Token::References, "REFERENCES")?;
        let table = self.ident("referenced table")?;
        self.expect(Token::LParen, "'(' after referenced table")?;
        let target = self.ident("referenced column")?;
        self.expect(Token::RParen, "')' after referenced column")?;
        Ok((column, (table, target)))
    }

    fn parse_column_spec(&mut self) -> Result<ColumnSpec> {
        let name = self.ident("column name")?;
        let mut data_type = self.ident("column type")?.to_uppercase();
        if self.eat(&Token::LParen) {
            match self.bump() {
                Some(Token::Num(len)) => data_type = format!("{data_type}({len})"),
                _ => return Err(QueryErr::Invalid(format!("bad length for type {data_type}"))),
            }
            self.expect(Token::RParen, "')' after type length")?;
        }

        let mut spec = ColumnSpec {
            name,
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            references: None,
        };
        loop {
            match self.peek() {
                Some(Token::Primary) => {
                    self.bump();
                    self.expect_word("KEY", "KEY after PRIMARY")?;
                    spec.primary_key = true;
                }
                Some(Token::Not) => {
                    self.bump();
                    self.expect(Token::Null, "NULL after NOT")?;
                    spec.nullable = false;
                }
                Some(Token::Null) => {
                    self.bump();
                    spec.nullable = true;
                }
                Some(Token::Comma | Token::RParen) => return Ok(spec),
                _ => return Err(self.unexpected("PRIMARY KEY, NOT NULL, ',' or ')'")),
            }
        }
    }

    fn parse_drop(&mut self) -> Result<Stmt> {
        self.expect(Token::Drop, "DROP")?;
        match self.bump() {
            Some(Token::Table) => {
                let table = self.ident("table name")?;
                Ok(Stmt::DropTable { table })
            }
            Some(Token::Database) => {
                let name = self.ident("database name")?;
                Ok(Stmt::DropDatabase { name })
            }
            _ => Err(QueryErr::Invalid(
                "expected DROP TABLE or DROP DATABASE".to_string(),
            )),
        }
    }
}
