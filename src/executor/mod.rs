/*
실행 예시

    `CREATE DATABASE school;`
    >>> SUCCESS

    `CREATE TABLE friends (name VARCHAR(20) NOT NULL, age INT);`
    `INSERT INTO friends VALUES ('Alpha', 18);`
    `INSERT INTO friends VALUES ('Beta', 20);`
    >>> SUCCESS
        SUCCESS
        SUCCESS

    `SELECT name FROM friends WHERE age = 20;`
    >>> | name |
        |------|
        | Beta |
        (1 row)

    `DELETE FROM friends WHERE age = 99;`
    >>> UNCHANGED

변경이 없는 문장은 UNCHANGED, 실패한 문장은 ERROR를 출력하고
다음 문장은 계속 실행됩니다.
*/

pub mod database;
mod join;

pub use database::DatabaseManager;

use crate::error::{DbError, Result};
use crate::query::{Stmt, parse_each};
use crate::storage::Row;
use log::{debug, warn};
use std::fmt;

/// Login and permission state, owned outside the engine.
pub trait Session {
    fn is_logged_in(&self) -> bool;
    fn can_modify_data(&self) -> bool;
    fn current_database(&self) -> Option<&str>;
}

/// Column headers and rows of a SELECT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Rows(ResultSet),
    Success,
    /// The statement ran but changed nothing.
    Unchanged,
    Error(String),
}

impl QueryResult {
    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            write!(f, "|")?;
            for (cell, &width) in cells.iter().zip(&widths) {
                write!(f, " {cell:<width$} |")?;
            }
            writeln!(f)
        };
        line(f, &self.columns)?;
        write!(f, "|")?;
        for width in &widths {
            write!(f, "{}|", "-".repeat(width + 2))?;
        }
        writeln!(f)?;
        for row in &self.rows {
            line(f, row)?;
        }
        match self.rows.len() {
            1 => write!(f, "(1 row)"),
            n => write!(f, "({n} rows)"),
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(rows) => write!(f, "{rows}"),
            QueryResult::Success => f.write_str("SUCCESS"),
            QueryResult::Unchanged => f.write_str("UNCHANGED"),
            QueryResult::Error(msg) => write!(f, "ERROR: {msg}"),
        }
    }
}

/// Runs SQL text for one session against a `DatabaseManager`.
pub struct Executor<S: Session> {
    db: DatabaseManager,
    session: S,
}

impl<S: Session> Executor<S> {
    /// Selects the session's database, if it names one.
    pub fn new(mut db: DatabaseManager, session: S) -> Result<Self> {
        if let Some(name) = session.current_database() {
            db.use_database(name)?;
        }
        Ok(Self { db, session })
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.db
    }

    /// Runs every statement in `src`, one result per statement. A failed
    /// statement does not stop the ones after it.
    pub fn run(&mut self, src: &str) -> Vec<QueryResult> {
        parse_each(src)
            .into_iter()
            .map(|stmt| match stmt {
                Ok(stmt) => self.execute(&stmt),
                Err(e) => QueryResult::Error(DbError::from(e).to_string()),
            })
            .collect()
    }

    pub fn execute(&mut self, stmt: &Stmt) -> QueryResult {
        match self.try_execute(stmt) {
            Ok(result) => result,
            Err(e) => {
                warn!("{} failed: {e}", stmt.kind());
                QueryResult::Error(e.to_string())
            }
        }
    }

    fn try_execute(&mut self, stmt: &Stmt) -> Result<QueryResult> {
        if !self.session.is_logged_in() {
            return Err(DbError::Unsupported("running queries without logging in".to_string()));
        }
        if stmt.is_mutating() && !self.session.can_modify_data() {
            return Err(DbError::Unsupported(format!(
                "{} for a read-only session",
                stmt.kind()
            )));
        }
        debug!("running {}", stmt.kind());
        Ok(match stmt {
            Stmt::Select(select) => QueryResult::Rows(self.db.execute_select(select)?),
            Stmt::ShowTables | Stmt::ShowDatabases => QueryResult::Rows(self.db.show(stmt)?),
            _ => {
                if self.db.execute_non_query(stmt)? {
                    QueryResult::Success
                } else {
                    QueryResult::Unchanged
                }
            }
        })
    }
}
