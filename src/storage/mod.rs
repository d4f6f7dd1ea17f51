pub mod aggregate;
pub mod file;
pub mod filter;
pub mod index;
pub mod table;

pub use filter::{BoundPredicate, ColumnResolver};
pub use index::Index;
pub use table::Table;

use crate::error::{DbError, Result};
use crate::query::ColumnSpec;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Every value is stored as text; the empty string is null.
pub type Row = Vec<String>;

/// Padding for the missing side of an outer join.
pub const NULL_MARKER: &str = "NULL";

#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum DataType {
    Integer,
    Float,
    Bool,
    String,
    VarChar(usize),
}

impl DataType {
    /// Whether a non-null value is acceptable for this type.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            DataType::Integer => value.trim().parse::<i64>().is_ok(),
            DataType::Float => value.trim().parse::<f64>().is_ok(),
            DataType::Bool => parse_bool(value).is_some(),
            DataType::String => true,
            DataType::VarChar(len) => value.chars().count() <= len,
        }
    }

    /// Ordering used by ORDER BY. Nulls sort first; values that do not
    /// parse as the declared type fall back to text order.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let typed = match self {
            DataType::Integer => match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => None,
            },
            DataType::Float => match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b),
                _ => None,
            },
            DataType::Bool => match (parse_bool(a), parse_bool(b)) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
            DataType::String | DataType::VarChar(_) => None,
        };
        typed.unwrap_or_else(|| a.cmp(b))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_uppercase().as_str() {
        "TRUE" | "1" => Some(true),
        "FALSE" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("INTEGER"),
            DataType::Float => f.write_str("FLOAT"),
            DataType::Bool => f.write_str("BOOL"),
            DataType::String => f.write_str("STRING"),
            DataType::VarChar(len) => write!(f, "VARCHAR({len})"),
        }
    }
}

impl FromStr for DataType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        if let Some((name, rest)) = upper.split_once('(') {
            let len = rest
                .strip_suffix(')')
                .and_then(|len| len.trim().parse::<usize>().ok())
                .ok_or_else(|| DbError::InvalidSchema(format!("bad type '{s}'")))?;
            return match name.trim() {
                "VARCHAR" | "CHAR" => Ok(DataType::VarChar(len)),
                _ => Ok(DataType::String),
            };
        }
        Ok(match upper.as_str() {
            "INT" | "INTEGER" => DataType::Integer,
            "FLOAT" | "DOUBLE" | "REAL" => DataType::Float,
            "BOOL" | "BOOLEAN" => DataType::Bool,
            _ => DataType::String,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
}

impl ColumnDef {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable: true,
            primary_key: false,
            foreign_key: None,
        }
    }

    /// Validates a value against nullability and the declared type.
    pub fn check(&self, value: &str) -> Result<()> {
        if value.is_empty() {
            return if self.nullable {
                Ok(())
            } else {
                Err(DbError::NullViolation(self.name.clone()))
            };
        }
        if self.data_type.accepts(value) {
            Ok(())
        } else {
            Err(DbError::TypeMismatch {
                column: self.name.clone(),
                data_type: self.data_type.to_string(),
                value: value.to_string(),
            })
        }
    }
}

impl TryFrom<&ColumnSpec> for ColumnDef {
    type Error = DbError;

    fn try_from(spec: &ColumnSpec) -> Result<Self> {
        Ok(Self {
            name: spec.name.to_string(),
            data_type: spec.data_type.parse()?,
            nullable: spec.nullable,
            primary_key: spec.primary_key,
            foreign_key: spec.references.as_ref().map(|(table, column)| ForeignKey {
                table: table.to_string(),
                column: column.to_string(),
            }),
        })
    }
}
