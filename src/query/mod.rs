pub mod error;
pub mod lexer;
pub mod parser;

pub use error::QueryErr;
pub use lexer::Lexer;
pub use parser::{
    AggregateFunc, CmpOp, ColumnRef, ColumnSpec, Comparison, Having, Join, JoinKind, Operand,
    OrderBy, Parser, Predicate, Select, SelectItem, Stmt, TableRef, parse, parse_each,
};
