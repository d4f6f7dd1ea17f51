use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryErr>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryErr {
    #[error("unexpected end of statement")]
    UnexpectedEof,
    #[error("invalid number literal '{0}'")]
    InvalidNum(String),
    #[error("unterminated text literal")]
    UnterminatedText,
    #[error("invalid character '{0}'")]
    InvalidToken(char),
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unsupported statement starting with {0}")]
    UnsupportedStatement(String),
    #[error("missing {0}")]
    MissingClause(&'static str),
    #[error("condition near {0} has no comparison operator")]
    MissingOperator(String),
    #[error("expected exactly one statement, found {0}")]
    StatementCount(usize),
    #[error("{0}")]
    Invalid(String),
}
