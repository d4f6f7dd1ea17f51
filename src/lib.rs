pub mod error;
pub mod executor;
pub mod highlight;
pub mod query;
pub mod storage;

pub use error::{DbError, Result};
pub use executor::{DatabaseManager, Executor, QueryResult, ResultSet, Session};
