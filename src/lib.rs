use thiserror::Error;

pub mod config;
pub mod load;
pub mod naming;
pub mod sheet;
pub mod sqlite;
#[cfg(feature = "mysql")]
pub mod mysql;
mod util;

pub use config::{BackendKind, Config, ConfigError, Credentials, LoadSpec};
pub use load::{load, load_spreadsheet, LoadError};
pub use naming::ColumnName;
pub use sheet::{Cell, MissingPolicy, SheetError, Spreadsheet};
pub use sqlite::SqliteSession;
#[cfg(feature = "mysql")]
pub use mysql::MySqlSession;

/// A database the loader can write to.
///
/// One value of this type is a session: it is opened once, used by every
/// load of a run, and closed once at the end.
pub trait Backend: Sized {
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    fn connect(credentials: &Credentials) -> Result<Self, ConnectError>;
    /// Create `table` with a `TEXT` column per name unless it exists.
    ///
    /// Runs outside of any load transaction: MySQL commits DDL implicitly,
    /// which would end the transaction the rows are inserted in.
    fn create_table(&mut self, table: &str, columns: &[ColumnName]) -> Result<(), DbError>;
    fn transaction(&mut self) -> Result<Self::Transaction<'_>, DbError>;
    fn close(self) -> Result<(), DbError>;
}

/// Statements issued by one load.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it
/// back.
pub trait Transaction {
    fn insert_rows(
        &mut self,
        table: &str,
        column_count: usize,
        rows: &[Vec<String>],
    ) -> Result<usize, DbError>;
    fn commit(self) -> Result<(), DbError>;
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySql(#[from] sqlx::Error),
    #[error("row {row} has {actual} values, expected {expected}")]
    Arity {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no database configured")]
    NoDatabase,
    #[error("could not open sqlite database {database}")]
    Sqlite {
        database: String,
        #[source]
        source: rusqlite::Error,
    },
    #[cfg(feature = "mysql")]
    #[error("could not connect to mysql at {host}:{port}")]
    MySql {
        host: String,
        port: u16,
        #[source]
        source: sqlx::Error,
    },
    #[cfg(feature = "mysql")]
    #[error("could not start database runtime")]
    Runtime(#[source] std::io::Error),
}
