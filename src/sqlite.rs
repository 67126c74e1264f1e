use std::path::Path;

use rusqlite::{params_from_iter, Connection, OpenFlags};

use crate::{
    util::{check_arity, create_table_sql, insert_sql},
    Backend, ColumnName, ConnectError, Credentials, DbError,
};

const QUOTE: char = '"';

#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn open(path: impl AsRef<Path>, create: bool) -> rusqlite::Result<Self> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(path, flags)?;
        Ok(SqliteSession { conn })
    }
}

impl Backend for SqliteSession {
    type Transaction<'a> = Transaction<'a>;

    fn connect(credentials: &Credentials) -> Result<Self, ConnectError> {
        let database = credentials
            .database()
            .map_err(|_| ConnectError::NoDatabase)?;
        if credentials.password.is_some() {
            log::warn!("sqlite ignores the configured password");
        }
        let session =
            Self::open(database, credentials.create_if_missing).map_err(|source| {
                ConnectError::Sqlite {
                    database: database.to_owned(),
                    source,
                }
            })?;
        log::info!("Connected to sqlite database {}", database);
        Ok(session)
    }

    fn create_table(&mut self, table: &str, columns: &[ColumnName]) -> Result<(), DbError> {
        let sql = create_table_sql(table, columns, QUOTE);
        log::debug!("{}", sql);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn transaction(&mut self) -> Result<Transaction<'_>, DbError> {
        Ok(Transaction {
            tx: self.conn.transaction()?,
        })
    }

    fn close(self) -> Result<(), DbError> {
        self.conn.close().map_err(|(_, e)| DbError::from(e))
    }
}

pub struct Transaction<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl<'conn> crate::Transaction for Transaction<'conn> {
    fn insert_rows(
        &mut self,
        table: &str,
        column_count: usize,
        rows: &[Vec<String>],
    ) -> Result<usize, DbError> {
        let mut stmt = self.tx.prepare(&insert_sql(table, column_count, QUOTE))?;
        for (i, row) in rows.iter().enumerate() {
            check_arity(i, column_count, row)?;
            stmt.execute(params_from_iter(row))?;
        }
        Ok(rows.len())
    }

    fn commit(self) -> Result<(), DbError> {
        Ok(self.tx.commit()?)
    }
}
