use sqlx::{
    mysql::{MySqlConnectOptions, MySqlConnection},
    ConnectOptions, Connection, MySql,
};
use tokio::runtime::{self, Runtime};

use crate::{
    util::{check_arity, create_table_sql, insert_sql},
    Backend, ColumnName, ConnectError, Credentials, DbError,
};

const QUOTE: char = '`';

/// A MySQL connection driven from blocking code.
///
/// The session owns a current-thread runtime and runs every statement to
/// completion before returning.
pub struct MySqlSession {
    rt: Runtime,
    conn: MySqlConnection,
}

impl MySqlSession {
    fn options(credentials: &Credentials, database: &str) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.user)
            .database(database);
        if let Some(password) = &credentials.password {
            options = options.password(password);
        }
        options.log_statements(log::LevelFilter::Debug)
    }
}

impl Backend for MySqlSession {
    type Transaction<'a> = Transaction<'a>;

    fn connect(credentials: &Credentials) -> Result<Self, ConnectError> {
        let database = credentials
            .database()
            .map_err(|_| ConnectError::NoDatabase)?;
        let rt = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConnectError::Runtime)?;
        let conn = rt
            .block_on(Self::options(credentials, database).connect())
            .map_err(|source| ConnectError::MySql {
                host: credentials.host.clone(),
                port: credentials.port,
                source,
            })?;
        log::info!(
            "Connected to mysql database {} at {}:{}",
            database,
            credentials.host,
            credentials.port
        );
        Ok(MySqlSession { rt, conn })
    }

    // Issued in autocommit mode, before the load's transaction begins.
    fn create_table(&mut self, table: &str, columns: &[ColumnName]) -> Result<(), DbError> {
        let sql = create_table_sql(table, columns, QUOTE);
        self.rt.block_on(sqlx::query(&sql).execute(&mut self.conn))?;
        Ok(())
    }

    fn transaction(&mut self) -> Result<Transaction<'_>, DbError> {
        let tx = self.rt.block_on(self.conn.begin())?;
        Ok(Transaction { rt: &self.rt, tx })
    }

    fn close(self) -> Result<(), DbError> {
        let MySqlSession { rt, conn } = self;
        rt.block_on(conn.close())?;
        Ok(())
    }
}

pub struct Transaction<'s> {
    rt: &'s Runtime,
    tx: sqlx::Transaction<'s, MySql>,
}

impl<'s> crate::Transaction for Transaction<'s> {
    fn insert_rows(
        &mut self,
        table: &str,
        column_count: usize,
        rows: &[Vec<String>],
    ) -> Result<usize, DbError> {
        let sql = insert_sql(table, column_count, QUOTE);
        for (i, row) in rows.iter().enumerate() {
            check_arity(i, column_count, row)?;
            let query = row
                .iter()
                .fold(sqlx::query(&sql), |query, value| query.bind(value.as_str()));
            self.rt.block_on(query.execute(&mut *self.tx))?;
        }
        Ok(rows.len())
    }

    fn commit(self) -> Result<(), DbError> {
        let Transaction { rt, tx } = self;
        rt.block_on(tx.commit())?;
        Ok(())
    }
}
