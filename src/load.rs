use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    naming::{find_collision, Collision},
    sheet::{MissingPolicy, SheetError, Spreadsheet},
    Backend, DbError, Transaction,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {}", path.display())]
    Sheet {
        path: PathBuf,
        #[source]
        source: SheetError,
    },
    #[error("{} has no header row", path.display())]
    EmptySheet { path: PathBuf },
    #[error(
        "{}: columns {} and {} are both named {}",
        path.display(),
        collision.first,
        collision.second,
        collision.name
    )]
    DuplicateColumn { path: PathBuf, collision: Collision },
    #[error("could not load {} into {table}", path.display())]
    Db {
        path: PathBuf,
        table: String,
        #[source]
        source: DbError,
    },
}

/// Load one spreadsheet into `table`, returning the number of rows inserted.
///
/// The table is created with a `TEXT` column per spreadsheet column unless
/// it already exists. All rows go into a single transaction, which is
/// rolled back if any of them fails.
pub fn load<B: Backend>(
    path: impl AsRef<Path>,
    sheet: Option<&str>,
    table: &str,
    session: &mut B,
    policy: &MissingPolicy,
) -> Result<usize, LoadError> {
    let path = path.as_ref();
    let spreadsheet = Spreadsheet::read(path, sheet).map_err(|source| LoadError::Sheet {
        path: path.to_owned(),
        source,
    })?;
    load_spreadsheet(path, &spreadsheet, table, session, policy)
}

/// Load an in-memory spreadsheet; `path` is only used in error reports.
pub fn load_spreadsheet<B: Backend>(
    path: &Path,
    spreadsheet: &Spreadsheet,
    table: &str,
    session: &mut B,
    policy: &MissingPolicy,
) -> Result<usize, LoadError> {
    if spreadsheet.column_count() == 0 {
        return Err(LoadError::EmptySheet {
            path: path.to_owned(),
        });
    }
    let columns = spreadsheet.column_names();
    if let Some(collision) = find_collision(&columns) {
        return Err(LoadError::DuplicateColumn {
            path: path.to_owned(),
            collision,
        });
    }
    let db_err = |source| LoadError::Db {
        path: path.to_owned(),
        table: table.to_owned(),
        source,
    };
    session.create_table(table, &columns).map_err(db_err)?;
    let mut tx = session.transaction().map_err(db_err)?;
    let rows = spreadsheet.filled_rows(policy);
    let count = tx
        .insert_rows(table, columns.len(), &rows)
        .map_err(db_err)?;
    tx.commit().map_err(db_err)?;
    log::info!("Inserted {} rows into {}", count, table);
    Ok(count)
}
