use std::path::PathBuf;

use anyhow::Context as _;
use structopt::StructOpt;

use sheet2sql::{load, Backend, BackendKind, Config, LoadSpec, SqliteSession};

const EXIT_SETUP: i32 = 1;
const EXIT_LOAD: i32 = 2;

/// Load spreadsheet files into database tables.
///
/// Every column is created as TEXT, named after the spreadsheet's header
/// row. Missing cells are stored as empty strings.
#[derive(StructOpt)]
struct Opt {
    /// TOML configuration file.
    #[structopt(short = "c", long = "config")]
    config: Option<PathBuf>,
    /// Database backend: mysql or sqlite.
    #[structopt(long = "backend")]
    backend: Option<BackendKind>,
    /// Database server host.
    #[structopt(long = "host")]
    host: Option<String>,
    /// Database server port.
    #[structopt(long = "port")]
    port: Option<u16>,
    /// Database user.
    #[structopt(long = "user")]
    user: Option<String>,
    /// Database password.
    #[structopt(long = "password", env = "SHEET2SQL_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Database name; for sqlite, the database file.
    #[structopt(long = "database")]
    database: Option<String>,
    /// Create the sqlite database file if it does not exist.
    #[structopt(long = "create")]
    create: bool,
    /// Continue with the next file after a failed load.
    #[structopt(long = "keep-going")]
    keep_going: bool,
    /// Files to load, as FILE=TABLE.
    ///
    /// When given, these replace the loads listed in the configuration file.
    loads: Vec<LoadSpec>,
}

impl Opt {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let conn = &mut config.connection;
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(host) = &self.host {
            conn.host = host.clone();
        }
        if let Some(port) = self.port {
            conn.port = port;
        }
        if let Some(user) = &self.user {
            conn.user = user.clone();
        }
        if let Some(password) = &self.password {
            conn.password = Some(password.clone());
        }
        if let Some(database) = &self.database {
            conn.database = Some(database.clone());
        }
        conn.create_if_missing |= self.create;
        config.keep_going |= self.keep_going;
        if !self.loads.is_empty() {
            config.loads = self.loads.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn run_loads<B: Backend>(session: &mut B, config: &Config) -> usize {
    let policy = config.missing_policy();
    let mut failed = 0;
    for spec in &config.loads {
        let result = load(
            &spec.file,
            spec.sheet.as_deref(),
            &spec.table,
            session,
            &policy,
        );
        if let Err(e) = result {
            report(&anyhow::Error::new(e));
            failed += 1;
            if !config.keep_going {
                break;
            }
        }
    }
    failed
}

fn run_with<B: Backend>(config: &Config) -> anyhow::Result<i32> {
    let mut session = B::connect(&config.connection)?;
    let failed = run_loads(&mut session, config);
    let rc = if failed == 0 {
        log::info!("All {} files loaded", config.loads.len());
        0
    } else {
        log::error!(
            "{} of {} files failed to load",
            failed,
            config.loads.len()
        );
        EXIT_LOAD
    };
    let closed = session
        .close()
        .context("could not close the database session");
    match closed {
        Err(e) if rc == 0 => Err(e),
        Err(e) => {
            report(&e);
            Ok(rc)
        }
        Ok(()) => Ok(rc),
    }
}

fn run(config: &Config) -> anyhow::Result<i32> {
    match config.backend {
        BackendKind::Sqlite => run_with::<SqliteSession>(config),
        #[cfg(feature = "mysql")]
        BackendKind::MySql => run_with::<sheet2sql::MySqlSession>(config),
        #[cfg(not(feature = "mysql"))]
        BackendKind::MySql => Err(sheet2sql::ConfigError::Unsupported(config.backend).into()),
    }
}

fn report(e: &anyhow::Error) {
    for (i, e) in e.chain().enumerate() {
        if i == 0 {
            log::error!("{}", e);
        } else {
            log::error!("caused by: {}", e);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();
    let rc = match opt.config().and_then(|config| run(&config)) {
        Ok(rc) => rc,
        Err(e) => {
            report(&e);
            EXIT_SETUP
        }
    };
    std::process::exit(rc);
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rust_xlsxwriter::Workbook;
    use sheet2sql::{ColumnName, ConnectError, Credentials, DbError};
    use tempfile::{tempdir, TempDir};

    use super::*;

    fn write_sheet(path: &Path, header: &str, values: &[&str]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, header).unwrap();
        for (i, value) in values.iter().enumerate() {
            sheet.write_string(i as u32 + 1, 0, *value).unwrap();
        }
        workbook.save(path).unwrap();
    }

    fn config(dir: &TempDir, files: &[(&str, &str)], keep_going: bool) -> Config {
        let mut config = Config {
            backend: BackendKind::Sqlite,
            keep_going,
            ..Config::default()
        };
        let database = dir.path().join("tariff.db");
        config.connection.database = Some(database.to_string_lossy().into_owned());
        config.connection.create_if_missing = true;
        config.loads = files
            .iter()
            .map(|(file, table)| LoadSpec {
                file: dir.path().join(file),
                table: table.to_string(),
                sheet: None,
            })
            .collect();
        config
    }

    fn row_count(dir: &TempDir, table: &str) -> Option<i64> {
        let conn = rusqlite::Connection::open(dir.path().join("tariff.db")).unwrap();
        conn.query_row(&format!("SELECT count(*) FROM \"{}\"", table), [], |row| {
            row.get(0)
        })
        .ok()
    }

    fn fixture() -> TempDir {
        let dir = tempdir().unwrap();
        write_sheet(&dir.path().join("currency.xlsx"), "Code", &["USD", "EUR"]);
        write_sheet(&dir.path().join("duty type.xlsx"), "Duty Type", &["Import"]);
        dir
    }

    #[test]
    fn all_loads_succeed_with_exit_zero() {
        let dir = fixture();
        let config = config(
            &dir,
            &[
                ("currency.xlsx", "currency_table"),
                ("duty type.xlsx", "duty_type_table"),
            ],
            false,
        );
        assert_eq!(run_with::<SqliteSession>(&config).unwrap(), 0);
        assert_eq!(row_count(&dir, "currency_table"), Some(2));
        assert_eq!(row_count(&dir, "duty_type_table"), Some(1));
    }

    #[test]
    fn first_failure_stops_the_run() {
        let dir = fixture();
        let config = config(
            &dir,
            &[
                ("missing.xlsx", "tariff_table"),
                ("duty type.xlsx", "duty_type_table"),
            ],
            false,
        );
        assert_eq!(run_with::<SqliteSession>(&config).unwrap(), EXIT_LOAD);
        assert_eq!(row_count(&dir, "duty_type_table"), None);
    }

    #[test]
    fn keep_going_loads_the_remaining_files() {
        let dir = fixture();
        let config = config(
            &dir,
            &[
                ("missing.xlsx", "tariff_table"),
                ("duty type.xlsx", "duty_type_table"),
            ],
            true,
        );
        assert_eq!(run_with::<SqliteSession>(&config).unwrap(), EXIT_LOAD);
        assert_eq!(row_count(&dir, "duty_type_table"), Some(1));
    }

    #[test]
    fn missing_database_is_a_setup_failure() {
        let dir = fixture();
        let mut config = config(&dir, &[("currency.xlsx", "currency_table")], false);
        config.connection.create_if_missing = false;
        assert!(run_with::<SqliteSession>(&config).is_err());
        assert!(!dir.path().join("tariff.db").exists());
    }

    // A session whose close always fails.
    struct FailingClose(SqliteSession);

    impl Backend for FailingClose {
        type Transaction<'a> = sheet2sql::sqlite::Transaction<'a>;

        fn connect(credentials: &Credentials) -> Result<Self, ConnectError> {
            SqliteSession::connect(credentials).map(FailingClose)
        }

        fn create_table(&mut self, table: &str, columns: &[ColumnName]) -> Result<(), DbError> {
            self.0.create_table(table, columns)
        }

        fn transaction(&mut self) -> Result<Self::Transaction<'_>, DbError> {
            self.0.transaction()
        }

        fn close(self) -> Result<(), DbError> {
            self.0.close()?;
            Err(DbError::Arity {
                row: 0,
                expected: 0,
                actual: 0,
            })
        }
    }

    #[test]
    fn close_failure_keeps_the_load_exit_code() {
        let dir = fixture();
        let config = config(&dir, &[("missing.xlsx", "tariff_table")], false);
        assert_eq!(run_with::<FailingClose>(&config).unwrap(), EXIT_LOAD);
    }

    #[test]
    fn close_failure_fails_an_otherwise_clean_run() {
        let dir = fixture();
        let config = config(&dir, &[("currency.xlsx", "currency_table")], false);
        assert!(run_with::<FailingClose>(&config).is_err());
        assert_eq!(row_count(&dir, "currency_table"), Some(2));
    }
}
