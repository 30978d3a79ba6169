//! SQLite persistence for run summaries and per-arc assignments.
#![forbid(unsafe_code)]

use std::sync::{Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use ecoroute_core::{Assignment, PersistError, ResultSink, RunSummary};
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Errors raised by [`SqliteResultSink`].
#[derive(Debug, Error)]
pub enum SqliteSinkError {
    /// Failed to create the parent directory for the database file.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Path of the directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Database path, or `:memory:`.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Enabling SQLite foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Creating the result tables failed.
    #[error("failed to create result tables")]
    CreateSchema {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning the transaction failed.
    #[error("failed to begin result transaction")]
    BeginTransaction {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Removing previously stored rows failed.
    #[error("failed to clear stored rows for run {run_id} route {route_name}")]
    Clear {
        /// Run identifier.
        run_id: String,
        /// Route option name.
        route_name: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Writing the summary row failed.
    #[error("failed to write summary for run {run_id} route {route_name}")]
    WriteSummary {
        /// Run identifier.
        run_id: String,
        /// Route option name.
        route_name: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Writing an assignment row failed.
    #[error("failed to write step {step_order} of vehicle {vehicle_id}")]
    WriteAssignment {
        /// Vehicle driving the arc.
        vehicle_id: String,
        /// Position of the arc in the vehicle's route.
        step_order: u32,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Committing the transaction failed.
    #[error("failed to commit result transaction")]
    Commit {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Reading stored rows failed.
    #[error("failed to read stored rows for run {run_id} route {route_name}")]
    Read {
        /// Run identifier.
        run_id: String,
        /// Route option name.
        route_name: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS run_summary (
        run_id TEXT NOT NULL,
        route_name TEXT NOT NULL,
        total_distance_km REAL NOT NULL,
        total_co2_g REAL NOT NULL,
        total_time_min REAL NOT NULL,
        PRIMARY KEY (run_id, route_name)
    );
    CREATE TABLE IF NOT EXISTS assignments (
        run_id TEXT NOT NULL,
        route_name TEXT NOT NULL,
        vehicle_id TEXT NOT NULL,
        step_order INTEGER NOT NULL,
        start_job_id TEXT,
        end_job_id TEXT,
        distance_km REAL NOT NULL,
        co2_g REAL NOT NULL,
        load_kg REAL NOT NULL,
        time_min REAL NOT NULL,
        slope_pct REAL NOT NULL,
        congestion_factor REAL NOT NULL,
        PRIMARY KEY (run_id, route_name, vehicle_id, step_order),
        FOREIGN KEY (run_id, route_name)
            REFERENCES run_summary (run_id, route_name) ON DELETE CASCADE
    );
";

/// [`ResultSink`] writing to the `run_summary` and `assignments` tables.
///
/// Every save runs in one transaction that first deletes what is stored
/// under the same `(run_id, route_name)`, so saving again replaces the
/// earlier rows instead of duplicating them.
///
/// # Examples
/// ```
/// use ecoroute_core::{ResultSink, RunSummary};
/// use ecoroute_data::SqliteResultSink;
///
/// let sink = SqliteResultSink::open_in_memory()?;
/// let summary = RunSummary {
///     run_id: "r1".to_owned(),
///     route_name: "eco".to_owned(),
///     total_distance_km: 42.0,
///     total_co2_g: 18_500.0,
///     total_time_min: 51.5,
/// };
/// sink.store(&summary, &[])?;
/// let (stored, assignments) = sink.load("r1", "eco")?.expect("stored");
/// assert_eq!(stored, summary);
/// assert!(assignments.is_empty());
/// # Ok::<(), ecoroute_data::SqliteSinkError>(())
/// ```
#[derive(Debug)]
pub struct SqliteResultSink {
    connection: Mutex<Connection>,
}

impl SqliteResultSink {
    /// Open (or create) the database at `path`, creating parent directories
    /// and tables as needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory, database, or schema cannot be
    /// created.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteSinkError> {
        ensure_parent_dir(path)?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| SqliteSinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Self::initialise(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error when SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, SqliteSinkError> {
        let connection = Connection::open_in_memory().map_err(|source| SqliteSinkError::Open {
            path: Utf8PathBuf::from(":memory:"),
            source,
        })?;
        Self::initialise(connection)
    }

    fn initialise(connection: Connection) -> Result<Self, SqliteSinkError> {
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| SqliteSinkError::ForeignKeys { source })?;
        connection
            .execute_batch(SCHEMA)
            .map_err(|source| SqliteSinkError::CreateSchema { source })?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Replace the rows stored for `summary`'s run and route option.
    ///
    /// Assignments are stored under the summary's key.
    ///
    /// # Errors
    ///
    /// Returns an error when any statement fails; nothing is changed then.
    pub fn store(
        &self,
        summary: &RunSummary,
        assignments: &[Assignment],
    ) -> Result<(), SqliteSinkError> {
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let transaction = connection
            .transaction()
            .map_err(|source| SqliteSinkError::BeginTransaction { source })?;

        clear_rows(&transaction, &summary.run_id, &summary.route_name)?;
        write_summary(&transaction, summary)?;
        write_assignments(&transaction, summary, assignments)?;

        transaction
            .commit()
            .map_err(|source| SqliteSinkError::Commit { source })?;
        log::debug!(
            "stored run {} route {} with {} assignments",
            summary.run_id,
            summary.route_name,
            assignments.len()
        );
        Ok(())
    }

    /// Read back what is stored for one run and route option.
    ///
    /// Assignments come back in the order they were written.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub fn load(
        &self,
        run_id: &str,
        route_name: &str,
    ) -> Result<Option<(RunSummary, Vec<Assignment>)>, SqliteSinkError> {
        let read_error = |source| SqliteSinkError::Read {
            run_id: run_id.to_owned(),
            route_name: route_name.to_owned(),
            source,
        };
        let connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let summary = connection
            .query_row(
                "SELECT total_distance_km, total_co2_g, total_time_min FROM run_summary
                 WHERE run_id = ?1 AND route_name = ?2",
                (run_id, route_name),
                |row| {
                    Ok(RunSummary {
                        run_id: run_id.to_owned(),
                        route_name: route_name.to_owned(),
                        total_distance_km: row.get(0)?,
                        total_co2_g: row.get(1)?,
                        total_time_min: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(read_error)?;
        let Some(summary) = summary else {
            return Ok(None);
        };

        let mut statement = connection
            .prepare(
                "SELECT vehicle_id, step_order, start_job_id, end_job_id, distance_km, co2_g,
                        load_kg, time_min, slope_pct, congestion_factor
                 FROM assignments WHERE run_id = ?1 AND route_name = ?2 ORDER BY rowid",
            )
            .map_err(read_error)?;
        let assignments = statement
            .query_map((run_id, route_name), |row| {
                Ok(Assignment {
                    run_id: run_id.to_owned(),
                    route_name: route_name.to_owned(),
                    vehicle_id: row.get(0)?,
                    step_order: row.get(1)?,
                    start_job_id: row.get(2)?,
                    end_job_id: row.get(3)?,
                    distance_km: row.get(4)?,
                    co2_g: row.get(5)?,
                    load_kg: row.get(6)?,
                    time_min: row.get(7)?,
                    slope_pct: row.get(8)?,
                    congestion_factor: row.get(9)?,
                })
            })
            .and_then(Iterator::collect::<Result<Vec<_>, _>>)
            .map_err(read_error)?;
        Ok(Some((summary, assignments)))
    }
}

impl ResultSink for SqliteResultSink {
    fn save(&self, summary: &RunSummary, assignments: &[Assignment]) -> Result<(), PersistError> {
        self.store(summary, assignments).map_err(|err| {
            let message = describe(&err);
            log::warn!("{message}");
            PersistError::Backend {
                run_id: summary.run_id.clone(),
                route_name: summary.route_name.clone(),
                message,
            }
        })
    }
}

/// `err` followed by each of its sources.
fn describe(err: &SqliteSinkError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn clear_rows(
    transaction: &Transaction<'_>,
    run_id: &str,
    route_name: &str,
) -> Result<(), SqliteSinkError> {
    let clear_error = |source| SqliteSinkError::Clear {
        run_id: run_id.to_owned(),
        route_name: route_name.to_owned(),
        source,
    };
    transaction
        .execute(
            "DELETE FROM assignments WHERE run_id = ?1 AND route_name = ?2",
            (run_id, route_name),
        )
        .map_err(clear_error)?;
    transaction
        .execute(
            "DELETE FROM run_summary WHERE run_id = ?1 AND route_name = ?2",
            (run_id, route_name),
        )
        .map_err(clear_error)?;
    Ok(())
}

fn write_summary(
    transaction: &Transaction<'_>,
    summary: &RunSummary,
) -> Result<(), SqliteSinkError> {
    transaction
        .execute(
            "INSERT INTO run_summary
                (run_id, route_name, total_distance_km, total_co2_g, total_time_min)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &summary.run_id,
                &summary.route_name,
                summary.total_distance_km,
                summary.total_co2_g,
                summary.total_time_min,
            ),
        )
        .map(|_| ())
        .map_err(|source| SqliteSinkError::WriteSummary {
            run_id: summary.run_id.clone(),
            route_name: summary.route_name.clone(),
            source,
        })
}

fn write_assignments(
    transaction: &Transaction<'_>,
    summary: &RunSummary,
    assignments: &[Assignment],
) -> Result<(), SqliteSinkError> {
    if assignments.is_empty() {
        return Ok(());
    }

    let mut statement = transaction
        .prepare(
            "INSERT INTO assignments
                (run_id, route_name, vehicle_id, step_order, start_job_id, end_job_id,
                 distance_km, co2_g, load_kg, time_min, slope_pct, congestion_factor)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .map_err(|source| SqliteSinkError::WriteSummary {
            run_id: summary.run_id.clone(),
            route_name: summary.route_name.clone(),
            source,
        })?;

    for assignment in assignments {
        statement
            .execute((
                &summary.run_id,
                &summary.route_name,
                &assignment.vehicle_id,
                assignment.step_order,
                &assignment.start_job_id,
                &assignment.end_job_id,
                assignment.distance_km,
                assignment.co2_g,
                assignment.load_kg,
                assignment.time_min,
                assignment.slope_pct,
                assignment.congestion_factor,
            ))
            .map_err(|source| SqliteSinkError::WriteAssignment {
                vehicle_id: assignment.vehicle_id.clone(),
                step_order: assignment.step_order,
                source,
            })?;
    }
    Ok(())
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), SqliteSinkError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };
    let create_error = |source| SqliteSinkError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    };
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())
        .map_err(create_error)?
        .create_dir_all(relative)
        .map_err(create_error)
}
