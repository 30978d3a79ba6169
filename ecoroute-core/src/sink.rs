//! Persistence of reported route options.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::{Assignment, RunSummary};

/// Failure to store a route option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// The storage backend rejected the write.
    #[error("failed to store run {run_id} route {route_name}: {message}")]
    Backend {
        /// Run identifier.
        run_id: String,
        /// Route option name.
        route_name: String,
        /// Backend detail.
        message: String,
    },
}

/// Destination for reported route options.
///
/// Saves are keyed by `(run_id, route_name)` taken from the summary. Saving
/// the same key again replaces what was stored before.
pub trait ResultSink {
    /// Store one route option.
    fn save(&self, summary: &RunSummary, assignments: &[Assignment]) -> Result<(), PersistError>;
}

impl<T: ResultSink + ?Sized> ResultSink for &T {
    fn save(&self, summary: &RunSummary, assignments: &[Assignment]) -> Result<(), PersistError> {
        (**self).save(summary, assignments)
    }
}

impl<T: ResultSink + ?Sized> ResultSink for Box<T> {
    fn save(&self, summary: &RunSummary, assignments: &[Assignment]) -> Result<(), PersistError> {
        (**self).save(summary, assignments)
    }
}

type StoredOption = (RunSummary, Vec<Assignment>);

/// Sink keeping route options in memory.
///
/// # Examples
/// ```
/// use ecoroute_core::{MemorySink, ResultSink, RunSummary};
///
/// let sink = MemorySink::default();
/// let summary = RunSummary {
///     run_id: "r1".to_owned(),
///     route_name: "eco".to_owned(),
///     total_distance_km: 12.0,
///     total_co2_g: 3_400.0,
///     total_time_min: 20.0,
/// };
/// sink.save(&summary, &[]).expect("stored");
/// sink.save(&summary, &[]).expect("stored again");
/// assert_eq!(sink.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: Mutex<BTreeMap<(String, String), StoredOption>>,
}

impl MemorySink {
    /// The stored summary and assignments for a key.
    #[must_use]
    pub fn get(&self, run_id: &str, route_name: &str) -> Option<StoredOption> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(run_id.to_owned(), route_name.to_owned()))
            .cloned()
    }

    /// Number of stored route options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn save(&self, summary: &RunSummary, assignments: &[Assignment]) -> Result<(), PersistError> {
        let mut stored = self.stored.lock().map_err(|_| PersistError::Backend {
            run_id: summary.run_id.clone(),
            route_name: summary.route_name.clone(),
            message: "memory sink lock poisoned".to_owned(),
        })?;
        stored.insert(
            (summary.run_id.clone(), summary.route_name.clone()),
            (summary.clone(), assignments.to_vec()),
        );
        Ok(())
    }
}
