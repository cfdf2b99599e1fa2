//! Practice session controller
//!
//! Wires the engine to the core: execute, decode, record history, render,
//! and grade. The history store is injected so several controllers can share
//! one instance.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use sqlgrade_core::{
    decode_record_batches, format, grade, CanonicalTable, DecodeError, FormatOptions,
    FormattedTable, GradingPolicy, GradingVerdict, HistoryStore, OptionsError,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::{DuckExecutor, ExecutionError, QueryOutput};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Could not decode query result: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Options(#[from] OptionsError),
}

/// A decoded result together with its display rendering.
#[derive(Debug, Clone)]
pub struct QueryView {
    pub table: CanonicalTable,
    pub rendered: FormattedTable,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub verdict: GradingVerdict,
    pub view: QueryView,
}

pub struct PracticeSession {
    executor: Mutex<DuckExecutor>,
    history: Arc<HistoryStore>,
    format: FormatOptions,
}

impl PracticeSession {
    pub fn new(
        executor: DuckExecutor,
        history: Arc<HistoryStore>,
        format: FormatOptions,
    ) -> Result<Self, SessionError> {
        format.validate()?;
        Ok(Self {
            executor: Mutex::new(executor),
            history,
            format,
        })
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn format_options(&self) -> &FormatOptions {
        &self.format
    }

    fn executor(&self) -> MutexGuard<'_, DuckExecutor> {
        self.executor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run setup statements (schema, seed data). Not recorded in history.
    pub fn execute_script(&self, sql: &str) -> Result<(), SessionError> {
        self.executor().execute_batch(sql)?;
        Ok(())
    }

    /// Execute and decode without touching history.
    pub fn reference(&self, sql: &str) -> Result<CanonicalTable, SessionError> {
        let (table, _) = self.execute_and_decode(sql)?;
        Ok(table)
    }

    /// Execute a learner query, record it on success and render the result.
    pub fn run(&self, sql: &str) -> Result<QueryView, SessionError> {
        let (table, elapsed) = self.execute_and_decode(sql)?;
        self.history.record(sql.trim());

        let rendered = format(&table, &self.format)?;
        Ok(QueryView {
            table,
            rendered,
            elapsed,
        })
    }

    /// Run a learner query and grade it against `expected`.
    pub fn attempt(
        &self,
        sql: &str,
        expected: &CanonicalTable,
        policy: &GradingPolicy,
    ) -> Result<AttemptReport, SessionError> {
        let view = self.run(sql)?;
        let verdict = grade(&view.table, expected, policy);
        info!(outcome = ?verdict.outcome(), "attempt graded");
        Ok(AttemptReport { verdict, view })
    }

    /// Table names in the current database, via `SHOW TABLES`.
    pub fn tables(&self) -> Result<Vec<String>, SessionError> {
        let (table, _) = self.execute_and_decode("SHOW TABLES")?;
        Ok(table.first_column_text())
    }

    fn execute_and_decode(&self, sql: &str) -> Result<(CanonicalTable, Duration), SessionError> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        let started = Instant::now();
        let QueryOutput { schema, batches } = self.executor().run(sql)?;
        let table = decode_record_batches(&schema, &batches)?;
        let elapsed = started.elapsed();

        debug!(
            rows = table.row_count(),
            columns = table.column_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "query decoded"
        );
        Ok((table, elapsed))
    }
}
