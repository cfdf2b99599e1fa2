//! DuckDB executor producing Arrow result batches
//!
//! This is the query-engine side of the pipeline: it runs SQL and hands back
//! the schema plus raw record batches, leaving normalization to
//! `sqlgrade-core`. Engine errors are passed through unchanged.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use duckdb::{Connection, Result as DuckResult};
use thiserror::Error;
use tracing::debug;

mod session;

pub use session::{AttemptReport, PracticeSession, QueryView, SessionError};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionBudget {
    pub max_memory_mb: Option<u64>,
    pub max_rows: Option<u64>,
}

/// Raw engine output: one schema shared by zero or more batches.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl QueryOutput {
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

pub struct DuckExecutor {
    conn: Connection,
    budget: ExecutionBudget,
}

impl DuckExecutor {
    pub fn new() -> DuckResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> DuckResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            budget: ExecutionBudget::default(),
        }
    }

    pub fn set_budget(&mut self, budget: ExecutionBudget) -> Result<(), ExecutionError> {
        if let Some(max_memory_mb) = budget.max_memory_mb {
            let pragma = format!("PRAGMA memory_limit='{}MB'", max_memory_mb);
            self.conn.execute_batch(&pragma)?;
        }
        self.budget = budget;
        Ok(())
    }

    /// Run statements whose results are not needed (schema setup, seed data).
    pub fn execute_batch(&self, sql: &str) -> Result<(), ExecutionError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Execute one statement and collect its Arrow batches.
    pub fn run(&self, sql: &str) -> Result<QueryOutput, ExecutionError> {
        let mut stmt = self.conn.prepare(sql)?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();

        let mut batches = Vec::new();
        let mut row_count: u64 = 0;
        for batch in arrow {
            row_count += batch.num_rows() as u64;
            if let Some(max_rows) = self.budget.max_rows {
                if row_count > max_rows {
                    return Err(ExecutionError::BudgetExceeded(format!(
                        "Max rows ({}) exceeded",
                        max_rows
                    )));
                }
            }
            batches.push(batch);
        }

        debug!(
            columns = schema.fields().len(),
            batches = batches.len(),
            rows = row_count,
            "query executed"
        );

        Ok(QueryOutput { schema, batches })
    }
}
