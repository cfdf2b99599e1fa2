//! Shared server state, assembled once at start-up

use std::collections::HashMap;
use std::sync::Arc;

use sqlgrade_core::{CanonicalTable, HistoryStore, OptionsError};
use sqlgrade_duck::{DuckExecutor, ExecutionBudget, ExecutionError, PracticeSession, SessionError};
use sqlgrade_registry::{QuestionRegistry, RegistryError};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics::Metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open database: {0}")]
    Database(#[from] duckdb::Error),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to read setup script {path}: {source}")]
    SetupScript {
        path: String,
        source: std::io::Error,
    },

    #[error("Reference query for question {id} failed: {source}")]
    Reference { id: String, source: SessionError },
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<PracticeSession>,
    pub questions: Arc<QuestionRegistry>,
    /// Expected result per question id
    pub references: Arc<HashMap<String, Arc<CanonicalTable>>>,
    pub metrics: Metrics,
}

impl AppState {
    /// Open the database, seed it, load questions and compute references.
    pub fn build(config: &Config) -> Result<Self, StartupError> {
        let mut executor = match &config.database.path {
            Some(path) => DuckExecutor::open(path)?,
            None => DuckExecutor::new()?,
        };
        executor.set_budget(ExecutionBudget {
            max_memory_mb: config.database.memory_limit_mb,
            max_rows: config.database.max_rows,
        })?;

        let history = HistoryStore::new(config.practice.history_capacity)?;
        let session =
            PracticeSession::new(executor, Arc::new(history), config.practice.format_options())?;

        for path in &config.database.setup_scripts {
            let sql = std::fs::read_to_string(path).map_err(|source| StartupError::SetupScript {
                path: path.clone(),
                source,
            })?;
            session.execute_script(&sql)?;
            info!(script = %path, "setup script applied");
        }

        let questions = match &config.practice.questions_path {
            Some(path) => QuestionRegistry::load(path)?,
            None => {
                warn!("no question bank configured; attempts are disabled");
                QuestionRegistry::new()
            }
        };

        Self::new(session, questions, Metrics::new()?)
    }

    /// Run every reference query once so attempts only execute learner SQL.
    pub fn new(
        session: PracticeSession,
        questions: QuestionRegistry,
        metrics: Metrics,
    ) -> Result<Self, StartupError> {
        let mut references = HashMap::with_capacity(questions.len());
        for question in questions.list() {
            let table = session
                .reference(&question.reference_sql)
                .map_err(|source| StartupError::Reference {
                    id: question.id.clone(),
                    source,
                })?;
            references.insert(question.id.clone(), Arc::new(table));
        }
        info!(questions = references.len(), "reference results ready");

        Ok(Self {
            session: Arc::new(session),
            questions: Arc::new(questions),
            references: Arc::new(references),
            metrics,
        })
    }
}
