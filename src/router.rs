//! Input router: strategy recommendation from empirical performance.
//!
//! The router classifies an input as a query or an assertion, then asks
//! the performance store for the strategy hash with the best recorded
//! metrics for that class and model. The store is SQLite; the router only
//! ever reads it — records are written by an external evaluation harness.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Primary metric inside the `metrics` JSON used for ranking.
pub const PRIMARY_METRIC: &str = "exactMatchProlog";

const WH_WORDS: &[&str] = &[
    "who", "what", "where", "when", "why", "how", "is", "are", "do", "does", "can", "should",
    "would",
];

/// Coarse input classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputClass {
    GeneralQuery,
    GeneralAssert,
}

impl InputClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralQuery => "general_query",
            Self::GeneralAssert => "general_assert",
        }
    }

    /// Classify: a question mark anywhere, or a leading wh-word, makes a
    /// query; everything else is an assertion.
    pub fn classify(text: &str) -> Self {
        if text.contains('?') {
            return Self::GeneralQuery;
        }
        let first = text
            .trim()
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .unwrap_or_default();
        if WH_WORDS.contains(&first.as_str()) {
            Self::GeneralQuery
        } else {
            Self::GeneralAssert
        }
    }
}

/// One empirical performance record.
#[derive(Debug, Clone)]
pub struct PerformanceRecord {
    pub strategy_hash: String,
    /// Example identifier, prefixed with the input class it belongs to.
    pub example_id: Option<String>,
    pub llm_model_id: String,
    /// Metric name -> score; ranking reads [`PRIMARY_METRIC`].
    pub metrics: Value,
    pub latency_ms: f64,
    pub cost: f64,
}

/// SQLite-backed store of performance records.
pub struct PerformanceStore {
    conn: Arc<Mutex<Connection>>,
}

impl PerformanceStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn =
            Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        Self::initialize(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS performance_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_hash TEXT NOT NULL,
                example_id TEXT,
                llm_model_id TEXT NOT NULL,
                metrics TEXT NOT NULL,
                latency_ms REAL NOT NULL DEFAULT 0,
                cost REAL NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_perf_model
                ON performance_records(llm_model_id);",
        )
        .map_err(|e| Error::Storage(e.to_string()))
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("failed to lock connection: {e}")))?;
        f(&conn).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Insert a record. The router never calls this; it exists for the
    /// evaluation harness that populates the store.
    pub fn record(&self, record: &PerformanceRecord) -> Result<()> {
        let metrics = serde_json::to_string(&record.metrics)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO performance_records
                    (strategy_hash, example_id, llm_model_id, metrics, latency_ms, cost)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.strategy_hash,
                    record.example_id,
                    record.llm_model_id,
                    metrics,
                    record.latency_ms,
                    record.cost,
                ],
            )?;
            Ok(())
        })
    }

    /// Best strategy hash for the class and model: primary metric
    /// descending, then latency ascending, then cost ascending. Records
    /// with no example id match every class.
    pub fn best_strategy(&self, class: InputClass, model_id: &str) -> Result<Option<String>> {
        let prefix = class.as_str();
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT strategy_hash FROM performance_records
                 WHERE llm_model_id = ?1
                   AND (example_id IS NULL OR example_id LIKE ?2 || '%')
                 ORDER BY json_extract(metrics, '$.' || ?3) DESC,
                          latency_ms ASC,
                          cost ASC
                 LIMIT 1",
                params![model_id, prefix, PRIMARY_METRIC],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
    }
}

/// Stateless recommendation adapter over the performance store.
pub struct InputRouter {
    store: Arc<PerformanceStore>,
}

impl InputRouter {
    pub fn new(store: Arc<PerformanceStore>) -> Self {
        Self { store }
    }

    /// Recommend a strategy hash for the input, or `None` when the store
    /// has nothing relevant — the caller then falls back to its
    /// configured base strategy.
    pub fn recommend(&self, nl_text: &str, model_id: &str) -> Result<Option<String>> {
        let class = InputClass::classify(nl_text);
        let best = self.store.best_strategy(class, model_id)?;
        tracing::debug!(
            class = class.as_str(),
            model = model_id,
            hash = best.as_deref().unwrap_or("<none>"),
            "router recommendation"
        );
        Ok(best)
    }
}
