use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::types::{AggregateRow, ComparisonVerdict, MetricsRecord, ModelKey};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("aggregate overflow: {0}")]
    Overflow(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("time parse error: {0}")]
    Chrono(#[from] chrono::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task join error: {0}")]
    Task(String),
}

/// Durable per-(model, provider) running statistics.
///
/// `record_comparison` must apply the full set of row updates for one event
/// as a single atomic unit: a reader never observes an event half-applied,
/// and a rejected event (validation or overflow) leaves state untouched.
#[async_trait]
pub trait AggregateStorage: Send + Sync {
    async fn init(&self) -> EngineResult<()>;

    async fn record_comparison(
        &self,
        records: &[MetricsRecord],
        verdict: &ComparisonVerdict,
    ) -> EngineResult<()>;

    async fn snapshot(&self) -> EngineResult<Vec<AggregateRow>>;
}

fn validate_event(records: &[MetricsRecord]) -> EngineResult<()> {
    if records.is_empty() {
        return Err(EngineError::InvalidMetric(
            "comparison event must contain at least one record".to_string(),
        ));
    }
    for record in records {
        record.validate().map_err(EngineError::InvalidMetric)?;
    }
    Ok(())
}

fn sort_rows(rows: &mut [AggregateRow]) {
    rows.sort_by(|a, b| {
        b.total_comparisons
            .cmp(&a.total_comparisons)
            .then_with(|| a.key.cmp(&b.key))
    });
}

#[derive(Debug, Clone)]
pub struct SqliteAggregateStorage {
    db_path: PathBuf,
}

impl SqliteAggregateStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    async fn with_connection<T, F>(&self, func: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> EngineResult<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = open_connection(&db_path)?;
            func(&mut connection)
        })
        .await
        .map_err(|error| EngineError::Task(error.to_string()))?
    }
}

#[async_trait]
impl AggregateStorage for SqliteAggregateStorage {
    async fn init(&self) -> EngineResult<()> {
        self.with_connection(|connection| {
            connection.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS model_aggregates (
                    model_id TEXT NOT NULL,
                    provider TEXT NOT NULL,
                    total_comparisons INTEGER NOT NULL DEFAULT 0,
                    sum_response_time_ms REAL NOT NULL DEFAULT 0,
                    sum_cost_usd REAL NOT NULL DEFAULT 0,
                    sum_tokens_used INTEGER NOT NULL DEFAULT 0,
                    min_response_time_ms REAL NOT NULL,
                    max_response_time_ms REAL NOT NULL,
                    times_fastest INTEGER NOT NULL DEFAULT 0,
                    times_cheapest INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (model_id, provider)
                );

                CREATE INDEX IF NOT EXISTS idx_aggregates_comparisons
                    ON model_aggregates(total_comparisons);
                "#,
            )?;
            Ok(())
        })
        .await
    }

    async fn record_comparison(
        &self,
        records: &[MetricsRecord],
        verdict: &ComparisonVerdict,
    ) -> EngineResult<()> {
        validate_event(records)?;
        debug!("recording comparison event with {} records", records.len());
        let records = records.to_vec();
        let verdict = verdict.clone();

        self.with_connection(move |connection| {
            let now = Utc::now();
            // One immediate transaction per event: the write lock is taken up
            // front so the busy timeout applies, and rollback on any failure
            // keeps the all-or-nothing contract across process crashes.
            let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
            for record in &records {
                let current = load_row(&tx, &record.key())?
                    .unwrap_or_else(|| AggregateRow::new(record.key(), now));
                let next = current
                    .folded(record, &verdict, now)
                    .map_err(EngineError::Overflow)?;
                upsert_row(&tx, &next)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn snapshot(&self) -> EngineResult<Vec<AggregateRow>> {
        self.with_connection(|connection| {
            let mut stmt = connection.prepare(
                r#"
                SELECT model_id, provider, total_comparisons, sum_response_time_ms,
                       sum_cost_usd, sum_tokens_used, min_response_time_ms,
                       max_response_time_ms, times_fastest, times_cheapest, updated_at
                FROM model_aggregates
                ORDER BY total_comparisons DESC, model_id ASC, provider ASC
                "#,
            )?;
            let mut rows = stmt.query([])?;
            let mut result = Vec::new();

            while let Some(row) = rows.next()? {
                result.push(AggregateRow {
                    key: ModelKey::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                    total_comparisons: row.get::<_, i64>(2)? as u64,
                    sum_response_time_ms: row.get(3)?,
                    sum_cost_usd: row.get(4)?,
                    sum_tokens_used: row.get::<_, i64>(5)? as u64,
                    min_response_time_ms: row.get(6)?,
                    max_response_time_ms: row.get(7)?,
                    times_fastest: row.get::<_, i64>(8)? as u64,
                    times_cheapest: row.get::<_, i64>(9)? as u64,
                    updated_at: parse_timestamp(row.get::<_, String>(10)?)?,
                });
            }

            Ok(result)
        })
        .await
    }
}

fn open_connection(path: &Path) -> EngineResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let connection = Connection::open(path)
        .map_err(|error| EngineError::StorageUnavailable(error.to_string()))?;
    connection
        .execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|error| EngineError::StorageUnavailable(error.to_string()))?;
    Ok(connection)
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}

fn parse_timestamp(raw: String) -> EngineResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc))
}

fn load_row(connection: &Connection, key: &ModelKey) -> EngineResult<Option<AggregateRow>> {
    let row = connection
        .query_row(
            r#"
            SELECT total_comparisons, sum_response_time_ms, sum_cost_usd,
                   sum_tokens_used, min_response_time_ms, max_response_time_ms,
                   times_fastest, times_cheapest, updated_at
            FROM model_aggregates
            WHERE model_id = ?1 AND provider = ?2
            "#,
            params![key.model_id, key.provider],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((
        total_comparisons,
        sum_response_time_ms,
        sum_cost_usd,
        sum_tokens_used,
        min_response_time_ms,
        max_response_time_ms,
        times_fastest,
        times_cheapest,
        updated_at_raw,
    )) = row
    else {
        return Ok(None);
    };

    Ok(Some(AggregateRow {
        key: key.clone(),
        total_comparisons: total_comparisons as u64,
        sum_response_time_ms,
        sum_cost_usd,
        sum_tokens_used: sum_tokens_used as u64,
        min_response_time_ms,
        max_response_time_ms,
        times_fastest: times_fastest as u64,
        times_cheapest: times_cheapest as u64,
        updated_at: parse_timestamp(updated_at_raw)?,
    }))
}

fn upsert_row(connection: &Connection, row: &AggregateRow) -> EngineResult<()> {
    connection.execute(
        r#"
        INSERT INTO model_aggregates (
            model_id, provider, total_comparisons, sum_response_time_ms,
            sum_cost_usd, sum_tokens_used, min_response_time_ms,
            max_response_time_ms, times_fastest, times_cheapest, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(model_id, provider) DO UPDATE SET
            total_comparisons = excluded.total_comparisons,
            sum_response_time_ms = excluded.sum_response_time_ms,
            sum_cost_usd = excluded.sum_cost_usd,
            sum_tokens_used = excluded.sum_tokens_used,
            min_response_time_ms = excluded.min_response_time_ms,
            max_response_time_ms = excluded.max_response_time_ms,
            times_fastest = excluded.times_fastest,
            times_cheapest = excluded.times_cheapest,
            updated_at = excluded.updated_at
        "#,
        params![
            row.key.model_id,
            row.key.provider,
            row.total_comparisons as i64,
            row.sum_response_time_ms,
            row.sum_cost_usd,
            row.sum_tokens_used as i64,
            row.min_response_time_ms,
            row.max_response_time_ms,
            row.times_fastest as i64,
            row.times_cheapest as i64,
            format_timestamp(row.updated_at),
        ],
    )?;
    Ok(())
}

/// In-memory backend used when no database path is configured. The service
/// stays functional without durable storage, matching the behavior of a
/// deployment with no database reachable at startup.
#[derive(Debug, Default)]
pub struct MemoryAggregateStorage {
    rows: Mutex<HashMap<ModelKey, AggregateRow>>,
}

impl MemoryAggregateStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AggregateStorage for MemoryAggregateStorage {
    async fn init(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn record_comparison(
        &self,
        records: &[MetricsRecord],
        verdict: &ComparisonVerdict,
    ) -> EngineResult<()> {
        validate_event(records)?;
        let now = Utc::now();
        let mut rows = self.rows.lock().await;

        // Stage every updated row before touching the map so a rejected
        // event leaves the existing state visible and unchanged.
        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            let key = record.key();
            let current = rows
                .get(&key)
                .cloned()
                .unwrap_or_else(|| AggregateRow::new(key.clone(), now));
            let next = current
                .folded(record, verdict, now)
                .map_err(EngineError::Overflow)?;
            staged.push((key, next));
        }

        for (key, row) in staged {
            rows.insert(key, row);
        }
        Ok(())
    }

    async fn snapshot(&self) -> EngineResult<Vec<AggregateRow>> {
        let rows = self.rows.lock().await;
        let mut result: Vec<AggregateRow> = rows.values().cloned().collect();
        sort_rows(&mut result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use tempfile::tempdir;

    use super::{
        AggregateStorage, EngineError, MemoryAggregateStorage, SqliteAggregateStorage,
    };
    use crate::comparator::compare;
    use crate::types::{MetricsRecord, ModelKey};

    fn record(model: &str, provider: &str, time_ms: f64, cost: f64) -> MetricsRecord {
        MetricsRecord {
            model_id: model.to_string(),
            provider: provider.to_string(),
            response_time_ms: time_ms,
            tokens_used: 100,
            cost_usd: cost,
            timestamp: Utc::now(),
        }
    }

    fn scenario_a() -> Vec<MetricsRecord> {
        vec![
            record("m1", "pA", 100.0, 0.01),
            record("m2", "pB", 50.0, 0.02),
        ]
    }

    async fn apply(storage: &dyn AggregateStorage, records: &[MetricsRecord]) {
        let verdict = compare(records).expect("verdict");
        storage
            .record_comparison(records, &verdict)
            .await
            .expect("record comparison");
    }

    #[tokio::test]
    async fn sqlite_storage_accumulates_wins_and_extrema_across_events() {
        let dir = tempdir().expect("temp dir");
        let storage = SqliteAggregateStorage::new(dir.path().join("aggregates.db"));
        storage.init().await.expect("init storage");

        let event = scenario_a();
        apply(&storage, &event).await;
        apply(&storage, &event).await;

        let rows = storage.snapshot().await.expect("snapshot");
        assert_eq!(rows.len(), 2);

        let m2 = rows
            .iter()
            .find(|row| row.key == ModelKey::new("m2", "pB"))
            .expect("m2 row");
        assert_eq!(m2.total_comparisons, 2);
        assert_eq!(m2.times_fastest, 2);
        assert_eq!(m2.times_cheapest, 0);
        assert_eq!(m2.min_response_time_ms, 50.0);
        assert_eq!(m2.max_response_time_ms, 50.0);
        assert_eq!(m2.sum_response_time_ms / m2.total_comparisons as f64, 50.0);

        let m1 = rows
            .iter()
            .find(|row| row.key == ModelKey::new("m1", "pA"))
            .expect("m1 row");
        assert_eq!(m1.times_cheapest, 2);
        assert_eq!(m1.times_fastest, 0);
    }

    #[tokio::test]
    async fn sqlite_storage_persists_across_reopen() {
        let dir = tempdir().expect("temp dir");
        let db_path = dir.path().join("aggregates.db");

        {
            let storage = SqliteAggregateStorage::new(&db_path);
            storage.init().await.expect("init storage");
            apply(&storage, &scenario_a()).await;
        }

        let reopened = SqliteAggregateStorage::new(&db_path);
        reopened.init().await.expect("reinit storage");
        let rows = reopened.snapshot().await.expect("snapshot");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().map(|r| r.total_comparisons).sum::<u64>(), 2);
    }

    #[tokio::test]
    async fn invalid_event_creates_no_rows() {
        let dir = tempdir().expect("temp dir");
        let storage = SqliteAggregateStorage::new(dir.path().join("aggregates.db"));
        storage.init().await.expect("init storage");

        let records = vec![record("m1", "pA", 100.0, -1.0)];
        let verdict = compare(&scenario_a()).expect("verdict");

        let outcome = storage.record_comparison(&records, &verdict).await;
        assert!(matches!(outcome, Err(EngineError::InvalidMetric(_))));

        let rows = storage.snapshot().await.expect("snapshot");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn overflow_leaves_existing_aggregates_untouched() {
        let storage = MemoryAggregateStorage::new();
        storage.init().await.expect("init storage");
        apply(&storage, &scenario_a()).await;

        let mut oversized = record("m1", "pA", 10.0, 0.01);
        oversized.tokens_used = u64::MAX;
        let event = vec![oversized, record("m2", "pB", 5.0, 0.02)];
        let verdict = compare(&event).expect("verdict");

        let outcome = storage.record_comparison(&event, &verdict).await;
        assert!(matches!(outcome, Err(EngineError::Overflow(_))));

        let rows = storage.snapshot().await.expect("snapshot");
        assert_eq!(rows.iter().map(|r| r.total_comparisons).sum::<u64>(), 2);
    }

    #[tokio::test]
    async fn total_comparisons_equals_sum_of_event_sizes() {
        let storage = MemoryAggregateStorage::new();
        storage.init().await.expect("init storage");

        apply(&storage, &scenario_a()).await;
        apply(&storage, &[record("m3", "pC", 10.0, 0.001)]).await;
        apply(
            &storage,
            &[
                record("m1", "pA", 90.0, 0.015),
                record("m2", "pB", 60.0, 0.025),
                record("m3", "pC", 12.0, 0.002),
            ],
        )
        .await;

        let rows = storage.snapshot().await.expect("snapshot");
        assert_eq!(rows.iter().map(|r| r.total_comparisons).sum::<u64>(), 6);
    }

    #[tokio::test]
    async fn concurrent_events_yield_the_same_final_rows_as_sequential() {
        let dir = tempdir().expect("temp dir");
        let storage = Arc::new(SqliteAggregateStorage::new(dir.path().join("aggregates.db")));
        storage.init().await.expect("init storage");

        let events: Vec<Vec<MetricsRecord>> = (0..8)
            .map(|i| {
                vec![
                    record("m1", "pA", 100.0 + i as f64, 0.01),
                    record("m2", "pB", 50.0, 0.02 + i as f64 * 0.001),
                ]
            })
            .collect();

        let mut handles = Vec::new();
        for event in events.clone() {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let verdict = compare(&event).expect("verdict");
                storage
                    .record_comparison(&event, &verdict)
                    .await
                    .expect("record comparison");
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        let sequential = MemoryAggregateStorage::new();
        for event in &events {
            apply(&sequential, event).await;
        }

        let concurrent_rows = storage.snapshot().await.expect("snapshot");
        let sequential_rows = sequential.snapshot().await.expect("snapshot");

        assert_eq!(concurrent_rows.len(), sequential_rows.len());
        for (a, b) in concurrent_rows.iter().zip(sequential_rows.iter()) {
            assert_eq!(a.key, b.key);
            assert_eq!(a.total_comparisons, b.total_comparisons);
            assert_eq!(a.times_fastest, b.times_fastest);
            assert_eq!(a.times_cheapest, b.times_cheapest);
            assert_eq!(a.min_response_time_ms, b.min_response_time_ms);
            assert_eq!(a.max_response_time_ms, b.max_response_time_ms);
            assert!((a.sum_response_time_ms - b.sum_response_time_ms).abs() < 1e-9);
            assert!((a.sum_cost_usd - b.sum_cost_usd).abs() < 1e-9);
        }
    }
}
