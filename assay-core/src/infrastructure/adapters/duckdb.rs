// assay-core/src/infrastructure/adapters/duckdb.rs

use duckdb::types::Value as DbValue;
use duckdb::{Config, Connection};
use serde_json::{Map, Number, Value};
use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::domain::batch::{BatchData, BatchDataHandle, BatchMarkers, BatchSpec, RecordSet};
use crate::domain::error::DomainError;
use crate::error::AssayError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::{ExecutionEngine, MetricConfiguration, MetricId};

const DEFAULT_HEAD_ROWS: u64 = 5;
const DEFAULT_SAMPLE_FRACTION: f64 = 0.1;

/// Handle to a batch registered inside a DuckDB connection.
#[derive(Debug, Clone, PartialEq)]
pub struct DuckDbRelation {
    relation_name: String,
    batch_id: String,
}

impl DuckDbRelation {
    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }
}

impl BatchData for DuckDbRelation {
    fn type_name(&self) -> &str {
        "DuckDbRelation"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct DuckDbExecutionEngine {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbExecutionEngine {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Relation every batch id is registered under.
    pub fn relation_name(batch_id: &str) -> String {
        format!("batch_{:x}", md5::compute(batch_id.as_bytes()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Database(DatabaseError::Poisoned))
    }

    /// FROM clause for the batch spec's source. Record sets are copied into a table first.
    fn source_sql(
        &self,
        conn: &Connection,
        relation: &str,
        spec: &BatchSpec,
    ) -> Result<String, InfrastructureError> {
        if let Some(data) = spec.batch_data() {
            if let Some(records) = data.as_any().downcast_ref::<RecordSet>() {
                let table = format!("{}_data", relation);
                conn.execute_batch(&format!(
                    "CREATE OR REPLACE TABLE {} AS {}",
                    quote_ident(&table),
                    record_set_sql(records)?
                ))?;
                return Ok(quote_ident(&table));
            }
            if let Some(existing) = data.as_any().downcast_ref::<DuckDbRelation>() {
                return Ok(quote_ident(existing.relation_name()));
            }
            return Err(InfrastructureError::UnsupportedBatchSpec(format!(
                "DuckDB cannot load in-memory data of type {}",
                data.type_name()
            )));
        }

        if let Some(query) = spec.query() {
            return Ok(format!("({})", query));
        }

        if let Some(path) = spec.path() {
            let reader = match spec.reader_method() {
                Some(method) => method.to_string(),
                None => default_reader(Path::new(path)).to_string(),
            };
            let function = match reader.as_str() {
                "read_csv" | "read_csv_auto" => "read_csv_auto",
                "read_parquet" => "read_parquet",
                "read_json" | "read_json_auto" => "read_json_auto",
                other => {
                    return Err(InfrastructureError::UnsupportedBatchSpec(format!(
                        "unknown reader_method '{}'",
                        other
                    )));
                }
            };
            return Ok(format!("{}({})", function, quote_literal(path)));
        }

        Err(InfrastructureError::UnsupportedBatchSpec(
            "batch spec needs batch_data, query or path".into(),
        ))
    }

    fn count_rows(conn: &Connection, relation: &str) -> Result<i64, InfrastructureError> {
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(relation)),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count)
    }

    fn column_names(conn: &Connection, relation: &str) -> Result<Vec<String>, InfrastructureError> {
        let mut stmt = conn.prepare(&format!("DESCRIBE {}", quote_ident(relation)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn head(
        conn: &Connection,
        relation: &str,
        n_rows: u64,
        fetch_all: bool,
    ) -> Result<Value, InfrastructureError> {
        let columns = Self::column_names(conn, relation)?;
        let mut sql = format!("SELECT * FROM {}", quote_ident(relation));
        if !fetch_all {
            sql.push_str(&format!(" LIMIT {}", n_rows));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let mut record = Map::new();
                for (i, column) in columns.iter().enumerate() {
                    record.insert(column.clone(), to_json(row.get::<_, DbValue>(i)?));
                }
                Ok(Value::Object(record))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(rows))
    }

    fn resolve_metric(
        conn: &Connection,
        metric: &MetricConfiguration,
    ) -> Result<Value, AssayError> {
        let batch_id = metric.batch_id().ok_or_else(|| {
            DomainError::InvalidBatchId(format!("metric {} has no batch_id domain", metric))
        })?;
        let relation = Self::relation_name(batch_id);
        let kwargs = metric.metric_value_kwargs();

        let value = match metric.metric_name() {
            MetricConfiguration::TABLE_HEAD => {
                let n_rows = kwargs
                    .get("n_rows")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_HEAD_ROWS);
                let fetch_all = kwargs
                    .get("fetch_all")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Self::head(conn, &relation, n_rows, fetch_all)?
            }
            MetricConfiguration::TABLE_ROW_COUNT => Value::from(Self::count_rows(conn, &relation)?),
            MetricConfiguration::TABLE_COLUMNS => Value::from(Self::column_names(conn, &relation)?),
            other => return Err(DomainError::UnsupportedMetric(other.to_string()).into()),
        };
        Ok(value)
    }
}

impl ExecutionEngine for DuckDbExecutionEngine {
    fn engine_name(&self) -> &str {
        "duckdb"
    }

    #[instrument(skip(self, batch_spec))]
    fn load_batch_data(
        &self,
        batch_id: &str,
        batch_spec: &BatchSpec,
    ) -> Result<(BatchDataHandle, BatchMarkers), AssayError> {
        let relation = Self::relation_name(batch_id);
        let conn = self.lock()?;

        let source = self.source_sql(&conn, &relation, batch_spec)?;
        let select = select_sql(&source, batch_spec)?;

        // Random samples are materialized so every metric sees the same rows.
        let kind = if batch_spec.sampling_method() == Some("sample_using_random") {
            "TABLE"
        } else {
            "VIEW"
        };
        conn.execute_batch(&format!("DROP VIEW IF EXISTS {}", quote_ident(&relation)))
            .or_else(|_| conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(&relation))))?;
        conn.execute_batch(&format!(
            "CREATE OR REPLACE {} {} AS {}",
            kind,
            quote_ident(&relation),
            select
        ))?;
        debug!(relation = %relation, sql = %select, "Batch registered");

        let row_count = Self::count_rows(&conn, &relation)?;
        let markers = BatchMarkers::stamped().with("row_count", row_count);
        let handle: BatchDataHandle = Arc::new(DuckDbRelation {
            relation_name: relation,
            batch_id: batch_id.to_string(),
        });
        Ok((handle, markers))
    }

    #[instrument(skip(self, metrics), fields(count = metrics.len()))]
    fn resolve_metrics(
        &self,
        metrics: &[MetricConfiguration],
    ) -> Result<HashMap<MetricId, Value>, AssayError> {
        let conn = self.lock()?;
        metrics
            .iter()
            .map(|metric| Self::resolve_metric(&conn, metric).map(|value| (metric.id(), value)))
            .collect()
    }
}

// ==========================================
// SQL HELPERS
// ==========================================

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn default_reader(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => "read_parquet",
        Some("json") | Some("jsonl") | Some("ndjson") => "read_json",
        _ => "read_csv",
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        other => quote_literal(&other.to_string()),
    }
}

fn record_set_sql(records: &RecordSet) -> Result<String, InfrastructureError> {
    if records.columns().is_empty() {
        return Err(InfrastructureError::UnsupportedBatchSpec(
            "record set has no columns".into(),
        ));
    }
    let columns = records
        .columns()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    if records.is_empty() {
        let nulls = records
            .columns()
            .iter()
            .map(|c| format!("NULL::VARCHAR AS {}", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        return Ok(format!("SELECT {} WHERE false", nulls));
    }

    let rows = records
        .rows()
        .iter()
        .map(|row| {
            let values = row.iter().map(sql_literal).collect::<Vec<_>>().join(", ");
            format!("({})", values)
        })
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("SELECT * FROM (VALUES {}) AS t({})", rows, columns))
}

/// SELECT over the source with splitting (WHERE) and sampling applied.
fn select_sql(source: &str, spec: &BatchSpec) -> Result<String, InfrastructureError> {
    let mut sql = format!("SELECT * FROM {}", source);

    if let Some(method) = spec.splitter_method() {
        match method {
            "split_on_column_value" => {
                let kwargs = spec.splitter_kwargs().ok_or_else(|| {
                    InfrastructureError::UnsupportedBatchSpec(
                        "split_on_column_value needs splitter_kwargs".into(),
                    )
                })?;
                let column = kwargs
                    .get("column_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        InfrastructureError::UnsupportedBatchSpec(
                            "split_on_column_value needs a column_name".into(),
                        )
                    })?;
                let value = kwargs
                    .get("batch_identifiers")
                    .and_then(|ids| ids.get(column))
                    .ok_or_else(|| {
                        InfrastructureError::UnsupportedBatchSpec(format!(
                            "split_on_column_value needs batch_identifiers.{}",
                            column
                        ))
                    })?;
                sql.push_str(&format!(" WHERE {} = {}", quote_ident(column), sql_literal(value)));
            }
            other => {
                return Err(InfrastructureError::UnsupportedBatchSpec(format!(
                    "unknown splitter_method '{}'",
                    other
                )));
            }
        }
    }

    if let Some(method) = spec.sampling_method() {
        let kwargs = spec.sampling_kwargs();
        match method {
            "sample_using_limit" => {
                let n = kwargs
                    .and_then(|k| k.get("n"))
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        InfrastructureError::UnsupportedBatchSpec(
                            "sample_using_limit needs a non-negative n".into(),
                        )
                    })?;
                sql.push_str(&format!(" LIMIT {}", n));
            }
            "sample_using_random" => {
                let p = kwargs
                    .and_then(|k| k.get("p"))
                    .and_then(Value::as_f64)
                    .unwrap_or(DEFAULT_SAMPLE_FRACTION);
                if !(0.0..=1.0).contains(&p) {
                    return Err(InfrastructureError::UnsupportedBatchSpec(format!(
                        "sample_using_random p must be within [0, 1], got {}",
                        p
                    )));
                }
                sql.push_str(&format!(" USING SAMPLE {}% (bernoulli)", p * 100.0));
            }
            other => {
                return Err(InfrastructureError::UnsupportedBatchSpec(format!(
                    "unknown sampling_method '{}'",
                    other
                )));
            }
        }
    }

    Ok(sql)
}

fn to_json(value: DbValue) -> Value {
    match value {
        DbValue::Null => Value::Null,
        DbValue::Boolean(b) => Value::Bool(b),
        DbValue::TinyInt(i) => Value::from(i),
        DbValue::SmallInt(i) => Value::from(i),
        DbValue::Int(i) => Value::from(i),
        DbValue::BigInt(i) => Value::from(i),
        DbValue::UTinyInt(i) => Value::from(i),
        DbValue::USmallInt(i) => Value::from(i),
        DbValue::UInt(i) => Value::from(i),
        DbValue::UBigInt(i) => Value::from(i),
        DbValue::HugeInt(i) => i64::try_from(i)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(i.to_string())),
        DbValue::Float(f) => Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number),
        DbValue::Double(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        DbValue::Text(s) => Value::String(s),
        other => Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::identity::IdDict;
    use anyhow::Result;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn head_metric(batch_id: &str, n_rows: u64) -> MetricConfiguration {
        MetricConfiguration::new(
            MetricConfiguration::TABLE_HEAD,
            IdDict::new().with("batch_id", batch_id),
            IdDict::new().with("n_rows", n_rows).with("fetch_all", false),
        )
    }

    fn resolve_one(engine: &DuckDbExecutionEngine, metric: MetricConfiguration) -> Result<Value> {
        let id = metric.id();
        let mut resolved = engine.resolve_metrics(&[metric])?;
        Ok(resolved.remove(&id).expect("metric resolved"))
    }

    #[test]
    fn test_csv_path_head_and_row_count() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("taxi.csv");
        fs::write(&path, "id,amount\n1,10\n2,20\n3,30\n")?;

        let engine = DuckDbExecutionEngine::new(":memory:")?;
        let spec = BatchSpec::new()
            .with_path(path.to_string_lossy())
            .with(BatchSpec::READER_METHOD, "read_csv");
        let (handle, markers) = engine.load_batch_data("abc", &spec)?;

        assert_eq!(handle.type_name(), "DuckDbRelation");
        assert_eq!(markers.get("row_count"), Some(&json!(3)));
        assert!(markers.ge_load_time().is_some());

        let rows = resolve_one(&engine, head_metric("abc", 2))?;
        assert_eq!(rows, json!([{"id": 1, "amount": 10}, {"id": 2, "amount": 20}]));
        Ok(())
    }

    #[test]
    fn test_query_batch_with_limit_sampling() -> Result<()> {
        let engine = DuckDbExecutionEngine::new(":memory:")?;
        let spec = BatchSpec::new()
            .with_query("SELECT range AS n FROM range(10)")
            .with(BatchSpec::SAMPLING_METHOD, "sample_using_limit")
            .with(BatchSpec::SAMPLING_KWARGS, json!({"n": 4}));
        let (_, markers) = engine.load_batch_data("q", &spec)?;
        assert_eq!(markers.get("row_count"), Some(&json!(4)));

        let columns = resolve_one(
            &engine,
            MetricConfiguration::new(
                MetricConfiguration::TABLE_COLUMNS,
                IdDict::new().with("batch_id", "q"),
                IdDict::new(),
            ),
        )?;
        assert_eq!(columns, json!(["n"]));
        Ok(())
    }

    #[test]
    fn test_record_set_with_split() -> Result<()> {
        let engine = DuckDbExecutionEngine::new(":memory:")?;
        let records = RecordSet::new(
            vec!["city".into(), "fare".into()],
            vec![
                vec![json!("paris"), json!(12)],
                vec![json!("lyon"), json!(8)],
                vec![json!("paris"), json!(15)],
            ],
        );
        let spec = BatchSpec::new()
            .with_batch_data(records.into_handle())
            .with(BatchSpec::SPLITTER_METHOD, "split_on_column_value")
            .with(
                BatchSpec::SPLITTER_KWARGS,
                json!({"column_name": "city", "batch_identifiers": {"city": "paris"}}),
            );
        let (_, markers) = engine.load_batch_data("rs", &spec)?;
        assert_eq!(markers.get("row_count"), Some(&json!(2)));

        let rows = resolve_one(&engine, head_metric("rs", 10))?;
        assert_eq!(rows.as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[test]
    fn test_unsupported_metric() -> Result<()> {
        let engine = DuckDbExecutionEngine::new(":memory:")?;
        engine.load_batch_data("x", &BatchSpec::new().with_query("SELECT 1 AS a"))?;
        let err = engine
            .resolve_metrics(&[MetricConfiguration::new(
                "column.mean",
                IdDict::new().with("batch_id", "x"),
                IdDict::new(),
            )])
            .unwrap_err();
        assert!(matches!(
            err,
            AssayError::Domain(DomainError::UnsupportedMetric(ref name)) if name == "column.mean"
        ));
        Ok(())
    }

    #[test]
    fn test_empty_spec_is_rejected() -> Result<()> {
        let engine = DuckDbExecutionEngine::new(":memory:")?;
        assert!(engine.load_batch_data("none", &BatchSpec::new()).is_err());
        Ok(())
    }

    #[test]
    fn test_relation_name_is_stable() {
        assert_eq!(
            DuckDbExecutionEngine::relation_name("abc"),
            DuckDbExecutionEngine::relation_name("abc")
        );
        assert!(DuckDbExecutionEngine::relation_name("abc").starts_with("batch_"));
    }
}
