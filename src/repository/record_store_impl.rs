// ==========================================
// 疫情通报采集系统 - 时间序列存储实现
// ==========================================
// 职责: 基于 rusqlite 实现 RecordStore
// 键: (measurement, state, county, ts)，州级记录 county 存空串
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::record::{
    format_timestamp, parse_timestamp, CanonicalRecord, IngestRun, RecordFields, RecordTags,
    RunStatus,
};
use crate::domain::types::{FederalState, Measurement};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

const UPSERT_SQL: &str = r#"
INSERT INTO records (measurement, state, county, ts, count, p10k, p100k, death)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT (measurement, state, county, ts) DO UPDATE SET
    count = excluded.count,
    p10k  = excluded.p10k,
    p100k = excluded.p100k,
    death = excluded.death
"#;

const SELECT_COLUMNS: &str =
    "SELECT measurement, state, county, ts, count, p10k, p100k, death FROM records";

/// 数据库中的一行（未校验）
struct RecordRow {
    measurement: String,
    state: String,
    county: String,
    ts: String,
    count: i64,
    p10k: Option<f64>,
    p100k: Option<f64>,
    death: Option<i64>,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            measurement: row.get(0)?,
            state: row.get(1)?,
            county: row.get(2)?,
            ts: row.get(3)?,
            count: row.get(4)?,
            p10k: row.get(5)?,
            p100k: row.get(6)?,
            death: row.get(7)?,
        })
    }

    fn into_record(self) -> RepositoryResult<CanonicalRecord> {
        let measurement: Measurement =
            self.measurement
                .parse()
                .map_err(|e: String| RepositoryError::FieldValueError {
                    field: "measurement".to_string(),
                    message: e,
                })?;
        let timestamp = parse_timestamp(&self.ts).map_err(|e| RepositoryError::FieldValueError {
            field: "ts".to_string(),
            message: format!("'{}': {}", self.ts, e),
        })?;

        Ok(CanonicalRecord {
            measurement,
            tags: RecordTags {
                state: self.state,
                county: (!self.county.is_empty()).then_some(self.county),
            },
            timestamp,
            fields: RecordFields {
                count: self.count,
                p10k: self.p10k,
                p100k: self.p100k,
                death: self.death,
            },
        })
    }
}

// ==========================================
// SqliteRecordStore
// ==========================================
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 打开（必要时创建）数据库
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Err(SchemaVersion): 数据库由更新版本的程序创建，拒绝写入
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;

        if let Some(found) = read_schema_version(&conn)? {
            if found > CURRENT_SCHEMA_VERSION {
                return Err(RepositoryError::SchemaVersion {
                    found,
                    supported: CURRENT_SCHEMA_VERSION,
                });
            }
        }
        debug!(db_path, "数据库已打开");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn upsert_tx(tx: &Transaction, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(UPSERT_SQL)?;
        for record in records {
            stmt.execute(params![
                record.measurement.as_str(),
                record.tags.state,
                record.tags.county.as_deref().unwrap_or(""),
                record.time_str(),
                record.fields.count,
                record.fields.p10k,
                record.fields.p100k,
                record.fields.death,
            ])?;
        }
        Ok(records.len())
    }

    fn select_records(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn write_batch(&self, records: &[CanonicalRecord]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let written = Self::upsert_tx(&tx, records)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(written, "批量写入完成");
        Ok(written)
    }

    async fn query_series(
        &self,
        measurement: Measurement,
        state: &str,
        county: Option<&str>,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE measurement = ?1 AND state = ?2 AND county = ?3 ORDER BY ts",
            SELECT_COLUMNS
        );
        Self::select_records(
            &conn,
            &sql,
            &[&measurement.as_str(), &state, &county.unwrap_or("")],
        )
    }

    async fn query_since(
        &self,
        measurement: Measurement,
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE measurement = ?1 AND ts >= ?2 ORDER BY ts, state, county",
            SELECT_COLUMNS
        );
        Self::select_records(&conn, &sql, &[&measurement.as_str(), &format_timestamp(&since)])
    }

    async fn list_tag_values(&self, measurement: Measurement) -> RepositoryResult<Vec<RecordTags>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT state, county FROM records WHERE measurement = ?1 ORDER BY state, county",
        )?;
        let tags = stmt
            .query_map([measurement.as_str()], |row| {
                let county: String = row.get(1)?;
                Ok(RecordTags {
                    state: row.get(0)?,
                    county: (!county.is_empty()).then_some(county),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    async fn count_records(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn rename_region(
        &self,
        measurement: Measurement,
        state: Option<&str>,
        old_name: &str,
        new_name: &str,
    ) -> RepositoryResult<usize> {
        if old_name == new_name {
            return Err(RepositoryError::NoopRename(old_name.to_string()));
        }

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let states: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT state FROM records WHERE measurement = ?1 AND county = ?2 ORDER BY state",
            )?;
            let found = stmt
                .query_map(params![measurement.as_str(), old_name], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            found
        };

        let target_state = match state {
            Some(s) => s.to_string(),
            None => match states.as_slice() {
                [] => return Ok(0),
                [only] => only.clone(),
                _ => {
                    return Err(RepositoryError::AmbiguousRegion {
                        county: old_name.to_string(),
                        states: states.join(", "),
                    })
                }
            },
        };

        // 读出全部匹配
        let sql = format!(
            "{} WHERE measurement = ?1 AND state = ?2 AND county = ?3 ORDER BY ts",
            SELECT_COLUMNS
        );
        let matching = Self::select_records(
            &tx,
            &sql,
            &[&measurement.as_str(), &target_state, &old_name],
        )?;
        if matching.is_empty() {
            return Ok(0);
        }

        // 以新键重写（与新键已有记录合并）
        let renamed: Vec<CanonicalRecord> = matching
            .into_iter()
            .map(|mut record| {
                record.tags.county = Some(new_name.to_string());
                record
            })
            .collect();
        let moved = Self::upsert_tx(&tx, &renamed)?;

        // 删除旧键
        tx.execute(
            "DELETE FROM records WHERE measurement = ?1 AND state = ?2 AND county = ?3",
            params![measurement.as_str(), target_state, old_name],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            measurement = %measurement,
            state = %target_state,
            old = old_name,
            new = new_name,
            moved,
            "区域重命名完成"
        );
        Ok(moved)
    }

    async fn insert_run(&self, run: &IngestRun) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO ingest_run (
                run_id, state, bulletin_ts, record_count, unresolved_count,
                total_mismatch, status, message, started_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                run.run_id,
                run.state.short(),
                run.bulletin_timestamp.as_ref().map(format_timestamp),
                run.record_count as i64,
                run.unresolved_count as i64,
                run.total_mismatch,
                run.status.as_str(),
                run.message,
                format_timestamp(&run.started_at),
                run.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> RepositoryResult<Vec<IngestRun>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, state, bulletin_ts, record_count, unresolved_count,
                   total_mismatch, status, message, started_at, elapsed_ms
            FROM ingest_run
            ORDER BY started_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        #[allow(clippy::type_complexity)]
        let rows: Vec<(String, String, Option<String>, i64, i64, bool, String, Option<String>, String, i64)> = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(run_id, state, bulletin_ts, record_count, unresolved_count, total_mismatch, status, message, started_at, elapsed_ms)| {
                    let state: FederalState = state.parse().map_err(|e: String| {
                        RepositoryError::FieldValueError {
                            field: "state".to_string(),
                            message: e,
                        }
                    })?;
                    let parse_ts = |raw: &str| {
                        parse_timestamp(raw).map_err(|e| RepositoryError::FieldValueError {
                            field: "ts".to_string(),
                            message: format!("'{}': {}", raw, e),
                        })
                    };
                    Ok(IngestRun {
                        run_id,
                        state,
                        bulletin_timestamp: bulletin_ts.as_deref().map(parse_ts).transpose()?,
                        record_count: record_count as usize,
                        unresolved_count: unresolved_count as usize,
                        total_mismatch,
                        status: RunStatus::parse(&status),
                        message,
                        started_at: parse_ts(&started_at)?,
                        elapsed_ms,
                    })
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn store() -> (NamedTempFile, SqliteRecordStore) {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteRecordStore::new(file.path().to_str().unwrap()).unwrap();
        (file, store)
    }

    fn record(county: &str, count: i64) -> CanonicalRecord {
        CanonicalRecord::region(
            FederalState::By,
            county,
            Utc.with_ymd_and_hms(2020, 3, 17, 10, 0, 0).unwrap(),
            RecordFields {
                count,
                p10k: Some(1.5),
                p100k: Some(15.0),
                death: None,
            },
        )
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_key() {
        let (_file, store) = store();
        store.write_batch(&[record("Passau", 10)]).await.unwrap();
        store.write_batch(&[record("Passau", 12)]).await.unwrap();

        assert_eq!(store.count_records().await.unwrap(), 1);
        let series = store
            .query_series(Measurement::InfectedDeState, "Bayern", Some("Passau"))
            .await
            .unwrap();
        assert_eq!(series[0].fields.count, 12);
        assert_eq!(series[0].fields.death, None);
    }

    #[tokio::test]
    async fn test_noop_rename_rejected() {
        let (_file, store) = store();
        let err = store
            .rename_region(Measurement::InfectedDeState, None, "Passau", "Passau")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NoopRename(_)));
    }
}
