// ==========================================
// 疫情通报采集系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少多进程并行入库时的偶发 busy 错误
// - 建表幂等，首次打开即可使用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

-- 时间序列记录: (measurement, state, county, ts) 唯一，州级记录 county 为空串
CREATE TABLE IF NOT EXISTS records (
    measurement TEXT NOT NULL,
    state       TEXT NOT NULL,
    county      TEXT NOT NULL DEFAULT '',
    ts          TEXT NOT NULL,
    count       INTEGER NOT NULL,
    p10k        REAL,
    p100k       REAL,
    death       INTEGER,
    PRIMARY KEY (measurement, state, county, ts)
);

CREATE INDEX IF NOT EXISTS idx_records_county ON records (measurement, county);
CREATE INDEX IF NOT EXISTS idx_records_ts ON records (measurement, ts);

-- 运行审计
CREATE TABLE IF NOT EXISTS ingest_run (
    run_id           TEXT PRIMARY KEY,
    state            TEXT NOT NULL,
    bulletin_ts      TEXT,
    record_count     INTEGER NOT NULL,
    unresolved_count INTEGER NOT NULL,
    total_mismatch   INTEGER NOT NULL,
    status           TEXT NOT NULL,
    message          TEXT,
    started_at       TEXT NOT NULL,
    elapsed_ms       INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ingest_run_started ON ingest_run (started_at);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并登记 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
