// ==========================================
// 数字仓储批量导入导出系统 - 运行簿记 Repository 实现
// ==========================================
// 存储: rusqlite;连接经 db::open_sqlite_connection 统一初始化
// 约束: 锁内只做同步数据库操作,绝不跨 await 持锁
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::run::{
    EntryStatus, FailedEntry, ImporterRun, PendingRelationship, RelationshipState, RunSummary,
};
use crate::domain::types::{RunCounter, RunKind, StatusCode, TargetKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::run_repo::{EntryRow, RunRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 簿记表建表语句（IF NOT EXISTS,可重复执行）
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS importer_run (
    run_id            TEXT PRIMARY KEY,
    importer_id       TEXT NOT NULL,
    kind              TEXT NOT NULL,
    total_records     INTEGER NOT NULL DEFAULT 0,
    enqueued_records  INTEGER NOT NULL DEFAULT 0,
    processed_records INTEGER NOT NULL DEFAULT 0,
    failed_records    INTEGER NOT NULL DEFAULT 0,
    deleted_records   INTEGER NOT NULL DEFAULT 0,
    cancelled         INTEGER NOT NULL DEFAULT 0,
    started_at        TEXT NOT NULL,
    finished_at       TEXT
);

CREATE TABLE IF NOT EXISTS entry (
    entry_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    importer_id       TEXT NOT NULL,
    source_identifier TEXT NOT NULL,
    kind              TEXT NOT NULL,
    raw_json          TEXT,
    attrs_json        TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE(importer_id, source_identifier, kind)
);

CREATE TABLE IF NOT EXISTS entry_status (
    status_id     TEXT PRIMARY KEY,
    entry_id      INTEGER NOT NULL REFERENCES entry(entry_id),
    run_id        TEXT NOT NULL,
    code          TEXT NOT NULL,
    error_class   TEXT,
    error_message TEXT,
    backtrace     TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_relationship (
    relationship_id   TEXT PRIMARY KEY,
    run_id            TEXT NOT NULL,
    parent_identifier TEXT NOT NULL,
    child_identifier  TEXT NOT NULL,
    state             TEXT NOT NULL DEFAULT 'PENDING',
    created_at        TEXT NOT NULL,
    CHECK(parent_identifier <> child_identifier)
);

CREATE TABLE IF NOT EXISTS config_kv (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_entry_status_entry ON entry_status(entry_id);
CREATE INDEX IF NOT EXISTS idx_entry_status_run ON entry_status(run_id);
CREATE INDEX IF NOT EXISTS idx_pending_rel_run ON pending_relationship(run_id, state);
"#;

// ==========================================
// SqliteRunRepository
// ==========================================
pub struct SqliteRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRunRepository {
    /// 创建新的 Repository 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ImportError::DatabaseConnectionError(e.to_string()))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> ImportResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::Internal(format!("连接锁中毒: {}", e)))
    }
}

fn parse_utc(value: &str) -> ImportResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ImportError::DatabaseQueryError(format!("时间戳格式非法 {}: {}", value, e)))
}

fn parse_kind(value: &str) -> ImportResult<TargetKind> {
    TargetKind::parse(value)
        .ok_or_else(|| ImportError::DatabaseQueryError(format!("未知实体类型: {}", value)))
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<(ImporterRun, String, String, Option<String>)> {
    // 时间戳/枚举字段原样取出,锁外再解析
    Ok((
        ImporterRun {
            run_id: row.get("run_id")?,
            importer_id: row.get("importer_id")?,
            kind: RunKind::Import, // 占位,随后由 kind 字符串覆盖
            total_records: row.get("total_records")?,
            enqueued_records: row.get("enqueued_records")?,
            processed_records: row.get("processed_records")?,
            failed_records: row.get("failed_records")?,
            deleted_records: row.get("deleted_records")?,
            cancelled: row.get::<_, i64>("cancelled")? != 0,
            started_at: Utc::now(), // 占位
            finished_at: None,      // 占位
        },
        row.get("kind")?,
        row.get("started_at")?,
        row.get("finished_at")?,
    ))
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn create_run(&self, run: &ImporterRun) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO importer_run (
                run_id, importer_id, kind, total_records, enqueued_records,
                processed_records, failed_records, deleted_records, cancelled,
                started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                run.run_id,
                run.importer_id,
                run.kind.to_string(),
                run.total_records,
                run.enqueued_records,
                run.processed_records,
                run.failed_records,
                run.deleted_records,
                run.cancelled as i64,
                run.started_at.to_rfc3339(),
                run.finished_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    async fn reset_counters(&self, run_id: &str) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            UPDATE importer_run
            SET total_records = 0, enqueued_records = 0, processed_records = 0,
                failed_records = 0, deleted_records = 0
            WHERE run_id = ?1
            "#,
            params![run_id],
        )?;
        Ok(())
    }

    async fn set_total(&self, run_id: &str, total: i64) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE importer_run SET total_records = ?2 WHERE run_id = ?1",
            params![run_id, total],
        )?;
        Ok(())
    }

    async fn increment(&self, run_id: &str, counter: RunCounter) -> ImportResult<()> {
        let conn = self.lock()?;
        // 列名来自封闭枚举,拼接安全;单条 UPDATE 在数据库内原子完成读-改-写
        let sql = format!(
            "UPDATE importer_run SET {col} = {col} + 1 WHERE run_id = ?1",
            col = counter.column()
        );
        let changed = conn.execute(&sql, params![run_id])?;
        if changed == 0 {
            return Err(ImportError::DatabaseQueryError(format!(
                "运行不存在: {}",
                run_id
            )));
        }
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> ImportResult<Option<ImporterRun>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT * FROM importer_run WHERE run_id = ?1",
                params![run_id],
                row_to_run,
            )
            .optional()?
        };

        match raw {
            None => Ok(None),
            Some((mut run, kind, started_at, finished_at)) => {
                run.kind = RunKind::parse(&kind).ok_or_else(|| {
                    ImportError::DatabaseQueryError(format!("未知运行类型: {}", kind))
                })?;
                run.started_at = parse_utc(&started_at)?;
                run.finished_at = match finished_at {
                    Some(t) => Some(parse_utc(&t)?),
                    None => None,
                };
                Ok(Some(run))
            }
        }
    }

    async fn cancel_run(&self, run_id: &str) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE importer_run SET cancelled = 1 WHERE run_id = ?1",
            params![run_id],
        )?;
        Ok(())
    }

    async fn is_cancelled(&self, run_id: &str) -> ImportResult<bool> {
        let conn = self.lock()?;
        let cancelled: Option<i64> = conn
            .query_row(
                "SELECT cancelled FROM importer_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(cancelled.unwrap_or(0) != 0)
    }

    async fn finish_run(&self, run_id: &str) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE importer_run SET finished_at = ?2 WHERE run_id = ?1",
            params![run_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn run_summary(&self, run_id: &str) -> ImportResult<RunSummary> {
        let run = self
            .get_run(run_id)
            .await?
            .ok_or_else(|| ImportError::DatabaseQueryError(format!("运行不存在: {}", run_id)))?;

        let failed_entries = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT e.source_identifier, s.error_class, s.error_message
                FROM entry_status s
                JOIN entry e ON e.entry_id = s.entry_id
                WHERE s.run_id = ?1
                  AND s.code = 'Failed'
                  AND s.rowid = (
                      SELECT MAX(s2.rowid) FROM entry_status s2
                      WHERE s2.entry_id = s.entry_id AND s2.run_id = ?1
                  )
                ORDER BY e.source_identifier
                "#,
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok(FailedEntry {
                    source_identifier: row.get(0)?,
                    error_class: row.get(1)?,
                    error_message: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        Ok(RunSummary {
            run_id: run.run_id,
            kind: run.kind,
            total_records: run.total_records,
            enqueued_records: run.enqueued_records,
            processed_records: run.processed_records,
            failed_records: run.failed_records,
            deleted_records: run.deleted_records,
            failed_entries,
        })
    }

    async fn upsert_entry(
        &self,
        importer_id: &str,
        source_identifier: &str,
        kind: TargetKind,
        raw_json: Option<&str>,
        attrs_json: Option<&str>,
    ) -> ImportResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO entry (
                importer_id, source_identifier, kind, raw_json, attrs_json,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(importer_id, source_identifier, kind) DO UPDATE SET
                raw_json = COALESCE(excluded.raw_json, entry.raw_json),
                attrs_json = COALESCE(excluded.attrs_json, entry.attrs_json),
                updated_at = excluded.updated_at
            "#,
            params![
                importer_id,
                source_identifier,
                kind.to_string(),
                raw_json,
                attrs_json,
                now,
            ],
        )?;

        let entry_id: i64 = conn.query_row(
            r#"
            SELECT entry_id FROM entry
            WHERE importer_id = ?1 AND source_identifier = ?2 AND kind = ?3
            "#,
            params![importer_id, source_identifier, kind.to_string()],
            |row| row.get(0),
        )?;
        Ok(entry_id)
    }

    async fn get_entry(
        &self,
        importer_id: &str,
        source_identifier: &str,
        kind: TargetKind,
    ) -> ImportResult<Option<EntryRow>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                r#"
                SELECT entry_id, importer_id, source_identifier, kind, raw_json, attrs_json
                FROM entry
                WHERE importer_id = ?1 AND source_identifier = ?2 AND kind = ?3
                "#,
                params![importer_id, source_identifier, kind.to_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?
        };

        match raw {
            None => Ok(None),
            Some((entry_id, importer_id, source_identifier, kind, raw_json, attrs_json)) => {
                Ok(Some(EntryRow {
                    entry_id,
                    importer_id,
                    source_identifier,
                    kind: parse_kind(&kind)?,
                    raw_json,
                    attrs_json,
                }))
            }
        }
    }

    async fn list_entries(&self, importer_id: &str) -> ImportResult<Vec<EntryRow>> {
        let raw_rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT entry_id, importer_id, source_identifier, kind, raw_json, attrs_json
                FROM entry
                WHERE importer_id = ?1
                ORDER BY entry_id
                "#,
            )?;
            let rows = stmt.query_map(params![importer_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        raw_rows
            .into_iter()
            .map(|(entry_id, importer_id, source_identifier, kind, raw_json, attrs_json)| {
                Ok(EntryRow {
                    entry_id,
                    importer_id,
                    source_identifier,
                    kind: parse_kind(&kind)?,
                    raw_json,
                    attrs_json,
                })
            })
            .collect()
    }

    async fn append_status(&self, status: &EntryStatus) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO entry_status (
                status_id, entry_id, run_id, code, error_class, error_message,
                backtrace, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                status.status_id,
                status.entry_id,
                status.run_id,
                status.code.as_str(),
                status.error_class,
                status.error_message,
                status.backtrace,
                status.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn latest_status(&self, entry_id: i64) -> ImportResult<Option<EntryStatus>> {
        let raw = {
            let conn = self.lock()?;
            conn.query_row(
                r#"
                SELECT status_id, entry_id, run_id, code, error_class, error_message,
                       backtrace, created_at
                FROM entry_status
                WHERE entry_id = ?1
                ORDER BY rowid DESC
                LIMIT 1
                "#,
                params![entry_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?
        };

        match raw {
            None => Ok(None),
            Some((
                status_id,
                entry_id,
                run_id,
                code,
                error_class,
                error_message,
                backtrace,
                created_at,
            )) => {
                let code = StatusCode::parse(&code).ok_or_else(|| {
                    ImportError::DatabaseQueryError(format!("未知状态码: {}", code))
                })?;
                Ok(Some(EntryStatus {
                    status_id,
                    entry_id,
                    run_id,
                    code,
                    error_class,
                    error_message,
                    backtrace,
                    created_at: parse_utc(&created_at)?,
                }))
            }
        }
    }

    async fn insert_relationship(&self, rel: &PendingRelationship) -> ImportResult<()> {
        // 自引用在领域构造器已拒绝;表上 CHECK 双保险
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO pending_relationship (
                relationship_id, run_id, parent_identifier, child_identifier,
                state, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                rel.relationship_id,
                rel.run_id,
                rel.parent_identifier,
                rel.child_identifier,
                rel.state.as_str(),
                rel.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn pending_relationships(
        &self,
        run_id: &str,
    ) -> ImportResult<Vec<PendingRelationship>> {
        let raw_rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT relationship_id, run_id, parent_identifier, child_identifier,
                       state, created_at
                FROM pending_relationship
                WHERE run_id = ?1 AND state = 'PENDING'
                ORDER BY rowid
                "#,
            )?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        raw_rows
            .into_iter()
            .map(
                |(relationship_id, run_id, parent_identifier, child_identifier, state, created_at)| {
                    let state = RelationshipState::parse(&state).ok_or_else(|| {
                        ImportError::DatabaseQueryError(format!("未知关系状态: {}", state))
                    })?;
                    Ok(PendingRelationship {
                        relationship_id,
                        run_id,
                        parent_identifier,
                        child_identifier,
                        state,
                        created_at: parse_utc(&created_at)?,
                    })
                },
            )
            .collect()
    }

    async fn mark_relationship(
        &self,
        relationship_id: &str,
        state: RelationshipState,
    ) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE pending_relationship SET state = ?2 WHERE relationship_id = ?1",
            params![relationship_id, state.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::ImporterRun;
    use crate::domain::types::RunKind;

    fn repo() -> (tempfile::TempDir, SqliteRunRepository) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let repo = SqliteRunRepository::new(path.to_str().unwrap()).unwrap();
        (dir, repo)
    }

    #[tokio::test]
    async fn test_create_and_get_run() {
        let (_dir, repo) = repo();
        let run = ImporterRun::new("imp-1", RunKind::Import);
        repo.create_run(&run).await.unwrap();

        let loaded = repo.get_run(&run.run_id).await.unwrap().unwrap();
        assert_eq!(loaded.importer_id, "imp-1");
        assert_eq!(loaded.kind, RunKind::Import);
        assert_eq!(loaded.processed_records, 0);
        assert!(!loaded.cancelled);
    }

    #[tokio::test]
    async fn test_increment_counters() {
        let (_dir, repo) = repo();
        let run = ImporterRun::new("imp-1", RunKind::Import);
        repo.create_run(&run).await.unwrap();

        repo.increment(&run.run_id, RunCounter::Enqueued).await.unwrap();
        repo.increment(&run.run_id, RunCounter::Enqueued).await.unwrap();
        repo.increment(&run.run_id, RunCounter::Processed).await.unwrap();
        repo.increment(&run.run_id, RunCounter::Failed).await.unwrap();
        repo.increment(&run.run_id, RunCounter::Deleted).await.unwrap();

        let loaded = repo.get_run(&run.run_id).await.unwrap().unwrap();
        assert_eq!(loaded.enqueued_records, 2);
        assert_eq!(loaded.processed_records, 1);
        assert_eq!(loaded.failed_records, 1);
        assert_eq!(loaded.deleted_records, 1);
    }

    #[tokio::test]
    async fn test_increment_missing_run_is_error() {
        let (_dir, repo) = repo();
        let result = repo.increment("run-ghost", RunCounter::Processed).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reset_counters() {
        let (_dir, repo) = repo();
        let run = ImporterRun::new("imp-1", RunKind::Import);
        repo.create_run(&run).await.unwrap();
        repo.increment(&run.run_id, RunCounter::Processed).await.unwrap();
        repo.set_total(&run.run_id, 10).await.unwrap();

        repo.reset_counters(&run.run_id).await.unwrap();
        let loaded = repo.get_run(&run.run_id).await.unwrap().unwrap();
        assert_eq!(loaded.total_records, 0);
        assert_eq!(loaded.processed_records, 0);
    }

    #[tokio::test]
    async fn test_cancel_flag() {
        let (_dir, repo) = repo();
        let run = ImporterRun::new("imp-1", RunKind::Import);
        repo.create_run(&run).await.unwrap();

        assert!(!repo.is_cancelled(&run.run_id).await.unwrap());
        repo.cancel_run(&run.run_id).await.unwrap();
        assert!(repo.is_cancelled(&run.run_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_entry_idempotent_key() {
        let (_dir, repo) = repo();
        let first = repo
            .upsert_entry("imp-1", "rec-1", TargetKind::Work, Some("{}"), None)
            .await
            .unwrap();
        let second = repo
            .upsert_entry("imp-1", "rec-1", TargetKind::Work, None, Some("{\"a\":[]}"))
            .await
            .unwrap();
        assert_eq!(first, second);

        // None 不覆盖既有值
        let row = repo
            .get_entry("imp-1", "rec-1", TargetKind::Work)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.raw_json.as_deref(), Some("{}"));
        assert_eq!(row.attrs_json.as_deref(), Some("{\"a\":[]}"));
    }

    #[tokio::test]
    async fn test_status_history_append_only_latest_wins() {
        let (_dir, repo) = repo();
        let run = ImporterRun::new("imp-1", RunKind::Import);
        repo.create_run(&run).await.unwrap();
        let entry_id = repo
            .upsert_entry("imp-1", "rec-1", TargetKind::Work, None, None)
            .await
            .unwrap();

        repo.append_status(&EntryStatus::new(entry_id, run.run_id.as_str(), StatusCode::Pending))
            .await
            .unwrap();
        repo.append_status(
            &EntryStatus::new(entry_id, run.run_id.as_str(), StatusCode::Failed).with_error(
                "SourceFetchError",
                "超时",
                None,
            ),
        )
        .await
        .unwrap();
        repo.append_status(&EntryStatus::new(entry_id, run.run_id.as_str(), StatusCode::Complete))
            .await
            .unwrap();

        let latest = repo.latest_status(entry_id).await.unwrap().unwrap();
        assert_eq!(latest.code, StatusCode::Complete);
    }

    #[tokio::test]
    async fn test_run_summary_failed_entries() {
        let (_dir, repo) = repo();
        let run = ImporterRun::new("imp-1", RunKind::Import);
        repo.create_run(&run).await.unwrap();

        let ok_entry = repo
            .upsert_entry("imp-1", "rec-ok", TargetKind::Work, None, None)
            .await
            .unwrap();
        let bad_entry = repo
            .upsert_entry("imp-1", "rec-bad", TargetKind::Work, None, None)
            .await
            .unwrap();

        repo.append_status(&EntryStatus::new(ok_entry, &run.run_id, StatusCode::Complete))
            .await
            .unwrap();
        repo.append_status(
            &EntryStatus::new(bad_entry, &run.run_id, StatusCode::Failed).with_error(
                "PersistenceValidationError",
                "title 不能为空",
                None,
            ),
        )
        .await
        .unwrap();
        repo.increment(&run.run_id, RunCounter::Processed).await.unwrap();
        repo.increment(&run.run_id, RunCounter::Failed).await.unwrap();

        let summary = repo.run_summary(&run.run_id).await.unwrap();
        assert_eq!(summary.processed_records, 1);
        assert_eq!(summary.failed_records, 1);
        assert_eq!(summary.failed_entries.len(), 1);
        assert_eq!(summary.failed_entries[0].source_identifier, "rec-bad");
        assert_eq!(
            summary.failed_entries[0].error_message.as_deref(),
            Some("title 不能为空")
        );
    }

    #[tokio::test]
    async fn test_relationship_lifecycle() {
        let (_dir, repo) = repo();
        let rel = PendingRelationship::new("run-1", "col-1", "rec-1").unwrap();
        repo.insert_relationship(&rel).await.unwrap();

        let pending = repo.pending_relationships("run-1").await.unwrap();
        assert_eq!(pending.len(), 1);

        repo.mark_relationship(&rel.relationship_id, RelationshipState::Resolved)
            .await
            .unwrap();
        let pending = repo.pending_relationships("run-1").await.unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_relationship_self_reference_rejected_by_check() {
        let (_dir, repo) = repo();
        // 绕过领域构造器直接构造自引用,表级 CHECK 兜底
        let mut rel = PendingRelationship::new("run-1", "a", "b").unwrap();
        rel.parent_identifier = "same".to_string();
        rel.child_identifier = "same".to_string();
        let result = repo.insert_relationship(&rel).await;
        assert!(result.is_err());
    }
}
