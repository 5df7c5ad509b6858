// ==========================================
// 数字仓储批量导入导出系统 - 配置管理器
// ==========================================
// 存储: config_kv 表（key/value 文本）
// 约定: 缺键取默认值;值格式非法报 ConfigValueError 而非静默回退
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::{MimeFallback, SplitDelimiters};
use crate::importer::error::{ImportError, ImportResult};
use crate::config::import_config_trait::ImportConfigReader;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// 配置键
const KEY_INSTITUTION_NAME: &str = "institution_name";
const KEY_RIGHTS_OVERRIDE: &str = "rights_override";
const KEY_RIGHTS_OVERRIDE_FORCED: &str = "rights_override_forced";
const KEY_THUMBNAIL_URL_TEMPLATE: &str = "thumbnail_url_template";
const KEY_MIME_FALLBACK: &str = "mime_fallback";
const KEY_SPLIT_DELIMITERS: &str = "split_delimiters";
const KEY_IDENTIFIER_FIELD: &str = "identifier_field";
const KEY_SINGLE_VALUED_FIELDS: &str = "single_valued_fields";
const KEY_SOURCE_TIMEOUT_SECS: &str = "source_timeout_secs";
const KEY_DEPOSITOR: &str = "depositor";

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建配置管理器（config_kv 表由簿记仓储建表）
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ImportError::DatabaseConnectionError(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn get_string(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::Internal(format!("连接锁中毒: {}", e)))?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }

    /// 写配置（测试/CLI 初始化用）
    pub fn set(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::Internal(format!("连接锁中毒: {}", e)))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn get_bool(&self, key: &str, default: bool) -> ImportResult<bool> {
        match self.get_string(key)? {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ImportError::ConfigValueError {
                    key: key.to_string(),
                    value,
                    message: "期望布尔值".to_string(),
                }),
            },
        }
    }

    fn get_u64(&self, key: &str, default: u64) -> ImportResult<u64> {
        match self.get_string(key)? {
            None => Ok(default),
            Some(value) => value.parse::<u64>().map_err(|_| ImportError::ConfigValueError {
                key: key.to_string(),
                value,
                message: "期望非负整数".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_institution_name(&self) -> ImportResult<Option<String>> {
        self.get_string(KEY_INSTITUTION_NAME)
    }

    async fn get_rights_override(&self) -> ImportResult<Option<String>> {
        self.get_string(KEY_RIGHTS_OVERRIDE)
    }

    async fn get_rights_override_forced(&self) -> ImportResult<bool> {
        self.get_bool(KEY_RIGHTS_OVERRIDE_FORCED, false)
    }

    async fn get_thumbnail_url_template(&self) -> ImportResult<Option<String>> {
        self.get_string(KEY_THUMBNAIL_URL_TEMPLATE)
    }

    async fn get_mime_fallback(&self) -> ImportResult<MimeFallback> {
        match self.get_string(KEY_MIME_FALLBACK)? {
            None => Ok(MimeFallback::Null),
            Some(value) => match value.to_ascii_uppercase().as_str() {
                "NULL" => Ok(MimeFallback::Null),
                "TITLE_CASE" => Ok(MimeFallback::TitleCase),
                _ => Err(ImportError::ConfigValueError {
                    key: KEY_MIME_FALLBACK.to_string(),
                    value,
                    message: "期望 NULL 或 TITLE_CASE".to_string(),
                }),
            },
        }
    }

    async fn get_split_delimiters(&self) -> ImportResult<SplitDelimiters> {
        match self.get_string(KEY_SPLIT_DELIMITERS)? {
            None => Ok(SplitDelimiters::ColonSemicolonPipe),
            Some(value) => match value.to_ascii_uppercase().as_str() {
                "COLON_SEMICOLON_PIPE" => Ok(SplitDelimiters::ColonSemicolonPipe),
                "COLON_SEMICOLON" => Ok(SplitDelimiters::ColonSemicolon),
                _ => Err(ImportError::ConfigValueError {
                    key: KEY_SPLIT_DELIMITERS.to_string(),
                    value,
                    message: "期望 COLON_SEMICOLON_PIPE 或 COLON_SEMICOLON".to_string(),
                }),
            },
        }
    }

    async fn get_identifier_field(&self) -> ImportResult<String> {
        Ok(self
            .get_string(KEY_IDENTIFIER_FIELD)?
            .unwrap_or_else(|| "source_identifier".to_string()))
    }

    async fn get_single_valued_fields(&self) -> ImportResult<Vec<String>> {
        match self.get_string(KEY_SINGLE_VALUED_FIELDS)? {
            None => Ok(vec!["title".to_string()]),
            Some(value) => Ok(value
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect()),
        }
    }

    async fn get_depositor(&self) -> ImportResult<Option<String>> {
        self.get_string(KEY_DEPOSITOR)
    }

    async fn get_source_timeout_secs(&self) -> ImportResult<u64> {
        self.get_u64(KEY_SOURCE_TIMEOUT_SECS, 30)
    }
}
