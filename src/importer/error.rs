// ==========================================
// 数字仓储批量导入导出系统 - 导入模块错误类型
// ==========================================
// 传播红线: 单记录错误在条目/工厂边界捕获并转为终态状态行,
// 绝不向上中止整个运行;运行级错误中止运行,剩余条目保持 Pending
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 源抓取错误（单记录可重试）=====
    #[error("源记录抓取失败: {message}")]
    SourceFetch { message: String, retryable: bool },

    // ===== 规则应用错误 =====
    #[error("字段规则应用失败 (字段 {field}): {message}")]
    Mapping { field: String, message: String },

    #[error("规则模式编译失败 (目标字段 {to}): {message}")]
    RulePattern { to: String, message: String },

    // ===== 落库错误 =====
    #[error("标识符类型冲突 ({identifier}): 期望 {expected}, 实际 {actual}")]
    IdentifierConflict {
        identifier: String,
        expected: String,
        actual: String,
    },

    #[error("持久层校验失败 ({identifier}): {message}")]
    PersistenceValidation { identifier: String, message: String },

    #[error("关联目标未出现 (parent {parent}, child {child})")]
    AssociationUnresolved { parent: String, child: String },

    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("BagIt 包不合规 ({bag}): {message}")]
    BagitError { bag: String, message: String },

    #[error("校验和不匹配 ({path}): 期望 {expected}, 实际 {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 状态行 error_class 用的类别名
    pub fn class_name(&self) -> &'static str {
        match self {
            ImportError::SourceFetch { .. } => "SourceFetchError",
            ImportError::Mapping { .. } | ImportError::RulePattern { .. } => "MappingError",
            ImportError::IdentifierConflict { .. } => "IdentifierConflictError",
            ImportError::PersistenceValidation { .. } => "PersistenceValidationError",
            ImportError::AssociationUnresolved { .. } => "AssociationUnresolvedError",
            ImportError::FileNotFound(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::FileReadError(_)
            | ImportError::CsvParseError(_)
            | ImportError::BagitError { .. }
            | ImportError::ChecksumMismatch { .. } => "SourceFetchError",
            ImportError::DatabaseConnectionError(_)
            | ImportError::DatabaseTransactionError(_)
            | ImportError::DatabaseQueryError(_) => "DatabaseError",
            ImportError::ConfigReadError { .. } | ImportError::ConfigValueError { .. } => {
                "ConfigError"
            }
            ImportError::Internal(_) | ImportError::Other(_) => "InternalError",
        }
    }

    /// 是否可重试（仅源抓取超时/网络类）
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImportError::SourceFetch { retryable: true, .. })
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseQueryError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        ImportError::SourceFetch {
            message: err.to_string(),
            retryable: err.is_timeout() || err.is_connect(),
        }
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::Internal(format!("JSON 序列化失败: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_taxonomy() {
        let err = ImportError::SourceFetch {
            message: "超时".to_string(),
            retryable: true,
        };
        assert_eq!(err.class_name(), "SourceFetchError");
        assert!(err.is_retryable());

        let err = ImportError::Mapping {
            field: "subject".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(err.class_name(), "MappingError");
        assert!(!err.is_retryable());

        let err = ImportError::IdentifierConflict {
            identifier: "rec-1".to_string(),
            expected: "WORK".to_string(),
            actual: "COLLECTION".to_string(),
        };
        assert_eq!(err.class_name(), "IdentifierConflictError");
    }

    #[test]
    fn test_persistence_validation_message_preserved() {
        let err = ImportError::PersistenceValidation {
            identifier: "rec-1".to_string(),
            message: "title 不能为空".to_string(),
        };
        assert!(err.to_string().contains("title 不能为空"));
    }
}
