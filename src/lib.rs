// ==========================================
// 数字仓储批量导入导出系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 元数据批量采收/映射/落库管道,
// 仓储平台本体（存储/检索/授权/界面）为外部协作方
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 规则引擎层 - 字段规则/匹配器/值解析
pub mod mapping;

// 源客户端层 - OAI-PMH / CSV / BagIt
pub mod source;

// 解析层 - 按格式枚举记录构造条目
pub mod parser;

// 落库引擎层 - 幂等建/改与对账
pub mod factory;

// 数据仓储层 - 运行簿记
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 导入编排层
pub mod importer;

// 导出编排层
pub mod exporter;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    MimeFallback, RunCounter, RunKind, SourceFormat, SplitDelimiters, StatusCode, TargetKind,
};

// 领域实体
pub use domain::{
    CollectionRef, Entry, EntryStatus, ImporterRun, NormalizedAttributes, PendingRelationship,
    RawRecord, RunSummary,
};

// 规则引擎
pub use mapping::{FieldRule, Mapping, MappingConfig, Matcher, ParseRegistry};

// 解析与装配
pub use parser::{resolve_format, FormatBundle, ParserSettings, RecordParser};

// 落库引擎
pub use factory::{InMemoryGateway, ObjectFactory, PersistenceGateway, RepoEntity};

// 仓储
pub use repository::{RunRepository, SqliteRunRepository};

// 配置
pub use config::{ConfigManager, ImportConfigReader};

// 编排
pub use exporter::CsvExporter;
pub use importer::{ImportError, ImportResult, MetadataImporter, MetadataImporterImpl};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "数字仓储批量导入导出系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
