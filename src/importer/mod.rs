// ==========================================
// 数字仓储批量导入导出系统 - 导入编排层
// ==========================================
// 职责: 整合解析/映射/落库,驱动一次导入运行
// 流程: 枚举 → 抓取 → 映射 → 落库 → 状态/计数 → 对账
// ==========================================

// 模块声明
pub mod error;
pub mod importer_impl;
pub mod importer_trait;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use importer_impl::{batch_run_imports, MetadataImporterImpl};
pub use importer_trait::MetadataImporter;
