// ==========================================
// 数字仓储批量导入导出系统 - 数据仓储层
// ==========================================
// 职责: 运行/条目/状态/待定关系的持久化访问
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

pub mod run_repo;
pub mod run_repo_impl;

pub use run_repo::{EntryRow, RunRepository};
pub use run_repo_impl::SqliteRunRepository;
