// ==========================================
// 数字仓储批量导入导出系统 - 运行簿记 Repository Trait
// ==========================================
// 职责: 定义运行/条目/状态/待定关系的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则,只做数据 CRUD;
// 计数器递增必须是数据库内的单条原子读-改-写
// ==========================================

use crate::domain::run::{
    EntryStatus, ImporterRun, PendingRelationship, RelationshipState, RunSummary,
};
use crate::domain::types::{RunCounter, TargetKind};
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// EntryRow - 条目持久化行
// ==========================================
// 键: (importer_id, source_identifier, kind);存最近原始载荷与
// 规范化属性 JSON 供审计/重放
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub entry_id: i64,
    pub importer_id: String,
    pub source_identifier: String,
    pub kind: TargetKind,
    pub raw_json: Option<String>,
    pub attrs_json: Option<String>,
}

// ==========================================
// RunRepository Trait
// ==========================================
// 实现者: SqliteRunRepository（rusqlite）
#[async_trait]
pub trait RunRepository: Send + Sync {
    // ===== 运行管理 =====

    /// 新建运行行（计数器全零）
    async fn create_run(&self, run: &ImporterRun) -> ImportResult<()>;

    /// 运行起始显式清零计数器（运行内计数器只增不减的唯一例外）
    async fn reset_counters(&self, run_id: &str) -> ImportResult<()>;

    /// 写入总数估计
    async fn set_total(&self, run_id: &str, total: i64) -> ImportResult<()>;

    /// 计数器 +1（单条 UPDATE ... SET c = c + 1,并发工作者不丢更新）
    async fn increment(&self, run_id: &str, counter: RunCounter) -> ImportResult<()>;

    async fn get_run(&self, run_id: &str) -> ImportResult<Option<ImporterRun>>;

    /// 外部取消运行
    async fn cancel_run(&self, run_id: &str) -> ImportResult<()>;

    /// 工作者在开始处理每条记录前检查（尽力而为语义）
    async fn is_cancelled(&self, run_id: &str) -> ImportResult<bool>;

    async fn finish_run(&self, run_id: &str) -> ImportResult<()>;

    /// 运行汇总: 计数器 + 失败条目明细
    async fn run_summary(&self, run_id: &str) -> ImportResult<RunSummary>;

    // ===== 条目管理 =====

    /// 建/改条目行（raw/attrs 传 None 时保留既有值）
    ///
    /// # 返回
    /// - Ok(i64): entry 表主键
    async fn upsert_entry(
        &self,
        importer_id: &str,
        source_identifier: &str,
        kind: TargetKind,
        raw_json: Option<&str>,
        attrs_json: Option<&str>,
    ) -> ImportResult<i64>;

    async fn get_entry(
        &self,
        importer_id: &str,
        source_identifier: &str,
        kind: TargetKind,
    ) -> ImportResult<Option<EntryRow>>;

    /// 指定 importer 的全部条目（导出/审计用）
    async fn list_entries(&self, importer_id: &str) -> ImportResult<Vec<EntryRow>>;

    // ===== 状态历史 =====

    /// 追加状态行（只追加,不改写历史）
    async fn append_status(&self, status: &EntryStatus) -> ImportResult<()>;

    /// 条目最新状态行
    async fn latest_status(&self, entry_id: i64) -> ImportResult<Option<EntryStatus>>;

    // ===== 待定关系 =====

    async fn insert_relationship(&self, rel: &PendingRelationship) -> ImportResult<()>;

    /// 指定运行仍处 PENDING 的关系
    async fn pending_relationships(
        &self,
        run_id: &str,
    ) -> ImportResult<Vec<PendingRelationship>>;

    async fn mark_relationship(
        &self,
        relationship_id: &str,
        state: RelationshipState,
    ) -> ImportResult<()>;
}
