// ==========================================
// 数字仓储批量导入导出系统 - 运行与状态簿记模型
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 2.1 运行计数器 / 2.3 待定关系
// 对齐: schema v0.1 importer_run / entry_status / pending_relationship 表
// ==========================================

use crate::domain::types::{RunKind, StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// ImporterRun - 一次导入/导出运行
// ==========================================
// 红线: 计数器在运行内单调不减,仅运行起始允许显式清零
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterRun {
    pub run_id: String,          // 运行 ID（UUID）
    pub importer_id: String,     // 所属 Importer/Exporter
    pub kind: RunKind,           // IMPORT / EXPORT
    pub total_records: i64,      // 总记录数（尽力估计,失败为 0）
    pub enqueued_records: i64,   // 已入队
    pub processed_records: i64,  // 已处理成功（含 Complete (with failures)）
    pub failed_records: i64,     // 失败
    pub deleted_records: i64,    // 已删除
    pub cancelled: bool,         // 取消标志（外部置位,工作者尽力检查）
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImporterRun {
    pub fn new(importer_id: impl Into<String>, kind: RunKind) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            importer_id: importer_id.into(),
            kind,
            total_records: 0,
            enqueued_records: 0,
            processed_records: 0,
            failed_records: 0,
            deleted_records: 0,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

// ==========================================
// EntryStatus - 条目状态行
// ==========================================
// 红线: 只追加;每条目最新一行即当前状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryStatus {
    pub status_id: String,             // 状态行 ID（UUID）
    pub entry_id: i64,                 // entry 表主键
    pub run_id: String,                // 产生该状态的运行
    pub code: StatusCode,              // 状态码
    pub error_class: Option<String>,   // 错误类别（taxonomy 变体名）
    pub error_message: Option<String>, // 错误消息（持久层消息原样保留）
    pub backtrace: Option<String>,     // 调用栈快照（可选）
    pub created_at: DateTime<Utc>,
}

impl EntryStatus {
    pub fn new(entry_id: i64, run_id: impl Into<String>, code: StatusCode) -> Self {
        Self {
            status_id: Uuid::new_v4().to_string(),
            entry_id,
            run_id: run_id.into(),
            code,
            error_class: None,
            error_message: None,
            backtrace: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_error(
        mut self,
        class: impl Into<String>,
        message: impl Into<String>,
        backtrace: Option<String>,
    ) -> Self {
        self.error_class = Some(class.into());
        self.error_message = Some(message.into());
        self.backtrace = backtrace;
        self
    }
}

// ==========================================
// RelationshipState - 待定关系解析状态
// ==========================================
// PENDING 可重试;RESOLVED 重试为空操作;FAILED 终止不再重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipState {
    Pending,
    Resolved,
    Failed,
}

impl RelationshipState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipState::Pending => "PENDING",
            RelationshipState::Resolved => "RESOLVED",
            RelationshipState::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<RelationshipState> {
        match value {
            "PENDING" => Some(RelationshipState::Pending),
            "RESOLVED" => Some(RelationshipState::Resolved),
            "FAILED" => Some(RelationshipState::Failed),
            _ => None,
        }
    }
}

// ==========================================
// PendingRelationship - 待定父子关系
// ==========================================
// 子记录先于父到达时登记,运行末尾对账批次统一补链
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRelationship {
    pub relationship_id: String,   // 关系 ID（UUID）
    pub run_id: String,            // 登记该关系的运行
    pub parent_identifier: String, // 父（集合/作品）标识符
    pub child_identifier: String,  // 子标识符
    pub state: RelationshipState,
    pub created_at: DateTime<Utc>,
}

impl PendingRelationship {
    /// 登记待定关系
    ///
    /// # 返回
    /// - Err: 自引用（parent == child）在创建时即拒绝
    pub fn new(
        run_id: impl Into<String>,
        parent_identifier: impl Into<String>,
        child_identifier: impl Into<String>,
    ) -> Result<Self, String> {
        let parent = parent_identifier.into();
        let child = child_identifier.into();
        if parent == child {
            return Err(format!("待定关系自引用: parent 与 child 均为 {}", parent));
        }
        Ok(Self {
            relationship_id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            parent_identifier: parent,
            child_identifier: child,
            state: RelationshipState::Pending,
            created_at: Utc::now(),
        })
    }
}

// ==========================================
// RunSummary - 运行汇总
// ==========================================
// 对外摘要: 各终态计数 + 失败条目明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub kind: RunKind,
    pub total_records: i64,
    pub enqueued_records: i64,
    pub processed_records: i64,
    pub failed_records: i64,
    pub deleted_records: i64,
    pub failed_entries: Vec<FailedEntry>,
}

/// 失败条目明细（错误类别/消息随状态行捕获）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    pub source_identifier: String,
    pub error_class: Option<String>,
    pub error_message: Option<String>,
}
