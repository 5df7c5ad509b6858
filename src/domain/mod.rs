// ==========================================
// 数字仓储批量导入导出系统 - 领域层
// ==========================================
// 职责: 领域实体与类型定义,不含业务流程
// ==========================================

pub mod attributes;
pub mod record;
pub mod run;
pub mod types;

pub use attributes::{is_url_shaped, NormalizedAttributes};
pub use record::{CollectionRef, Entry, EntryStage, RawField, RawRecord, SourceFile};
pub use run::{
    EntryStatus, FailedEntry, ImporterRun, PendingRelationship, RelationshipState, RunSummary,
};
pub use types::{
    MimeFallback, RunCounter, RunKind, SourceFormat, SplitDelimiters, StatusCode, TargetKind,
};
