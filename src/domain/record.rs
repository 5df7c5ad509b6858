// ==========================================
// 数字仓储批量导入导出系统 - 原始记录与条目
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 1.2 条目生命周期
// 红线: 原始记录抓取后不可变;条目阶段显式迁移,禁止隐式缓存
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::types::TargetKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==========================================
// RawField - 原始字段对
// ==========================================
// 保序: 源记录内字段出现顺序即向量顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    pub value: String,
}

impl RawField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ==========================================
// SourceFile - 源附件引用
// ==========================================
// 用途: BagIt 包内数据文件（manifest 提供校验和）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,            // 文件绝对路径
    pub checksum: Option<String>, // manifest 声明的 SHA-256（十六进制小写）
}

// ==========================================
// RawRecord - 原始源记录
// ==========================================
// 红线: 抓取完成后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source_identifier: String, // 源侧标识符
    pub fields: Vec<RawField>,     // 有序字段对
    pub payload: String,           // 原始载荷（审计用,OAI 为 XML 片段,CSV 为行文本）
    pub deleted: bool,             // 源侧删除标记（OAI header status="deleted"）
    #[serde(default)]
    pub files: Vec<SourceFile>,    // 随记录附带的数据文件（BagIt）
}

impl RawRecord {
    pub fn new(source_identifier: impl Into<String>) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            fields: Vec::new(),
            payload: String::new(),
            deleted: false,
            files: Vec::new(),
        }
    }

    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(RawField::new(name, value));
    }
}

// ==========================================
// CollectionRef - 集合归属引用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionRef {
    /// 固定目标集合标识符
    Id(String),
    /// "归入名为 X 的集合": 按标识符查找,未命中则转为待定关系延迟解析
    SetName(String),
}

impl CollectionRef {
    /// 待定关系/查找用的父标识符
    pub fn identifier(&self) -> &str {
        match self {
            CollectionRef::Id(id) => id,
            CollectionRef::SetName(name) => name,
        }
    }
}

// ==========================================
// EntryStage - 条目阶段状态机
// ==========================================
// Unfetched -> Fetched -> Mapped,只进不退;乱序迁移是错误而非静默缓存命中
#[derive(Debug, Clone)]
pub enum EntryStage {
    Unfetched,
    Fetched(RawRecord),
    Mapped {
        raw: RawRecord,
        attrs: NormalizedAttributes,
    },
}

impl EntryStage {
    pub fn name(&self) -> &'static str {
        match self {
            EntryStage::Unfetched => "UNFETCHED",
            EntryStage::Fetched(_) => "FETCHED",
            EntryStage::Mapped { .. } => "MAPPED",
        }
    }
}

// ==========================================
// Entry - 导入条目
// ==========================================
// 身份: (importer_id, source_identifier);每记录每运行各建一个,不跨运行复用
#[derive(Debug, Clone)]
pub struct Entry {
    pub importer_id: String,
    pub source_identifier: String,
    pub kind: TargetKind,
    pub collection: Option<CollectionRef>,
    stage: EntryStage,
}

impl Entry {
    /// 仅持标识符的条目（原始记录由 [`Entry::attach_raw`] 迁入）
    pub fn new(
        importer_id: impl Into<String>,
        source_identifier: impl Into<String>,
        kind: TargetKind,
    ) -> Self {
        Self {
            importer_id: importer_id.into(),
            source_identifier: source_identifier.into(),
            kind,
            collection: None,
            stage: EntryStage::Unfetched,
        }
    }

    /// 列表页已携带完整记录时直接进入 Fetched 阶段
    pub fn with_raw(importer_id: impl Into<String>, raw: RawRecord, kind: TargetKind) -> Self {
        Self {
            importer_id: importer_id.into(),
            source_identifier: raw.source_identifier.clone(),
            kind,
            collection: None,
            stage: EntryStage::Fetched(raw),
        }
    }

    pub fn with_collection(mut self, collection: CollectionRef) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn stage(&self) -> &EntryStage {
        &self.stage
    }

    pub fn stage_name(&self) -> &'static str {
        self.stage.name()
    }

    /// Unfetched -> Fetched
    ///
    /// # 返回
    /// - Err: 已越过 Unfetched 阶段（重复抓取视为调用方错误）
    pub fn attach_raw(&mut self, raw: RawRecord) -> Result<(), String> {
        match self.stage {
            EntryStage::Unfetched => {
                self.stage = EntryStage::Fetched(raw);
                Ok(())
            }
            _ => Err(format!(
                "条目 {} 处于 {} 阶段,不能重复装入原始记录",
                self.source_identifier,
                self.stage.name()
            )),
        }
    }

    /// Fetched -> Mapped
    pub fn attach_attrs(&mut self, attrs: NormalizedAttributes) -> Result<(), String> {
        let stage = std::mem::replace(&mut self.stage, EntryStage::Unfetched);
        match stage {
            EntryStage::Fetched(raw) => {
                self.stage = EntryStage::Mapped { raw, attrs };
                Ok(())
            }
            other => {
                let name = other.name();
                self.stage = other;
                Err(format!(
                    "条目 {} 处于 {} 阶段,不能装入规范化属性",
                    self.source_identifier, name
                ))
            }
        }
    }

    pub fn raw(&self) -> Option<&RawRecord> {
        match &self.stage {
            EntryStage::Unfetched => None,
            EntryStage::Fetched(raw) => Some(raw),
            EntryStage::Mapped { raw, .. } => Some(raw),
        }
    }

    /// 规范化属性（仅 Mapped 阶段可得）
    pub fn all_attrs(&self) -> Option<&NormalizedAttributes> {
        match &self.stage {
            EntryStage::Mapped { attrs, .. } => Some(attrs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawRecord {
        let mut raw = RawRecord::new("rec-1");
        raw.push_field("title", "样例记录");
        raw
    }

    #[test]
    fn test_entry_stage_progression() {
        let mut entry = Entry::new("imp-1", "rec-1", TargetKind::Work);
        assert_eq!(entry.stage_name(), "UNFETCHED");
        assert!(entry.raw().is_none());
        assert!(entry.all_attrs().is_none());

        entry.attach_raw(sample_raw()).unwrap();
        assert_eq!(entry.stage_name(), "FETCHED");
        assert!(entry.raw().is_some());
        assert!(entry.all_attrs().is_none());

        entry.attach_attrs(NormalizedAttributes::new()).unwrap();
        assert_eq!(entry.stage_name(), "MAPPED");
        assert!(entry.raw().is_some());
        assert!(entry.all_attrs().is_some());
    }

    #[test]
    fn test_entry_double_fetch_rejected() {
        let mut entry = Entry::new("imp-1", "rec-1", TargetKind::Work);
        entry.attach_raw(sample_raw()).unwrap();
        assert!(entry.attach_raw(sample_raw()).is_err());
    }

    #[test]
    fn test_entry_map_before_fetch_rejected() {
        let mut entry = Entry::new("imp-1", "rec-1", TargetKind::Work);
        let err = entry.attach_attrs(NormalizedAttributes::new());
        assert!(err.is_err());
        // 失败后阶段不变
        assert_eq!(entry.stage_name(), "UNFETCHED");
    }

    #[test]
    fn test_entry_with_raw_starts_fetched() {
        let entry = Entry::with_raw("imp-1", sample_raw(), TargetKind::Work);
        assert_eq!(entry.stage_name(), "FETCHED");
        assert_eq!(entry.source_identifier, "rec-1");
    }

    #[test]
    fn test_collection_ref_identifier() {
        assert_eq!(CollectionRef::Id("col-9".to_string()).identifier(), "col-9");
        assert_eq!(
            CollectionRef::SetName("历史照片".to_string()).identifier(),
            "历史照片"
        );
    }
}
