// ==========================================
// 数字仓储批量导入导出系统 - 领域类型定义
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 0.2 运行与状态体系
// 依据: Field_Mapping_Rules_v0.4.md - 映射变体配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 源格式 (Source Format)
// ==========================================
// 红线: 封闭枚举,解析器/映射/工厂按格式静态绑定,不做运行时字符串反射
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceFormat {
    Oai,   // OAI-PMH 收割源
    Csv,   // CSV 文件源
    Bagit, // BagIt 包源
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Oai => write!(f, "OAI"),
            SourceFormat::Csv => write!(f, "CSV"),
            SourceFormat::Bagit => write!(f, "BAGIT"),
        }
    }
}

impl SourceFormat {
    /// 从配置字符串解析（大小写不敏感）
    pub fn parse(value: &str) -> Option<SourceFormat> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OAI" | "OAI-PMH" => Some(SourceFormat::Oai),
            "CSV" => Some(SourceFormat::Csv),
            "BAGIT" => Some(SourceFormat::Bagit),
            _ => None,
        }
    }
}

// ==========================================
// 目标实体类型 (Target Kind)
// ==========================================
// 用途: Factory 落库时的目标对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Work,       // 作品
    Collection, // 集合
    FileSet,    // 文件集
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Work => write!(f, "WORK"),
            TargetKind::Collection => write!(f, "COLLECTION"),
            TargetKind::FileSet => write!(f, "FILE_SET"),
        }
    }
}

impl TargetKind {
    pub fn parse(value: &str) -> Option<TargetKind> {
        match value.trim().to_ascii_uppercase().as_str() {
            "WORK" => Some(TargetKind::Work),
            "COLLECTION" => Some(TargetKind::Collection),
            "FILE_SET" | "FILESET" => Some(TargetKind::FileSet),
            _ => None,
        }
    }
}

// ==========================================
// 条目状态码 (Status Code)
// ==========================================
// 状态机: Pending -> {Complete, Complete (with failures), Failed, Deleted}
// 红线: 状态历史只追加,不原地修改;最新一条决定当前展示状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Pending,              // 初始状态,尚未处理
    Complete,             // 主对象与全部附属步骤成功
    CompleteWithFailures, // 主对象落库成功,附属步骤(附件/关联)部分失败
    Failed,               // 主对象落库失败
    Deleted,              // 被删除型记录显式移除
}

impl StatusCode {
    /// 数据库/展示用文本（与历史数据格式一致,不可更改）
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Pending => "Pending",
            StatusCode::Complete => "Complete",
            StatusCode::CompleteWithFailures => "Complete (with failures)",
            StatusCode::Failed => "Failed",
            StatusCode::Deleted => "Deleted",
        }
    }

    pub fn parse(value: &str) -> Option<StatusCode> {
        match value {
            "Pending" => Some(StatusCode::Pending),
            "Complete" => Some(StatusCode::Complete),
            "Complete (with failures)" => Some(StatusCode::CompleteWithFailures),
            "Failed" => Some(StatusCode::Failed),
            "Deleted" => Some(StatusCode::Deleted),
            _ => None,
        }
    }

    /// 是否终态（终态转换对应运行计数器恰好 +1）
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StatusCode::Pending)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 运行类型 (Run Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunKind {
    Import, // 导入运行
    Export, // 导出运行
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Import => write!(f, "IMPORT"),
            RunKind::Export => write!(f, "EXPORT"),
        }
    }
}

impl RunKind {
    pub fn parse(value: &str) -> Option<RunKind> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IMPORT" => Some(RunKind::Import),
            "EXPORT" => Some(RunKind::Export),
            _ => None,
        }
    }
}

// ==========================================
// 运行计数器 (Run Counter)
// ==========================================
// 红线: 计数器递增必须是单条原子读-改-写,多工作者并发不丢更新
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCounter {
    Enqueued,  // 已入队记录数
    Processed, // 已处理成功记录数
    Failed,    // 失败记录数
    Deleted,   // 已删除记录数
}

impl RunCounter {
    /// importer_run 表对应列名
    pub fn column(&self) -> &'static str {
        match self {
            RunCounter::Enqueued => "enqueued_records",
            RunCounter::Processed => "processed_records",
            RunCounter::Failed => "failed_records",
            RunCounter::Deleted => "deleted_records",
        }
    }
}

// ==========================================
// 未识别 MIME 类型回退行为 (Mime Fallback)
// ==========================================
// 两种源格式变体的历史行为并存,按映射变体显式选择,不合并
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MimeFallback {
    Null,      // 变体 A: 未识别类型解析为空,该值被丢弃
    TitleCase, // 变体 B: 未识别类型按词首大写原样回传
}

// ==========================================
// 默认切分分隔符集 (Split Delimiters)
// ==========================================
// 变体差异: 竖线是否参与默认切分,按映射变体显式选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitDelimiters {
    ColonSemicolonPipe, // 冒号/分号/竖线(可带两侧空白)
    ColonSemicolon,     // 冒号/分号(可带两侧空白)
}

impl SplitDelimiters {
    /// 默认切分正则
    pub fn pattern(&self) -> &'static str {
        match self {
            SplitDelimiters::ColonSemicolonPipe => r"\s*[:;|]\s*",
            SplitDelimiters::ColonSemicolon => r"\s*[:;]\s*",
        }
    }
}
