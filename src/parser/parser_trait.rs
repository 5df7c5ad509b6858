// ==========================================
// 数字仓储批量导入导出系统 - 记录解析器 Trait
// ==========================================
// 职责: 定义按源格式的记录枚举接口（不包含实现）
// 红线: 总数为尽力估计,估计失败回退 0,不得让估计失败中止运行
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::record::Entry;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// EntryPage - 一页条目
// ==========================================
#[derive(Debug)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    /// 续传令牌（None 表示最后一页）
    pub next_token: Option<String>,
}

// ==========================================
// RecordParser Trait
// ==========================================
// 实现者: OaiParser / CsvRecordParser / BagitRecordParser
#[async_trait]
pub trait RecordParser: Send + Sync {
    /// 总记录数尽力估计（失败回退 0）
    async fn total_estimate(&self) -> u64;

    /// 枚举一页条目
    ///
    /// # 参数
    /// - resumption: 上一页返回的续传令牌,首页传 None
    async fn next_page(&self, resumption: Option<String>) -> ImportResult<EntryPage>;

    /// 逐记录处理前需预建的集合（OAI set 预建;无集合概念的源返回空表）
    async fn collections_to_create(&self) -> ImportResult<Vec<NormalizedAttributes>>;
}
