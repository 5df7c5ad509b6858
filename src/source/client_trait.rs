// ==========================================
// 数字仓储批量导入导出系统 - 源客户端 Trait
// ==========================================
// 职责: 定义记录源访问接口（不包含实现）
// 红线: 分页续传用不透明令牌;抓取超时是单记录可重试错误,不是运行级错误
// ==========================================

use crate::domain::record::RawRecord;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// RawRecordPage - 一页原始记录
// ==========================================
#[derive(Debug, Clone)]
pub struct RawRecordPage {
    pub records: Vec<RawRecord>,
    /// 续传令牌（None 表示最后一页）
    pub next_token: Option<String>,
    /// 源侧声明的完整列表大小（尽力而为）
    pub complete_list_size: Option<u64>,
}

impl RawRecordPage {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            next_token: None,
            complete_list_size: None,
        }
    }
}

// ==========================================
// SourceSet - 源侧集合/子集
// ==========================================
// OAI-PMH 的 set;预建集合模式下逐个落为集合实体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    pub spec: String,
    pub name: String,
}

// ==========================================
// SourceClient Trait
// ==========================================
// 实现者: OaiClient / CsvSourceClient / BagitSourceClient
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// 列出一页记录
    ///
    /// # 参数
    /// - resumption: 上一页返回的续传令牌,首页传 None
    async fn list(&self, resumption: Option<String>) -> ImportResult<RawRecordPage>;

    /// 按标识符抓取单条记录
    async fn get(&self, identifier: &str) -> ImportResult<RawRecord>;

    /// 列出源侧集合（无集合概念的源返回空表）
    async fn list_sets(&self) -> ImportResult<Vec<SourceSet>>;
}
