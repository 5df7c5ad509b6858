// ==========================================
// 数字仓储批量导入导出系统 - 导入器 Trait
// ==========================================
// 职责: 定义导入编排主接口（不包含实现）
// ==========================================

use crate::domain::run::RunSummary;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// MetadataImporter Trait
// ==========================================
// 用途: 一次导入运行的入口
// 实现者: MetadataImporterImpl
#[async_trait]
pub trait MetadataImporter: Send + Sync {
    /// 执行一次完整导入运行
    ///
    /// # 流程
    /// 1. 建运行行 + 计数器清零
    /// 2. 总数估计（尽力而为）
    /// 3. 预建源侧集合
    /// 4. 分页枚举条目,逐条处理（单记录错误只记状态,不中止运行）
    /// 5. 屏障后对账待定关系
    /// 6. 收尾并返回运行汇总
    ///
    /// # 返回
    /// - Ok(RunSummary): 各终态计数 + 失败条目明细
    /// - Err: 运行级错误（源整体不可达/配置非法),剩余条目保持 Pending
    async fn run_import(&self) -> ImportResult<RunSummary>;
}
