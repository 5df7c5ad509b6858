// ==========================================
// 数字仓储批量导入导出系统 - 持久层网关 Trait
// ==========================================
// 职责: 定义目标仓储平台的窄接口（不包含实现）
// 红线: 网关不含导入业务规则;标识符字段必须有精确匹配索引查询;
// 校验失败以 PersistenceValidation 返回,消息原样进入状态行
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::types::TargetKind;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// RepoEntity - 目标仓储实体句柄
// ==========================================
// 工厂不拥有也不跨调用缓存实体;所有权在持久层
#[derive(Debug, Clone)]
pub struct RepoEntity {
    pub id: String,
    pub kind: TargetKind,
    pub attributes: NormalizedAttributes,
}

// ==========================================
// PersistenceGateway Trait
// ==========================================
// 实现者: 仓储平台适配层;本 crate 自带 InMemoryGateway 供测试/试运行
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// 按配置的标识符字段精确匹配查找实体
    async fn find_by_identifier(
        &self,
        field: &str,
        value: &str,
    ) -> ImportResult<Option<RepoEntity>>;

    /// 新建实体并持久化
    async fn create(
        &self,
        kind: TargetKind,
        attrs: &NormalizedAttributes,
    ) -> ImportResult<RepoEntity>;

    /// 以给定属性集整体更新实体（合并策略由调用方决定）
    async fn update(
        &self,
        entity: &RepoEntity,
        attrs: &NormalizedAttributes,
    ) -> ImportResult<RepoEntity>;

    /// 实体持久化后附加二进制文件
    async fn attach_file(
        &self,
        entity: &RepoEntity,
        bytes: &[u8],
        filename: &str,
    ) -> ImportResult<()>;

    /// 删除实体（删除型记录）
    async fn delete(&self, entity: &RepoEntity) -> ImportResult<()>;

    /// 建立父子关联（集合-作品/作品-作品）
    async fn link(&self, parent_id: &str, child_id: &str) -> ImportResult<()>;
}
