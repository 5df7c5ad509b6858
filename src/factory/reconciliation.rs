// ==========================================
// 数字仓储批量导入导出系统 - 待定关系对账
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 3.3 对账批次
// 触发: 运行内全部条目各处理一遍之后（屏障语义）
// 红线: 对账可安全重试;已解析关系重试为空操作;
// 仍未解析的关系终止为失败,不再重试
// ==========================================

use crate::domain::run::PendingRelationship;
use crate::factory::persistence_trait::PersistenceGateway;
use crate::importer::error::ImportResult;
use tracing::{debug, info, warn};

// ==========================================
// ReconciliationOutcome - 对账结果
// ==========================================
#[derive(Debug, Default)]
pub struct ReconciliationOutcome {
    /// 本次成功补链的关系 ID
    pub resolved: Vec<String>,
    /// 父对象仍缺失（或补链失败）的关系
    pub failed: Vec<PendingRelationship>,
}

// ==========================================
// ReconciliationPass
// ==========================================
pub struct ReconciliationPass<'a> {
    gateway: &'a dyn PersistenceGateway,
    identifier_field: &'a str,
}

impl<'a> ReconciliationPass<'a> {
    pub fn new(gateway: &'a dyn PersistenceGateway, identifier_field: &'a str) -> Self {
        Self {
            gateway,
            identifier_field,
        }
    }

    /// 重试全部待定关系;状态落库由调用方按结果执行
    pub async fn resolve(
        &self,
        pending: Vec<PendingRelationship>,
    ) -> ImportResult<ReconciliationOutcome> {
        let mut outcome = ReconciliationOutcome::default();
        info!(count = pending.len(), "开始待定关系对账");

        for rel in pending {
            let parent = self
                .gateway
                .find_by_identifier(self.identifier_field, &rel.parent_identifier)
                .await?;
            let child = self
                .gateway
                .find_by_identifier(self.identifier_field, &rel.child_identifier)
                .await?;

            match (parent, child) {
                (Some(parent), Some(child)) => {
                    match self.gateway.link(&parent.id, &child.id).await {
                        Ok(()) => {
                            debug!(
                                parent = %rel.parent_identifier,
                                child = %rel.child_identifier,
                                "待定关系补链成功"
                            );
                            outcome.resolved.push(rel.relationship_id.clone());
                        }
                        Err(e) => {
                            warn!(
                                parent = %rel.parent_identifier,
                                child = %rel.child_identifier,
                                error = %e,
                                "待定关系补链失败"
                            );
                            outcome.failed.push(rel);
                        }
                    }
                }
                _ => {
                    warn!(
                        parent = %rel.parent_identifier,
                        child = %rel.child_identifier,
                        "对账时父或子对象仍缺失"
                    );
                    outcome.failed.push(rel);
                }
            }
        }

        info!(
            resolved = outcome.resolved.len(),
            failed = outcome.failed.len(),
            "待定关系对账完成"
        );
        Ok(outcome)
    }
}
