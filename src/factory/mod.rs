// ==========================================
// 数字仓储批量导入导出系统 - 落库引擎层
// ==========================================
// 职责: 规范化属性 → 目标实体的幂等建/改 + 关联/附件 + 对账
// ==========================================

pub mod memory_gateway;
pub mod object_factory;
pub mod persistence_trait;
pub mod reconciliation;

pub use memory_gateway::InMemoryGateway;
pub use object_factory::{FactoryOutcome, ObjectFactory};
pub use persistence_trait::{PersistenceGateway, RepoEntity};
pub use reconciliation::{ReconciliationOutcome, ReconciliationPass};
