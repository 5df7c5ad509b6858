// ==========================================
// 数字仓储批量导入导出系统 - 内存持久层网关
// ==========================================
// 用途: 测试与 CLI 试运行的参考实现;真实平台适配层在外部注入
// 行为对齐: 标识符精确匹配 / 必填字段校验失败返回 PersistenceValidation
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::types::TargetKind;
use crate::factory::persistence_trait::{PersistenceGateway, RepoEntity};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Store {
    entities: HashMap<String, RepoEntity>,
    files: HashMap<String, Vec<String>>,
    links: HashSet<(String, String)>,
    next_id: u64,
}

// ==========================================
// InMemoryGateway
// ==========================================
pub struct InMemoryGateway {
    store: Mutex<Store>,
    /// create/update 时要求非空的字段（模拟平台校验）
    required_fields: Vec<String>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
            required_fields: Vec::new(),
        }
    }

    pub fn with_required_fields(fields: Vec<String>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            required_fields: fields,
        }
    }

    fn lock(&self) -> ImportResult<std::sync::MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|e| ImportError::Internal(format!("存储锁中毒: {}", e)))
    }

    fn validate(&self, identifier: &str, attrs: &NormalizedAttributes) -> ImportResult<()> {
        for field in &self.required_fields {
            if !attrs.contains(field) {
                return Err(ImportError::PersistenceValidation {
                    identifier: identifier.to_string(),
                    message: format!("{} 不能为空", field),
                });
            }
        }
        Ok(())
    }

    /// 实体总数（测试断言用）
    pub fn entity_count(&self) -> usize {
        self.store.lock().unwrap().entities.len()
    }

    pub fn entity(&self, id: &str) -> Option<RepoEntity> {
        self.store.lock().unwrap().entities.get(id).cloned()
    }

    /// 指定实体的附件文件名列表
    pub fn attached_files(&self, id: &str) -> Vec<String> {
        self.store
            .lock()
            .unwrap()
            .files
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_linked(&self, parent_id: &str, child_id: &str) -> bool {
        self.store
            .lock()
            .unwrap()
            .links
            .contains(&(parent_id.to_string(), child_id.to_string()))
    }

    pub fn link_count(&self) -> usize {
        self.store.lock().unwrap().links.len()
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn find_by_identifier(
        &self,
        field: &str,
        value: &str,
    ) -> ImportResult<Option<RepoEntity>> {
        let store = self.lock()?;
        Ok(store
            .entities
            .values()
            .find(|e| {
                e.attributes
                    .get(field)
                    .map(|vals| vals.iter().any(|v| v == value))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn create(
        &self,
        kind: TargetKind,
        attrs: &NormalizedAttributes,
    ) -> ImportResult<RepoEntity> {
        self.validate("", attrs)?;
        let mut store = self.lock()?;
        store.next_id += 1;
        let entity = RepoEntity {
            id: format!("obj-{}", store.next_id),
            kind,
            attributes: attrs.clone(),
        };
        store.entities.insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    async fn update(
        &self,
        entity: &RepoEntity,
        attrs: &NormalizedAttributes,
    ) -> ImportResult<RepoEntity> {
        self.validate(&entity.id, attrs)?;
        let mut store = self.lock()?;
        let stored = store.entities.get_mut(&entity.id).ok_or_else(|| {
            ImportError::PersistenceValidation {
                identifier: entity.id.clone(),
                message: "实体不存在,无法更新".to_string(),
            }
        })?;
        stored.attributes = attrs.clone();
        Ok(stored.clone())
    }

    async fn attach_file(
        &self,
        entity: &RepoEntity,
        _bytes: &[u8],
        filename: &str,
    ) -> ImportResult<()> {
        let mut store = self.lock()?;
        store
            .files
            .entry(entity.id.clone())
            .or_default()
            .push(filename.to_string());
        Ok(())
    }

    async fn delete(&self, entity: &RepoEntity) -> ImportResult<()> {
        let mut store = self.lock()?;
        store.entities.remove(&entity.id);
        store.files.remove(&entity.id);
        store
            .links
            .retain(|(p, c)| p != &entity.id && c != &entity.id);
        Ok(())
    }

    async fn link(&self, parent_id: &str, child_id: &str) -> ImportResult<()> {
        let mut store = self.lock()?;
        store
            .links
            .insert((parent_id.to_string(), child_id.to_string()));
        Ok(())
    }
}
