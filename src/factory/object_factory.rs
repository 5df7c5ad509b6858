// ==========================================
// 数字仓储批量导入导出系统 - 对象工厂（幂等落库引擎）
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 3.1 查找-建-改流程
// 幂等键: (系统标识符字段, 标识符值);重复投递安全
// 红线: 主对象失败即单记录失败;附件/关联失败是次级失败,
// 主对象仍算落库成功（Complete (with failures)）
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::record::{CollectionRef, SourceFile};
use crate::domain::types::TargetKind;
use crate::factory::persistence_trait::{PersistenceGateway, RepoEntity};
use crate::importer::error::{ImportError, ImportResult};
use crate::source::bagit_source::sha256_hex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

// ==========================================
// FactoryOutcome - 单次落库结果
// ==========================================
#[derive(Debug)]
pub struct FactoryOutcome {
    pub entity: RepoEntity,
    pub created: bool,
    /// 次级失败（附件/关联）,主对象已落库
    pub secondary_errors: Vec<ImportError>,
    /// 父对象尚不存在,需登记待定关系的父标识符
    pub deferred_parent: Option<String>,
}

// ==========================================
// ObjectFactory
// ==========================================
pub struct ObjectFactory {
    gateway: Arc<dyn PersistenceGateway>,
    identifier_field: String,
    single_valued: HashSet<String>,
    /// 新建实体时盖章的操作账户（更新不改既有归属）
    depositor: Option<String>,
}

impl ObjectFactory {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        identifier_field: impl Into<String>,
        single_valued_fields: Vec<String>,
    ) -> Self {
        let identifier_field = identifier_field.into();
        let mut single_valued: HashSet<String> = single_valued_fields.into_iter().collect();
        // 标识符字段恒按替换合并,避免重复运行反复追加
        single_valued.insert(identifier_field.clone());
        Self {
            gateway,
            identifier_field,
            single_valued,
            depositor: None,
        }
    }

    pub fn with_depositor(mut self, depositor: impl Into<String>) -> Self {
        self.depositor = Some(depositor.into());
        self
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub fn identifier_field(&self) -> &str {
        &self.identifier_field
    }

    /// 幂等落库: 查找 → 建/改 → 关联 → 附件
    ///
    /// # 参数
    /// - kind: 目标实体类型
    /// - attrs: 规范化属性集（必须携带标识符字段）
    /// - files_dir: 相对附件路径的根目录
    /// - files: 待附加文件（含 manifest 校验和）
    /// - collection: 集合归属引用
    pub async fn run(
        &self,
        kind: TargetKind,
        attrs: &NormalizedAttributes,
        files_dir: Option<&Path>,
        files: &[SourceFile],
        collection: Option<&CollectionRef>,
    ) -> ImportResult<FactoryOutcome> {
        let identifier = attrs
            .first(&self.identifier_field)
            .ok_or_else(|| ImportError::PersistenceValidation {
                identifier: String::new(),
                message: format!("属性集缺少标识符字段 {}", self.identifier_field),
            })?
            .to_string();

        // 1. 按标识符精确查找
        let existing = self
            .gateway
            .find_by_identifier(&self.identifier_field, &identifier)
            .await?;

        // 2/3. 建或改
        let (entity, created) = match existing {
            Some(entity) => {
                if entity.kind != kind {
                    return Err(ImportError::IdentifierConflict {
                        identifier,
                        expected: kind.to_string(),
                        actual: entity.kind.to_string(),
                    });
                }
                let merged = self.merge_attributes(&entity.attributes, attrs);
                debug!(identifier = %identifier, entity_id = %entity.id, "更新既有实体");
                (self.gateway.update(&entity, &merged).await?, false)
            }
            None => {
                debug!(identifier = %identifier, "新建实体");
                match &self.depositor {
                    Some(depositor) if !attrs.contains("depositor") => {
                        let mut stamped = attrs.clone();
                        stamped.append("depositor", vec![depositor.clone()]);
                        (self.gateway.create(kind, &stamped).await?, true)
                    }
                    _ => (self.gateway.create(kind, attrs).await?, true),
                }
            }
        };

        let mut secondary_errors = Vec::new();
        let mut deferred_parent = None;

        // 4. 集合归属: 父不存在转待定关系,不在此失败
        if let Some(collection_ref) = collection {
            let parent_identifier = collection_ref.identifier();
            if parent_identifier == identifier {
                secondary_errors.push(ImportError::Internal(format!(
                    "集合归属自引用: {}",
                    identifier
                )));
            } else {
                match self
                    .gateway
                    .find_by_identifier(&self.identifier_field, parent_identifier)
                    .await?
                {
                    Some(parent) => {
                        if let Err(e) = self.gateway.link(&parent.id, &entity.id).await {
                            warn!(parent = %parent_identifier, error = %e, "集合关联失败");
                            secondary_errors.push(e);
                        }
                    }
                    None => {
                        deferred_parent = Some(parent_identifier.to_string());
                    }
                }
            }
        }

        // 5. 实体已持久化,逐个附加文件
        for file in files {
            if let Err(e) = self.attach_one(&entity, files_dir, file).await {
                warn!(file = %file.path.display(), error = %e, "附件落库失败");
                secondary_errors.push(e);
            }
        }

        Ok(FactoryOutcome {
            entity,
            created,
            secondary_errors,
            deferred_parent,
        })
    }

    async fn attach_one(
        &self,
        entity: &RepoEntity,
        files_dir: Option<&Path>,
        file: &SourceFile,
    ) -> ImportResult<()> {
        let path = if file.path.is_absolute() {
            file.path.clone()
        } else {
            match files_dir {
                Some(dir) => dir.join(&file.path),
                None => file.path.clone(),
            }
        };

        let bytes = std::fs::read(&path)
            .map_err(|e| ImportError::FileReadError(format!("{}: {}", path.display(), e)))?;

        // manifest 声明了校验和时先核验再附加
        if let Some(expected) = &file.checksum {
            let actual = sha256_hex(&bytes);
            if &actual != expected {
                return Err(ImportError::ChecksumMismatch {
                    path: path.display().to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.gateway.attach_file(entity, &bytes, &filename).await
    }

    /// 属性合并: 追加,单值字段整体替换
    fn merge_attributes(
        &self,
        existing: &NormalizedAttributes,
        new: &NormalizedAttributes,
    ) -> NormalizedAttributes {
        let mut merged = existing.clone();
        for (field, values) in new.iter() {
            if self.single_valued.contains(field) {
                merged.replace(field, values.clone());
            } else {
                merged.append(field, values.clone());
            }
        }
        merged
    }
}
