// ==========================================
// 数字仓储批量导入导出系统 - 导入器实现
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 1.1 导入主流程
// 流程: 枚举 → 抓取 → 映射 → 落库 → 状态/计数 → 对账
// 红线: 单记录错误在此边界捕获并转为终态状态行,绝不中止运行;
// 每个终态转换对应计数器恰好 +1
// ==========================================

use crate::domain::record::Entry;
use crate::domain::run::{EntryStatus, ImporterRun, PendingRelationship, RelationshipState, RunSummary};
use crate::domain::types::{RunCounter, RunKind, StatusCode, TargetKind};
use crate::factory::object_factory::ObjectFactory;
use crate::factory::reconciliation::ReconciliationPass;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::MetadataImporter;
use crate::parser::registry::FormatBundle;
use crate::repository::run_repo::RunRepository;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

/// 单条目处理结果（非失败路径）
enum EntryOutcome {
    Complete,
    CompleteWithFailures(Vec<ImportError>),
    Deleted,
}

// ==========================================
// MetadataImporterImpl
// ==========================================
pub struct MetadataImporterImpl<R>
where
    R: RunRepository,
{
    importer_id: String,
    run_repo: R,
    bundle: FormatBundle,
    factory: ObjectFactory,
}

impl<R> MetadataImporterImpl<R>
where
    R: RunRepository,
{
    /// 创建导入器实例
    ///
    /// # 参数
    /// - importer_id: 导入器标识（条目身份的一半）
    /// - run_repo: 运行簿记仓储
    /// - bundle: 格式注册表装配的策略束（解析器 × 映射 × 客户端）
    /// - factory: 幂等落库引擎
    pub fn new(
        importer_id: impl Into<String>,
        run_repo: R,
        bundle: FormatBundle,
        factory: ObjectFactory,
    ) -> Self {
        Self {
            importer_id: importer_id.into(),
            run_repo,
            bundle,
            factory,
        }
    }

    pub fn importer_id(&self) -> &str {
        &self.importer_id
    }

    /// 处理单条目: 抓取 → 映射 → 落库,错误一律收敛为状态行
    ///
    /// 幂等: 外部任务设施至少一次投递时重复调用安全
    pub async fn process_entry(&self, run_id: &str, mut entry: Entry) {
        let source_identifier = entry.source_identifier.clone();

        let entry_id = match self
            .run_repo
            .upsert_entry(&entry.importer_id, &source_identifier, entry.kind, None, None)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // 簿记不可用属数据库级故障,无处落状态,只能记日志
                error!(identifier = %source_identifier, error = %e, "条目簿记失败");
                return;
            }
        };

        // 初始状态 Pending
        if let Err(e) = self
            .run_repo
            .append_status(&EntryStatus::new(entry_id, run_id, StatusCode::Pending))
            .await
        {
            error!(identifier = %source_identifier, error = %e, "Pending 状态写入失败");
        }

        let result = self.import_entry(run_id, entry_id, &mut entry).await;
        let (status, counter) = match result {
            Ok(EntryOutcome::Complete) => (
                EntryStatus::new(entry_id, run_id, StatusCode::Complete),
                RunCounter::Processed,
            ),
            Ok(EntryOutcome::CompleteWithFailures(errors)) => {
                let detail = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                let class = errors
                    .first()
                    .map(|e| e.class_name())
                    .unwrap_or("InternalError");
                (
                    EntryStatus::new(entry_id, run_id, StatusCode::CompleteWithFailures)
                        .with_error(class, detail, None),
                    RunCounter::Processed,
                )
            }
            Ok(EntryOutcome::Deleted) => (
                EntryStatus::new(entry_id, run_id, StatusCode::Deleted),
                RunCounter::Deleted,
            ),
            Err(e) => {
                warn!(identifier = %source_identifier, error = %e, "条目处理失败");
                (
                    EntryStatus::new(entry_id, run_id, StatusCode::Failed).with_error(
                        e.class_name(),
                        e.to_string(),
                        None,
                    ),
                    RunCounter::Failed,
                )
            }
        };

        // 终态转换: 状态行追加 + 计数器恰好 +1
        if let Err(e) = self.run_repo.append_status(&status).await {
            error!(identifier = %source_identifier, error = %e, "终态状态写入失败");
        }
        if let Err(e) = self.run_repo.increment(run_id, counter).await {
            error!(identifier = %source_identifier, error = %e, "计数器递增失败");
        }
    }

    async fn import_entry(
        &self,
        run_id: &str,
        _entry_id: i64,
        entry: &mut Entry,
    ) -> ImportResult<EntryOutcome> {
        if entry.source_identifier.is_empty() {
            return Err(ImportError::PersistenceValidation {
                identifier: String::new(),
                message: "源标识符缺失".to_string(),
            });
        }

        // Unfetched 条目经源客户端抓取（抓取超时可重试,单记录失败）
        if entry.raw().is_none() {
            let raw = self.bundle.client.get(&entry.source_identifier).await?;
            entry
                .attach_raw(raw)
                .map_err(ImportError::Internal)?;
        }

        let raw = entry
            .raw()
            .ok_or_else(|| ImportError::Internal("抓取后仍无原始记录".to_string()))?
            .clone();
        let raw_json = serde_json::to_string(&raw)?;

        // 删除型记录: 移除目标实体,条目转 Deleted
        if raw.deleted {
            self.run_repo
                .upsert_entry(
                    &entry.importer_id,
                    &entry.source_identifier,
                    entry.kind,
                    Some(&raw_json),
                    None,
                )
                .await?;
            let existing = self
                .factory
                .gateway()
                .find_by_identifier(self.factory.identifier_field(), &entry.source_identifier)
                .await?;
            if let Some(target) = existing {
                self.factory.gateway().delete(&target).await?;
                debug!(identifier = %entry.source_identifier, "删除型记录已移除目标实体");
            }
            return Ok(EntryOutcome::Deleted);
        }

        // 映射: 原始字段 → 规范化属性
        let attrs = self.bundle.mapping.build_attributes(&raw);
        entry
            .attach_attrs(attrs)
            .map_err(ImportError::Internal)?;
        let attrs = entry
            .all_attrs()
            .ok_or_else(|| ImportError::Internal("映射后仍无属性集".to_string()))?;

        // 审计: 条目行存最近原始载荷与规范化属性
        let attrs_json = attrs.to_json()?;
        self.run_repo
            .upsert_entry(
                &entry.importer_id,
                &entry.source_identifier,
                entry.kind,
                Some(&raw_json),
                Some(&attrs_json),
            )
            .await?;

        // 落库
        let outcome = self
            .factory
            .run(
                entry.kind,
                attrs,
                None,
                &raw.files,
                entry.collection.as_ref(),
            )
            .await?;

        let mut secondary = outcome.secondary_errors;

        // 父对象未出现: 登记待定关系,对账批次补链
        if let Some(parent) = outcome.deferred_parent {
            match PendingRelationship::new(run_id, parent.as_str(), entry.source_identifier.as_str())
            {
                Ok(rel) => {
                    if let Err(e) = self.run_repo.insert_relationship(&rel).await {
                        secondary.push(e);
                    } else {
                        debug!(
                            parent = %parent,
                            child = %entry.source_identifier,
                            "已登记待定关系"
                        );
                    }
                }
                Err(message) => secondary.push(ImportError::Internal(message)),
            }
        }

        if secondary.is_empty() {
            Ok(EntryOutcome::Complete)
        } else {
            Ok(EntryOutcome::CompleteWithFailures(secondary))
        }
    }

    /// 屏障后对账: 补链待定关系,仍未解析的条目记失败恰好一次
    async fn reconcile(&self, run_id: &str) -> ImportResult<()> {
        let pending = self.run_repo.pending_relationships(run_id).await?;
        if pending.is_empty() {
            return Ok(());
        }

        let pass = ReconciliationPass::new(
            self.factory.gateway().as_ref(),
            self.factory.identifier_field(),
        );
        let outcome = pass.resolve(pending).await?;

        for relationship_id in outcome.resolved {
            self.run_repo
                .mark_relationship(&relationship_id, RelationshipState::Resolved)
                .await?;
        }

        for rel in outcome.failed {
            // PENDING → FAILED 终止,重复对账不会再次命中
            self.run_repo
                .mark_relationship(&rel.relationship_id, RelationshipState::Failed)
                .await?;

            let err = ImportError::AssociationUnresolved {
                parent: rel.parent_identifier.clone(),
                child: rel.child_identifier.clone(),
            };
            match self
                .run_repo
                .get_entry(&self.importer_id, &rel.child_identifier, self.bundle.kind)
                .await?
            {
                Some(entry_row) => {
                    self.run_repo
                        .append_status(
                            &EntryStatus::new(entry_row.entry_id, run_id, StatusCode::Failed)
                                .with_error(err.class_name(), err.to_string(), None),
                        )
                        .await?;
                    self.run_repo.increment(run_id, RunCounter::Failed).await?;
                }
                None => {
                    warn!(child = %rel.child_identifier, "待定关系对应条目不存在");
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R> MetadataImporter for MetadataImporterImpl<R>
where
    R: RunRepository,
{
    #[instrument(skip(self), fields(importer_id = %self.importer_id))]
    async fn run_import(&self) -> ImportResult<RunSummary> {
        let run = ImporterRun::new(self.importer_id.as_str(), RunKind::Import);
        let run_id = run.run_id.clone();
        info!(run_id = %run_id, "开始导入运行");

        self.run_repo.create_run(&run).await?;
        // 运行起点显式清零（计数器在运行内单调不减的唯一例外）
        self.run_repo.reset_counters(&run_id).await?;

        // 总数尽力估计
        let total = self.bundle.parser.total_estimate().await;
        self.run_repo.set_total(&run_id, total as i64).await?;
        debug!(total = total, "总数估计完成");

        // 逐记录处理前预建源侧集合
        match self.bundle.parser.collections_to_create().await {
            Ok(collections) => {
                for attrs in collections {
                    if let Err(e) = self
                        .factory
                        .run(TargetKind::Collection, &attrs, None, &[], None)
                        .await
                    {
                        warn!(error = %e, "集合预建失败");
                    }
                }
            }
            Err(e) => warn!(error = %e, "集合枚举失败,跳过预建"),
        }

        // 主循环: 页枚举失败是运行级错误,向上中止;单记录错误只记状态
        let mut resumption: Option<String> = None;
        let mut cancelled = false;
        'pages: loop {
            let page = self.bundle.parser.next_page(resumption.take()).await?;
            for entry in page.entries {
                // 每条记录开始前检查取消标志（尽力而为,过期窗口为一条记录）
                if self.run_repo.is_cancelled(&run_id).await? {
                    warn!(run_id = %run_id, "运行已取消,不再开始新记录");
                    cancelled = true;
                    break 'pages;
                }
                self.run_repo.increment(&run_id, RunCounter::Enqueued).await?;
                self.process_entry(&run_id, entry).await;
            }
            match page.next_token {
                Some(token) => resumption = Some(token),
                None => break,
            }
        }

        // 屏障: 全部条目各处理一遍后才允许对账
        if !cancelled {
            self.reconcile(&run_id).await?;
        }

        self.run_repo.finish_run(&run_id).await?;
        let summary = self.run_repo.run_summary(&run_id).await?;
        info!(
            run_id = %run_id,
            total = summary.total_records,
            processed = summary.processed_records,
            failed = summary.failed_records,
            deleted = summary.deleted_records,
            "导入运行完成"
        );
        Ok(summary)
    }
}

/// 批量执行多个导入器（并发,互不影响）
pub async fn batch_run_imports<M>(importers: &[M]) -> Vec<Result<RunSummary, String>>
where
    M: MetadataImporter,
{
    info!(count = importers.len(), "开始批量导入");
    let tasks = importers.iter().map(|importer| async move {
        importer
            .run_import()
            .await
            .map_err(|e| format!("导入运行失败: {}", e))
    });
    let results = join_all(tasks).await;
    info!(
        total = results.len(),
        success = results.iter().filter(|r| r.is_ok()).count(),
        failed = results.iter().filter(|r| r.is_err()).count(),
        "批量导入完成"
    );
    results
}
