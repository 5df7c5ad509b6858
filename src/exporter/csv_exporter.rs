// ==========================================
// 数字仓储批量导入导出系统 - CSV 导出器
// ==========================================
// 职责: 导出指定 importer 全部条目的规范化属性为 CSV
// 表头: source_identifier + 各条目属性键的并集（字典序);
// 多值以 "; " 连接
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::run::{EntryStatus, ImporterRun, RunSummary};
use crate::domain::types::{RunCounter, RunKind, StatusCode};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::run_repo::RunRepository;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, instrument, warn};

/// 多值连接符
const VALUE_SEPARATOR: &str = "; ";

// ==========================================
// CsvExporter
// ==========================================
pub struct CsvExporter<R>
where
    R: RunRepository,
{
    importer_id: String,
    run_repo: R,
}

impl<R> CsvExporter<R>
where
    R: RunRepository,
{
    pub fn new(importer_id: impl Into<String>, run_repo: R) -> Self {
        Self {
            importer_id: importer_id.into(),
            run_repo,
        }
    }

    /// 执行一次导出运行
    #[instrument(skip(self, output_path), fields(importer_id = %self.importer_id))]
    pub async fn run_export(&self, output_path: &Path) -> ImportResult<RunSummary> {
        let run = ImporterRun::new(self.importer_id.as_str(), RunKind::Export);
        let run_id = run.run_id.clone();
        info!(run_id = %run_id, output = %output_path.display(), "开始导出运行");

        self.run_repo.create_run(&run).await?;
        self.run_repo.reset_counters(&run_id).await?;

        let entries = self.run_repo.list_entries(&self.importer_id).await?;
        self.run_repo
            .set_total(&run_id, entries.len() as i64)
            .await?;

        // 预解码属性集,同时收集表头键并集
        let mut decoded: Vec<(i64, String, Option<NormalizedAttributes>)> = Vec::new();
        let mut columns: BTreeSet<String> = BTreeSet::new();
        for row in &entries {
            let attrs = row
                .attrs_json
                .as_deref()
                .and_then(|json| NormalizedAttributes::from_json(json).ok());
            if let Some(attrs) = &attrs {
                for key in attrs.keys() {
                    columns.insert(key.clone());
                }
            }
            decoded.push((row.entry_id, row.source_identifier.clone(), attrs));
        }
        // 标识符独占首列
        columns.remove("source_identifier");

        let mut writer = csv::Writer::from_path(output_path)
            .map_err(|e| ImportError::FileReadError(format!("{}: {}", output_path.display(), e)))?;

        let mut header: Vec<&str> = vec!["source_identifier"];
        header.extend(columns.iter().map(|c| c.as_str()));
        writer.write_record(&header)?;

        for (entry_id, source_identifier, attrs) in decoded {
            self.run_repo.increment(&run_id, RunCounter::Enqueued).await?;
            match attrs {
                Some(attrs) => {
                    let mut record: Vec<String> = vec![source_identifier];
                    for column in &columns {
                        let cell = attrs
                            .get(column)
                            .map(|vals| vals.join(VALUE_SEPARATOR))
                            .unwrap_or_default();
                        record.push(cell);
                    }
                    writer.write_record(&record)?;
                    self.run_repo
                        .append_status(&EntryStatus::new(entry_id, &run_id, StatusCode::Complete))
                        .await?;
                    self.run_repo
                        .increment(&run_id, RunCounter::Processed)
                        .await?;
                }
                None => {
                    // 无可导出属性（从未映射成功或审计 JSON 损坏）
                    warn!(identifier = %source_identifier, "条目无规范化属性,导出跳过");
                    self.run_repo
                        .append_status(
                            &EntryStatus::new(entry_id, &run_id, StatusCode::Failed).with_error(
                                "MappingError",
                                "条目无规范化属性可导出",
                                None,
                            ),
                        )
                        .await?;
                    self.run_repo.increment(&run_id, RunCounter::Failed).await?;
                }
            }
        }

        writer
            .flush()
            .map_err(|e| ImportError::FileReadError(e.to_string()))?;

        self.run_repo.finish_run(&run_id).await?;
        let summary = self.run_repo.run_summary(&run_id).await?;
        info!(
            run_id = %run_id,
            processed = summary.processed_records,
            failed = summary.failed_records,
            "导出运行完成"
        );
        Ok(summary)
    }
}
