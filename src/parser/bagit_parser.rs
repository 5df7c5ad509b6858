// ==========================================
// 数字仓储批量导入导出系统 - BagIt 解析器
// ==========================================
// 职责: BagIt 包 → 条目(含附件引用),单页无续传
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::record::{CollectionRef, Entry};
use crate::domain::types::TargetKind;
use crate::importer::error::ImportResult;
use crate::parser::parser_trait::{EntryPage, RecordParser};
use crate::source::bagit_source::BagitSourceClient;
use crate::source::client_trait::SourceClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

// ==========================================
// BagitRecordParser
// ==========================================
pub struct BagitRecordParser {
    client: Arc<BagitSourceClient>,
    importer_id: String,
    collection: Option<CollectionRef>,
}

impl BagitRecordParser {
    pub fn new(
        client: Arc<BagitSourceClient>,
        importer_id: impl Into<String>,
        collection: Option<CollectionRef>,
    ) -> Self {
        Self {
            client,
            importer_id: importer_id.into(),
            collection,
        }
    }
}

#[async_trait]
impl RecordParser for BagitRecordParser {
    async fn total_estimate(&self) -> u64 {
        match self.client.list(None).await {
            Ok(page) => page
                .complete_list_size
                .unwrap_or(page.records.len() as u64),
            Err(e) => {
                warn!(error = %e, "BagIt 总数估计失败,回退 0");
                0
            }
        }
    }

    async fn next_page(&self, resumption: Option<String>) -> ImportResult<EntryPage> {
        let page = self.client.list(resumption).await?;
        let entries = page
            .records
            .into_iter()
            .map(|raw| {
                let mut entry = Entry::with_raw(self.importer_id.clone(), raw, TargetKind::Work);
                if let Some(c) = &self.collection {
                    entry = entry.with_collection(c.clone());
                }
                entry
            })
            .collect();
        Ok(EntryPage {
            entries,
            next_token: page.next_token,
        })
    }

    async fn collections_to_create(&self) -> ImportResult<Vec<NormalizedAttributes>> {
        Ok(Vec::new())
    }
}
