// ==========================================
// 数字仓储批量导入导出系统 - OAI-PMH 解析器
// ==========================================
// 职责: ListRecords 分页枚举 → 条目;ListSets → 集合预建
// 分页: 不透明 resumptionToken 续传
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::record::{CollectionRef, Entry};
use crate::domain::types::TargetKind;
use crate::importer::error::ImportResult;
use crate::parser::parser_trait::{EntryPage, RecordParser};
use crate::source::client_trait::SourceClient;
use crate::source::oai_client::OaiClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

// ==========================================
// OaiParser
// ==========================================
pub struct OaiParser {
    client: Arc<OaiClient>,
    importer_id: String,
    /// "归入名为 X 的集合" 模式: 每条目挂接 set 名引用,补链延迟到对账
    collect_into_set: bool,
    collection: Option<CollectionRef>,
}

impl OaiParser {
    pub fn new(
        client: Arc<OaiClient>,
        importer_id: impl Into<String>,
        collect_into_set: bool,
        collection: Option<CollectionRef>,
    ) -> Self {
        Self {
            client,
            importer_id: importer_id.into(),
            collect_into_set,
            collection,
        }
    }

    fn entry_collection(&self) -> Option<CollectionRef> {
        if let Some(fixed) = &self.collection {
            return Some(fixed.clone());
        }
        if self.collect_into_set {
            if let Some(set) = self.client.set_spec() {
                return Some(CollectionRef::SetName(set.to_string()));
            }
        }
        None
    }
}

#[async_trait]
impl RecordParser for OaiParser {
    async fn total_estimate(&self) -> u64 {
        // completeListSize 来自首页 resumptionToken 属性
        match self.client.list(None).await {
            Ok(page) => page
                .complete_list_size
                .unwrap_or(page.records.len() as u64),
            Err(e) => {
                warn!(error = %e, "OAI 总数估计失败,回退 0");
                0
            }
        }
    }

    async fn next_page(&self, resumption: Option<String>) -> ImportResult<EntryPage> {
        let page = self.client.list(resumption).await?;
        let collection = self.entry_collection();
        let entries = page
            .records
            .into_iter()
            .map(|raw| {
                let mut entry = Entry::with_raw(self.importer_id.clone(), raw, TargetKind::Work);
                if let Some(c) = &collection {
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
        if !self.collect_into_set {
            return Ok(Vec::new());
        }
        let sets = self.client.list_sets().await?;
        let wanted = self.client.set_spec();
        Ok(sets
            .into_iter()
            .filter(|set| wanted.map(|w| w == set.spec).unwrap_or(true))
            .map(|set| {
                let mut attrs = NormalizedAttributes::new();
                attrs.append("source_identifier", vec![set.spec]);
                attrs.append("title", vec![set.name]);
                attrs
            })
            .collect())
    }
}
