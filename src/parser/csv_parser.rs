// ==========================================
// 数字仓储批量导入导出系统 - CSV 解析器
// ==========================================
// 职责: CSV 行 → 条目,单页无续传
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::record::{CollectionRef, Entry};
use crate::domain::types::TargetKind;
use crate::importer::error::ImportResult;
use crate::parser::parser_trait::{EntryPage, RecordParser};
use crate::source::client_trait::SourceClient;
use crate::source::csv_source::CsvSourceClient;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

// ==========================================
// CsvRecordParser
// ==========================================
pub struct CsvRecordParser {
    client: Arc<CsvSourceClient>,
    importer_id: String,
    collection: Option<CollectionRef>,
}

impl CsvRecordParser {
    pub fn new(
        client: Arc<CsvSourceClient>,
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
impl RecordParser for CsvRecordParser {
    async fn total_estimate(&self) -> u64 {
        match self.client.list(None).await {
            Ok(page) => page
                .complete_list_size
                .unwrap_or(page.records.len() as u64),
            Err(e) => {
                warn!(error = %e, "CSV 总数估计失败,回退 0");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn client(content: &str) -> (tempfile::NamedTempFile, Arc<CsvSourceClient>) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        let client = Arc::new(CsvSourceClient::new(file.path(), "source_identifier"));
        (file, client)
    }

    #[tokio::test]
    async fn test_next_page_builds_fetched_entries() {
        let (_file, client) = client("source_identifier,title\nrec-1,甲\nrec-2,乙\n");
        let parser = CsvRecordParser::new(client, "imp-1", None);

        let page = parser.next_page(None).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.next_token, None);
        assert_eq!(page.entries[0].stage_name(), "FETCHED");
        assert_eq!(page.entries[0].source_identifier, "rec-1");
        assert_eq!(page.entries[0].importer_id, "imp-1");
    }

    #[tokio::test]
    async fn test_fixed_collection_attached() {
        let (_file, client) = client("source_identifier,title\nrec-1,甲\n");
        let parser = CsvRecordParser::new(
            client,
            "imp-1",
            Some(CollectionRef::Id("col-1".to_string())),
        );

        let page = parser.next_page(None).await.unwrap();
        assert_eq!(
            page.entries[0].collection,
            Some(CollectionRef::Id("col-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_total_estimate_falls_back_to_zero() {
        let client = Arc::new(CsvSourceClient::new("/不存在/no.csv", "source_identifier"));
        let parser = CsvRecordParser::new(client, "imp-1", None);
        assert_eq!(parser.total_estimate().await, 0);
    }
}
