// ==========================================
// 数字仓储批量导入导出系统 - CSV 文件源客户端
// ==========================================
// 职责: 逐行读取 CSV,按表头序产出原始字段对
// 约定: 标识符列缺失的行仍产出记录（标识符为空,由编排层判失败）
// ==========================================

use crate::domain::record::RawRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::source::client_trait::{RawRecordPage, SourceClient, SourceSet};
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::{Path, PathBuf};

// ==========================================
// CsvSourceClient
// ==========================================
pub struct CsvSourceClient {
    path: PathBuf,
    identifier_column: String,
}

impl CsvSourceClient {
    pub fn new(path: impl Into<PathBuf>, identifier_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identifier_column: identifier_column.into(),
        }
    }

    /// 全量读入（CSV 源无分页,单页返回）
    fn read_all(&self) -> ImportResult<Vec<RawRecord>> {
        let path: &Path = &self.path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = path.extension() {
            if ext.to_ascii_lowercase() != "csv" {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result?;

            // 跳过完全空白的行
            if row.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let mut identifier = String::new();
            let mut fields = Vec::new();
            for (col_idx, value) in row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    let value = value.trim();
                    if value.is_empty() {
                        continue;
                    }
                    if header == &self.identifier_column {
                        identifier = value.to_string();
                    }
                    fields.push(crate::domain::record::RawField::new(header.clone(), value));
                }
            }

            let mut record = RawRecord::new(identifier);
            record.payload = serde_json::to_string(&fields).unwrap_or_default();
            record.fields = fields;
            records.push(record);
        }

        Ok(records)
    }
}

#[async_trait]
impl SourceClient for CsvSourceClient {
    async fn list(&self, _resumption: Option<String>) -> ImportResult<RawRecordPage> {
        let records = self.read_all()?;
        let size = records.len() as u64;
        Ok(RawRecordPage {
            records,
            next_token: None,
            complete_list_size: Some(size),
        })
    }

    async fn get(&self, identifier: &str) -> ImportResult<RawRecord> {
        self.read_all()?
            .into_iter()
            .find(|r| r.source_identifier == identifier)
            .ok_or_else(|| ImportError::SourceFetch {
                message: format!("CSV 中不存在标识符 {}", identifier),
                retryable: false,
            })
    }

    async fn list_sets(&self) -> ImportResult<Vec<SourceSet>> {
        Ok(Vec::new())
    }
}
