// ==========================================
// 数字仓储批量导入导出系统 - BagIt 包源客户端
// ==========================================
// 职责: 枚举 BagIt 包,读取 manifest 与包内元数据 CSV
// 约定: 每包一条记录;元数据取 data/metadata.csv 首行;
// manifest-sha256.txt 声明的数据文件作为记录附件随记录传递,
// 校验和在附件落库时核验
// ==========================================

use crate::domain::record::{RawField, RawRecord, SourceFile};
use crate::importer::error::{ImportError, ImportResult};
use crate::source::client_trait::{RawRecordPage, SourceClient, SourceSet};
use async_trait::async_trait;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// 包声明文件（存在即视为一个 bag）
const BAG_DECL: &str = "bagit.txt";
/// 校验和清单
const MANIFEST: &str = "manifest-sha256.txt";
/// 包内元数据文件（相对包根）
const METADATA_FILE: &str = "data/metadata.csv";

// ==========================================
// BagitSourceClient
// ==========================================
pub struct BagitSourceClient {
    root: PathBuf,
    identifier_column: String,
}

impl BagitSourceClient {
    pub fn new(root: impl Into<PathBuf>, identifier_column: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            identifier_column: identifier_column.into(),
        }
    }

    /// 枚举包目录: root 本身是 bag,或 root 下一层子目录中的 bag
    fn bag_dirs(&self) -> ImportResult<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(ImportError::FileNotFound(self.root.display().to_string()));
        }
        if self.root.join(BAG_DECL).is_file() {
            return Ok(vec![self.root.clone()]);
        }
        let mut bags = Vec::new();
        for dir_entry in fs::read_dir(&self.root)? {
            let path = dir_entry?.path();
            if path.is_dir() && path.join(BAG_DECL).is_file() {
                bags.push(path);
            }
        }
        bags.sort();
        Ok(bags)
    }

    fn read_bag(&self, bag: &Path) -> ImportResult<RawRecord> {
        let bag_name = bag
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| bag.display().to_string());

        let manifest = read_manifest(bag)?;

        // 元数据 CSV 首行 → 字段对
        let metadata_path = bag.join(METADATA_FILE);
        if !metadata_path.is_file() {
            return Err(ImportError::BagitError {
                bag: bag_name,
                message: format!("缺少元数据文件 {}", METADATA_FILE),
            });
        }
        let fields = read_metadata_row(&metadata_path)?;

        // 标识符: 元数据列优先,缺省回退包目录名
        let identifier = fields
            .iter()
            .find(|f| f.name == self.identifier_column)
            .map(|f| f.value.clone())
            .unwrap_or(bag_name);

        // manifest 中除元数据 CSV 外的数据文件作为附件
        let files: Vec<SourceFile> = manifest
            .into_iter()
            .filter(|(_, rel)| rel != METADATA_FILE)
            .map(|(checksum, rel)| SourceFile {
                path: bag.join(rel),
                checksum: Some(checksum),
            })
            .collect();

        let mut record = RawRecord::new(identifier);
        record.payload = serde_json::to_string(&fields).unwrap_or_default();
        record.fields = fields;
        record.files = files;
        Ok(record)
    }
}

/// 读取 manifest-sha256.txt: 每行 "<校验和> <相对路径>"
fn read_manifest(bag: &Path) -> ImportResult<Vec<(String, String)>> {
    let manifest_path = bag.join(MANIFEST);
    if !manifest_path.is_file() {
        return Err(ImportError::BagitError {
            bag: bag.display().to_string(),
            message: format!("缺少 {}", MANIFEST),
        });
    }
    let content = fs::read_to_string(&manifest_path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((checksum, rel)) => {
                entries.push((checksum.trim().to_lowercase(), rel.trim().to_string()))
            }
            None => {
                return Err(ImportError::BagitError {
                    bag: bag.display().to_string(),
                    message: format!("manifest 行格式非法: {}", line),
                });
            }
        }
    }
    Ok(entries)
}

/// 元数据 CSV 首个数据行,按表头序
fn read_metadata_row(path: &Path) -> ImportResult<Vec<RawField>> {
    let file = fs::File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let row = match reader.records().next() {
        Some(row) => row?,
        None => {
            return Err(ImportError::CsvParseError(format!(
                "{} 无数据行",
                path.display()
            )))
        }
    };

    let mut fields = Vec::new();
    for (col_idx, value) in row.iter().enumerate() {
        if let Some(header) = headers.get(col_idx) {
            let value = value.trim();
            if !value.is_empty() {
                fields.push(RawField::new(header.clone(), value));
            }
        }
    }
    Ok(fields)
}

/// SHA-256 十六进制小写（manifest 核验用）
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl SourceClient for BagitSourceClient {
    async fn list(&self, _resumption: Option<String>) -> ImportResult<RawRecordPage> {
        let bags = self.bag_dirs()?;
        let size = bags.len() as u64;
        let records = bags
            .iter()
            .map(|bag| self.read_bag(bag))
            .collect::<ImportResult<Vec<_>>>()?;
        Ok(RawRecordPage {
            records,
            next_token: None,
            complete_list_size: Some(size),
        })
    }

    async fn get(&self, identifier: &str) -> ImportResult<RawRecord> {
        for bag in self.bag_dirs()? {
            let record = self.read_bag(&bag)?;
            if record.source_identifier == identifier {
                return Ok(record);
            }
        }
        Err(ImportError::SourceFetch {
            message: format!("BagIt 目录中不存在标识符 {}", identifier),
            retryable: false,
        })
    }

    async fn list_sets(&self) -> ImportResult<Vec<SourceSet>> {
        Ok(Vec::new())
    }
}
