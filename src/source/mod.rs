// ==========================================
// 数字仓储批量导入导出系统 - 源客户端层
// ==========================================
// 职责: 外部记录源访问（OAI-PMH / CSV / BagIt）
// ==========================================

pub mod bagit_source;
pub mod client_trait;
pub mod csv_source;
pub mod oai_client;

pub use bagit_source::{sha256_hex, BagitSourceClient};
pub use client_trait::{RawRecordPage, SourceClient, SourceSet};
pub use csv_source::CsvSourceClient;
pub use oai_client::OaiClient;
