// ==========================================
// 数字仓储批量导入导出系统 - 解析层
// ==========================================
// 职责: 按源格式枚举记录并构造条目
// ==========================================

pub mod bagit_parser;
pub mod csv_parser;
pub mod oai_parser;
pub mod parser_trait;
pub mod registry;

pub use bagit_parser::BagitRecordParser;
pub use csv_parser::CsvRecordParser;
pub use oai_parser::OaiParser;
pub use parser_trait::{EntryPage, RecordParser};
pub use registry::{resolve_format, FormatBundle, ParserSettings};
