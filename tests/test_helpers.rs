// ==========================================
// 集成测试辅助
// ==========================================
// 职责: 临时数据库/CSV 素材/装配快捷方式
// ==========================================

#![allow(dead_code)]

use repo_bulk_import::domain::record::CollectionRef;
use repo_bulk_import::domain::types::{SourceFormat, TargetKind};
use repo_bulk_import::factory::{InMemoryGateway, ObjectFactory};
use repo_bulk_import::importer::MetadataImporterImpl;
use repo_bulk_import::mapping::{FieldRule, MappingConfig, SplitSpec};
use repo_bulk_import::parser::{resolve_format, ParserSettings};
use repo_bulk_import::repository::SqliteRunRepository;
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

/// 创建测试用簿记数据库
pub fn create_test_db() -> (TempDir, String) {
    let dir = TempDir::new().expect("创建临时目录失败");
    let path = dir.path().join("test.db").display().to_string();
    (dir, path)
}

/// 写测试 CSV 文件（.csv 后缀）
pub fn write_csv(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("创建临时 CSV 失败");
    write!(file, "{}", content).expect("写入临时 CSV 失败");
    file
}

/// 标准测试规则: date → date_created(切分) + subject 切分并句首大写
pub fn standard_rules() -> Vec<FieldRule> {
    let mut date = FieldRule::renaming("date_created", "date");
    date.split = SplitSpec::Flag(true);
    let mut subject = FieldRule::renaming("subject", "subject");
    subject.split = SplitSpec::Flag(true);
    subject.parsed = true;
    vec![date, subject]
}

/// 装配 CSV 导入器（内存网关）
pub fn build_csv_importer(
    importer_id: &str,
    csv_path: &str,
    db_path: &str,
    rules: Vec<FieldRule>,
    collection: Option<CollectionRef>,
    gateway: Arc<InMemoryGateway>,
) -> MetadataImporterImpl<SqliteRunRepository> {
    let run_repo = SqliteRunRepository::new(db_path).expect("创建簿记仓储失败");

    let mapping = MappingConfig {
        rules,
        ..Default::default()
    };
    let settings = ParserSettings {
        importer_id: importer_id.to_string(),
        format: SourceFormat::Csv,
        location: csv_path.to_string(),
        set_spec: None,
        collect_into_set: false,
        collection,
        timeout_secs: 5,
        kind: TargetKind::Work,
        mapping,
    };
    let bundle = resolve_format(settings).expect("格式装配失败");
    let factory = ObjectFactory::new(gateway, "source_identifier", vec!["title".to_string()]);

    MetadataImporterImpl::new(importer_id, run_repo, bundle, factory)
}
