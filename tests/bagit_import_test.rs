// ==========================================
// BagIt 导入集成测试
// ==========================================
// 测试目标: 包枚举 → 元数据映射 → 附件按校验和落库
// ==========================================

mod test_helpers;

use repo_bulk_import::domain::types::{SourceFormat, TargetKind};
use repo_bulk_import::factory::{InMemoryGateway, ObjectFactory, PersistenceGateway};
use repo_bulk_import::importer::{MetadataImporter, MetadataImporterImpl};
use repo_bulk_import::logging;
use repo_bulk_import::mapping::MappingConfig;
use repo_bulk_import::parser::{resolve_format, ParserSettings};
use repo_bulk_import::repository::{RunRepository, SqliteRunRepository};
use repo_bulk_import::source::sha256_hex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use test_helpers::{create_test_db, standard_rules};

/// 搭一个最小 bag
fn build_bag(root: &Path, name: &str, identifier: &str, file_bytes: &[u8]) -> PathBuf {
    let bag = root.join(name);
    fs::create_dir_all(bag.join("data")).unwrap();
    fs::write(bag.join("bagit.txt"), "BagIt-Version: 0.97\n").unwrap();
    fs::write(bag.join("data/page-1.tif"), file_bytes).unwrap();

    let mut metadata = fs::File::create(bag.join("data/metadata.csv")).unwrap();
    writeln!(metadata, "source_identifier,title,subject").unwrap();
    writeln!(metadata, "{},包内作品,fish ; birds", identifier).unwrap();

    fs::write(
        bag.join("manifest-sha256.txt"),
        format!(
            "{} data/page-1.tif\n{} data/metadata.csv\n",
            sha256_hex(file_bytes),
            sha256_hex(b"unchecked")
        ),
    )
    .unwrap();
    bag
}

fn build_bagit_importer(
    bags_dir: &Path,
    db_path: &str,
    gateway: Arc<InMemoryGateway>,
) -> MetadataImporterImpl<SqliteRunRepository> {
    let settings = ParserSettings {
        importer_id: "imp-bag".to_string(),
        format: SourceFormat::Bagit,
        location: bags_dir.display().to_string(),
        set_spec: None,
        collect_into_set: false,
        collection: None,
        timeout_secs: 5,
        kind: TargetKind::Work,
        mapping: MappingConfig {
            rules: standard_rules(),
            ..Default::default()
        },
    };
    let bundle = resolve_format(settings).expect("格式装配失败");
    let factory = ObjectFactory::new(gateway, "source_identifier", vec!["title".to_string()]);
    MetadataImporterImpl::new(
        "imp-bag",
        SqliteRunRepository::new(db_path).unwrap(),
        bundle,
        factory,
    )
}

#[tokio::test]
async fn test_bagit_import_attaches_files() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let bags = tempfile::TempDir::new().unwrap();
    build_bag(bags.path(), "bag-a", "rec-1", b"tif-bytes");

    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_bagit_importer(bags.path(), &db_path, gateway.clone());

    let summary = importer.run_import().await.expect("导入应成功");

    assert_eq!(summary.processed_records, 1);
    assert_eq!(summary.failed_records, 0);

    let entity = gateway
        .find_by_identifier("source_identifier", "rec-1")
        .await
        .unwrap()
        .expect("包记录应落库");
    assert_eq!(
        entity.attributes.get("subject").unwrap(),
        &["Fish".to_string(), "Birds".to_string()]
    );
    assert_eq!(gateway.attached_files(&entity.id), vec!["page-1.tif"]);
}

#[tokio::test]
async fn test_bagit_checksum_mismatch_is_complete_with_failures() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let bags = tempfile::TempDir::new().unwrap();
    let bag = build_bag(bags.path(), "bag-a", "rec-1", b"tif-bytes");
    // 落包后数据文件被篡改,manifest 校验和不再匹配
    fs::write(bag.join("data/page-1.tif"), b"tampered").unwrap();

    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_bagit_importer(bags.path(), &db_path, gateway.clone());

    let summary = importer.run_import().await.expect("运行应完成");

    // 主对象成功,附件核验失败为次级失败
    assert_eq!(summary.processed_records, 1);
    assert_eq!(summary.failed_records, 0);
    assert_eq!(gateway.entity_count(), 1);

    let repo = SqliteRunRepository::new(&db_path).unwrap();
    let entry = repo
        .get_entry("imp-bag", "rec-1", TargetKind::Work)
        .await
        .unwrap()
        .unwrap();
    let latest = repo.latest_status(entry.entry_id).await.unwrap().unwrap();
    assert_eq!(
        latest.code,
        repo_bulk_import::domain::types::StatusCode::CompleteWithFailures
    );
}
