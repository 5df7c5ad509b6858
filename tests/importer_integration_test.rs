// ==========================================
// 导入器集成测试
// ==========================================
// 测试目标: CSV 端到端导入流程（枚举 → 映射 → 落库 → 状态/计数）
// ==========================================

mod test_helpers;

use repo_bulk_import::domain::types::{StatusCode, TargetKind};
use repo_bulk_import::factory::{InMemoryGateway, PersistenceGateway};
use repo_bulk_import::importer::MetadataImporter;
use repo_bulk_import::logging;
use repo_bulk_import::repository::{RunRepository, SqliteRunRepository};
use std::sync::Arc;
use test_helpers::{build_csv_importer, create_test_db, standard_rules, write_csv};

#[tokio::test]
async fn test_import_csv_basic() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let csv = write_csv(
        "source_identifier,title,date,subject\n\
         rec-1,渔业年鉴,2020-01-01,fish ; birds\n\
         rec-2,地方志,1999,history\n",
    );
    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        standard_rules(),
        None,
        gateway.clone(),
    );

    let summary = importer.run_import().await.expect("导入应成功");

    assert_eq!(summary.total_records, 2);
    assert_eq!(summary.enqueued_records, 2);
    assert_eq!(summary.processed_records, 2);
    assert_eq!(summary.failed_records, 0);
    assert_eq!(summary.deleted_records, 0);
    assert_eq!(gateway.entity_count(), 2);

    // 映射结果进入目标实体
    let entity = gateway
        .find_by_identifier("source_identifier", "rec-1")
        .await
        .unwrap()
        .expect("rec-1 应已落库");
    assert_eq!(entity.kind, TargetKind::Work);
    assert_eq!(
        entity.attributes.get("subject").unwrap(),
        &["Fish".to_string(), "Birds".to_string()]
    );
    assert_eq!(
        entity.attributes.get("date_created").unwrap(),
        &["2020-01-01".to_string()]
    );
}

#[tokio::test]
async fn test_import_twice_is_idempotent() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let csv = write_csv("source_identifier,title\nrec-1,样例\n");
    let gateway = Arc::new(InMemoryGateway::new());

    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        Vec::new(),
        None,
        gateway.clone(),
    );
    importer.run_import().await.expect("首次导入应成功");

    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        Vec::new(),
        None,
        gateway.clone(),
    );
    let summary = importer.run_import().await.expect("重复导入应成功");

    // 幂等: 同标识符不产生第二个实体;新运行计数独立
    assert_eq!(gateway.entity_count(), 1);
    assert_eq!(summary.processed_records, 1);
}

#[tokio::test]
async fn test_entry_status_and_audit_persisted() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let csv = write_csv("source_identifier,title,subject\nrec-1,样例,fish ; birds\n");
    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        standard_rules(),
        None,
        gateway,
    );
    importer.run_import().await.expect("导入应成功");

    let repo = SqliteRunRepository::new(&db_path).unwrap();
    let entry = repo
        .get_entry("imp-1", "rec-1", TargetKind::Work)
        .await
        .unwrap()
        .expect("条目行应存在");

    // 审计: 原始载荷与规范化属性 JSON 均已存档
    assert!(entry.raw_json.is_some());
    let attrs_json = entry.attrs_json.expect("规范化属性应存档");
    assert!(attrs_json.contains("Fish"));

    // 状态历史: 最新为 Complete
    let latest = repo.latest_status(entry.entry_id).await.unwrap().unwrap();
    assert_eq!(latest.code, StatusCode::Complete);
}

#[tokio::test]
async fn test_record_without_identifier_fails_run_continues() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    // 第二行缺标识符
    let csv = write_csv("source_identifier,title\nrec-1,甲\n,乙\nrec-3,丙\n");
    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        Vec::new(),
        None,
        gateway.clone(),
    );

    let summary = importer.run_import().await.expect("运行不应被单记录错误中止");

    assert_eq!(summary.processed_records, 2);
    assert_eq!(summary.failed_records, 1);
    assert_eq!(gateway.entity_count(), 2);
    assert_eq!(summary.failed_entries.len(), 1);
    assert_eq!(
        summary.failed_entries[0].error_class.as_deref(),
        Some("PersistenceValidationError")
    );
}

#[tokio::test]
async fn test_persistence_validation_failure_recorded_verbatim() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let csv = write_csv("source_identifier,title\nrec-1,有标题\nrec-2,\n");
    // 平台要求 title 非空 → rec-2 校验失败
    let gateway = Arc::new(InMemoryGateway::with_required_fields(vec![
        "title".to_string()
    ]));
    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        Vec::new(),
        None,
        gateway.clone(),
    );

    let summary = importer.run_import().await.expect("运行应完成");

    assert_eq!(summary.processed_records, 1);
    assert_eq!(summary.failed_records, 1);
    let failed = &summary.failed_entries[0];
    assert_eq!(failed.source_identifier, "rec-2");
    // 持久层消息原样进入状态行
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("title 不能为空"));
}

#[tokio::test]
async fn test_deleted_record_removes_entity() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let csv = write_csv("source_identifier,title\nrec-1,甲\n");
    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        Vec::new(),
        None,
        gateway.clone(),
    );
    importer.run_import().await.expect("导入应成功");
    assert_eq!(gateway.entity_count(), 1);

    // 删除型记录到达（OAI header status="deleted" 语义）
    let repo = SqliteRunRepository::new(&db_path).unwrap();
    let run = repo_bulk_import::domain::run::ImporterRun::new(
        "imp-1",
        repo_bulk_import::domain::types::RunKind::Import,
    );
    repo.create_run(&run).await.unwrap();

    let mut raw = repo_bulk_import::domain::record::RawRecord::new("rec-1");
    raw.deleted = true;
    let entry = repo_bulk_import::domain::record::Entry::with_raw("imp-1", raw, TargetKind::Work);
    importer.process_entry(&run.run_id, entry).await;

    assert_eq!(gateway.entity_count(), 0);
    let loaded = repo.get_run(&run.run_id).await.unwrap().unwrap();
    assert_eq!(loaded.deleted_records, 1);

    let entry_row = repo
        .get_entry("imp-1", "rec-1", TargetKind::Work)
        .await
        .unwrap()
        .unwrap();
    let latest = repo.latest_status(entry_row.entry_id).await.unwrap().unwrap();
    assert_eq!(latest.code, StatusCode::Deleted);
}

#[tokio::test]
async fn test_process_entry_duplicate_delivery_safe() {
    logging::init_test();

    let (_dir, db_path) = create_test_db();
    let csv = write_csv("source_identifier,title\nrec-1,甲\n");
    let gateway = Arc::new(InMemoryGateway::new());
    let importer = build_csv_importer(
        "imp-1",
        csv.path().to_str().unwrap(),
        &db_path,
        Vec::new(),
        None,
        gateway.clone(),
    );

    let repo = SqliteRunRepository::new(&db_path).unwrap();
    let run = repo_bulk_import::domain::run::ImporterRun::new(
        "imp-1",
        repo_bulk_import::domain::types::RunKind::Import,
    );
    repo.create_run(&run).await.unwrap();

    // 外部任务设施至少一次投递: 同一记录重复处理
    let make_entry = || {
        let mut raw = repo_bulk_import::domain::record::RawRecord::new("rec-1");
        raw.push_field("title", "甲");
        repo_bulk_import::domain::record::Entry::with_raw("imp-1", raw, TargetKind::Work)
    };
    importer.process_entry(&run.run_id, make_entry()).await;
    importer.process_entry(&run.run_id, make_entry()).await;

    // 幂等落库: 实体仍只有一个;计数器如实反映两次处理
    assert_eq!(gateway.entity_count(), 1);
    let loaded = repo.get_run(&run.run_id).await.unwrap().unwrap();
    assert_eq!(loaded.processed_records, 2);
}
