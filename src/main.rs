// ==========================================
// 数字仓储批量导入导出系统 - CLI 主入口
// ==========================================
// 用途: 以命令行驱动一次导入/导出运行
// 说明: 导入以内存网关试运行落库（真实平台适配层由宿主应用注入);
// 运行簿记/状态/审计照常写入 SQLite
// ==========================================

use repo_bulk_import::config::{ConfigManager, ImportConfigReader};
use repo_bulk_import::domain::record::CollectionRef;
use repo_bulk_import::domain::run::RunSummary;
use repo_bulk_import::domain::types::{SourceFormat, TargetKind};
use repo_bulk_import::exporter::CsvExporter;
use repo_bulk_import::factory::{InMemoryGateway, ObjectFactory};
use repo_bulk_import::importer::{MetadataImporter, MetadataImporterImpl};
use repo_bulk_import::mapping::{FieldRule, MappingConfig};
use repo_bulk_import::parser::{resolve_format, ParserSettings};
use repo_bulk_import::repository::SqliteRunRepository;
use repo_bulk_import::{logging, APP_NAME, VERSION};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", APP_NAME);
    tracing::info!("系统版本: {}", VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Vec<String>) -> Result<(), String> {
    let Some((command, rest)) = args.split_first() else {
        print_usage();
        return Ok(());
    };
    let opts = parse_options(rest)?;

    let db_path = opts
        .get("db")
        .cloned()
        .unwrap_or_else(default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    match command.as_str() {
        "import" => run_import_command(&opts, &db_path).await,
        "export" => run_export_command(&opts, &db_path).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(format!("未知命令: {}（支持 import / export / help）", other)),
    }
}

async fn run_import_command(opts: &HashMap<String, String>, db_path: &str) -> Result<(), String> {
    let importer_id = required(opts, "importer")?;
    let location = required(opts, "location")?;
    let format = SourceFormat::parse(&required(opts, "format")?)
        .ok_or_else(|| "格式须为 oai / csv / bagit".to_string())?;

    let run_repo = SqliteRunRepository::new(db_path).map_err(|e| e.to_string())?;
    let config = ConfigManager::new(db_path).map_err(|e| e.to_string())?;

    // 规则文件（可选,缺省走恒等透传映射）
    let rules: Vec<FieldRule> = match opts.get("rules") {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("规则文件读取失败 {}: {}", path, e))?;
            serde_json::from_str(&json).map_err(|e| format!("规则文件解析失败: {}", e))?
        }
        None => Vec::new(),
    };

    let mapping = MappingConfig {
        rules,
        split_delimiters: config.get_split_delimiters().await.map_err(|e| e.to_string())?,
        mime_fallback: config.get_mime_fallback().await.map_err(|e| e.to_string())?,
        passthrough_unknown: true,
        identifier_field: config.get_identifier_field().await.map_err(|e| e.to_string())?,
        institution: config.get_institution_name().await.map_err(|e| e.to_string())?,
        rights_override: config.get_rights_override().await.map_err(|e| e.to_string())?,
        rights_override_forced: config
            .get_rights_override_forced()
            .await
            .map_err(|e| e.to_string())?,
        thumbnail_url_template: config
            .get_thumbnail_url_template()
            .await
            .map_err(|e| e.to_string())?,
    };

    let settings = ParserSettings {
        importer_id: importer_id.clone(),
        format,
        location,
        set_spec: opts.get("set").cloned(),
        collect_into_set: opts.contains_key("collect-sets"),
        collection: opts.get("collection").map(|id| CollectionRef::Id(id.clone())),
        timeout_secs: config
            .get_source_timeout_secs()
            .await
            .map_err(|e| e.to_string())?,
        kind: TargetKind::Work,
        mapping,
    };

    let identifier_field = settings.mapping.identifier_field.clone();
    let single_valued = config
        .get_single_valued_fields()
        .await
        .map_err(|e| e.to_string())?;

    let bundle = resolve_format(settings).map_err(|e| e.to_string())?;
    let gateway = Arc::new(InMemoryGateway::new());
    let mut factory = ObjectFactory::new(gateway, identifier_field, single_valued);
    if let Some(depositor) = config.get_depositor().await.map_err(|e| e.to_string())? {
        factory = factory.with_depositor(depositor);
    }

    let importer = MetadataImporterImpl::new(importer_id, run_repo, bundle, factory);
    let summary = importer.run_import().await.map_err(|e| e.to_string())?;
    print_summary(&summary);
    Ok(())
}

async fn run_export_command(opts: &HashMap<String, String>, db_path: &str) -> Result<(), String> {
    let importer_id = required(opts, "importer")?;
    let output = required(opts, "output")?;

    let run_repo = SqliteRunRepository::new(db_path).map_err(|e| e.to_string())?;
    let exporter = CsvExporter::new(importer_id, run_repo);
    let summary = exporter
        .run_export(&PathBuf::from(output))
        .await
        .map_err(|e| e.to_string())?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("运行 {} [{}]", summary.run_id, summary.kind);
    println!(
        "  总数 {}  入队 {}  成功 {}  失败 {}  删除 {}",
        summary.total_records,
        summary.enqueued_records,
        summary.processed_records,
        summary.failed_records,
        summary.deleted_records
    );
    for failed in &summary.failed_entries {
        println!(
            "  失败: {} [{}] {}",
            failed.source_identifier,
            failed.error_class.as_deref().unwrap_or("-"),
            failed.error_message.as_deref().unwrap_or("-")
        );
    }
}

/// 解析 --key value / --flag 形式的选项
fn parse_options(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut opts = HashMap::new();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        let Some(key) = arg.strip_prefix("--") else {
            return Err(format!("非法参数: {}", arg));
        };
        let value = match iter.peek() {
            Some(next) if !next.starts_with("--") => iter.next().unwrap().clone(),
            _ => String::new(), // 布尔开关
        };
        opts.insert(key.to_string(), value);
    }
    Ok(opts)
}

fn required(opts: &HashMap<String, String>, key: &str) -> Result<String, String> {
    opts.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| format!("缺少必要参数 --{}", key))
}

fn default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    let dir = base.join("repo-bulk-import");
    let _ = std::fs::create_dir_all(&dir);
    dir.join("import.db").display().to_string()
}

fn print_usage() {
    println!("{} v{}", APP_NAME, VERSION);
    println!();
    println!("用法:");
    println!("  repo-bulk-import import --format <oai|csv|bagit> --location <URL或路径> \\");
    println!("      --importer <名称> [--rules <rules.json>] [--collection <集合标识符>] \\");
    println!("      [--set <OAI set>] [--collect-sets] [--db <数据库路径>]");
    println!("  repo-bulk-import export --importer <名称> --output <out.csv> [--db <数据库路径>]");
}
