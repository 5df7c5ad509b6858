// ==========================================
// 数字仓储批量导入导出系统 - 格式注册表
// ==========================================
// 依据: Harvest_Pipeline_Spec_v0.2.md - 1.1 策略装配
// 红线: 封闭注册表,格式枚举 → (解析器 × 映射 × 客户端) 策略束,
// 在配置期一次装配;不做运行时字符串到类型的反射解析
// ==========================================

use crate::domain::record::CollectionRef;
use crate::domain::types::{SourceFormat, TargetKind};
use crate::importer::error::ImportResult;
use crate::mapping::mapping::{Mapping, MappingConfig};
use crate::parser::bagit_parser::BagitRecordParser;
use crate::parser::csv_parser::CsvRecordParser;
use crate::parser::oai_parser::OaiParser;
use crate::parser::parser_trait::RecordParser;
use crate::source::bagit_source::BagitSourceClient;
use crate::source::client_trait::SourceClient;
use crate::source::csv_source::CsvSourceClient;
use crate::source::oai_client::OaiClient;
use std::sync::Arc;

// ==========================================
// ParserSettings - 装配输入
// ==========================================
#[derive(Debug, Clone)]
pub struct ParserSettings {
    pub importer_id: String,
    pub format: SourceFormat,
    /// OAI 端点 URL / CSV 文件路径 / BagIt 目录
    pub location: String,
    /// OAI set 限定（仅 OAI 有效）
    pub set_spec: Option<String>,
    /// "归入名为 X 的集合" 模式（仅 OAI 有效）
    pub collect_into_set: bool,
    /// 固定集合归属
    pub collection: Option<CollectionRef>,
    /// 源抓取超时秒数
    pub timeout_secs: u64,
    /// 目标实体类型
    pub kind: TargetKind,
    pub mapping: MappingConfig,
}

// ==========================================
// FormatBundle - 装配产物
// ==========================================
// 每格式一束协作策略,配置期装配完成
pub struct FormatBundle {
    pub parser: Box<dyn RecordParser>,
    pub client: Arc<dyn SourceClient>,
    pub mapping: Arc<Mapping>,
    pub kind: TargetKind,
}

/// 按格式枚举装配策略束
pub fn resolve_format(settings: ParserSettings) -> ImportResult<FormatBundle> {
    let identifier_field = settings.mapping.identifier_field.clone();
    let mapping = Arc::new(Mapping::new(settings.mapping)?);

    let (parser, client): (Box<dyn RecordParser>, Arc<dyn SourceClient>) = match settings.format {
        SourceFormat::Oai => {
            let client = Arc::new(OaiClient::new(
                settings.location,
                settings.set_spec,
                settings.timeout_secs,
            )?);
            let parser = OaiParser::new(
                client.clone(),
                settings.importer_id,
                settings.collect_into_set,
                settings.collection,
            );
            (Box::new(parser), client)
        }
        SourceFormat::Csv => {
            let client = Arc::new(CsvSourceClient::new(settings.location, identifier_field));
            let parser =
                CsvRecordParser::new(client.clone(), settings.importer_id, settings.collection);
            (Box::new(parser), client)
        }
        SourceFormat::Bagit => {
            let client = Arc::new(BagitSourceClient::new(settings.location, identifier_field));
            let parser =
                BagitRecordParser::new(client.clone(), settings.importer_id, settings.collection);
            (Box::new(parser), client)
        }
    };

    Ok(FormatBundle {
        parser,
        client,
        mapping,
        kind: settings.kind,
    })
}
