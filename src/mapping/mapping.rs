// ==========================================
// 数字仓储批量导入导出系统 - 映射器
// ==========================================
// 依据: Field_Mapping_Rules_v0.4.md - 映射累积与后处理
// 职责: 按序对原始记录逐字段应用规则,累积规范化属性,
// 再执行三步固定后处理（缩略图/贡献机构/权利声明）
// 红线: build_attributes 为纯函数,同记录两次求值产出一致
// ==========================================

use crate::domain::attributes::NormalizedAttributes;
use crate::domain::record::RawRecord;
use crate::domain::types::{MimeFallback, SplitDelimiters};
use crate::importer::error::ImportResult;
use crate::mapping::matcher::Matcher;
use crate::mapping::parse_registry::ParseRegistry;
use crate::mapping::rule::{is_reserved_property, CompiledRule, FieldRule};
use std::collections::HashMap;

/// 缩略图模板中的记录标识符占位符
pub const IDENTIFIER_PLACEHOLDER: &str = "{identifier}";

/// 贡献机构目标字段
pub const FIELD_CONTRIBUTING_INSTITUTION: &str = "contributing_institution";
/// 权利声明目标字段
pub const FIELD_RIGHTS_STATEMENT: &str = "rights_statement";
/// 缩略图来源目标字段（保留属性,仅后处理写入）
pub const FIELD_THUMBNAIL_URL: &str = "thumbnail_url";

// ==========================================
// MappingConfig - 映射变体配置
// ==========================================
// 每源格式一份;变体差异（分隔符集/MIME 回退/未知字段透传）全部显式
#[derive(Debug, Clone)]
pub struct MappingConfig {
    pub rules: Vec<FieldRule>,
    pub split_delimiters: SplitDelimiters,
    pub mime_fallback: MimeFallback,
    /// 未命中规则的源字段是否按原名透传
    pub passthrough_unknown: bool,
    /// 标识符类目标字段（双源合并走 URL 优先）
    pub identifier_field: String,
    /// 外部提供的贡献机构名,覆盖任何抓取值
    pub institution: Option<String>,
    /// 外部提供的权利声明覆盖值
    pub rights_override: Option<String>,
    /// 强制覆盖: false 时记录已有权利值则保留原值
    pub rights_override_forced: bool,
    /// 缩略图 URL 模板,含 {identifier} 占位符
    pub thumbnail_url_template: Option<String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            split_delimiters: SplitDelimiters::ColonSemicolonPipe,
            mime_fallback: MimeFallback::Null,
            passthrough_unknown: true,
            identifier_field: "source_identifier".to_string(),
            institution: None,
            rights_override: None,
            rights_override_forced: false,
            thumbnail_url_template: None,
        }
    }
}

// ==========================================
// Mapping - 单源格式的规则集合
// ==========================================
pub struct Mapping {
    compiled: Vec<CompiledRule>,
    /// 源字段名 → 规则下标列表（from 含多名时逐名登记;同名多规则按声明序全部应用）
    index: HashMap<String, Vec<usize>>,
    matcher: Matcher,
    config: MappingConfig,
}

impl Mapping {
    /// 构建映射（规则正则在此一次性编译,模式非法即失败）
    pub fn new(config: MappingConfig) -> ImportResult<Self> {
        let mut compiled = Vec::with_capacity(config.rules.len());
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, rule) in config.rules.iter().enumerate() {
            for from in &rule.from {
                index.entry(from.clone()).or_default().push(pos);
            }
            compiled.push(CompiledRule::compile(rule.clone(), config.split_delimiters)?);
        }

        let matcher = Matcher::new(ParseRegistry::standard(config.mime_fallback));

        Ok(Self {
            compiled,
            index,
            matcher,
            config,
        })
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// 原始记录 → 规范化属性集
    pub fn build_attributes(&self, record: &RawRecord) -> NormalizedAttributes {
        let mut attrs = NormalizedAttributes::new();
        let id_field = self.config.identifier_field.as_str();

        // 头部标识符先行写入;记录体映射出的标识符按 URL 优先合并
        if !record.source_identifier.is_empty() {
            attrs.merge_identifier(id_field, vec![record.source_identifier.clone()]);
        }

        for field in &record.fields {
            match self.index.get(&field.name) {
                Some(rule_positions) => {
                    for &pos in rule_positions {
                        let rule = &self.compiled[pos];
                        if let Some(value) = self.matcher.apply(&field.value, rule) {
                            let to = rule.rule.to.as_str();
                            if to == id_field {
                                attrs.merge_identifier(to, value.into_vec());
                            } else {
                                attrs.append(to, value.into_vec());
                            }
                        }
                    }
                }
                None => {
                    // 默认恒等映射: 未命中规则的字段按原名透传（保留属性除外）
                    if self.config.passthrough_unknown && !is_reserved_property(&field.name) {
                        if field.name == id_field {
                            attrs.merge_identifier(id_field, vec![field.value.clone()]);
                        } else {
                            attrs.append(&field.name, vec![field.value.clone()]);
                        }
                    }
                }
            }
        }

        self.post_process(record, &mut attrs);
        attrs
    }

    /// 三步固定后处理
    fn post_process(&self, record: &RawRecord, attrs: &mut NormalizedAttributes) {
        // 1. 缩略图来源: 模板对记录标识符插值
        if let Some(template) = &self.config.thumbnail_url_template {
            let url = template.replace(IDENTIFIER_PLACEHOLDER, &record.source_identifier);
            attrs.replace(FIELD_THUMBNAIL_URL, vec![url]);
        }

        // 2. 贡献机构: 外部机构名覆盖任何抓取值
        if let Some(institution) = &self.config.institution {
            attrs.replace(FIELD_CONTRIBUTING_INSTITUTION, vec![institution.clone()]);
        }

        // 3. 权利声明: 覆盖值生效,除非记录已有权利值且未强制
        if let Some(rights) = &self.config.rights_override {
            if self.config.rights_override_forced || !attrs.contains(FIELD_RIGHTS_STATEMENT) {
                attrs.replace(FIELD_RIGHTS_STATEMENT, vec![rights.clone()]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::rule::SplitSpec;

    fn record(fields: &[(&str, &str)]) -> RawRecord {
        let mut raw = RawRecord::new("rec-1");
        for (name, value) in fields {
            raw.push_field(*name, *value);
        }
        raw
    }

    fn date_subject_rules() -> Vec<FieldRule> {
        let mut date = FieldRule::renaming("date_created", "date");
        date.split = SplitSpec::Flag(true);
        let mut subject = FieldRule::renaming("subject", "subject");
        subject.split = SplitSpec::Flag(true);
        subject.parsed = true;
        vec![date, subject]
    }

    #[test]
    fn test_build_attributes_date_subject_scenario() {
        let config = MappingConfig {
            rules: date_subject_rules(),
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[
            ("date", "2020-01-01"),
            ("subject", "fish ; birds"),
        ]));

        assert_eq!(attrs.get("date_created").unwrap(), &["2020-01-01".to_string()]);
        assert_eq!(
            attrs.get("subject").unwrap(),
            &["Fish".to_string(), "Birds".to_string()]
        );
    }

    #[test]
    fn test_build_attributes_is_pure() {
        let config = MappingConfig {
            rules: date_subject_rules(),
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let raw = record(&[("date", "2020-01-01"), ("subject", "fish ; birds")]);

        let first = mapping.build_attributes(&raw);
        let second = mapping.build_attributes(&raw);
        assert_eq!(first, second);
    }

    #[test]
    fn test_multi_source_rule_accumulates() {
        let mut rule = FieldRule::renaming("creator", "author");
        rule.from.push("contributor".to_string());
        let config = MappingConfig {
            rules: vec![rule],
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[
            ("author", "张三"),
            ("contributor", "李四"),
        ]));

        assert_eq!(
            attrs.get("creator").unwrap(),
            &["张三".to_string(), "李四".to_string()]
        );
    }

    #[test]
    fn test_unknown_field_passthrough() {
        let mapping = Mapping::new(MappingConfig::default()).unwrap();
        let attrs = mapping.build_attributes(&record(&[("publisher", "某出版社")]));
        assert_eq!(attrs.get("publisher").unwrap(), &["某出版社".to_string()]);
    }

    #[test]
    fn test_unknown_field_filtered_when_passthrough_off() {
        let config = MappingConfig {
            passthrough_unknown: false,
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[("publisher", "某出版社")]));
        assert!(!attrs.contains("publisher"));
    }

    #[test]
    fn test_header_identifier_body_url_merge() {
        let rule = FieldRule::renaming("source_identifier", "identifier");
        let config = MappingConfig {
            rules: vec![rule],
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();

        let mut raw = RawRecord::new("abc123");
        raw.push_field("identifier", "http://example.org/abc");
        let attrs = mapping.build_attributes(&raw);

        assert_eq!(
            attrs.get("source_identifier").unwrap(),
            &["http://example.org/abc".to_string()]
        );
    }

    #[test]
    fn test_thumbnail_template_interpolation() {
        let config = MappingConfig {
            thumbnail_url_template: Some(
                "https://img.example.org/{identifier}/thumb.jpg".to_string(),
            ),
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[]));

        assert_eq!(
            attrs.get("thumbnail_url").unwrap(),
            &["https://img.example.org/rec-1/thumb.jpg".to_string()]
        );
    }

    #[test]
    fn test_institution_replaces_scraped_value() {
        let config = MappingConfig {
            institution: Some("市立图书馆".to_string()),
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs =
            mapping.build_attributes(&record(&[("contributing_institution", "抓取值")]));

        assert_eq!(
            attrs.get("contributing_institution").unwrap(),
            &["市立图书馆".to_string()]
        );
    }

    #[test]
    fn test_rights_override_yields_to_existing_value() {
        let config = MappingConfig {
            rights_override: Some("CC-BY-4.0".to_string()),
            rights_override_forced: false,
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[("rights_statement", "原有版权说明")]));

        assert_eq!(
            attrs.get("rights_statement").unwrap(),
            &["原有版权说明".to_string()]
        );
    }

    #[test]
    fn test_rights_override_forced_wins() {
        let config = MappingConfig {
            rights_override: Some("CC-BY-4.0".to_string()),
            rights_override_forced: true,
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[("rights_statement", "原有版权说明")]));

        assert_eq!(attrs.get("rights_statement").unwrap(), &["CC-BY-4.0".to_string()]);
    }

    #[test]
    fn test_rights_override_fills_missing() {
        let config = MappingConfig {
            rights_override: Some("CC-BY-4.0".to_string()),
            rights_override_forced: false,
            ..Default::default()
        };
        let mapping = Mapping::new(config).unwrap();
        let attrs = mapping.build_attributes(&record(&[]));

        assert_eq!(attrs.get("rights_statement").unwrap(), &["CC-BY-4.0".to_string()]);
    }
}
