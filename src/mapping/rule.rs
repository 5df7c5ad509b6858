// ==========================================
// 数字仓储批量导入导出系统 - 声明式字段规则
// ==========================================
// 依据: Field_Mapping_Rules_v0.4.md - 标准字段规则表
// 红线: 规则集为一次构建的不可变值,正则在构建期编译,
// 运行期不存在可变的类级规则注册表
// ==========================================

use crate::domain::types::SplitDelimiters;
use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 保留属性集: 管道自身占用的目标字段,规则不得写入
pub const RESERVED_PROPERTIES: &[&str] = &[
    "id",
    "model",
    "delete",
    "file",
    "collection",
    "thumbnail_url",
];

/// 目标字段名是否为保留属性
pub fn is_reserved_property(name: &str) -> bool {
    RESERVED_PROPERTIES.contains(&name)
}

// ==========================================
// SplitSpec - 切分配置
// ==========================================
// true → 默认分隔符集;字符串 → 显式正则;false/缺省 → 不切分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SplitSpec {
    Flag(bool),
    Pattern(String),
}

impl Default for SplitSpec {
    fn default() -> Self {
        SplitSpec::Flag(false)
    }
}

// ==========================================
// Condition - 条件包含谓词
// ==========================================
// (谓词名, 模式) 对;谓词对原始值做编译后模式的匹配测试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionPredicate {
    Match,   // 模式命中则保留
    NoMatch, // 模式命中则丢弃
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub predicate: ConditionPredicate,
    pub pattern: String,
}

// ==========================================
// FieldRule - 声明式字段规则
// ==========================================
// 每目标字段每映射一条;from 中每个源字段名都会被索引到本规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub to: String,        // 目标字段
    pub from: Vec<String>, // 读取的源字段名列表
    #[serde(default)]
    pub split: SplitSpec,
    #[serde(default)]
    pub parsed: bool,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub excluded: bool,
}

impl FieldRule {
    pub fn renaming(to: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: vec![from.into()],
            split: SplitSpec::default(),
            parsed: false,
            condition: None,
            excluded: false,
        }
    }
}

// ==========================================
// CompiledRule - 编译后规则
// ==========================================
// 切分/条件正则在映射构建期编译一次;模式非法 → 构建期 RulePattern 错误
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: FieldRule,
    pub split_regex: Option<Regex>,
    pub condition_regex: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: FieldRule, delimiters: SplitDelimiters) -> ImportResult<Self> {
        let split_regex = match &rule.split {
            SplitSpec::Flag(false) => None,
            SplitSpec::Flag(true) => Some(compile_pattern(&rule.to, delimiters.pattern())?),
            SplitSpec::Pattern(pattern) => Some(compile_pattern(&rule.to, pattern)?),
        };

        let condition_regex = match &rule.condition {
            None => None,
            Some(cond) => Some(compile_pattern(&rule.to, &cond.pattern)?),
        };

        Ok(Self {
            rule,
            split_regex,
            condition_regex,
        })
    }
}

fn compile_pattern(to: &str, pattern: &str) -> ImportResult<Regex> {
    Regex::new(pattern).map_err(|e| ImportError::RulePattern {
        to: to.to_string(),
        message: e.to_string(),
    })
}
