// ==========================================
// 数字仓储批量导入导出系统 - 字段匹配器
// ==========================================
// 依据: Field_Mapping_Rules_v0.4.md - 规则求值次序
// 求值次序固定: 排除/保留属性 → 条件谓词 → 空白规整 → 切分
// → 单元素折叠 → 格式化解析;任何一步落空即整体落空
// ==========================================

use crate::mapping::parse_registry::ParseRegistry;
use crate::mapping::rule::{CompiledRule, ConditionPredicate};

// ==========================================
// MappedValue - 匹配产出
// ==========================================
// 单值保持标量;切分产生的多值保持切分顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedValue {
    Single(String),
    Multiple(Vec<String>),
}

impl MappedValue {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            MappedValue::Single(v) => vec![v],
            MappedValue::Multiple(vs) => vs,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MappedValue::Single(_) => 1,
            MappedValue::Multiple(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MappedValue::Multiple(vs) if vs.is_empty())
    }
}

// ==========================================
// Matcher - 规则求值器
// ==========================================
pub struct Matcher {
    registry: ParseRegistry,
}

impl Matcher {
    pub fn new(registry: ParseRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ParseRegistry {
        &self.registry
    }

    /// 对单个原始值应用一条编译后规则
    ///
    /// # 返回
    /// - Some(MappedValue): 规范化产出
    /// - None: 值被排除/条件不满足/解析后为空
    pub fn apply(&self, raw_value: &str, rule: &CompiledRule) -> Option<MappedValue> {
        // 1. 排除规则与保留属性恒不产出
        if rule.rule.excluded || crate::mapping::rule::is_reserved_property(&rule.rule.to) {
            return None;
        }

        // 2. 条件谓词针对原始值求值（规整之前）
        if let (Some(cond), Some(regex)) = (&rule.rule.condition, &rule.condition_regex) {
            let hit = regex.is_match(raw_value);
            let keep = match cond.predicate {
                ConditionPredicate::Match => hit,
                ConditionPredicate::NoMatch => !hit,
            };
            if !keep {
                return None;
            }
        }

        // 3. 空白规整
        let normalized = normalize_whitespace(raw_value);
        if normalized.is_empty() {
            return None;
        }

        // 4. 切分 + 5. 单元素折叠
        let value = match &rule.split_regex {
            None => MappedValue::Single(normalized),
            Some(regex) => {
                let mut parts: Vec<String> = regex
                    .split(&normalized)
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                if parts.len() == 1 {
                    MappedValue::Single(parts.remove(0))
                } else {
                    MappedValue::Multiple(parts)
                }
            }
        };

        // 6. 格式化解析,逐元素应用,解析为空的元素丢弃
        if rule.rule.parsed {
            let to = rule.rule.to.as_str();
            let parsed = match value {
                MappedValue::Single(v) => self.registry.parse(to, &v).map(MappedValue::Single),
                MappedValue::Multiple(vs) => {
                    let mut kept: Vec<String> =
                        vs.iter().filter_map(|v| self.registry.parse(to, v)).collect();
                    if kept.is_empty() {
                        None
                    } else if kept.len() == 1 {
                        Some(MappedValue::Single(kept.remove(0)))
                    } else {
                        Some(MappedValue::Multiple(kept))
                    }
                }
            };
            return parsed;
        }

        Some(value)
    }
}

/// 空白规整: 换行/制表/空格连续段折叠为单空格,去首尾空白
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MimeFallback, SplitDelimiters};
    use crate::mapping::parse_registry::ParseRegistry;
    use crate::mapping::rule::{Condition, FieldRule, SplitSpec};

    fn matcher() -> Matcher {
        Matcher::new(ParseRegistry::standard(MimeFallback::Null))
    }

    fn compile(rule: FieldRule) -> CompiledRule {
        CompiledRule::compile(rule, SplitDelimiters::ColonSemicolonPipe).unwrap()
    }

    #[test]
    fn test_split_true_default_delimiters() {
        let mut rule = FieldRule::renaming("subject", "subject");
        rule.split = SplitSpec::Flag(true);
        let result = matcher().apply("a ; b : c | d", &compile(rule)).unwrap();
        assert_eq!(
            result,
            MappedValue::Multiple(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string()
            ])
        );
    }

    #[test]
    fn test_split_explicit_semicolon_only() {
        let mut rule = FieldRule::renaming("subject", "subject");
        rule.split = SplitSpec::Pattern(";".to_string());
        let result = matcher().apply("a ; b : c | d", &compile(rule)).unwrap();
        assert_eq!(
            result,
            MappedValue::Multiple(vec!["a".to_string(), "b : c | d".to_string()])
        );
    }

    #[test]
    fn test_split_false_returns_normalized_scalar() {
        let rule = FieldRule::renaming("title", "title");
        let result = matcher().apply("  第一行\n\t第二行  ", &compile(rule)).unwrap();
        assert_eq!(result, MappedValue::Single("第一行 第二行".to_string()));
    }

    #[test]
    fn test_single_element_split_collapses_to_scalar() {
        let mut rule = FieldRule::renaming("subject", "subject");
        rule.split = SplitSpec::Flag(true);
        let result = matcher().apply("only-one", &compile(rule)).unwrap();
        assert_eq!(result, MappedValue::Single("only-one".to_string()));
    }

    #[test]
    fn test_reserved_target_always_null() {
        let mut rule = FieldRule::renaming("id", "identifier");
        rule.split = SplitSpec::Flag(true);
        rule.parsed = true;
        assert!(matcher().apply("任何值", &compile(rule)).is_none());
    }

    #[test]
    fn test_excluded_always_null() {
        let mut rule = FieldRule::renaming("title", "title");
        rule.excluded = true;
        assert!(matcher().apply("任何值", &compile(rule)).is_none());
    }

    #[test]
    fn test_condition_match_keeps() {
        let mut rule = FieldRule::renaming("date_created", "date");
        rule.condition = Some(Condition {
            predicate: crate::mapping::rule::ConditionPredicate::Match,
            pattern: r"^\d{4}".to_string(),
        });
        let m = matcher();
        assert!(m.apply("2020-01-01", &compile(rule.clone())).is_some());
        assert!(m.apply("未注明日期", &compile(rule)).is_none());
    }

    #[test]
    fn test_condition_no_match_drops() {
        let mut rule = FieldRule::renaming("description", "note");
        rule.condition = Some(Condition {
            predicate: crate::mapping::rule::ConditionPredicate::NoMatch,
            pattern: "内部".to_string(),
        });
        let m = matcher();
        assert!(m.apply("公开说明", &compile(rule.clone())).is_some());
        assert!(m.apply("内部备注", &compile(rule)).is_none());
    }

    #[test]
    fn test_parsed_subject_sentence_case() {
        let mut rule = FieldRule::renaming("subject", "subject");
        rule.split = SplitSpec::Flag(true);
        rule.parsed = true;
        let result = matcher().apply("fish ; birds", &compile(rule)).unwrap();
        assert_eq!(
            result,
            MappedValue::Multiple(vec!["Fish".to_string(), "Birds".to_string()])
        );
    }

    #[test]
    fn test_parsed_unknown_mime_dropped_in_null_variant() {
        let mut rule = FieldRule::renaming("format", "format");
        rule.parsed = true;
        assert!(matcher()
            .apply("application/unknown-type", &compile(rule))
            .is_none());
    }

    #[test]
    fn test_empty_after_normalize_is_null() {
        let rule = FieldRule::renaming("title", "title");
        assert!(matcher().apply("   \n\t  ", &compile(rule)).is_none());
    }
}
