// ==========================================
// 数字仓储批量导入导出系统 - 规则引擎层
// ==========================================
// 职责: 声明式字段规则 → 规范化属性集
// 组成: 规则编译 / 匹配器求值 / 值解析注册表 / 映射累积与后处理
// ==========================================

pub mod mapping;
pub mod matcher;
pub mod parse_registry;
pub mod rule;

pub use mapping::{Mapping, MappingConfig};
pub use matcher::{normalize_whitespace, MappedValue, Matcher};
pub use parse_registry::{ParseRegistry, ValueParser};
pub use rule::{
    is_reserved_property, CompiledRule, Condition, ConditionPredicate, FieldRule, SplitSpec,
    RESERVED_PROPERTIES,
};
