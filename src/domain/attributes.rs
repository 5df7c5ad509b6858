// ==========================================
// 数字仓储批量导入导出系统 - 规范化属性集
// ==========================================
// 依据: Field_Mapping_Rules_v0.4.md - 属性累积与合并语义
// 红线: 多值字段保持写入顺序;标识符类字段采用 URL 优先合并
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 规范化属性集: 目标字段名 → 有序值序列
///
/// 由规则引擎对原始记录逐字段累积构建;同名字段后续值追加,
/// 标识符类字段例外（见 [`NormalizedAttributes::merge_identifier`]）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAttributes {
    values: BTreeMap<String, Vec<String>>,
}

impl NormalizedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加值（已存在则数组拼接,保持插入顺序）
    pub fn append(&mut self, field: &str, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        self.values.entry(field.to_string()).or_default().extend(values);
    }

    /// 覆盖写入（替换该字段的全部现有值）
    pub fn replace(&mut self, field: &str, values: Vec<String>) {
        self.values.insert(field.to_string(), values);
    }

    /// 标识符类字段的双源合并
    ///
    /// # 规则
    /// - 新值中存在 URL 形值（`scheme://` 前缀）→ 取新值
    /// - 仅旧值存在 URL 形值 → 保留旧值
    /// - 两侧均无（或均有,已被第一条覆盖）→ 确定性取第二来源（新值）
    pub fn merge_identifier(&mut self, field: &str, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        match self.values.get(field) {
            None => {
                self.values.insert(field.to_string(), values);
            }
            Some(existing) => {
                let new_has_url = values.iter().any(|v| is_url_shaped(v));
                let old_has_url = existing.iter().any(|v| is_url_shaped(v));
                if new_has_url || !old_has_url {
                    self.values.insert(field.to_string(), values);
                }
                // 仅旧值为 URL 形: 保留旧值,不动
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.values.get(field).map(|v| v.as_slice())
    }

    /// 取字段首值
    pub fn first(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|v| v.first()).map(|s| s.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.get(field).map(|v| !v.is_empty()).unwrap_or(false)
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<String>> {
        self.values.remove(field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 按字段名字典序迭代（序列化/导出确定性依赖此序）
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// 审计用 JSON 快照
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.values)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self {
            values: serde_json::from_str(json)?,
        })
    }
}

/// 是否为绝对 URL 形值（`scheme://`）
pub fn is_url_shaped(value: &str) -> bool {
    match value.find("://") {
        None => false,
        Some(pos) => {
            if pos == 0 {
                return false;
            }
            let scheme = &value[..pos];
            let mut chars = scheme.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() => {}
                _ => return false,
            }
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
    }
}
