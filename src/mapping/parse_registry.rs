// ==========================================
// 数字仓储批量导入导出系统 - 值解析注册表
// ==========================================
// 依据: Field_Mapping_Rules_v0.4.md - 格式化解析函数表
// 红线: 目标字段名 → 解析函数的显式映射,可枚举可穷举测试,
// 不做"存在即调用"的反射式派发;未注册字段恒等通过
// ==========================================

use crate::domain::types::MimeFallback;
use std::collections::HashMap;

// ==========================================
// ValueParser - 解析函数种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueParser {
    Language,     // ISO 639 语言代码 → 语言名
    FormatLabel,  // MIME 类型 → 规范格式标签
    SentenceCase, // 自由文本 → 句首大写
    TitleCase,    // 自由文本 → 逐词首字母大写
}

// ==========================================
// ParseRegistry - 按目标字段名的解析注册表
// ==========================================
// 每映射变体持有一份;变体差异仅在未识别 MIME 的回退行为
#[derive(Debug, Clone)]
pub struct ParseRegistry {
    entries: HashMap<String, ValueParser>,
    mime_fallback: MimeFallback,
}

impl ParseRegistry {
    /// 标准注册表（OAI/CSV/BagIt 共用的字段约定）
    pub fn standard(mime_fallback: MimeFallback) -> Self {
        let mut entries = HashMap::new();
        entries.insert("language".to_string(), ValueParser::Language);
        entries.insert("format".to_string(), ValueParser::FormatLabel);
        entries.insert("subject".to_string(), ValueParser::SentenceCase);
        entries.insert("resource_type".to_string(), ValueParser::TitleCase);
        Self {
            entries,
            mime_fallback,
        }
    }

    /// 注册/覆盖单个字段的解析函数（构建期使用）
    pub fn register(&mut self, field: impl Into<String>, parser: ValueParser) {
        self.entries.insert(field.into(), parser);
    }

    pub fn mime_fallback(&self) -> MimeFallback {
        self.mime_fallback
    }

    /// 已注册字段列表（穷举测试用）
    pub fn registered_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = self.entries.keys().map(|k| k.as_str()).collect();
        fields.sort_unstable();
        fields
    }

    /// 对单个值应用解析
    ///
    /// # 返回
    /// - Some(v): 解析结果（未注册字段恒等返回原值）
    /// - None: 解析为空,调用方丢弃该元素
    pub fn parse(&self, field: &str, value: &str) -> Option<String> {
        match self.entries.get(field) {
            None => Some(value.to_string()),
            Some(ValueParser::Language) => Some(language_name(value)),
            Some(ValueParser::FormatLabel) => format_label(value, self.mime_fallback),
            Some(ValueParser::SentenceCase) => Some(sentence_case(value)),
            Some(ValueParser::TitleCase) => Some(title_case(value)),
        }
    }
}

/// ISO 639-1/639-2 语言代码查表;未收录代码原样通过
pub fn language_name(code: &str) -> String {
    match code.trim().to_ascii_lowercase().as_str() {
        "en" | "eng" => "English".to_string(),
        "fr" | "fre" | "fra" => "French".to_string(),
        "de" | "ger" | "deu" => "German".to_string(),
        "es" | "spa" => "Spanish".to_string(),
        "it" | "ita" => "Italian".to_string(),
        "pt" | "por" => "Portuguese".to_string(),
        "ru" | "rus" => "Russian".to_string(),
        "ja" | "jpn" => "Japanese".to_string(),
        "zh" | "chi" | "zho" => "Chinese".to_string(),
        "ko" | "kor" => "Korean".to_string(),
        "ar" | "ara" => "Arabic".to_string(),
        "nl" | "dut" | "nld" => "Dutch".to_string(),
        "sv" | "swe" => "Swedish".to_string(),
        "da" | "dan" => "Danish".to_string(),
        "no" | "nor" => "Norwegian".to_string(),
        "pl" | "pol" => "Polish".to_string(),
        "el" | "gre" | "ell" => "Greek".to_string(),
        "he" | "heb" => "Hebrew".to_string(),
        "hi" | "hin" => "Hindi".to_string(),
        "la" | "lat" => "Latin".to_string(),
        _ => code.to_string(),
    }
}

/// MIME 类型 → 规范格式标签（穷举 case 表）
///
/// 未收录类型的回退按变体:
/// - [`MimeFallback::Null`]: 返回 None,该值被丢弃
/// - [`MimeFallback::TitleCase`]: 逐段首字母大写原样回传
pub fn format_label(mime: &str, fallback: MimeFallback) -> Option<String> {
    let label = match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "JPEG",
        "image/png" => "PNG",
        "image/tiff" => "TIFF",
        "image/jp2" => "JP2",
        "image/gif" => "GIF",
        "image/bmp" => "BMP",
        "application/pdf" => "PDF",
        "text/plain" => "Text",
        "text/html" => "HTML",
        "text/csv" => "CSV",
        "application/xml" | "text/xml" => "XML",
        "application/json" => "JSON",
        "audio/mpeg" | "audio/mp3" => "MP3",
        "audio/wav" | "audio/x-wav" => "WAV",
        "audio/flac" => "FLAC",
        "video/mp4" => "MP4",
        "video/quicktime" => "MOV",
        "video/x-msvideo" => "AVI",
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "Word",
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "Excel",
        "application/vnd.ms-powerpoint"
        | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            "PowerPoint"
        }
        "application/zip" => "ZIP",
        _ => {
            return match fallback {
                MimeFallback::Null => None,
                MimeFallback::TitleCase => Some(title_case_segments(mime)),
            }
        }
    };
    Some(label.to_string())
}

/// 句首大写: 首字符大写,其余小写
pub fn sentence_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str()
        }
    }
}

/// 逐词首字母大写（词按空白切分）
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| sentence_case(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 逐段首字母大写,段按 '/'、'-'、空白切分且分隔符保留
/// 例: "application/unknown-type" → "Application/Unknown-Type"
pub fn title_case_segments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_segment_start = true;
    for c in value.chars() {
        if matches!(c, '/' | '-') || c.is_whitespace() {
            out.push(c);
            at_segment_start = true;
        } else if at_segment_start {
            out.extend(c.to_uppercase());
            at_segment_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}
