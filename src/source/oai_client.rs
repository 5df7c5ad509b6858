// ==========================================
// 数字仓储批量导入导出系统 - OAI-PMH 客户端
// ==========================================
// 职责: ListRecords/GetRecord/ListSets 三个动词 + oai_dc 载荷抽取
// 红线: HTTP 请求必须带超时;超时/断连是可重试的单记录错误
// 说明: 响应仅涉及 oai_dc 小子集,按定界标签扫描抽取,
// 字段保持文档序;实体转义按 XML 五实体处理
// ==========================================

use crate::domain::record::{RawField, RawRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::source::client_trait::{RawRecordPage, SourceClient, SourceSet};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// 无记录命中的 OAI 错误码（按空页处理,不报错）
const NO_RECORDS_MATCH: &str = "noRecordsMatch";

// ==========================================
// OaiClient
// ==========================================
pub struct OaiClient {
    http: reqwest::Client,
    base_url: String,
    metadata_prefix: String,
    set_spec: Option<String>,
}

impl OaiClient {
    /// 创建客户端
    ///
    /// # 参数
    /// - base_url: OAI-PMH 端点（不含查询串）
    /// - set_spec: 限定收割的 set（可选）
    /// - timeout_secs: 单请求超时秒数
    pub fn new(
        base_url: impl Into<String>,
        set_spec: Option<String>,
        timeout_secs: u64,
    ) -> ImportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            metadata_prefix: "oai_dc".to_string(),
            set_spec,
        })
    }

    pub fn set_spec(&self) -> Option<&str> {
        self.set_spec.as_deref()
    }

    async fn fetch(&self, query: &[(&str, &str)]) -> ImportResult<String> {
        let response = self.http.get(&self.base_url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::SourceFetch {
                message: format!("OAI 端点返回 HTTP {}", status),
                retryable: status.is_server_error(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceClient for OaiClient {
    async fn list(&self, resumption: Option<String>) -> ImportResult<RawRecordPage> {
        // 有续传令牌时仅允许携带 verb + resumptionToken
        let body = match &resumption {
            Some(token) => {
                debug!(token = %token, "OAI ListRecords 续传");
                self.fetch(&[("verb", "ListRecords"), ("resumptionToken", token)])
                    .await?
            }
            None => {
                let mut query: Vec<(&str, &str)> = vec![
                    ("verb", "ListRecords"),
                    ("metadataPrefix", &self.metadata_prefix),
                ];
                if let Some(set) = &self.set_spec {
                    query.push(("set", set));
                }
                self.fetch(&query).await?
            }
        };
        parse_list_records_response(&body)
    }

    async fn get(&self, identifier: &str) -> ImportResult<RawRecord> {
        let body = self
            .fetch(&[
                ("verb", "GetRecord"),
                ("identifier", identifier),
                ("metadataPrefix", &self.metadata_prefix),
            ])
            .await?;
        parse_get_record_response(&body)
    }

    async fn list_sets(&self) -> ImportResult<Vec<SourceSet>> {
        let body = self.fetch(&[("verb", "ListSets")]).await?;
        parse_list_sets_response(&body)
    }
}

// ==========================================
// 响应抽取（与 HTTP 解耦,可离线测试）
// ==========================================

pub(crate) fn parse_list_records_response(xml: &str) -> ImportResult<RawRecordPage> {
    check_oai_error(xml)?;
    if is_no_records_match(xml) {
        return Ok(RawRecordPage::empty());
    }

    let records = extract_blocks(xml, "record")
        .into_iter()
        .map(|block| parse_record_block(&block))
        .collect::<ImportResult<Vec<_>>>()?;

    let (next_token, complete_list_size) = parse_resumption(xml);

    Ok(RawRecordPage {
        records,
        next_token,
        complete_list_size,
    })
}

pub(crate) fn parse_get_record_response(xml: &str) -> ImportResult<RawRecord> {
    check_oai_error(xml)?;
    let block = extract_blocks(xml, "record")
        .into_iter()
        .next()
        .ok_or_else(|| ImportError::SourceFetch {
            message: "GetRecord 响应缺少 record 元素".to_string(),
            retryable: false,
        })?;
    parse_record_block(&block)
}

pub(crate) fn parse_list_sets_response(xml: &str) -> ImportResult<Vec<SourceSet>> {
    check_oai_error(xml)?;
    let sets = extract_blocks(xml, "set")
        .into_iter()
        .filter_map(|block| {
            let spec = extract_first(&block.inner, "setSpec")?;
            let name = extract_first(&block.inner, "setName")?;
            Some(SourceSet {
                spec: unescape_xml(&spec),
                name: unescape_xml(&name),
            })
        })
        .collect();
    Ok(sets)
}

fn is_no_records_match(xml: &str) -> bool {
    extract_blocks(xml, "error")
        .iter()
        .any(|b| attr_value(&b.attrs, "code").as_deref() == Some(NO_RECORDS_MATCH))
}

fn check_oai_error(xml: &str) -> ImportResult<()> {
    for block in extract_blocks(xml, "error") {
        let code = attr_value(&block.attrs, "code").unwrap_or_default();
        if code == NO_RECORDS_MATCH {
            continue;
        }
        warn!(code = %code, "OAI 端点报错");
        return Err(ImportError::SourceFetch {
            message: format!("OAI 错误 [{}]: {}", code, unescape_xml(block.inner.trim())),
            retryable: false,
        });
    }
    Ok(())
}

fn parse_record_block(block: &TagBlock) -> ImportResult<RawRecord> {
    let header = extract_blocks(&block.inner, "header")
        .into_iter()
        .next()
        .ok_or_else(|| ImportError::SourceFetch {
            message: "record 缺少 header 元素".to_string(),
            retryable: false,
        })?;

    let identifier = extract_first(&header.inner, "identifier")
        .map(|v| unescape_xml(v.trim()))
        .ok_or_else(|| ImportError::SourceFetch {
            message: "record header 缺少 identifier".to_string(),
            retryable: false,
        })?;

    let deleted = attr_value(&header.attrs, "status").as_deref() == Some("deleted");

    let mut record = RawRecord::new(identifier);
    record.deleted = deleted;
    record.payload = block.raw.clone();

    // 删除型记录不携带 metadata
    if !deleted {
        if let Some(metadata) = extract_blocks(&block.inner, "metadata").into_iter().next() {
            record.fields = parse_dc_fields(&metadata.inner);
        }
    }

    Ok(record)
}

/// 抽取 metadata 块内的 dc:* 元素,保持文档序
fn parse_dc_fields(metadata: &str) -> Vec<RawField> {
    let mut fields = Vec::new();
    let mut rest = metadata;
    while let Some(start) = rest.find("<dc:") {
        let after = &rest[start + 4..];
        let name_end = match after.find(|c: char| c == '>' || c == ' ' || c == '/') {
            Some(pos) => pos,
            None => break,
        };
        let name = &after[..name_end];
        // 定位开标签结束
        let tag_close = match after.find('>') {
            Some(pos) => pos,
            None => break,
        };
        // 自闭合标签无值,跳过
        if after[..tag_close].ends_with('/') {
            rest = &after[tag_close + 1..];
            continue;
        }
        let content_start = tag_close + 1;
        let close_tag = format!("</dc:{}>", name);
        match after[content_start..].find(&close_tag) {
            Some(end) => {
                let value = unescape_xml(after[content_start..content_start + end].trim());
                if !value.is_empty() {
                    fields.push(RawField::new(name, value));
                }
                rest = &after[content_start + end + close_tag.len()..];
            }
            None => break,
        }
    }
    fields
}

fn parse_resumption(xml: &str) -> (Option<String>, Option<u64>) {
    match extract_blocks(xml, "resumptionToken").into_iter().next() {
        None => (None, None),
        Some(block) => {
            let token = {
                let t = block.inner.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(unescape_xml(t))
                }
            };
            let size = attr_value(&block.attrs, "completeListSize")
                .and_then(|v| v.parse::<u64>().ok());
            (token, size)
        }
    }
}

// ==========================================
// 定界标签扫描
// ==========================================

struct TagBlock {
    inner: String, // 开闭标签之间的内容
    attrs: String, // 开标签属性串
    raw: String,   // 含标签的完整片段
}

/// 抽取全部 `<tag ...>...</tag>` 块（非嵌套同名标签）
fn extract_blocks(xml: &str, tag: &str) -> Vec<TagBlock> {
    let open_prefix = format!("<{}", tag);
    let close_tag = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(&open_prefix) {
        let after_prefix = &rest[start + open_prefix.len()..];
        // 必须是完整标签名（后随空白、'>' 或 '/'）
        match after_prefix.chars().next() {
            Some(c) if c == '>' || c == ' ' || c == '/' || c == '\t' || c == '\n' => {}
            _ => {
                rest = &rest[start + open_prefix.len()..];
                continue;
            }
        }
        let tag_close = match after_prefix.find('>') {
            Some(pos) => pos,
            None => break,
        };
        let attrs = after_prefix[..tag_close].trim().trim_end_matches('/').trim();
        // 自闭合: 空内容块
        if after_prefix[..tag_close].trim_end().ends_with('/') {
            blocks.push(TagBlock {
                inner: String::new(),
                attrs: attrs.to_string(),
                raw: rest[start..start + open_prefix.len() + tag_close + 1].to_string(),
            });
            rest = &after_prefix[tag_close + 1..];
            continue;
        }
        let content_start = tag_close + 1;
        match after_prefix[content_start..].find(&close_tag) {
            Some(end) => {
                let inner = after_prefix[content_start..content_start + end].to_string();
                let raw_end =
                    start + open_prefix.len() + content_start + end + close_tag.len();
                blocks.push(TagBlock {
                    inner,
                    attrs: attrs.to_string(),
                    raw: rest[start..raw_end].to_string(),
                });
                rest = &after_prefix[content_start + end + close_tag.len()..];
            }
            None => break,
        }
    }
    blocks
}

fn extract_first(xml: &str, tag: &str) -> Option<String> {
    extract_blocks(xml, tag).into_iter().next().map(|b| b.inner)
}

/// 属性串中取单个属性值（双引号定界）
fn attr_value(attrs: &str, name: &str) -> Option<String> {
    let needle = format!("{}=\"", name);
    let start = attrs.find(&needle)? + needle.len();
    let end = attrs[start..].find('"')?;
    Some(attrs[start..start + end].to_string())
}

/// XML 五实体反转义（&amp; 必须最后处理）
fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
