// ==========================================
// 数字仓储批量导入导出系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::{MimeFallback, SplitDelimiters};
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 映射后处理 =====

    /// 贡献机构名（后处理覆盖 contributing_institution）
    ///
    /// # 默认值
    /// - None（不覆盖）
    async fn get_institution_name(&self) -> ImportResult<Option<String>>;

    /// 权利声明覆盖值
    ///
    /// # 默认值
    /// - None（不覆盖）
    async fn get_rights_override(&self) -> ImportResult<Option<String>>;

    /// 是否强制覆盖既有权利值
    ///
    /// # 默认值
    /// - false（记录已有权利值时保留原值）
    async fn get_rights_override_forced(&self) -> ImportResult<bool>;

    /// 缩略图 URL 模板（含 {identifier} 占位符）
    ///
    /// # 默认值
    /// - None（不注入缩略图）
    async fn get_thumbnail_url_template(&self) -> ImportResult<Option<String>>;

    // ===== 映射变体 =====

    /// 未识别 MIME 类型回退行为
    ///
    /// # 默认值
    /// - NULL（变体 A: 丢弃）
    async fn get_mime_fallback(&self) -> ImportResult<MimeFallback>;

    /// 默认切分分隔符集
    ///
    /// # 默认值
    /// - COLON_SEMICOLON_PIPE
    async fn get_split_delimiters(&self) -> ImportResult<SplitDelimiters>;

    /// 系统标识符字段名（幂等落库键）
    ///
    /// # 默认值
    /// - "source_identifier"
    async fn get_identifier_field(&self) -> ImportResult<String>;

    /// 单值字段表（落库合并时整体替换而非追加）
    ///
    /// # 默认值
    /// - ["title"]
    async fn get_single_valued_fields(&self) -> ImportResult<Vec<String>>;

    /// 批量操作账户（新建实体的归属盖章）
    ///
    /// # 默认值
    /// - None（不盖章,归属由平台侧决定）
    async fn get_depositor(&self) -> ImportResult<Option<String>>;

    // ===== 源抓取 =====

    /// 源抓取超时秒数（OAI HTTP 请求）
    ///
    /// # 默认值
    /// - 30
    async fn get_source_timeout_secs(&self) -> ImportResult<u64>;
}
