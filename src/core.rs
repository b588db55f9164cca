use std::fmt;

use encoding_rs::Encoding;
use markup5ever_rcdom::RcDom;
use thiserror::Error;
use url::Url;

use crate::network::session::Session;
use crate::parsers::html::{
    get_base_url, get_charset, get_title, html_to_dom, serialize_document, walk,
};
use crate::utils::url::{parse_data_url, resolve_url};

/// Errors produced while turning a page into a self-contained snapshot
///
/// 只有顶层文档的获取失败会以错误形式向调用方传播；
/// 子资源（样式表、字体、图片）的失败在发生处被记录并隔离。
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// 顶层页面无法获取（网络错误、超时、非 2xx）
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// 目标不是可处理的 HTML 文档
    #[error("unsupported media type \"{0}\"")]
    UnsupportedMediaType(String),

    /// 子资源超出内联大小上限
    #[error("asset {url} exceeds inline ceiling ({size} > {ceiling} bytes)")]
    AssetTooLarge {
        url: String,
        size: usize,
        ceiling: usize,
    },

    /// 目标 URL 无法解析
    #[error("invalid URL \"{0}\"")]
    InvalidUrl(String),

    /// 未知的输出编码
    #[error("unknown encoding \"{0}\"")]
    UnknownEncoding(String),

    /// 快照缓存中不存在请求的条目
    #[error("snapshot \"{0}\" not found or expired")]
    SnapshotNotFound(String),

    /// Web 服务器错误
    #[error("server error: {0}")]
    Server(String),
}

/// 资源类别，决定适用的内联大小上限
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// CSS 中引用的图片（背景图等）
    CssImage,
    /// 文档中的 img 元素
    DocumentImage,
    /// 字体文件（不限大小，仅受超时约束）
    Font,
    /// 样式表自身
    Stylesheet,
    /// 其它资源
    Other,
}

/// Configuration options for snapshot processing
///
/// 所有大小上限和超时都可配置；§4 的参考值作为默认值。
#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    /// 顶层页面请求超时（秒）
    pub page_timeout: u64,
    /// 单个子资源请求超时（秒）
    pub asset_timeout: u64,
    /// CSS 引用图片的内联上限（字节）
    pub css_image_ceiling: usize,
    /// 文档图片的内联上限（字节）
    pub document_image_ceiling: usize,
    /// 跳过图片内联，使用占位图
    pub no_images: bool,
    /// 跳过字体内联
    pub no_fonts: bool,
    /// 保留脚本（默认移除跨域与 AJAX 脚本）
    pub keep_scripts: bool,
    /// 自定义 User-Agent
    pub user_agent: Option<String>,
    /// 不在输出前添加来源注释
    pub no_metadata: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            page_timeout: 30,
            asset_timeout: 15,
            css_image_ceiling: 500 * 1024,
            document_image_ceiling: 2 * 1024 * 1024,
            no_images: false,
            no_fonts: false,
            keep_scripts: false,
            user_agent: None,
            no_metadata: false,
        }
    }
}

impl SnapshotOptions {
    /// 返回某类资源的内联大小上限；`None` 表示不限制
    pub fn ceiling_for(&self, kind: AssetKind) -> Option<usize> {
        match kind {
            AssetKind::CssImage => Some(self.css_image_ceiling),
            AssetKind::DocumentImage => Some(self.document_image_ceiling),
            AssetKind::Font | AssetKind::Stylesheet | AssetKind::Other => None,
        }
    }
}

const FILE_SIGNATURES: [[&[u8]; 2]; 8] = [
    // Image
    [b"GIF87a", b"image/gif"],
    [b"GIF89a", b"image/gif"],
    [b"\xFF\xD8\xFF", b"image/jpeg"],
    [b"\x89PNG\x0D\x0A\x1A\x0A", b"image/png"],
    [b"<svg ", b"image/svg+xml"],
    [b"RIFF....WEBPVP8 ", b"image/webp"],
    // Font
    [b"wOF2", b"font/woff2"],
    [b"wOFF", b"font/woff"],
];

// All known non-"text/..." plaintext media types
const PLAINTEXT_MEDIA_TYPES: &[&str] = &[
    "application/javascript",
    "application/json",
    "application/ld+json",
    "application/xhtml+xml",
    "application/xml",
    "image/svg+xml",
];

/// Determines the media type of data based on its content signature
pub fn detect_media_type(data: &[u8], url: &Url) -> String {
    for signature in &FILE_SIGNATURES {
        let sig_bytes = signature[0];
        if data.len() >= sig_bytes.len() && data.starts_with(sig_bytes) {
            return String::from_utf8_lossy(signature[1]).to_string();
        }
    }

    detect_media_type_by_file_name(url.path())
}

/// Determines the media type based on file extension
///
/// 推断顺序是调用方先看 HTTP Content-Type 头，再落到这张扩展名表，
/// 最后兜底 application/octet-stream。
pub fn detect_media_type_by_file_name(filename: &str) -> String {
    let filename_lowercased = filename.to_lowercase();
    // 去掉查询串和片段，CSS 字体 URL 里常带版本参数（如 ?v=4.7.0）
    let filename_lowercased = filename_lowercased
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let media_type = if filename_lowercased.ends_with(".html") || filename_lowercased.ends_with(".htm") {
        "text/html"
    } else if filename_lowercased.ends_with(".css") {
        "text/css"
    } else if filename_lowercased.ends_with(".js") {
        "application/javascript"
    } else if filename_lowercased.ends_with(".json") {
        "application/json"
    } else if filename_lowercased.ends_with(".svg") {
        "image/svg+xml"
    } else if filename_lowercased.ends_with(".png") {
        "image/png"
    } else if filename_lowercased.ends_with(".jpg") || filename_lowercased.ends_with(".jpeg") {
        "image/jpeg"
    } else if filename_lowercased.ends_with(".gif") {
        "image/gif"
    } else if filename_lowercased.ends_with(".webp") {
        "image/webp"
    } else if filename_lowercased.ends_with(".ico") {
        "image/x-icon"
    } else if filename_lowercased.ends_with(".woff2") {
        "font/woff2"
    } else if filename_lowercased.ends_with(".woff") {
        "font/woff"
    } else if filename_lowercased.ends_with(".ttf") {
        "font/truetype"
    } else if filename_lowercased.ends_with(".otf") {
        "font/opentype"
    } else if filename_lowercased.ends_with(".eot") {
        "application/vnd.ms-fontobject"
    } else {
        "application/octet-stream"
    };

    media_type.to_string()
}

/// 根据 URL 推断资源类别（字体 / 图片 / 未知）
pub fn classify_asset(media_type: &str, url: &Url) -> AssetKind {
    let media_type = if media_type.is_empty() {
        detect_media_type_by_file_name(url.path())
    } else {
        media_type.to_lowercase()
    };

    if media_type.starts_with("font/") || media_type == "application/vnd.ms-fontobject" {
        AssetKind::Font
    } else if media_type.starts_with("image/") {
        AssetKind::CssImage
    } else if media_type == "text/css" {
        AssetKind::Stylesheet
    } else {
        AssetKind::Other
    }
}

/// Parses Content-Type header value
pub fn parse_content_type(content_type: &str) -> (String, String, bool) {
    let mut media_type = String::new();
    let mut charset = String::new();
    let mut is_base64 = false;

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        } else if part == "base64" {
            is_base64 = true;
        }
    }

    (media_type, charset, is_base64)
}

/// Checks if the given media type represents plaintext content
pub fn is_plaintext_media_type(media_type: &str) -> bool {
    media_type.starts_with("text/") || PLAINTEXT_MEDIA_TYPES.contains(&media_type)
}

/// 生成快照来源注释（放在输出文档最前面）
pub fn create_metadata_comment(url: &Url) -> String {
    use chrono::{SecondsFormat, Utc};

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("<!-- Saved from {} at {} using pagesnap -->", url, timestamp)
}

/// Creates a self-contained offline document from a URL
///
/// 获取目标页面后交给 [`create_offline_document_from_data`] 处理。
/// 只有这一层的页面获取失败会作为错误返回；之后所有子资源的失败
/// 都被隔离为"留下外部引用"的降级行为。
pub fn create_offline_document(
    session: &mut Session,
    target: &str,
) -> Result<(String, Option<String>), SnapshotError> {
    let (input_data, target_url) = if target.starts_with("data:") {
        // Data URL：直接取出内嵌的 HTML
        let parsed_url =
            Url::parse(target).map_err(|_| SnapshotError::InvalidUrl(target.to_string()))?;
        let (media_type, _, data) = parse_data_url(&parsed_url);
        if media_type == "text/html" {
            (data, parsed_url)
        } else {
            return Err(SnapshotError::UnsupportedMediaType(media_type));
        }
    } else if target.starts_with("http://") || target.starts_with("https://") {
        let parsed_url =
            Url::parse(target).map_err(|_| SnapshotError::InvalidUrl(target.to_string()))?;
        let asset = session
            .retrieve_page(&parsed_url)
            .map_err(|e| SnapshotError::Fetch {
                url: target.to_string(),
                reason: e.to_string(),
            })?;
        if is_plaintext_media_type(&asset.media_type) {
            (asset.data, asset.final_url)
        } else {
            return Err(SnapshotError::UnsupportedMediaType(asset.media_type));
        }
    } else {
        return Err(SnapshotError::InvalidUrl(target.to_string()));
    };

    create_offline_document_from_data(session, input_data, target_url)
}

/// Creates a self-contained offline document from raw HTML data
///
/// 完整的内联流水线：解析编码 → 确定基准 URL → 遍历 DOM 嵌入资源 →
/// 序列化为带 `<!DOCTYPE html>` 前缀的单一文档。
pub fn create_offline_document_from_data(
    session: &mut Session,
    input_data: Vec<u8>,
    target_url: Url,
) -> Result<(String, Option<String>), SnapshotError> {
    // 1. 编码探测：先按 UTF-8 解析，如果文档自述其它字符集则重新解析
    let (dom, _document_encoding) = parse_with_encoding(&input_data)?;

    // 2. 确定基准 URL：文档内的 <base> 优先于请求 URL
    let mut base_url = target_url.clone();
    if let Some(existing_base) = get_base_url(&dom.document) {
        base_url = resolve_url(&base_url, &existing_base);
    }

    // 3. 遍历 DOM 并嵌入所有远程资源
    walk(session, &base_url, &dom.document);

    let document_title = get_title(&dom.document);

    // 4. 序列化输出
    let mut html = serialize_document(dom);
    if !session.options.no_metadata {
        let mut comment = create_metadata_comment(&target_url);
        comment.push('\n');
        html.insert_str(0, &comment);
    }

    Ok((html, document_title))
}

fn parse_with_encoding(input_data: &[u8]) -> Result<(RcDom, String), SnapshotError> {
    let mut document_encoding = "utf-8".to_string();
    let mut dom = html_to_dom(input_data, document_encoding.clone());

    if let Some(html_charset) = get_charset(&dom.document) {
        if !html_charset.is_empty() {
            // 检查 HTML 内部声明的字符集是否有效
            if let Some(document_charset) =
                Encoding::for_label_no_replacement(html_charset.as_bytes())
            {
                document_encoding = html_charset;
                dom = html_to_dom(input_data, document_charset.name().to_string());
            }
        }
    }

    Ok((dom, document_encoding))
}

/// 变更涉及的元素类别，用于闭合的分发表而不是字符串比较
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Headline,
    Subheadline,
    Cta,
    Description,
    Text,
}

impl ElementType {
    /// 从前端传来的元素 id 推断类别
    pub fn from_element_id(element_id: &str) -> Self {
        let id = element_id.to_lowercase();
        if id.contains("headline") && !id.contains("subheadline") || id.contains("h1") {
            ElementType::Headline
        } else if id.contains("subheadline")
            || id.contains("subtitle")
            || id.contains("h2")
            || id.contains("h3")
        {
            ElementType::Subheadline
        } else if id.contains("cta")
            || id.contains("button")
            || id.contains("btn")
            || id.contains("call-to-action")
        {
            ElementType::Cta
        } else if id.contains("description") || id.contains("desc") || id.contains("paragraph") {
            ElementType::Description
        } else {
            ElementType::Text
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            ElementType::Headline => "headline",
            ElementType::Subheadline => "subheadline",
            ElementType::Cta => "cta",
            ElementType::Description => "description",
            ElementType::Text => "text",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_media_type_by_file_name_html() {
        // 无 Content-Type 头的页面靠扩展名识别，不能落到 octet-stream
        assert_eq!(detect_media_type_by_file_name("/page.html"), "text/html");
        assert_eq!(detect_media_type_by_file_name("/index.htm"), "text/html");
    }

    #[test]
    fn test_detect_media_type_by_file_name_common_types() {
        assert_eq!(detect_media_type_by_file_name("style.css"), "text/css");
        assert_eq!(detect_media_type_by_file_name("image.png"), "image/png");
        assert_eq!(detect_media_type_by_file_name("photo.jpg"), "image/jpeg");
        assert_eq!(detect_media_type_by_file_name("anim.gif"), "image/gif");
        assert_eq!(detect_media_type_by_file_name("pic.webp"), "image/webp");
        assert_eq!(detect_media_type_by_file_name("vector.svg"), "image/svg+xml");
    }

    #[test]
    fn test_detect_media_type_by_file_name_fonts() {
        assert_eq!(detect_media_type_by_file_name("brand.woff2"), "font/woff2");
        assert_eq!(detect_media_type_by_file_name("brand.woff"), "font/woff");
        assert_eq!(detect_media_type_by_file_name("brand.ttf"), "font/truetype");
        assert_eq!(detect_media_type_by_file_name("brand.otf"), "font/opentype");
        assert_eq!(
            detect_media_type_by_file_name("brand.eot"),
            "application/vnd.ms-fontobject"
        );
    }

    #[test]
    fn test_detect_media_type_by_file_name_query_string() {
        assert_eq!(
            detect_media_type_by_file_name("/fonts/fa.woff2?v=4.7.0"),
            "font/woff2"
        );
    }

    #[test]
    fn test_detect_media_type_by_file_name_unknown_extension() {
        assert_eq!(
            detect_media_type_by_file_name("file.unknown"),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_detect_media_type_magic_bytes() {
        let url = Url::parse("https://example.com/no-extension").unwrap();
        assert_eq!(detect_media_type(b"GIF89a......", &url), "image/gif");
        assert_eq!(
            detect_media_type(b"\x89PNG\x0D\x0A\x1A\x0A....", &url),
            "image/png"
        );
        assert_eq!(detect_media_type(b"wOF2....", &url), "font/woff2");
    }

    #[test]
    fn test_classify_asset() {
        let url = Url::parse("https://example.com/a.woff2").unwrap();
        assert_eq!(classify_asset("", &url), AssetKind::Font);
        let url = Url::parse("https://example.com/a.png").unwrap();
        assert_eq!(classify_asset("", &url), AssetKind::CssImage);
        let url = Url::parse("https://example.com/a").unwrap();
        assert_eq!(classify_asset("image/jpeg", &url), AssetKind::CssImage);
        assert_eq!(classify_asset("text/css", &url), AssetKind::Stylesheet);
        assert_eq!(classify_asset("application/pdf", &url), AssetKind::Other);
    }

    #[test]
    fn test_parse_content_type_basic() {
        let (media_type, charset, is_base64) = parse_content_type("text/html");
        assert_eq!(media_type, "text/html");
        assert_eq!(charset, "");
        assert!(!is_base64);
    }

    #[test]
    fn test_parse_content_type_with_charset() {
        let (media_type, charset, is_base64) = parse_content_type("text/html; charset=utf-8");
        assert_eq!(media_type, "text/html");
        assert_eq!(charset, "utf-8");
        assert!(!is_base64);
    }

    #[test]
    fn test_parse_content_type_quoted_charset() {
        let (media_type, charset, _) =
            parse_content_type("text/html; charset=\"utf-8\"; boundary=something");
        assert_eq!(media_type, "text/html");
        assert_eq!(charset, "utf-8");
    }

    #[test]
    fn test_is_plaintext_media_type() {
        assert!(is_plaintext_media_type("text/html"));
        assert!(is_plaintext_media_type("text/css"));
        assert!(is_plaintext_media_type("application/json"));
        assert!(!is_plaintext_media_type("image/png"));
        assert!(!is_plaintext_media_type("font/woff2"));
    }

    #[test]
    fn test_ceilings_configurable() {
        let mut options = SnapshotOptions::default();
        assert_eq!(
            options.ceiling_for(AssetKind::CssImage),
            Some(500 * 1024)
        );
        assert_eq!(
            options.ceiling_for(AssetKind::DocumentImage),
            Some(2 * 1024 * 1024)
        );
        assert_eq!(options.ceiling_for(AssetKind::Font), None);

        options.css_image_ceiling = 1024;
        assert_eq!(options.ceiling_for(AssetKind::CssImage), Some(1024));
    }

    #[test]
    fn test_element_type_from_element_id() {
        assert_eq!(
            ElementType::from_element_id("headline-1"),
            ElementType::Headline
        );
        assert_eq!(
            ElementType::from_element_id("subheadline-2"),
            ElementType::Subheadline
        );
        assert_eq!(ElementType::from_element_id("cta-button-1"), ElementType::Cta);
        assert_eq!(
            ElementType::from_element_id("description-1"),
            ElementType::Description
        );
        assert_eq!(ElementType::from_element_id("blob-9"), ElementType::Text);
    }
}
