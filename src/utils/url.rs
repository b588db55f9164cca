//! URL 处理工具模块
//!
//! 提供相对 URL 解析和 data URL 的创建与解析。解析函数都是纯函数：
//! 不进行任何网络访问，输入不合法时尽量返回原始引用而不是报错。

use base64::{prelude::BASE64_STANDARD, Engine};

pub use url::Url;

use crate::core::detect_media_type;

/// 1x1 透明 GIF，作为被禁用图片的占位符
pub const EMPTY_IMAGE_DATA_URL: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==";

/// 不需要解析的 URL 方案（原样保留）
const PASSTHROUGH_SCHEMES: &[&str] = &["data:", "mailto:", "javascript:", "about:", "blob:"];

/// 判断两个 URL 是否同源（方案和主机都相同）
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str()
}

/// 检查字符串是否是带协议的完整 URL
pub fn is_url_and_has_protocol(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => !url.scheme().is_empty(),
        Err(_) => false,
    }
}

/// 将资源引用解析为绝对 URL
///
/// 解析规则按顺序应用：
///
/// 1. 协议相对引用（`//host/path`）补上基准 URL 的方案；
/// 2. 根相对引用（`/path`）补上基准 URL 的方案和主机；
/// 3. 已是绝对 URL（带方案）原样返回；
/// 4. 其余情况按标准相对 URL 规则基于基准 URL 拼接。
///
/// `data:`、`mailto:` 和纯片段引用（`#section`）原样通过。
/// 该函数从不失败：无法解析的输入尽力返回基准 URL 或原始字符串。
pub fn resolve_url(base_url: &Url, reference: &str) -> Url {
    let reference = reference.trim();

    // 纯片段引用保持指向当前文档
    if reference.is_empty() || reference.starts_with('#') {
        let mut url = base_url.clone();
        url.set_fragment(if reference.len() > 1 {
            Some(&reference[1..])
        } else {
            None
        });
        return url;
    }

    // data:、mailto: 等特殊方案原样通过
    if PASSTHROUGH_SCHEMES
        .iter()
        .any(|scheme| reference.starts_with(scheme))
    {
        if let Ok(url) = Url::parse(reference) {
            return url;
        }
    }

    // 协议相对引用：补上基准方案
    if let Some(rest) = reference.strip_prefix("//") {
        if let Ok(url) = Url::parse(&format!("{}://{}", base_url.scheme(), rest)) {
            return url;
        }
    }

    // 已是绝对 URL：原样返回
    if let Ok(url) = Url::parse(reference) {
        if !url.cannot_be_a_base() || url.scheme() == "data" {
            return url;
        }
    }

    // 根相对和普通相对引用都交给标准的 join 处理；
    // join 基于样式表自身的 URL 而不是顶层页面 URL，由调用方保证
    match base_url.join(reference) {
        Ok(url) => url,
        Err(_) => base_url.clone(),
    }
}

/// 创建 data URL
///
/// 将资源内容编码为 `data:<media_type>;base64,<payload>` 形式。
/// 如果未提供媒体类型，则根据内容签名和文件扩展名推断。
pub fn create_data_url(media_type: &str, charset: &str, data: &[u8], final_url: &Url) -> Url {
    let media_type = if media_type.is_empty() {
        detect_media_type(data, final_url)
    } else {
        media_type.to_string()
    };

    let mut data_url = format!("data:{}", media_type);

    if !charset.trim().is_empty() && !charset.trim().eq_ignore_ascii_case("us-ascii") {
        data_url.push_str(";charset=");
        data_url.push_str(charset.trim());
    }

    data_url.push_str(";base64,");
    data_url.push_str(&BASE64_STANDARD.encode(data));

    // 编码后的 data URL 一定可以解析
    Url::parse(&data_url).unwrap_or_else(|_| Url::parse("data:text/plain,").unwrap())
}

/// 解析 data URL，返回（媒体类型、字符集、数据）
pub fn parse_data_url(url: &Url) -> (String, String, Vec<u8>) {
    let path = url.path();
    let comma = match path.find(',') {
        Some(position) => position,
        None => return (String::new(), String::new(), Vec::new()),
    };

    let meta = &path[..comma];
    let payload = &path[comma + 1..];

    let mut media_type = String::new();
    let mut charset = String::new();
    let mut is_base64 = false;

    for (i, part) in meta.split(';').enumerate() {
        let part = part.trim();
        if i == 0 {
            media_type = part.to_lowercase();
        } else if let Some(value) = part.strip_prefix("charset=") {
            charset = value.to_string();
        } else if part == "base64" {
            is_base64 = true;
        }
    }

    let data = if is_base64 {
        BASE64_STANDARD.decode(payload).unwrap_or_default()
    } else {
        percent_encoding::percent_decode_str(payload)
            .collect::<Vec<u8>>()
            .to_vec()
    };

    (media_type, charset, data)
}
