//! HTTP 会话管理
//!
//! `Session` 持有一个阻塞式 HTTP 客户端和单次运行的资源缓存。
//! 同一资源在一次快照中最多只会被请求一次；后续引用直接命中缓存。
//!
//! 失败隔离策略在这里体现为类型：`retrieve_asset` 返回 `Result`，
//! 调用方（DOM 遍历器、CSS 嵌入器）决定失败时是保留原始引用还是丢弃。

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};
use url::Url;

use crate::core::{
    detect_media_type, detect_media_type_by_file_name, parse_content_type, SnapshotError,
    SnapshotOptions,
};
use crate::utils::url::parse_data_url;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// 一次成功获取的资源
#[derive(Clone, Debug)]
pub struct FetchedAsset {
    /// 资源内容
    pub data: Vec<u8>,
    /// 重定向后的最终 URL，相对引用必须基于它解析
    pub final_url: Url,
    /// 媒体类型（优先取 Content-Type 头，其次按扩展名推断）
    pub media_type: String,
    /// 字符集（可能为空）
    pub charset: String,
}

/// HTTP 会话：客户端、选项和运行期资源缓存
pub struct Session {
    client: Client,
    cache: HashMap<String, FetchedAsset>,
    pub options: SnapshotOptions,
}

impl Session {
    /// 按选项构造会话
    pub fn new(options: SnapshotOptions) -> Result<Self, SnapshotError> {
        let mut headers = HeaderMap::new();
        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(options.page_timeout))
            .build()
            .map_err(|e| SnapshotError::Server(e.to_string()))?;

        Ok(Session {
            client,
            cache: HashMap::new(),
            options,
        })
    }

    /// 获取顶层页面
    ///
    /// 顶层页面的失败会向上传播，与子资源的降级处理不同。
    pub fn retrieve_page(&mut self, url: &Url) -> Result<FetchedAsset, SnapshotError> {
        self.retrieve(url, Duration::from_secs(self.options.page_timeout), None)
            .map_err(|reason| SnapshotError::Fetch {
                url: url.to_string(),
                reason,
            })
    }

    /// 获取子资源
    ///
    /// `ceiling` 是内联大小上限（字节）；超限的资源返回
    /// [`SnapshotError::AssetTooLarge`]，由调用方决定降级方式。
    /// `data:` URL 不经过网络直接解码。
    pub fn retrieve_asset(
        &mut self,
        document_url: &Url,
        url: &Url,
        ceiling: Option<usize>,
    ) -> Result<FetchedAsset, SnapshotError> {
        if url.scheme() == "data" {
            let (media_type, charset, data) = parse_data_url(url);
            return Ok(FetchedAsset {
                data,
                final_url: url.clone(),
                media_type,
                charset,
            });
        }

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SnapshotError::Fetch {
                url: url.to_string(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }

        let cache_key = url.as_str().to_string();
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("缓存命中: {}", url);
            // 上限在命中时仍然生效：同一图片可能同时被 CSS 和 img 引用
            if let Some(limit) = ceiling {
                if cached.data.len() > limit {
                    return Err(SnapshotError::AssetTooLarge {
                        url: url.to_string(),
                        size: cached.data.len(),
                        ceiling: limit,
                    });
                }
            }
            return Ok(cached.clone());
        }

        debug!("获取资源: {} (来自 {})", url, document_url);
        let asset = self
            .retrieve(url, Duration::from_secs(self.options.asset_timeout), ceiling)
            .map_err(|reason| {
                warn!("资源获取失败: {} ({})", url, reason);
                SnapshotError::Fetch {
                    url: url.to_string(),
                    reason,
                }
            })?;

        if let Some(limit) = ceiling {
            if asset.data.len() > limit {
                // 超限资源也缓存，避免其它引用点重复下载
                self.cache.insert(cache_key, asset.clone());
                return Err(SnapshotError::AssetTooLarge {
                    url: url.to_string(),
                    size: asset.data.len(),
                    ceiling: limit,
                });
            }
        }

        self.cache.insert(cache_key, asset.clone());
        Ok(asset)
    }

    fn retrieve(
        &self,
        url: &Url,
        timeout: Duration,
        ceiling: Option<usize>,
    ) -> Result<FetchedAsset, String> {
        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let final_url = Url::parse(response.url().as_str()).unwrap_or_else(|_| url.clone());

        let (mut media_type, charset) = match response.headers().get(CONTENT_TYPE) {
            Some(value) => {
                let (media_type, charset, _) =
                    parse_content_type(&String::from_utf8_lossy(value.as_bytes()));
                (media_type, charset)
            }
            None => (String::new(), String::new()),
        };

        // Content-Length 提前超限检查，省掉下载正文
        if let (Some(limit), Some(length)) = (ceiling, response.content_length()) {
            if length as usize > limit {
                return Err(format!(
                    "content length {} exceeds ceiling {}",
                    length, limit
                ));
            }
        }

        let data = response.bytes().map_err(|e| e.to_string())?.to_vec();

        if media_type.is_empty() {
            media_type = detect_media_type(&data, &final_url);
        } else if media_type == "application/octet-stream" {
            // 部分服务器对字体一律返回 octet-stream，按扩展名纠正
            let by_name = detect_media_type_by_file_name(final_url.path());
            if by_name != "application/octet-stream" {
                media_type = by_name;
            }
        }

        Ok(FetchedAsset {
            data,
            final_url,
            media_type,
            charset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_asset_needs_no_network() {
        let mut session = Session::new(SnapshotOptions::default()).unwrap();
        let document_url = Url::parse("https://example.com/").unwrap();
        let url = Url::parse("data:text/css;base64,Ym9keXt9").unwrap();

        let asset = session.retrieve_asset(&document_url, &url, None).unwrap();
        assert_eq!(asset.media_type, "text/css");
        assert_eq!(asset.data, b"body{}");
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        let mut session = Session::new(SnapshotOptions::default()).unwrap();
        let document_url = Url::parse("https://example.com/").unwrap();
        let url = Url::parse("ftp://example.com/file.css").unwrap();

        let result = session.retrieve_asset(&document_url, &url, None);
        assert!(matches!(result, Err(SnapshotError::Fetch { .. })));
    }
}
