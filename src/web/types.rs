//! Web API 的请求与响应类型

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::cache::SnapshotCache;
use crate::core::SnapshotOptions;
use crate::extract::StructuredContent;
use crate::rewrite::{ChangeOutcome, ContentChange};

/// 共享应用状态
pub struct AppState {
    pub options: SnapshotOptions,
    pub cache: Mutex<SnapshotCache>,
}

/// POST /api/scrape 请求
#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

/// POST /api/scrape/batch 请求
#[derive(Debug, Deserialize)]
pub struct BatchScrapeRequest {
    pub urls: Vec<String>,
}

/// POST /api/snapshot 请求
#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub url: String,
    /// 保留脚本（默认移除）
    pub keep_scripts: Option<bool>,
    /// 跳过图片内联
    pub no_images: Option<bool>,
    /// 跳过字体内联
    pub no_fonts: Option<bool>,
}

/// POST /api/rewrite 请求
///
/// `html` 和 `snapshot_id` 二选一：直接提交文档，或引用已缓存的快照。
#[derive(Debug, Deserialize)]
pub struct RewriteRequest {
    pub html: Option<String>,
    pub snapshot_id: Option<String>,
    pub changes: Vec<ContentChange>,
}

/// 单个页面的提取结果
#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub status: String,
    pub url: String,
    pub title: Option<String>,
    pub data: StructuredContent,
}

/// 批量提取的单项结果
#[derive(Debug, Serialize)]
pub struct BatchScrapeItem {
    pub url: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StructuredContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 批量提取结果
#[derive(Debug, Serialize)]
pub struct BatchScrapeResponse {
    pub status: String,
    pub results: Vec<BatchScrapeItem>,
}

/// 快照创建结果
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub status: String,
    pub snapshot_id: String,
    pub preview_url: String,
    pub title: Option<String>,
    pub url: String,
}

/// 改写结果
#[derive(Debug, Serialize)]
pub struct RewriteResponse {
    pub status: String,
    pub html: String,
    pub applied_count: usize,
    pub unmatched_originals: Vec<String>,
    pub changes: Vec<ChangeOutcome>,
}
