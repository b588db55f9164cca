//! Web API 处理器
//!
//! 所有耗时的抓取和内联工作都放进 `spawn_blocking`：会话使用阻塞式
//! HTTP 客户端，不能占用异步运行时的工作线程。
//!
//! 响应统一使用 `{"status": "success" | "error", ...}` 包装。

use std::sync::Arc;

use axum::{
    extract::{Json as ExtractJson, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use tokio::task;

use crate::core::{create_offline_document, SnapshotOptions};
use crate::extract;
use crate::network::session::Session;
use crate::rewrite;
use crate::web::types::{
    AppState, BatchScrapeItem, BatchScrapeRequest, BatchScrapeResponse, RewriteRequest,
    RewriteResponse, ScrapeRequest, ScrapeResponse, SnapshotRequest, SnapshotResponse,
};

/// 批量提取一次最多处理的 URL 数
const MAX_BATCH_URLS: usize = 10;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(status: StatusCode, message: String) -> ApiError {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "error": message,
        })),
    )
}

/// 服务自述
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/scrape",
            "POST /api/scrape/batch",
            "POST /api/snapshot",
            "GET /snapshot/{id}",
            "POST /api/rewrite",
            "GET /api/health",
        ],
    }))
}

/// 健康检查
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "success" }))
}

/// 抓取单个页面并提取结构化文案
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    tracing::info!("提取请求: {}", request.url);

    let options = state.options.clone();
    let url = request.url.clone();

    let result = task::spawn_blocking(move || scrape_one(options, &url))
        .await
        .map_err(|e| {
            tracing::error!("提取任务失败: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("任务执行失败: {}", e))
        })?;

    match result {
        Ok((title, data)) => Ok(Json(ScrapeResponse {
            status: "success".to_string(),
            url: request.url,
            title,
            data,
        })),
        Err(e) => {
            tracing::error!("提取失败: {} ({})", request.url, e);
            Err(error_response(StatusCode::BAD_GATEWAY, e))
        }
    }
}

/// 批量抓取并提取，最多 10 个 URL
pub async fn scrape_batch(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<BatchScrapeRequest>,
) -> Result<Json<BatchScrapeResponse>, ApiError> {
    if request.urls.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "urls 不能为空".to_string(),
        ));
    }
    if request.urls.len() > MAX_BATCH_URLS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("一次最多处理 {} 个 URL", MAX_BATCH_URLS),
        ));
    }

    tracing::info!("批量提取请求: {} 个 URL", request.urls.len());

    let options = state.options.clone();
    let urls = request.urls.clone();

    let results = task::spawn_blocking(move || {
        urls.iter()
            .map(|url| match scrape_one(options.clone(), url) {
                Ok((_title, data)) => BatchScrapeItem {
                    url: url.clone(),
                    status: "success".to_string(),
                    data: Some(data),
                    error: None,
                },
                Err(e) => BatchScrapeItem {
                    url: url.clone(),
                    status: "error".to_string(),
                    data: None,
                    error: Some(e),
                },
            })
            .collect::<Vec<BatchScrapeItem>>()
    })
    .await
    .map_err(|e| {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("任务执行失败: {}", e))
    })?;

    Ok(Json(BatchScrapeResponse {
        status: "success".to_string(),
        results,
    }))
}

/// 创建离线快照并放入缓存
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<SnapshotRequest>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    tracing::info!("快照请求: {}", request.url);

    let mut options = state.options.clone();
    if let Some(keep_scripts) = request.keep_scripts {
        options.keep_scripts = keep_scripts;
    }
    if let Some(no_images) = request.no_images {
        options.no_images = no_images;
    }
    if let Some(no_fonts) = request.no_fonts {
        options.no_fonts = no_fonts;
    }

    let url = request.url.clone();
    let result = task::spawn_blocking(move || -> Result<(String, Option<String>), String> {
        let mut session = Session::new(options).map_err(|e| e.to_string())?;
        create_offline_document(&mut session, &url).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("任务执行失败: {}", e))
    })?;

    let (html, title) = match result {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("快照失败: {} ({})", request.url, e);
            return Err(error_response(StatusCode::BAD_GATEWAY, e));
        }
    };

    let snapshot_id = {
        let mut cache = state.cache.lock().map_err(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "缓存不可用".to_string(),
            )
        })?;
        cache.insert(&request.url, html, title.clone())
    };

    tracing::info!("快照完成: {} -> {}", request.url, snapshot_id);

    Ok(Json(SnapshotResponse {
        status: "success".to_string(),
        preview_url: format!("/snapshot/{}", snapshot_id),
        snapshot_id,
        title,
        url: request.url,
    }))
}

/// 按 id 取回快照文档
pub async fn serve_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = {
        let mut cache = state.cache.lock().map_err(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "缓存不可用".to_string(),
            )
        })?;
        cache.get(&id)
    };

    match entry {
        Some(entry) => Ok((
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            entry.html,
        )),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("快照不存在或已过期: {}", id),
        )),
    }
}

/// 将文案变更应用到文档
pub async fn apply_rewrite(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<RewriteRequest>,
) -> Result<Json<RewriteResponse>, ApiError> {
    let html = match (&request.html, &request.snapshot_id) {
        (Some(html), _) => html.clone(),
        (None, Some(id)) => {
            let mut cache = state.cache.lock().map_err(|_| {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "缓存不可用".to_string(),
                )
            })?;
            match cache.get(id) {
                Some(entry) => entry.html,
                None => {
                    return Err(error_response(
                        StatusCode::NOT_FOUND,
                        format!("快照不存在或已过期: {}", id),
                    ));
                }
            }
        }
        (None, None) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "必须提供 html 或 snapshot_id".to_string(),
            ));
        }
    };

    tracing::info!("改写请求: {} 条变更", request.changes.len());

    let result = rewrite::apply_changes(&html, &request.changes);

    Ok(Json(RewriteResponse {
        status: "success".to_string(),
        html: result.html,
        applied_count: result.applied_count,
        unmatched_originals: result.unmatched_originals,
        changes: result.outcomes,
    }))
}

/// 抓取并提取单个页面（阻塞调用）
fn scrape_one(
    options: SnapshotOptions,
    url: &str,
) -> Result<(Option<String>, extract::StructuredContent), String> {
    let mut session = Session::new(options).map_err(|e| e.to_string())?;
    let (html, title) = create_offline_document(&mut session, url).map_err(|e| e.to_string())?;
    Ok((title, extract::extract(&html)))
}
