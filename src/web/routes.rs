//! Web 路由定义

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::web::{handlers, types::AppState};

/// 创建路由结构
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // 服务自述与健康检查
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        // 提取
        .route("/api/scrape", post(handlers::scrape))
        .route("/api/scrape/batch", post(handlers::scrape_batch))
        // 快照与预览
        .route("/api/snapshot", post(handlers::snapshot))
        .route("/snapshot/:id", get(handlers::serve_snapshot))
        // 文案改写
        .route("/api/rewrite", post(handlers::apply_rewrite))
}
