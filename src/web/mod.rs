//! Web 服务器模块
//!
//! 把快照、提取和改写能力以 HTTP API 的形式提供出来。
//! 整个模块由 `web` feature 控制，库本身不依赖异步运行时。

pub mod config;
pub mod handlers;
pub mod routes;
pub mod types;

pub use config::*;
pub use routes::*;
pub use types::*;

use std::sync::{Arc, Mutex};

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::cache::SnapshotCache;
use crate::core::{SnapshotError, SnapshotOptions};

/// Web 服务器
pub struct WebServer {
    config: WebConfig,
    options: SnapshotOptions,
}

impl WebServer {
    /// 创建新的 Web 服务器
    pub fn new(config: WebConfig, options: SnapshotOptions) -> Self {
        Self { config, options }
    }

    /// 启动 Web 服务器
    pub async fn start(&self) -> Result<(), SnapshotError> {
        let app_state = Arc::new(AppState {
            options: self.options.clone(),
            cache: Mutex::new(SnapshotCache::new(
                self.config.cache_capacity,
                self.config.cache_ttl,
            )),
        });

        let app = create_router(app_state);

        let listener = tokio::net::TcpListener::bind(self.config.listen_address())
            .await
            .map_err(|e| SnapshotError::Server(format!("无法绑定监听地址: {}", e)))?;

        tracing::info!("Web 服务器已启动: http://{}", self.config.listen_address());

        axum::serve(listener, app)
            .await
            .map_err(|e| SnapshotError::Server(format!("服务器运行出错: {}", e)))?;

        Ok(())
    }
}

/// 创建路由器
fn create_router(app_state: Arc<AppState>) -> Router {
    create_routes().with_state(app_state).layer(CorsLayer::permissive())
}
