//! # Pagesnap Library
//!
//! 一个用于将网页保存为单一离线 HTML 文件的工具库，同时提供结构化内容提取
//! 和保持版式的文本替换功能。
//!
//! ## 模块组织
//!
//! - `core` - 核心功能和主要处理逻辑
//! - `parsers` - 资源解析器（HTML、CSS）
//! - `network` - 网络通信会话
//! - `extract` - 结构化内容提取和噪音过滤
//! - `rewrite` - 文本替换引擎
//! - `cache` - 快照缓存
//! - `collab` - 外部协作者接口（AI 文案建议、发布）
//! - `utils` - 工具函数和实用程序
//! - `web` - Web 服务器功能（可选）

pub mod cache;
pub mod collab;
pub mod core;
pub mod extract;
pub mod network;
pub mod parsers;
pub mod rewrite;
pub mod utils;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use crate::network::*;
pub use crate::utils::*;
