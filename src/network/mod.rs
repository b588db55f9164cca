//! # 网络模块
//!
//! 这个模块包含所有与网络通信相关的功能：
//!
//! - HTTP会话管理和资源下载
//! - 单次运行内的资源去重缓存
//!
//! # 模块组织
//!
//! - `session` - HTTP会话管理、请求处理、资源下载

pub mod session;

// Re-export commonly used items for convenience
pub use session::{FetchedAsset, Session};
