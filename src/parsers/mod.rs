//! # 解析器模块
//!
//! 这个模块包含所有用于解析和处理不同类型web资源的功能：
//!
//! - HTML解析和DOM操作
//! - CSS解析和样式嵌入
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM操作、元数据处理、资源嵌入
//! - `css` - CSS样式表解析、URL处理、样式嵌入

pub mod css;
pub mod html;

// Re-export commonly used items for convenience
pub use css::embed_css;
pub use html::{
    get_base_url, get_charset, get_title, html_to_dom, serialize_document, walk,
};
