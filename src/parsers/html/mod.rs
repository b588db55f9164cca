//! HTML解析和处理模块
//!
//! 这个模块被划分为多个子模块：
//!
//! - `utils`: 基础工具函数和常量
//! - `parser`: link rel 和 srcset 的解析
//! - `dom`: 基础DOM操作
//! - `metadata`: 文档元数据处理
//! - `serializer`: 序列化和安全头重写
//! - `assets`: 资源嵌入和处理
//! - `walker`: DOM遍历核心逻辑

pub mod assets;
pub mod dom;
pub mod metadata;
pub mod parser;
pub mod serializer;
pub mod utils;
pub mod walker;

pub use assets::{check_integrity, embed_srcset, retrieve_and_embed_asset};
pub use dom::{
    find_nodes, get_node_attr, get_node_name, get_parent_node, get_text_content, html_to_dom,
    set_node_attr,
};
pub use metadata::{ensure_charset, ensure_viewport, get_base_url, get_charset, get_title};
pub use parser::{parse_link_type, parse_srcset, LinkType, SrcSetItem};
pub use serializer::serialize_document;
pub use utils::{is_favicon, FAVICON_VALUES, PERMISSIVE_CSP, WHITESPACES};
pub use walker::walk;
