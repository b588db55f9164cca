//! 噪音过滤模块
//!
//! 提取内容前先剔除与营销文案无关的页面构件：cookie 横幅、弹窗、
//! 订阅浮层、聊天挂件、导航结构，以及内联样式标记为不可见的元素。
//! 过滤是幂等的：对已过滤的文档再次过滤不产生变化。

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{detach_node, get_node_attr, get_node_name};

/// class 或 id 中出现这些词的元素视为页面杂音
const NOISE_KEYWORDS: &[&str] = &[
    "cookie",
    "consent",
    "gdpr",
    "popup",
    "modal",
    "overlay",
    "banner",
    "notification",
    "newsletter",
    "chat",
    "promo",
];

/// 导航性结构元素，其中的文本不属于页面文案
const STRUCTURAL_TAGS: &[&str] = &["nav", "header", "footer", "aside"];

/// 结构性的 class/id 关键词
const STRUCTURAL_KEYWORDS: &[&str] = &["nav", "menu", "header", "footer", "sidebar"];

/// 内联样式是否把元素标记为不可见或浮层
///
/// 按声明逐条解析，opacity 必须恰好为 0 才算隐藏（opacity: 0.85
/// 仍可见）。position:fixed 几乎只出现在 cookie 横幅、悬浮条这类
/// 覆盖物上，正文元素不会用它。
fn is_hidden_style(style: &str) -> bool {
    style.split(';').any(|declaration| {
        let mut parts = declaration.splitn(2, ':');
        let prop = parts.next().unwrap_or_default().trim();
        let value = parts.next().unwrap_or_default().trim();

        if prop.eq_ignore_ascii_case("display") {
            value.eq_ignore_ascii_case("none")
        } else if prop.eq_ignore_ascii_case("visibility") {
            value.eq_ignore_ascii_case("hidden")
        } else if prop.eq_ignore_ascii_case("opacity") {
            matches!(value.parse::<f32>(), Ok(opacity) if opacity == 0.0)
        } else if prop.eq_ignore_ascii_case("position") {
            value.eq_ignore_ascii_case("fixed")
        } else {
            false
        }
    })
}

/// 从 DOM 中移除所有噪音元素
pub fn strip_noise(node: &Handle) {
    let children: Vec<Handle> = node.children.borrow().clone();
    for child_node in children.iter() {
        if is_noise(child_node) {
            detach_node(child_node);
        } else {
            strip_noise(child_node);
        }
    }
}

fn is_noise(node: &Handle) -> bool {
    let name = match &node.data {
        NodeData::Element { .. } => get_node_name(node).unwrap_or_default(),
        _ => return false,
    };

    if STRUCTURAL_TAGS.contains(&name) {
        return true;
    }

    let class_value = get_node_attr(node, "class").unwrap_or_default().to_lowercase();
    let id_value = get_node_attr(node, "id").unwrap_or_default().to_lowercase();

    for keyword in NOISE_KEYWORDS.iter().chain(STRUCTURAL_KEYWORDS.iter()) {
        if class_value.contains(keyword) || id_value.contains(keyword) {
            return true;
        }
    }

    is_hidden_style(&get_node_attr(node, "style").unwrap_or_default())
}
