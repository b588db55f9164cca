//! HTML 文档元数据处理模块
//!
//! 提供 base URL、字符编码声明、视口和标题的读取与设置。
//! 快照输出前通过 `ensure_charset` / `ensure_viewport` 保证
//! 离线打开时编码和移动端显示正确。

use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::format_tendril;
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::core::parse_content_type;

use super::dom::{find_nodes, get_node_attr, set_node_attr};

/// 获取文档的 base URL
///
/// 只有第一个 `<base>` 标签起作用（忽略其余的，如果有的话）。
pub fn get_base_url(handle: &Handle) -> Option<String> {
    if let Some(base_node) = find_nodes(handle, vec!["html", "head", "base"]).first() {
        get_node_attr(base_node, "href")
    } else {
        None
    }
}

/// 获取文档声明的字符编码
///
/// 支持 HTML5 的 `<meta charset="...">` 和 HTML4 的
/// `<meta http-equiv="content-type" content="...; charset=...">` 两种格式。
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, vec!["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(meta_content_type_node_attr_value) = get_node_attr(meta_node, "content") {
                let (_media_type, charset, _is_base64) =
                    parse_content_type(&meta_content_type_node_attr_value);
                return Some(charset);
            }
        }
    }

    None
}

/// 获取文档标题
pub fn get_title(node: &Handle) -> Option<String> {
    for title_node in find_nodes(node, vec!["html", "head", "title"]).iter() {
        for child_node in title_node.children.borrow().iter() {
            if let NodeData::Text { ref contents } = child_node.data {
                return Some(contents.borrow().to_string());
            }
        }
    }

    None
}

/// 确保文档声明了字符编码
///
/// 已有声明时改写为给定编码；没有时在 `<head>` 里新建
/// HTML5 格式的 charset meta。
pub fn ensure_charset(dom: &RcDom, charset: &str) {
    for meta_node in find_nodes(&dom.document, vec!["html", "head", "meta"]).iter() {
        if get_node_attr(meta_node, "charset").is_some() {
            set_node_attr(meta_node, "charset", Some(charset.to_string()));
            return;
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
            && get_node_attr(meta_node, "content").is_some()
        {
            set_node_attr(
                meta_node,
                "content",
                Some(format!("text/html;charset={charset}")),
            );
            return;
        }
    }

    let meta_charset_node: Handle = create_element(
        dom,
        QualName::new(None, ns!(), LocalName::from("meta")),
        vec![Attribute {
            name: QualName::new(None, ns!(), LocalName::from("charset")),
            value: format_tendril!("{}", charset),
        }],
    );

    if let Some(head_node) = find_nodes(&dom.document, vec!["html", "head"]).first() {
        head_node
            .children
            .borrow_mut()
            .push(meta_charset_node.clone());
    }
}

/// 确保文档声明了视口
///
/// 已有 viewport meta 时保持原样；缺失时补上标准移动端视口。
pub fn ensure_viewport(dom: &RcDom) {
    for meta_node in find_nodes(&dom.document, vec!["html", "head", "meta"]).iter() {
        if get_node_attr(meta_node, "name")
            .unwrap_or_default()
            .eq_ignore_ascii_case("viewport")
        {
            return;
        }
    }

    let meta_viewport_node: Handle = create_element(
        dom,
        QualName::new(None, ns!(), LocalName::from("meta")),
        vec![
            Attribute {
                name: QualName::new(None, ns!(), LocalName::from("name")),
                value: format_tendril!("viewport"),
            },
            Attribute {
                name: QualName::new(None, ns!(), LocalName::from("content")),
                value: format_tendril!("width=device-width, initial-scale=1"),
            },
        ],
    );

    if let Some(head_node) = find_nodes(&dom.document, vec!["html", "head"]).first() {
        head_node
            .children
            .borrow_mut()
            .push(meta_viewport_node.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_get_base_url_first_wins() {
        let dom = html_to_dom(
            b"<html><head><base href=\"https://a.example/\"><base href=\"https://b.example/\"></head></html>",
            "utf-8".to_string(),
        );
        assert_eq!(
            get_base_url(&dom.document),
            Some("https://a.example/".to_string())
        );
    }

    #[test]
    fn test_get_charset_html5() {
        let dom = html_to_dom(
            b"<html><head><meta charset=\"gb2312\"></head></html>",
            "utf-8".to_string(),
        );
        assert_eq!(get_charset(&dom.document), Some("gb2312".to_string()));
    }

    #[test]
    fn test_get_charset_html4() {
        let dom = html_to_dom(
            b"<html><head><meta http-equiv=\"content-type\" content=\"text/html; charset=iso-8859-1\"></head></html>",
            "utf-8".to_string(),
        );
        assert_eq!(get_charset(&dom.document), Some("iso-8859-1".to_string()));
    }

    #[test]
    fn test_get_title() {
        let dom = html_to_dom(
            b"<html><head><title>Landing Page</title></head></html>",
            "utf-8".to_string(),
        );
        assert_eq!(get_title(&dom.document), Some("Landing Page".to_string()));
    }

    #[test]
    fn test_ensure_charset_adds_meta() {
        let dom = html_to_dom(b"<html><head></head><body></body></html>", "utf-8".to_string());
        ensure_charset(&dom, "utf-8");
        assert_eq!(get_charset(&dom.document), Some("utf-8".to_string()));
    }

    #[test]
    fn test_ensure_viewport_keeps_existing() {
        let dom = html_to_dom(
            b"<html><head><meta name=\"viewport\" content=\"width=320\"></head></html>",
            "utf-8".to_string(),
        );
        ensure_viewport(&dom);
        let metas = find_nodes(&dom.document, vec!["html", "head", "meta"]);
        assert_eq!(metas.len(), 1);
        assert_eq!(
            get_node_attr(&metas[0], "content"),
            Some("width=320".to_string())
        );
    }

    #[test]
    fn test_ensure_viewport_adds_when_missing() {
        let dom = html_to_dom(b"<html><head></head><body></body></html>", "utf-8".to_string());
        ensure_viewport(&dom);
        let metas = find_nodes(&dom.document, vec!["html", "head", "meta"]);
        assert_eq!(metas.len(), 1);
        assert_eq!(get_node_attr(&metas[0], "name"), Some("viewport".to_string()));
    }
}
