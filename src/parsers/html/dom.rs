use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: String) -> RcDom {
    let s: String;

    if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        s = string.to_string();
    } else {
        s = String::from_utf8_lossy(data).to_string();
    }

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .unwrap()
}

/// 查找指定路径的DOM节点
///
/// `node_names` 是从外到内的元素名路径，比如 `["html", "head", "meta"]`
/// 会返回 head 下的所有 meta 节点。
pub fn find_nodes(node: &Handle, node_names: Vec<&str>) -> Vec<Handle> {
    assert!(!node_names.is_empty());

    let mut found_nodes = Vec::new();
    let node_name = node_names[0];

    if node_names.len() == 1 {
        if let NodeData::Element { ref name, .. } = node.data {
            if &*name.local == node_name {
                found_nodes.push(node.clone());
            }
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    } else if let NodeData::Element { ref name, .. } = node.data {
        if &*name.local == node_name {
            let mut new_node_names = node_names;
            new_node_names.remove(0);
            found_nodes.append(&mut find_nodes(node, new_node_names));
        } else {
            for child_node in node.children.borrow().iter() {
                found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
            }
        }
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let parent = child.parent.take();
    let upgraded = parent.as_ref().and_then(|weak| weak.upgrade());
    child.parent.set(parent);
    upgraded
}

/// 将节点从其父节点中摘除
pub fn detach_node(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
}

/// 收集节点及其后代的全部文本内容（去掉多余空白）
pub fn get_text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => {
            out.push_str(&contents.borrow());
            out.push(' ');
        }
        _ => {
            for child_node in node.children.borrow().iter() {
                // script 和 style 的文本不算内容
                if let Some(name) = get_node_name(child_node) {
                    if name == "script" || name == "style" {
                        continue;
                    }
                }
                collect_text(child_node, out);
            }
        }
    }
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    use html5ever::interface::{Attribute, QualName};
    use html5ever::tendril::format_tendril;
    use html5ever::{namespace_url, ns, LocalName};

    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    let _ = &attrs_mut[i].value.clear();
                    let _ = &attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            // Add new attribute (since originally the target node didn't have it)
            if let Some(attr_value) = attr_value.clone() {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_nodes_by_path() {
        let dom = html_to_dom(
            b"<html><head><meta charset=\"utf-8\"><meta name=\"a\"></head><body></body></html>",
            "utf-8".to_string(),
        );
        let metas = find_nodes(&dom.document, vec!["html", "head", "meta"]);
        assert_eq!(metas.len(), 2);
    }

    #[test]
    fn test_get_and_set_node_attr() {
        let dom = html_to_dom(b"<html><body><img src=\"a.png\"></body></html>", "utf-8".to_string());
        let img = find_nodes(&dom.document, vec!["html", "body", "img"])
            .first()
            .cloned()
            .unwrap();
        assert_eq!(get_node_attr(&img, "src"), Some("a.png".to_string()));

        set_node_attr(&img, "src", Some("b.png".to_string()));
        assert_eq!(get_node_attr(&img, "src"), Some("b.png".to_string()));

        set_node_attr(&img, "src", None);
        assert_eq!(get_node_attr(&img, "src"), None);
    }

    #[test]
    fn test_detach_node() {
        let dom = html_to_dom(
            b"<html><body><p>keep</p><script>var x;</script></body></html>",
            "utf-8".to_string(),
        );
        let script = find_nodes(&dom.document, vec!["html", "body", "script"])
            .first()
            .cloned()
            .unwrap();
        detach_node(&script);
        assert!(find_nodes(&dom.document, vec!["html", "body", "script"]).is_empty());
        assert_eq!(find_nodes(&dom.document, vec!["html", "body", "p"]).len(), 1);
    }

    #[test]
    fn test_get_text_content_skips_scripts() {
        let dom = html_to_dom(
            b"<html><body><h1>Big   News</h1><script>var x = 1;</script></body></html>",
            "utf-8".to_string(),
        );
        let body = find_nodes(&dom.document, vec!["html", "body"])
            .first()
            .cloned()
            .unwrap();
        assert_eq!(get_text_content(&body), "Big News");
    }
}
