//! 文档序列化模块
//!
//! 在输出前做最后的卫生处理：补齐字符集与视口声明、在 HEAD 最前
//! 插入宽松 CSP，然后序列化为带 `<!DOCTYPE html>` 前缀的完整文档。

use html5ever::interface::{Attribute, QualName};
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::format_tendril;
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{RcDom, SerializableHandle};

use super::dom::find_nodes;
use super::metadata::{ensure_charset, ensure_viewport};
use super::utils::PERMISSIVE_CSP;

/// 序列化文档为自包含 HTML 字符串
pub fn serialize_document(dom: RcDom) -> String {
    ensure_charset(&dom, "utf-8");
    ensure_viewport(&dom);

    // 遍历阶段已移除原页面的 CSP meta，这里补一条宽松策略。
    // 必须插到 HEAD 最前面：浏览器只认第一条 CSP 声明
    if let Some(head) = find_nodes(&dom.document, vec!["html", "head"]).first() {
        let meta = create_element(
            &dom,
            QualName::new(None, ns!(), LocalName::from("meta")),
            vec![
                Attribute {
                    name: QualName::new(None, ns!(), LocalName::from("http-equiv")),
                    value: format_tendril!("Content-Security-Policy"),
                },
                Attribute {
                    name: QualName::new(None, ns!(), LocalName::from("content")),
                    value: format_tendril!("{}", PERMISSIVE_CSP),
                },
            ],
        );
        head.children.borrow_mut().reverse();
        head.children.borrow_mut().push(meta.clone());
        head.children.borrow_mut().reverse();
    }

    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = dom.document.into();
    if serialize(&mut buf, &serializable, SerializeOpts::default()).is_err() {
        return String::new();
    }

    let mut html = String::from_utf8_lossy(&buf).to_string();

    // html5ever 的序列化不带 doctype，缺失时浏览器会进入怪异模式
    if !html.trim_start().to_lowercase().starts_with("<!doctype") {
        html.insert_str(0, "<!DOCTYPE html>\n");
    }

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn test_serialized_document_has_doctype() {
        let dom = html_to_dom(b"<html><head></head><body></body></html>", "utf-8".to_string());
        let html = serialize_document(dom);
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_csp_meta_is_first_in_head() {
        let dom = html_to_dom(
            b"<html><head><title>T</title></head><body></body></html>",
            "utf-8".to_string(),
        );
        let html = serialize_document(dom);
        let csp_position = html.find("Content-Security-Policy").unwrap();
        let title_position = html.find("<title>").unwrap();
        assert!(csp_position < title_position);
        assert!(html.contains(PERMISSIVE_CSP));
    }

    #[test]
    fn test_charset_and_viewport_present() {
        let dom = html_to_dom(b"<html><head></head><body></body></html>", "utf-8".to_string());
        let html = serialize_document(dom);
        assert!(html.contains("charset=\"utf-8\""));
        assert!(html.contains("viewport"));
    }
}
