//! HTML 静态资源处理模块
//!
//! 负责把文档里引用的外部资源变成自包含形式：
//!
//! - 外部样式表被取回、递归嵌入自身资源后，整体替换为内联 `<style>` 元素
//! - 图片（src、srcset、懒加载属性）转为 data URL，受文档图片大小上限约束
//! - 同源脚本的代码直接内联进 `<script>` 标签
//! - 带 integrity 属性的资源先做 SRI 校验，校验失败则不嵌入
//!
//! 获取失败的 http(s) 资源保留绝对 URL 引用；其它方案的引用被移除。

use std::cell::RefCell;
use std::rc::Rc;

use base64::{prelude::BASE64_STANDARD, Engine};
use encoding_rs::Encoding;
use html5ever::interface::QualName;
use html5ever::tendril::format_tendril;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData};
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::warn;

use crate::core::{classify_asset, AssetKind};
use crate::network::session::Session;
use crate::parsers::css::embed_css;
use crate::utils::url::{create_data_url, resolve_url, Url, EMPTY_IMAGE_DATA_URL};

use super::dom::{get_node_attr, get_node_name, get_parent_node, set_node_attr};
use super::parser::{parse_link_type, parse_srcset, LinkType, SrcSetItem};

/// 验证资源数据的子资源完整性（SRI）哈希
///
/// 支持 sha256 / sha384 / sha512 三种格式；格式不识别时视为失败。
pub fn check_integrity(data: &[u8], integrity: &str) -> bool {
    if let Some(hash_value) = integrity.strip_prefix("sha256-") {
        let mut hasher = Sha256::new();
        hasher.update(data);
        BASE64_STANDARD.encode(hasher.finalize()) == hash_value
    } else if let Some(hash_value) = integrity.strip_prefix("sha384-") {
        let mut hasher = Sha384::new();
        hasher.update(data);
        BASE64_STANDARD.encode(hasher.finalize()) == hash_value
    } else if let Some(hash_value) = integrity.strip_prefix("sha512-") {
        let mut hasher = Sha512::new();
        hasher.update(data);
        BASE64_STANDARD.encode(hasher.finalize()) == hash_value
    } else {
        false
    }
}

/// 处理并嵌入 srcset 属性中的所有图片
///
/// 每一项单独获取和降级：一张图失败不影响其余项。
pub fn embed_srcset(session: &mut Session, document_url: &Url, srcset: &str) -> String {
    let srcset_items: Vec<SrcSetItem> = parse_srcset(srcset);
    let ceiling = Some(session.options.document_image_ceiling);

    let mut result: String = "".to_string();
    let mut i: usize = srcset_items.len();

    for srcset_item in srcset_items {
        if session.options.no_images {
            result.push_str(EMPTY_IMAGE_DATA_URL);
        } else {
            let image_full_url: Url = resolve_url(document_url, srcset_item.path);

            match session.retrieve_asset(document_url, &image_full_url, ceiling) {
                Ok(asset) => {
                    let image_data_url: Url = create_data_url(
                        &asset.media_type,
                        &asset.charset,
                        &asset.data,
                        &asset.final_url,
                    );
                    result.push_str(image_data_url.as_ref());
                }
                Err(_) => {
                    if image_full_url.scheme() == "http" || image_full_url.scheme() == "https" {
                        result.push_str(image_full_url.as_ref());
                    } else {
                        result.push_str(EMPTY_IMAGE_DATA_URL);
                    }
                }
            }
        }

        if !srcset_item.descriptor.is_empty() {
            result.push(' ');
            result.push_str(srcset_item.descriptor);
        }

        if i > 1 {
            result.push_str(", ");
        }

        i -= 1;
    }

    result
}

/// 检索外部资源并嵌入到 HTML 元素中
///
/// 按元素类型选择策略：样式表替换为内联 `<style>`，脚本代码内联进
/// 标签内容，其余资源写回为 data URL。失败时 http(s) 引用改写为
/// 绝对 URL 保留，其它方案的引用被移除。
pub fn retrieve_and_embed_asset(
    session: &mut Session,
    document_url: &Url,
    node: &Handle,
    attr_name: &str,
    attr_value: &str,
) {
    let resolved_url: Url = resolve_url(document_url, attr_value);
    let node_name: &str = get_node_name(node).unwrap_or_default();

    // 按资源类别选择内联大小上限
    let ceiling = if node_name == "img" || node_name == "input" || attr_name == "poster" {
        Some(session.options.document_image_ceiling)
    } else {
        session
            .options
            .ceiling_for(classify_asset("", &resolved_url))
    };

    match session.retrieve_asset(document_url, &resolved_url, ceiling) {
        Ok(asset) => {
            // LINK 和 SCRIPT 先做 SRI 校验
            let mut ok_to_include: bool = true;
            if node_name == "link" || node_name == "script" {
                if let Some(node_integrity_attr_value) = get_node_attr(node, "integrity") {
                    if !node_integrity_attr_value.is_empty() {
                        ok_to_include = check_integrity(&asset.data, &node_integrity_attr_value);
                        if !ok_to_include {
                            warn!("SRI 校验失败，跳过资源: {}", resolved_url);
                        }
                    }
                    set_node_attr(node, "integrity", None);
                }
            }

            if !ok_to_include {
                return;
            }

            if node_name == "link"
                && parse_link_type(&get_node_attr(node, "rel").unwrap_or_default())
                    .contains(&LinkType::Stylesheet)
            {
                // 按字符编码解码样式表内容
                let stylesheet: String;
                if let Some(encoding) = Encoding::for_label(asset.charset.as_bytes()) {
                    let (string, _, _) = encoding.decode(&asset.data);
                    stylesheet = string.to_string();
                } else {
                    stylesheet = String::from_utf8_lossy(&asset.data).to_string();
                }

                // 相对引用基于样式表自己的最终 URL 解析
                let css: String = embed_css(session, &asset.final_url, &stylesheet);

                replace_node_with_style(node, &css);
            } else if node_name == "script" {
                let script_media_type =
                    get_node_attr(node, "type").unwrap_or(String::from("text/javascript"));

                if script_media_type == "text/javascript"
                    || script_media_type == "application/javascript"
                    || script_media_type == "module"
                {
                    // 代码直接内联，转义闭合标签防止解析错位
                    let code = String::from_utf8_lossy(&asset.data).replace("</script>", "<\\/script>");
                    let text_node = Node::new(NodeData::Text {
                        contents: RefCell::new(format_tendril!("{}", code)),
                    });
                    text_node.parent.set(Some(Rc::downgrade(node)));
                    node.children.borrow_mut().push(text_node);
                    set_node_attr(node, attr_name, None);
                } else {
                    let mut data_url = create_data_url(
                        &script_media_type,
                        &asset.charset,
                        &asset.data,
                        &asset.final_url,
                    );
                    data_url.set_fragment(resolved_url.fragment());
                    set_node_attr(node, attr_name, Some(data_url.to_string()));
                }
            } else {
                // 其余资源（图片、字体、图标）写回为 data URL
                let mut data_url = create_data_url(
                    &asset.media_type,
                    &asset.charset,
                    &asset.data,
                    &asset.final_url,
                );
                data_url.set_fragment(resolved_url.fragment());
                set_node_attr(node, attr_name, Some(data_url.to_string()));
            }
        }
        Err(e) => {
            if resolved_url.scheme() == "http" || resolved_url.scheme() == "https" {
                // 保留绝对 URL 引用，让浏览器在联网时仍可加载
                warn!("资源无法嵌入，保留远程引用: {} ({})", resolved_url, e);
                set_node_attr(node, attr_name, Some(resolved_url.to_string()));
            } else {
                set_node_attr(node, attr_name, None);
            }
        }
    }
}

/// 用包含给定 CSS 的内联 `<style>` 元素替换节点
fn replace_node_with_style(node: &Handle, css: &str) {
    let style_node = Node::new(NodeData::Element {
        name: QualName::new(None, ns!(), LocalName::from("style")),
        attrs: RefCell::new(vec![]),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    });
    let text_node = Node::new(NodeData::Text {
        contents: RefCell::new(format_tendril!("{}", css)),
    });
    text_node.parent.set(Some(Rc::downgrade(&style_node)));
    style_node.children.borrow_mut().push(text_node);

    if let Some(parent) = get_parent_node(node) {
        let mut children = parent.children.borrow_mut();
        if let Some(position) = children.iter().position(|child| Rc::ptr_eq(child, node)) {
            style_node.parent.set(Some(Rc::downgrade(&parent)));
            children[position] = style_node;
        }
    }
}
