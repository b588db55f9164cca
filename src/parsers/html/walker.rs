//! DOM遍历器模块
//!
//! 递归遍历整个 DOM 树，对每类元素应用对应的内联或清理策略：
//!
//! - `<link rel="stylesheet">` 替换为内联 `<style>`
//! - `<style>` 内容和 style 属性里的 url() 引用嵌入为 data URI
//! - `<img>`（含懒加载属性和 srcset）嵌入为 data URI
//! - 跨域外部脚本和引用 AJAX 端点的内联脚本被移除
//! - 指向页面控制的 meta（refresh、CSP）被清除
//! - 锚点、表单等导航性引用改写为绝对 URL
//!
//! 遍历会修改传入的 DOM；子资源获取失败不会中断遍历。

use markup5ever_rcdom::{Handle, NodeData};
use tracing::debug;

use crate::network::session::Session;
use crate::parsers::css::embed_css;
use crate::utils::url::{
    is_same_origin, is_url_and_has_protocol, resolve_url, Url, EMPTY_IMAGE_DATA_URL,
};

use super::assets::{embed_srcset, retrieve_and_embed_asset};
use super::dom::{detach_node, get_node_attr, get_node_name, get_parent_node, set_node_attr};
use super::parser::{parse_link_type, LinkType};

/// 懒加载库常用的图片地址属性，按此顺序探测
const LAZY_IMAGE_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original", "data-lazy"];

/// 内联脚本中出现这些路径时视为依赖后端接口，离线后只会报错
const AJAX_ENDPOINT_MARKERS: &[&str] = &["/api/", "/wp-json/", "admin-ajax.php", "xmlrpc.php"];

/// DOM 遍历和处理的入口函数
pub fn walk(session: &mut Session, document_url: &Url, node: &Handle) {
    match node.data {
        NodeData::Document => {
            walk_children(session, document_url, node);
        }
        NodeData::Element { ref name, .. } => {
            match name.local.as_ref() {
                "meta" => handle_meta(node),
                "link" => handle_link(session, document_url, node),
                "base" => {
                    if document_url.scheme() == "http" || document_url.scheme() == "https" {
                        if let Some(base_attr_href_value) = get_node_attr(node, "href") {
                            let href_full_url: Url =
                                resolve_url(document_url, &base_attr_href_value);
                            set_node_attr(node, "href", Some(href_full_url.to_string()));
                        }
                    }
                }
                "body" => {
                    // BODY 的 background 属性是老式写法，照样嵌入
                    if let Some(body_attr_background_value) = get_node_attr(node, "background") {
                        set_node_attr(node, "background", None);

                        if !session.options.no_images && !body_attr_background_value.is_empty() {
                            retrieve_and_embed_asset(
                                session,
                                document_url,
                                node,
                                "background",
                                &body_attr_background_value,
                            );
                        }
                    }
                }
                "img" => handle_img(session, document_url, node),
                "input" => {
                    if let Some(input_attr_type_value) = get_node_attr(node, "type") {
                        if input_attr_type_value.eq_ignore_ascii_case("image") {
                            if let Some(input_attr_src_value) = get_node_attr(node, "src") {
                                if session.options.no_images || input_attr_src_value.is_empty() {
                                    let value = if input_attr_src_value.is_empty() {
                                        ""
                                    } else {
                                        EMPTY_IMAGE_DATA_URL
                                    };
                                    set_node_attr(node, "src", Some(value.to_string()));
                                } else {
                                    retrieve_and_embed_asset(
                                        session,
                                        document_url,
                                        node,
                                        "src",
                                        &input_attr_src_value,
                                    );
                                }
                            }
                        }
                    }
                }
                "svg" => {
                    if session.options.no_images {
                        node.children.borrow_mut().clear();
                    }
                }
                "source" => {
                    // picture 里的 srcset 嵌入；音视频源只改写为绝对 URL
                    let parent_node_name = get_parent_node(node)
                        .and_then(|parent| get_node_name(&parent).map(|name| name.to_string()))
                        .unwrap_or_default();

                    if parent_node_name == "picture" {
                        if let Some(source_attr_srcset_value) = get_node_attr(node, "srcset") {
                            if !source_attr_srcset_value.is_empty() {
                                if session.options.no_images {
                                    set_node_attr(
                                        node,
                                        "srcset",
                                        Some(EMPTY_IMAGE_DATA_URL.to_string()),
                                    );
                                } else {
                                    let resolved_srcset: String = embed_srcset(
                                        session,
                                        document_url,
                                        &source_attr_srcset_value,
                                    );
                                    set_node_attr(node, "srcset", Some(resolved_srcset));
                                }
                            }
                        }
                    } else if let Some(source_attr_src_value) = get_node_attr(node, "src") {
                        let src_full_url = resolve_url(document_url, &source_attr_src_value);
                        set_node_attr(node, "src", Some(src_full_url.to_string()));
                    }
                }
                "audio" | "video" => {
                    // 音视频体积不可控，保留远程绝对 URL 引用
                    if let Some(media_attr_src_value) = get_node_attr(node, "src") {
                        let src_full_url = resolve_url(document_url, &media_attr_src_value);
                        set_node_attr(node, "src", Some(src_full_url.to_string()));
                    }

                    if let Some(video_attr_poster_value) = get_node_attr(node, "poster") {
                        if !video_attr_poster_value.is_empty() {
                            if session.options.no_images {
                                set_node_attr(
                                    node,
                                    "poster",
                                    Some(EMPTY_IMAGE_DATA_URL.to_string()),
                                );
                            } else {
                                retrieve_and_embed_asset(
                                    session,
                                    document_url,
                                    node,
                                    "poster",
                                    &video_attr_poster_value,
                                );
                            }
                        }
                    }
                }
                "a" | "area" => {
                    if let Some(anchor_attr_href_value) = get_node_attr(node, "href") {
                        if anchor_attr_href_value.trim().starts_with("javascript:") {
                            if !session.options.keep_scripts {
                                // 替换为空 JS 调用，保持点击不跳转的原始行为
                                set_node_attr(node, "href", Some("javascript:;".to_string()));
                            }
                        } else if !anchor_attr_href_value.starts_with('#')
                            && !is_url_and_has_protocol(&anchor_attr_href_value)
                        {
                            let href_full_url: Url =
                                resolve_url(document_url, &anchor_attr_href_value);
                            set_node_attr(node, "href", Some(href_full_url.to_string()));
                        }
                    }
                }
                "script" => {
                    handle_script(session, document_url, node);
                    // 节点可能已被移除，无需继续处理
                    return;
                }
                "style" => {
                    for child_node in node.children.borrow_mut().iter_mut() {
                        if let NodeData::Text { ref contents } = child_node.data {
                            let mut tendril = contents.borrow_mut();
                            let replacement = embed_css(session, document_url, tendril.as_ref());
                            tendril.clear();
                            tendril.push_slice(&replacement);
                        }
                    }
                }
                "form" => {
                    if let Some(form_attr_action_value) = get_node_attr(node, "action") {
                        let form_action_full_url: Url =
                            resolve_url(document_url, &form_attr_action_value);
                        set_node_attr(node, "action", Some(form_action_full_url.to_string()));
                    }
                }
                "frame" | "iframe" => {
                    // 嵌套文档不做递归打包，只保证引用是绝对 URL
                    if let Some(frame_attr_src_value) = get_node_attr(node, "src") {
                        if !frame_attr_src_value.trim().is_empty() {
                            let frame_full_url = resolve_url(document_url, &frame_attr_src_value);
                            set_node_attr(node, "src", Some(frame_full_url.to_string()));
                        }
                    }
                }
                _ => {}
            }

            // style 属性里的 url() 引用也要嵌入
            if let Some(node_attr_style_value) = get_node_attr(node, "style") {
                let embedded_style = embed_css(session, document_url, &node_attr_style_value);
                set_node_attr(node, "style", Some(embedded_style));
            }

            // 移除 JS 事件属性
            if !session.options.keep_scripts {
                strip_event_handler_attrs(node);
            }

            walk_children(session, document_url, node);
        }
        _ => {}
    }
}

/// 遍历子节点
///
/// 先拷贝子节点列表再递归：处理器可能替换或移除子节点，
/// 不能在持有 borrow 的情况下修改。
fn walk_children(session: &mut Session, document_url: &Url, node: &Handle) {
    let children: Vec<Handle> = node.children.borrow().clone();
    for child_node in children.iter() {
        walk(session, document_url, child_node);
    }
}

fn handle_meta(node: &Handle) {
    if let Some(meta_attr_http_equiv_value) = get_node_attr(node, "http-equiv") {
        if meta_attr_http_equiv_value.eq_ignore_ascii_case("refresh")
            || meta_attr_http_equiv_value.eq_ignore_ascii_case("location")
        {
            // 能控制页面跳转的 meta 一律失效
            set_node_attr(node, "http-equiv", None);
        } else if meta_attr_http_equiv_value.eq_ignore_ascii_case("content-security-policy") {
            // 原页面的 CSP 会阻止内联的 data URI 资源；
            // 序列化阶段会在 HEAD 最前面补一条宽松策略
            detach_node(node);
        }
    }
}

fn handle_link(session: &mut Session, document_url: &Url, node: &Handle) {
    let link_node_types: Vec<LinkType> =
        parse_link_type(&get_node_attr(node, "rel").unwrap_or_default());

    if link_node_types.contains(&LinkType::Favicon)
        || link_node_types.contains(&LinkType::AppleTouchIcon)
    {
        if let Some(link_attr_href_value) = get_node_attr(node, "href") {
            if !session.options.no_images && !link_attr_href_value.is_empty() {
                retrieve_and_embed_asset(
                    session,
                    document_url,
                    node,
                    "href",
                    &link_attr_href_value,
                );
            } else {
                set_node_attr(node, "href", None);
            }
        }
    } else if link_node_types.contains(&LinkType::Stylesheet) {
        if let Some(link_attr_href_value) = get_node_attr(node, "href") {
            if !link_attr_href_value.is_empty() {
                // 成功时整个 link 节点会被替换为内联 style
                retrieve_and_embed_asset(
                    session,
                    document_url,
                    node,
                    "href",
                    &link_attr_href_value,
                );
            }
        }
    } else if link_node_types.contains(&LinkType::Preload)
        || link_node_types.contains(&LinkType::DnsPrefetch)
    {
        // 所有资源都已内联，预加载和预解析不再有意义
        set_node_attr(node, "rel", None);
    } else {
        if let Some(link_attr_href_value) = get_node_attr(node, "href") {
            let href_full_url: Url = resolve_url(document_url, &link_attr_href_value);
            set_node_attr(node, "href", Some(href_full_url.to_string()));
        }
    }
}

fn handle_img(session: &mut Session, document_url: &Url, node: &Handle) {
    let img_attr_src_value: Option<String> = get_node_attr(node, "src");

    // 懒加载属性里的地址优先于 src 里的占位图
    let mut lazy_src: Option<String> = None;
    for lazy_attr in LAZY_IMAGE_ATTRS {
        if let Some(value) = get_node_attr(node, lazy_attr) {
            if !value.is_empty() {
                lazy_src = Some(value);
                break;
            }
        }
    }

    if session.options.no_images {
        if img_attr_src_value.is_some() {
            set_node_attr(node, "src", Some(EMPTY_IMAGE_DATA_URL.to_string()));
        }
        for lazy_attr in LAZY_IMAGE_ATTRS {
            set_node_attr(node, lazy_attr, None);
        }
    } else if lazy_src.is_none() && img_attr_src_value.clone().unwrap_or_default().is_empty() {
        set_node_attr(node, "src", Some("".to_string()));
    } else {
        let img_full_url: String = match lazy_src {
            Some(lazy_value) => {
                debug!("使用懒加载属性中的图片地址: {}", lazy_value);
                lazy_value
            }
            None => img_attr_src_value.unwrap_or_default(),
        };
        retrieve_and_embed_asset(session, document_url, node, "src", &img_full_url);

        // 嵌入后清掉懒加载属性，避免前端脚本再次改写 src
        for lazy_attr in LAZY_IMAGE_ATTRS {
            set_node_attr(node, lazy_attr, None);
        }
    }

    if let Some(img_srcset) = get_node_attr(node, "srcset") {
        if !img_srcset.is_empty() {
            if session.options.no_images {
                set_node_attr(node, "srcset", None);
            } else {
                let resolved_srcset: String = embed_srcset(session, document_url, &img_srcset);
                set_node_attr(node, "srcset", Some(resolved_srcset));
            }
        }
    }
}

fn handle_script(session: &mut Session, document_url: &Url, node: &Handle) {
    let script_attr_src: String = get_node_attr(node, "src").unwrap_or_default();

    if !script_attr_src.is_empty() {
        let script_full_url = resolve_url(document_url, &script_attr_src);

        if session.options.keep_scripts || is_same_origin(document_url, &script_full_url) {
            retrieve_and_embed_asset(session, document_url, node, "src", &script_attr_src);
        } else {
            debug!("移除跨域脚本: {}", script_full_url);
            detach_node(node);
        }
        return;
    }

    if !session.options.keep_scripts && inline_script_hits_ajax_endpoint(node) {
        debug!("移除引用后端接口的内联脚本");
        detach_node(node);
    }
}

/// 内联脚本内容是否引用了离线后不可用的后端接口
fn inline_script_hits_ajax_endpoint(node: &Handle) -> bool {
    for child_node in node.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child_node.data {
            let code = contents.borrow();
            if AJAX_ENDPOINT_MARKERS
                .iter()
                .any(|marker| code.contains(marker))
            {
                return true;
            }
        }
    }
    false
}

/// 移除元素上的 on* 事件处理属性
fn strip_event_handler_attrs(node: &Handle) {
    if let NodeData::Element { ref attrs, .. } = node.data {
        attrs
            .borrow_mut()
            .retain(|attr| !attr.name.local.starts_with("on"));
    }
}
