//! link rel 和 srcset 的解析
//!
//! 提供 `<link>` 元素 rel 属性和响应式图片 srcset 属性的解析。

use super::utils::{is_favicon, WHITESPACES};

/// `<link>` 元素 rel 属性的已知类型
#[derive(PartialEq, Eq)]
pub enum LinkType {
    /// 备用版本链接
    Alternate,
    /// Apple设备触摸图标
    AppleTouchIcon,
    /// DNS预取
    DnsPrefetch,
    /// 网站图标
    Favicon,
    /// 预加载资源
    Preload,
    /// CSS样式表
    Stylesheet,
}

/// srcset 属性中的单个图片项
pub struct SrcSetItem<'a> {
    /// 图片文件的路径或URL
    pub path: &'a str,
    /// 宽度描述符（如 "480w"）或像素密度描述符（如 "2x"）
    pub descriptor: &'a str,
}

/// 解析 rel 属性值为类型列表（不区分大小写，忽略未知值）
pub fn parse_link_type(link_attr_rel_value: &str) -> Vec<LinkType> {
    let mut types: Vec<LinkType> = vec![];

    for link_attr_rel_type in link_attr_rel_value.split_whitespace() {
        if link_attr_rel_type.eq_ignore_ascii_case("alternate") {
            types.push(LinkType::Alternate);
        } else if link_attr_rel_type.eq_ignore_ascii_case("dns-prefetch") {
            types.push(LinkType::DnsPrefetch);
        } else if link_attr_rel_type.eq_ignore_ascii_case("preload") {
            types.push(LinkType::Preload);
        } else if link_attr_rel_type.eq_ignore_ascii_case("stylesheet") {
            types.push(LinkType::Stylesheet);
        } else if is_favicon(link_attr_rel_type) {
            types.push(LinkType::Favicon);
        } else if link_attr_rel_type.eq_ignore_ascii_case("apple-touch-icon") {
            types.push(LinkType::AppleTouchIcon);
        }
    }

    types
}

/// 解析 srcset 属性
///
/// 支持宽度描述符（`480w`）、密度描述符（`2x`）和无描述符的项；
/// 无效片段被忽略。
pub fn parse_srcset(srcset: &str) -> Vec<SrcSetItem> {
    let mut srcset_items: Vec<SrcSetItem> = vec![];

    let mut partials: Vec<&str> = srcset.split(WHITESPACES).collect();
    let mut path: Option<&str> = None;
    let mut descriptor: Option<&str> = None;
    let mut i = 0;

    while i < partials.len() {
        let partial = partials[i];
        i += 1;

        if partial.is_empty() {
            continue;
        }

        if partial.ends_with(',') {
            if path.is_none() {
                path = Some(partial.strip_suffix(',').unwrap_or(partial));
                descriptor = Some("");
            } else {
                descriptor = Some(partial.strip_suffix(',').unwrap_or(partial));
            }
        } else if path.is_none() {
            path = Some(partial);
        } else {
            // 描述符和下一个路径可能粘在同一个片段里（逗号分隔）
            let mut chunks: Vec<&str> = partial.split(',').collect();

            if !chunks.is_empty() && chunks[0].ends_with(['x', 'w']) {
                descriptor = Some(chunks[0]);
                chunks.remove(0);
            }

            if !chunks.is_empty() {
                if let Some(desc) = descriptor {
                    partials.insert(i, &partial[desc.len()..]);
                } else {
                    partials.insert(i, partial);
                }
            }
        }

        if let (Some(p), Some(d)) = (path, descriptor) {
            srcset_items.push(SrcSetItem {
                path: p,
                descriptor: d,
            });

            path = None;
            descriptor = None;
        }
    }

    if let Some(p) = path {
        srcset_items.push(SrcSetItem {
            path: p,
            descriptor: descriptor.unwrap_or_default(),
        });
    }

    srcset_items
}
