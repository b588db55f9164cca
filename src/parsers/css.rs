//! CSS 解析器模块
//!
//! 将 CSS 样式表中引用的外部资源（背景图、字体、@import 的子样式表）
//! 嵌入为 data URI，输出自包含的 CSS。使用 cssparser 做语法级遍历，
//! 逐 token 重建样式表，保证未触及部分的语法原样保留。
//!
//! # 降级规则
//!
//! - 获取失败或超出大小上限的 http(s) 资源保留原始绝对 URL 引用；
//! - 其它方案的不可获取资源被移除；
//! - @import 递归深度超过 [`MAX_IMPORT_DEPTH`] 时不再内联，保留远程引用。
//!
//! CSS 引用的图片受 `css_image_ceiling` 约束；字体不限大小，
//! 只受请求超时约束。

use cssparser::{serialize_identifier, serialize_string, ParseError, Parser, ParserInput, Token};
use tracing::warn;

use crate::core::SnapshotError;
use crate::network::session::Session;
use crate::utils::url::{create_data_url, resolve_url, Url, EMPTY_IMAGE_DATA_URL};

/// @import 链的最大递归深度，防止循环导入
pub const MAX_IMPORT_DEPTH: usize = 8;

/// 可能包含图片 URL 的 CSS 属性
///
/// 这些属性里的 url() 受图片大小上限约束；其余属性（主要是
/// @font-face 的 src）不限大小。
const CSS_PROPS_WITH_IMAGE_URLS: &[&str] = &[
    // Universal
    "background",
    "background-image",
    "border-image",
    "border-image-source",
    "content",
    "cursor",
    "list-style",
    "list-style-image",
    "mask",
    "mask-image",
    // Specific to @counter-style
    "additive-symbols",
    "negative",
    "pad",
    "prefix",
    "suffix",
    "symbols",
];

/// 将 CSS 中的外部资源嵌入为 data URI
///
/// `document_url` 是这段 CSS 的归属 URL：对 `<style>` 和 style 属性
/// 是页面 URL，对外部样式表是样式表自己的最终 URL。相对引用
/// 一律基于它解析。
pub fn embed_css(session: &mut Session, document_url: &Url, css: &str) -> String {
    embed_css_at_depth(session, document_url, css, 0)
}

fn embed_css_at_depth(session: &mut Session, document_url: &Url, css: &str, depth: usize) -> String {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    process_css(session, document_url, &mut parser, "", "", "", depth).unwrap_or_default()
}

/// 格式化 CSS 标识符，转义特殊字符
pub fn format_ident(ident: &str) -> String {
    let mut res: String = "".to_string();
    let _ = serialize_identifier(ident, &mut res);
    res = res.trim_end().to_string();
    res
}

/// 格式化带引号的 CSS 字符串
pub fn format_quoted_string(string: &str) -> String {
    let mut res: String = "".to_string();
    let _ = serialize_string(string, &mut res);
    res
}

/// 检查 CSS 属性是否可能包含图片 URL
pub fn is_image_url_prop(prop_name: &str) -> bool {
    CSS_PROPS_WITH_IMAGE_URLS
        .iter()
        .any(|p| prop_name.eq_ignore_ascii_case(p))
}

/// CSS 解析上下文：当前 at-rule、当前属性名和 @import 深度
#[derive(Debug, Clone)]
struct CssProcessingContext {
    current_rule: String,
    current_prop: String,
    depth: usize,
}

/// 逐 token 处理 CSS 并重建样式表
///
/// 识别 @import 规则和 url() 函数并嵌入资源；其余 token 按原语法
/// 序列化。块结构和函数通过 `parse_nested_block` 递归处理。
#[allow(clippy::too_many_arguments)]
fn process_css<'a>(
    session: &mut Session,
    document_url: &Url,
    parser: &mut Parser,
    rule_name: &str,
    prop_name: &str,
    func_name: &str,
    depth: usize,
) -> Result<String, ParseError<'static, String>> {
    let mut result = String::new();
    let mut context = CssProcessingContext {
        current_rule: rule_name.to_string(),
        current_prop: prop_name.to_string(),
        depth,
    };

    loop {
        let token_offset = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token,
            Err(_) => break,
        };

        let token_result = match &token {
            // 注释原样保留
            Token::Comment(_) => parser.slice_from(token_offset).to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Colon => ":".to_string(),
            Token::Comma => ",".to_string(),
            Token::CloseParenthesis => ")".to_string(),
            Token::CloseSquareBracket => "]".to_string(),
            Token::CloseCurlyBracket => "}".to_string(),
            Token::IncludeMatch => "~=".to_string(),
            Token::DashMatch => "|=".to_string(),
            Token::PrefixMatch => "^=".to_string(),
            Token::SuffixMatch => "$=".to_string(),
            Token::SubstringMatch => "*=".to_string(),
            Token::CDO => "<!--".to_string(),
            Token::CDC => "-->".to_string(),
            Token::WhiteSpace(value) => value.to_string(),
            Token::Ident(value) => {
                context.current_rule.clear();
                context.current_prop = value.to_string();
                format_ident(value)
            }
            Token::AtKeyword(value) => {
                context.current_rule = value.to_string();
                if session.options.no_fonts && context.current_rule == "font-face" {
                    String::new()
                } else {
                    format!("@{}", value)
                }
            }
            Token::Hash(value) => format!("#{}", value),
            Token::IDHash(value) => {
                context.current_rule.clear();
                format!("#{}", format_ident(value))
            }
            Token::QuotedString(value) => {
                if context.current_rule == "import" {
                    context.current_rule.clear();
                    embed_import(session, document_url, value, context.depth)
                } else if func_name == "url" {
                    embed_url_value(session, document_url, value, &context)
                } else {
                    format_quoted_string(value)
                }
            }
            Token::Number {
                has_sign, value, ..
            } => {
                let mut result = String::new();
                if *has_sign && *value >= 0.0 {
                    result.push('+');
                }
                result.push_str(&value.to_string());
                result
            }
            Token::Percentage {
                has_sign,
                unit_value,
                ..
            } => {
                let mut result = String::new();
                if *has_sign && *unit_value >= 0.0 {
                    result.push('+');
                }
                result.push_str(&(unit_value * 100.0).to_string());
                result.push('%');
                result
            }
            Token::Dimension {
                has_sign,
                value,
                unit,
                ..
            } => {
                let mut result = String::new();
                if *has_sign && *value >= 0.0 {
                    result.push('+');
                }
                result.push_str(&value.to_string());
                result.push_str(unit);
                result
            }
            Token::UnquotedUrl(value) => {
                let is_import = context.current_rule == "import";
                if is_import {
                    context.current_rule.clear();
                }

                if value.is_empty() {
                    "url()".to_string()
                } else if value.starts_with('#') {
                    // 片段引用（SVG filter 等）指向文档内部，保持原样
                    format!("url({})", value)
                } else if is_import {
                    format!(
                        "url({})",
                        embed_import(session, document_url, value, context.depth)
                    )
                } else {
                    format!(
                        "url({})",
                        embed_url_value(session, document_url, value, &context)
                    )
                }
            }
            Token::Delim(value) => value.to_string(),
            Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
                if session.options.no_fonts && context.current_rule == "font-face" {
                    String::new()
                } else {
                    let (open_char, close_char) = match token {
                        Token::ParenthesisBlock => ('(', ')'),
                        Token::SquareBracketBlock => ('[', ']'),
                        Token::CurlyBracketBlock => ('{', '}'),
                        _ => ('(', ')'),
                    };

                    let rule = context.current_rule.clone();
                    let mut result = String::new();
                    result.push(open_char);

                    let block_css = parser
                        .parse_nested_block(|parser| {
                            process_css(
                                session,
                                document_url,
                                parser,
                                &rule,
                                &context.current_prop,
                                func_name,
                                context.depth,
                            )
                        })
                        .unwrap_or_default();
                    result.push_str(&block_css);

                    result.push(close_char);
                    result
                }
            }
            Token::Function(name) => {
                let function_name = name.to_string();
                let mut result = String::new();
                result.push_str(&function_name);
                result.push('(');

                let block_css = parser
                    .parse_nested_block(|parser| {
                        process_css(
                            session,
                            document_url,
                            parser,
                            rule_name,
                            &context.current_prop,
                            &function_name,
                            context.depth,
                        )
                    })
                    .unwrap_or_default();
                result.push_str(&block_css);

                result.push(')');
                result
            }
            Token::BadUrl(_) | Token::BadString(_) => String::new(),
        };

        result.push_str(&token_result);
    }

    // 仅含空白的结果压成空字符串
    if !result.is_empty() && result.trim().is_empty() {
        result = result.trim().to_string();
    }

    Ok(result)
}

/// 内联一个 @import 引用的样式表
///
/// 导入的 CSS 先以其最终 URL 为基准递归嵌入自身资源，再整体
/// 转成 data URI。深度超限或获取失败时保留 http(s) 远程引用。
fn embed_import(session: &mut Session, document_url: &Url, value: &str, depth: usize) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    let import_full_url = resolve_url(document_url, value);

    if depth >= MAX_IMPORT_DEPTH {
        warn!("@import 链超过深度上限，保留远程引用: {}", import_full_url);
        return keep_remote_or_drop(&import_full_url);
    }

    match session.retrieve_asset(document_url, &import_full_url, None) {
        Ok(asset) => {
            let embedded = embed_css_at_depth(
                session,
                &asset.final_url,
                &String::from_utf8_lossy(&asset.data),
                depth + 1,
            );
            let mut import_data_url = create_data_url(
                &asset.media_type,
                &asset.charset,
                embedded.as_bytes(),
                &asset.final_url,
            );
            import_data_url.set_fragment(import_full_url.fragment());
            format_quoted_string(import_data_url.as_ref())
        }
        Err(_) => keep_remote_or_drop(&import_full_url),
    }
}

/// 内联 url() 引用的资源（图片、字体等）
fn embed_url_value(
    session: &mut Session,
    document_url: &Url,
    value: &str,
    context: &CssProcessingContext,
) -> String {
    if value.is_empty() {
        return String::new();
    }

    let is_image = is_image_url_prop(&context.current_prop);

    if session.options.no_images && is_image {
        return format_quoted_string(EMPTY_IMAGE_DATA_URL);
    }

    // 图片受大小上限约束；字体和其它资源不限
    let ceiling = if is_image {
        Some(session.options.css_image_ceiling)
    } else {
        None
    };

    let resolved_url = resolve_url(document_url, value);
    match session.retrieve_asset(document_url, &resolved_url, ceiling) {
        Ok(asset) => {
            let mut data_url =
                create_data_url(&asset.media_type, &asset.charset, &asset.data, &asset.final_url);
            data_url.set_fragment(resolved_url.fragment());
            format_quoted_string(data_url.as_ref())
        }
        Err(SnapshotError::AssetTooLarge { url, size, ceiling }) => {
            warn!("CSS 图片超出大小上限，保留远程引用: {} ({} > {})", url, size, ceiling);
            keep_remote_or_drop(&resolved_url)
        }
        Err(_) => keep_remote_or_drop(&resolved_url),
    }
}

/// 获取失败时的降级：http(s) 保留远程引用，其它方案移除
fn keep_remote_or_drop(url: &Url) -> String {
    if url.scheme() == "http" || url.scheme() == "https" {
        format_quoted_string(url.as_ref())
    } else {
        String::new()
    }
}
