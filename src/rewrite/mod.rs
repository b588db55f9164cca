//! # 文本替换引擎
//!
//! 将 (原文, 替换文) 对应用到第三方 HTML 上，同时保证标签、属性和
//! 内联 CSS 逐字节不变。替换只发生在文本层：任何策略都不允许命中
//! 标签内部（`<` 与 `>` 之间）的内容。
//!
//! 匹配策略按顺序尝试，第一个命中的生效；每次只替换第一处出现。
//! 所有策略都失败时拒绝该条变更并记录，绝不输出损坏的文档。
//!
//! 变更按输入顺序依次应用在不断演化的文档上：后一条变更看到的是
//! 前一条已生效的结果。

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::core::ElementType;

/// 前端提交的一条文案变更
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContentChange {
    /// 来自提取结果的元素 id，如 "headline-1"
    pub element_id: String,
    /// 页面中的原文
    pub original_text: String,
    /// 要替换成的文案
    pub modified_text: String,
}

impl ContentChange {
    /// 从元素 id 推断变更涉及的元素类别
    pub fn element_type(&self) -> ElementType {
        ElementType::from_element_id(&self.element_id)
    }
}

/// 命中的匹配策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// 原文逐字出现在文本层
    Exact,
    /// Unicode 归一化（NFC/NFKD）后匹配
    Normalized,
    /// 与单个文本段整体相等（忽略首尾空白）
    TextSegment,
    /// 去掉表情前缀后匹配，文档中的前缀保留
    EmojiPrefix,
    /// 原文被内联标签打断，跨标签匹配
    CrossTag,
}

/// 单条变更的处理结果
#[derive(Clone, Debug, Serialize)]
pub struct ChangeOutcome {
    pub element_id: String,
    pub element_type: String,
    /// 命中的策略；未命中时为 None
    pub strategy: Option<MatchStrategy>,
    pub applied: bool,
}

/// 整批变更的应用结果
#[derive(Clone, Debug, Serialize)]
pub struct RewriteResult {
    /// 改写后的文档；未命中的变更不影响它
    pub html: String,
    /// 成功应用的条数
    pub applied_count: usize,
    /// 被拒绝的原文列表
    pub unmatched_originals: Vec<String>,
    /// 逐条结果
    pub outcomes: Vec<ChangeOutcome>,
}

/// 将一批变更依次应用到 HTML 文档
pub fn apply_changes(html: &str, changes: &[ContentChange]) -> RewriteResult {
    let mut document = html.to_string();
    let mut applied_count = 0;
    let mut unmatched_originals = Vec::new();
    let mut outcomes = Vec::new();

    for change in changes {
        let strategy = apply_one(&mut document, change);
        let applied = strategy.is_some();

        if applied {
            applied_count += 1;
            debug!(
                "变更已应用: {} ({:?})",
                change.element_id,
                strategy.unwrap()
            );
        } else {
            warn!("未找到安全匹配，拒绝变更: {}", change.element_id);
            unmatched_originals.push(change.original_text.clone());
        }

        outcomes.push(ChangeOutcome {
            element_id: change.element_id.clone(),
            element_type: change.element_type().to_string(),
            strategy,
            applied,
        });
    }

    RewriteResult {
        html: document,
        applied_count,
        unmatched_originals,
        outcomes,
    }
}

/// 按策略顺序尝试应用单条变更，返回命中的策略
fn apply_one(document: &mut String, change: &ContentChange) -> Option<MatchStrategy> {
    let original = change.original_text.trim();
    let replacement = change.modified_text.as_str();

    if original.is_empty() {
        return None;
    }

    // 1. 逐字匹配（带标签内部保护）
    if replace_exact(document, original, replacement) {
        return Some(MatchStrategy::Exact);
    }

    // 2. Unicode 归一化匹配
    if replace_normalized(document, original, replacement) {
        return Some(MatchStrategy::Normalized);
    }

    // 3. 文本段整体匹配
    if replace_whole_segment(document, original, replacement) {
        return Some(MatchStrategy::TextSegment);
    }

    // 4. 去表情前缀匹配
    if replace_after_prefix_strip(document, original, replacement) {
        return Some(MatchStrategy::EmojiPrefix);
    }

    // 5. 跨标签匹配
    if replace_across_tags(document, original, replacement) {
        return Some(MatchStrategy::CrossTag);
    }

    None
}

/// 位置是否落在标签内部（`<` 与 `>` 之间）
fn inside_tag(document: &str, position: usize) -> bool {
    let before = &document[..position];
    match (before.rfind('<'), before.rfind('>')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

/// 位置是否落在 style 或 script 元素的内容里
///
/// 这些内容是代码而不是文案，任何策略都不得触碰。
fn inside_protected_element(document: &str, position: usize) -> bool {
    let before = document[..position].to_lowercase();

    for tag in ["style", "script"] {
        let last_open = before.rfind(&format!("<{}", tag));
        let last_close = before.rfind(&format!("</{}", tag));
        match (last_open, last_close) {
            (Some(open), Some(close)) => {
                if open > close {
                    return true;
                }
            }
            (Some(_), None) => return true,
            _ => {}
        }
    }

    false
}

/// 该位置的匹配是否安全
fn safe_position(document: &str, position: usize) -> bool {
    !inside_tag(document, position) && !inside_protected_element(document, position)
}

/// 策略 1：第一处不在标签内部的逐字出现
fn replace_exact(document: &mut String, original: &str, replacement: &str) -> bool {
    let mut search_from = 0;

    while let Some(relative) = document[search_from..].find(original) {
        let position = search_from + relative;

        if safe_position(document, position) {
            document.replace_range(position..position + original.len(), replacement);
            return true;
        }

        // 这处出现不安全（标签内部或代码内容），继续找下一处
        search_from = position + 1;
    }

    false
}

/// 策略 2：对每个文本段做 NFC / NFKD 归一化后查找
///
/// 命中时整段按归一化形式重建，段外字节不受影响。
fn replace_normalized(document: &mut String, original: &str, replacement: &str) -> bool {
    let nfc_needle: String = original.nfc().collect();
    let nfkd_needle: String = original.nfkd().collect();

    for (segment_start, segment_text) in text_segments(document) {
        let nfc_segment: String = segment_text.nfc().collect();
        if let Some(position) = nfc_segment.find(&nfc_needle) {
            let rebuilt = format!(
                "{}{}{}",
                &nfc_segment[..position],
                replacement,
                &nfc_segment[position + nfc_needle.len()..]
            );
            document.replace_range(segment_start..segment_start + segment_text.len(), &rebuilt);
            return true;
        }

        let nfkd_segment: String = segment_text.nfkd().collect();
        if let Some(position) = nfkd_segment.find(&nfkd_needle) {
            let rebuilt = format!(
                "{}{}{}",
                &nfkd_segment[..position],
                replacement,
                &nfkd_segment[position + nfkd_needle.len()..]
            );
            document.replace_range(segment_start..segment_start + segment_text.len(), &rebuilt);
            return true;
        }
    }

    false
}

/// 策略 3：某个文本段去掉首尾空白后与原文完全相等
fn replace_whole_segment(document: &mut String, original: &str, replacement: &str) -> bool {
    for (segment_start, segment_text) in text_segments(document) {
        if segment_text.trim() == original {
            let leading = segment_text.len() - segment_text.trim_start().len();
            let trailing = segment_text.len() - segment_text.trim_end().len();
            let inner_start = segment_start + leading;
            let inner_end = segment_start + segment_text.len() - trailing;
            document.replace_range(inner_start..inner_end, replacement);
            return true;
        }
    }

    false
}

/// 策略 4：原文带有表情或符号前缀时，去掉前缀再匹配
///
/// 文档中该处自己的前缀保持不动，只替换正文部分。
fn replace_after_prefix_strip(document: &mut String, original: &str, replacement: &str) -> bool {
    let stripped = original.trim_start_matches(|c: char| !c.is_alphanumeric());

    if stripped == original || stripped.is_empty() {
        return false;
    }

    replace_exact(document, stripped, replacement)
}

/// 策略 5：原文的词序列被内联标签或换行打断
///
/// 词之间允许任意空白和完整标签。匹配的整个跨度（包括其中的
/// 内联标签）被替换文案取代；跨度之外逐字节不变。
fn replace_across_tags(document: &mut String, original: &str, replacement: &str) -> bool {
    let words: Vec<&str> = original.split_whitespace().collect();
    if words.len() < 2 {
        return false;
    }

    let pattern = words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<String>>()
        .join(r"(?:\s|<[^>]*>)+");

    let re = match regex::Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return false,
    };

    let mut search_from = 0;
    while let Some(found) = re.find(&document[search_from..]) {
        let start = search_from + found.start();
        let end = search_from + found.end();

        if safe_position(document, start) {
            document.replace_range(start..end, replacement);
            return true;
        }

        search_from = start + 1;
    }

    false
}

/// 枚举文档中的文本段：`>` 与下一个 `<` 之间的内容
///
/// 返回 (段起始字节偏移, 段文本)。
fn text_segments(document: &str) -> Vec<(usize, String)> {
    let mut segments = Vec::new();
    let bytes = document.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'>' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end] != b'<' {
                end += 1;
            }
            if end > start {
                if let Some(text) = document.get(start..end) {
                    if !text.trim().is_empty() && !inside_protected_element(document, start) {
                        segments.push((start, text.to_string()));
                    }
                }
            }
            i = end;
        } else {
            i += 1;
        }
    }

    segments
}
