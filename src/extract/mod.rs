//! # 结构化内容提取模块
//!
//! 从落地页 HTML 中提取按用途分桶的营销文案：主标题、副标题、
//! 说明与信任文案、行动号召。每个桶有封闭的判定规则和条数上限，
//! 提取前先经过噪音过滤（见 `noise`）。
//!
//! # 模块组织
//!
//! - `noise` - 噪音元素过滤

pub mod noise;

use std::collections::HashSet;
use std::sync::OnceLock;

use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::parsers::html::dom::{
    find_nodes, get_node_attr, get_node_name, get_text_content, html_to_dom,
};

pub use noise::strip_noise;

/// 内容桶：封闭枚举，每个桶对应一套判定规则和上限
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentBucket {
    /// 主标题
    Headline,
    /// 副标题
    Subheadline,
    /// 说明与信任文案
    DescriptionCredibility,
    /// 行动号召
    CallToAction,
}

/// 单个桶的判定规则
struct BucketRule {
    bucket: ContentBucket,
    /// 结果条数上限
    cap: usize,
    /// 文本长度下限（字符）
    min_len: usize,
    /// 文本长度上限（字符）
    max_len: usize,
}

/// 各桶的规则表，匹配顺序即优先级
const BUCKET_RULES: &[BucketRule] = &[
    BucketRule {
        bucket: ContentBucket::Headline,
        cap: 3,
        min_len: 10,
        max_len: 200,
    },
    BucketRule {
        bucket: ContentBucket::Subheadline,
        cap: 5,
        min_len: 5,
        max_len: 300,
    },
    BucketRule {
        bucket: ContentBucket::DescriptionCredibility,
        cap: 8,
        min_len: 20,
        max_len: 500,
    },
    BucketRule {
        bucket: ContentBucket::CallToAction,
        cap: 10,
        min_len: 5,
        max_len: 200,
    },
];

fn rule_for(bucket: ContentBucket) -> &'static BucketRule {
    BUCKET_RULES
        .iter()
        .find(|rule| rule.bucket == bucket)
        .unwrap()
}

/// 提取出的一条文案
#[derive(Clone, Debug, Serialize)]
pub struct ExtractedItem {
    /// 前端可引用的稳定 id，如 "headline-1"
    pub id: String,
    /// 归一化后的文本
    pub text: String,
    /// 所属桶
    pub bucket: ContentBucket,
}

/// 一个页面的结构化文案
#[derive(Clone, Debug, Default, Serialize)]
pub struct StructuredContent {
    pub headlines: Vec<ExtractedItem>,
    pub subheadlines: Vec<ExtractedItem>,
    pub descriptions: Vec<ExtractedItem>,
    pub calls_to_action: Vec<ExtractedItem>,
    /// meta description，同时作为说明桶的第一候选
    pub meta_description: Option<String>,
}

impl StructuredContent {
    /// 所有桶的条目总数
    pub fn total(&self) -> usize {
        self.headlines.len()
            + self.subheadlines.len()
            + self.descriptions.len()
            + self.calls_to_action.len()
    }
}

/// 行动号召的用语特征
fn cta_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(sign\s?up|get\s?started|learn\s?more|buy\s?now|subscribe|download|try\s(it\s)?(for\s)?free|free\strial|limited\stime|unlock|claim|join|register|order\snow|shop\snow|add\sto\scart|book\s(a\s)?(demo|call)|contact\s(us|sales)|start\s(now|today|your))\b",
        )
        .unwrap()
    })
}

/// 同意/关闭类按钮用语，不算行动号召
fn dismiss_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(accept|decline|reject|dismiss|close|got\sit|ok(ay)?|no\sthanks|allow(\sall)?|cookie\ssettings)\s*$")
            .unwrap()
    })
}

/// CTA 元素常见的 class 关键词
const CTA_CLASS_KEYWORDS: &[&str] = &["cta", "btn", "button", "action"];

/// 主标题元素的 class/id 关键词
const HEADLINE_CLASS_KEYWORDS: &[&str] = &["headline", "title"];

/// 副标题元素的 class/id 关键词
///
/// 先于主标题关键词判定："subtitle" 同时含有 "title"。
const SUBHEADLINE_CLASS_KEYWORDS: &[&str] = &["subheadline", "subtitle", "tagline"];

/// 说明与信任文案的 class/id 关键词
const DESCRIPTION_CLASS_KEYWORDS: &[&str] = &[
    "description",
    "about",
    "intro",
    "summary",
    "testimonial",
    "review",
    "award",
    "certification",
    "guarantee",
];

/// 首屏容器的 class/id 关键词，其中的首段文本按副标题处理
const HERO_CLASS_KEYWORDS: &[&str] = &["hero", "jumbotron", "masthead"];

/// 出现这些词的文本不会是页面主标题
const HEADLINE_STOPLIST: &[&str] = &["cookie", "privacy", "sign in", "log in", "menu"];

/// 从 HTML 提取结构化文案
///
/// 在内部副本上执行噪音过滤后按规则表分桶；去重、裁剪到各桶
/// 上限。输入文档本身不会被修改。
pub fn extract(html: &str) -> StructuredContent {
    let dom = html_to_dom(html.as_bytes(), "utf-8".to_string());
    strip_noise(&dom.document);

    let mut content = StructuredContent {
        meta_description: get_meta_description(&dom.document),
        ..Default::default()
    };

    // meta description 是说明桶最可信的候选
    let mut seen: HashSet<String> = HashSet::new();
    if let Some(ref meta_description) = content.meta_description {
        let rule = rule_for(ContentBucket::DescriptionCredibility);
        if (rule.min_len..=rule.max_len).contains(&meta_description.chars().count()) {
            seen.insert(meta_description.clone());
            content.descriptions.push(ExtractedItem {
                id: "description-1".to_string(),
                text: meta_description.clone(),
                bucket: ContentBucket::DescriptionCredibility,
            });
        }
    }

    let mut hero_lead_taken = false;
    collect(&dom.document, &mut content, &mut seen, false, &mut hero_lead_taken);

    debug!(
        "提取完成: {} 条主标题, {} 条副标题, {} 条说明, {} 条行动号召",
        content.headlines.len(),
        content.subheadlines.len(),
        content.descriptions.len(),
        content.calls_to_action.len()
    );

    content
}

fn get_meta_description(document: &Handle) -> Option<String> {
    for meta_node in find_nodes(document, vec!["html", "head", "meta"]).iter() {
        if get_node_attr(meta_node, "name")
            .unwrap_or_default()
            .eq_ignore_ascii_case("description")
        {
            let content = get_node_attr(meta_node, "content").unwrap_or_default();
            let content = content.split_whitespace().collect::<Vec<&str>>().join(" ");
            if !content.is_empty() {
                return Some(content);
            }
        }
    }
    None
}

fn collect(
    node: &Handle,
    content: &mut StructuredContent,
    seen: &mut HashSet<String>,
    in_hero: bool,
    hero_lead_taken: &mut bool,
) {
    let mut in_hero = in_hero;

    if let NodeData::Element { .. } = node.data {
        let name = get_node_name(node).unwrap_or_default().to_string();

        if let Some((bucket, text)) = classify_element(&name, node, in_hero, hero_lead_taken) {
            try_push(content, seen, bucket, text);

            // 已分桶的元素不再深入，避免嵌套元素重复入桶
            return;
        }

        in_hero = in_hero || has_keyword(node, HERO_CLASS_KEYWORDS);
    }

    for child_node in node.children.borrow().clone().iter() {
        collect(child_node, content, seen, in_hero, hero_lead_taken);
    }
}

/// class 或 id 含有任一关键词
fn has_keyword(node: &Handle, keywords: &[&str]) -> bool {
    let class_value = get_node_attr(node, "class").unwrap_or_default().to_lowercase();
    let id_value = get_node_attr(node, "id").unwrap_or_default().to_lowercase();

    keywords
        .iter()
        .any(|keyword| class_value.contains(keyword) || id_value.contains(keyword))
}

/// 元素到桶的判定：返回命中的桶和候选文本
///
/// 标签名优先于 class/id 关键词；副标题关键词先于主标题关键词。
fn classify_element(
    name: &str,
    node: &Handle,
    in_hero: bool,
    hero_lead_taken: &mut bool,
) -> Option<(ContentBucket, String)> {
    match name {
        "h1" => Some((ContentBucket::Headline, get_text_content(node))),
        "h2" | "h3" => Some((ContentBucket::Subheadline, get_text_content(node))),
        "button" => Some((ContentBucket::CallToAction, get_text_content(node))),
        "input" => {
            let input_type = get_node_attr(node, "type").unwrap_or_default().to_lowercase();
            if input_type == "submit" || input_type == "button" {
                get_node_attr(node, "value").map(|value| (ContentBucket::CallToAction, value))
            } else {
                None
            }
        }
        "a" => {
            let text = get_text_content(node);
            if has_keyword(node, CTA_CLASS_KEYWORDS) || cta_regex().is_match(&text) {
                Some((ContentBucket::CallToAction, text))
            } else {
                None
            }
        }
        "p" => {
            // 首屏容器里的第一段按副标题处理
            if in_hero && !*hero_lead_taken {
                *hero_lead_taken = true;
                Some((ContentBucket::Subheadline, get_text_content(node)))
            } else {
                Some((ContentBucket::DescriptionCredibility, get_text_content(node)))
            }
        }
        "blockquote" | "figcaption" => {
            Some((ContentBucket::DescriptionCredibility, get_text_content(node)))
        }
        _ => {
            if has_keyword(node, SUBHEADLINE_CLASS_KEYWORDS) {
                Some((ContentBucket::Subheadline, get_text_content(node)))
            } else if has_keyword(node, HEADLINE_CLASS_KEYWORDS) {
                Some((ContentBucket::Headline, get_text_content(node)))
            } else if has_keyword(node, DESCRIPTION_CLASS_KEYWORDS) {
                Some((ContentBucket::DescriptionCredibility, get_text_content(node)))
            } else if has_keyword(node, CTA_CLASS_KEYWORDS) {
                Some((ContentBucket::CallToAction, get_text_content(node)))
            } else {
                None
            }
        }
    }
}

fn try_push(
    content: &mut StructuredContent,
    seen: &mut HashSet<String>,
    bucket: ContentBucket,
    text: String,
) {
    let rule = rule_for(bucket);
    let length = text.chars().count();

    if !(rule.min_len..=rule.max_len).contains(&length) {
        return;
    }

    if bucket == ContentBucket::Headline {
        let lowered = text.to_lowercase();
        // 单个词或法务/导航用语不会是页面主标题
        if text.split_whitespace().count() < 2
            || HEADLINE_STOPLIST.iter().any(|phrase| lowered.contains(phrase))
        {
            return;
        }
    }

    if bucket == ContentBucket::CallToAction && dismiss_regex().is_match(&text) {
        return;
    }

    if seen.contains(&text) {
        return;
    }

    let items = match bucket {
        ContentBucket::Headline => &mut content.headlines,
        ContentBucket::Subheadline => &mut content.subheadlines,
        ContentBucket::DescriptionCredibility => &mut content.descriptions,
        ContentBucket::CallToAction => &mut content.calls_to_action,
    };

    if items.len() >= rule.cap {
        return;
    }

    let prefix = match bucket {
        ContentBucket::Headline => "headline",
        ContentBucket::Subheadline => "subheadline",
        ContentBucket::DescriptionCredibility => "description",
        ContentBucket::CallToAction => "cta",
    };

    seen.insert(text.clone());
    items.push(ExtractedItem {
        id: format!("{}-{}", prefix, items.len() + 1),
        text,
        bucket,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_buckets() {
        let html = r#"<html><head><meta name="description" content="The fastest way to launch a landing page."></head>
            <body>
              <h1>Launch pages in minutes</h1>
              <h2>No code required</h2>
              <p>Trusted by over 10,000 marketing teams around the world.</p>
              <a class="btn-primary" href="/signup">Get started free</a>
            </body></html>"#;
        let content = extract(html);

        assert_eq!(content.headlines.len(), 1);
        assert_eq!(content.headlines[0].text, "Launch pages in minutes");
        assert_eq!(content.subheadlines.len(), 1);
        assert!(content
            .descriptions
            .iter()
            .any(|item| item.text.contains("10,000 marketing teams")));
        assert_eq!(content.calls_to_action.len(), 1);
        assert_eq!(content.calls_to_action[0].text, "Get started free");
        assert_eq!(
            content.meta_description.as_deref(),
            Some("The fastest way to launch a landing page.")
        );
    }

    #[test]
    fn test_headline_cap_is_three() {
        let mut body = String::new();
        for i in 0..6 {
            body.push_str(&format!("<h1>Completely unique headline {i}</h1>"));
        }
        let html = format!("<html><body>{body}</body></html>");
        let content = extract(&html);
        assert_eq!(content.headlines.len(), 3);
        assert_eq!(content.headlines[2].id, "headline-3");
    }

    #[test]
    fn test_cta_cap_is_ten() {
        let mut body = String::new();
        for i in 0..15 {
            body.push_str(&format!("<button>Claim offer {i:02}</button>"));
        }
        let html = format!("<html><body>{body}</body></html>");
        let content = extract(&html);
        assert_eq!(content.calls_to_action.len(), 10);
    }

    #[test]
    fn test_consent_buttons_excluded_from_cta() {
        let html = r#"<html><body>
            <button>Accept</button>
            <button>No thanks</button>
            <button>Start your trial</button>
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.calls_to_action.len(), 1);
        assert_eq!(content.calls_to_action[0].text, "Start your trial");
    }

    #[test]
    fn test_plain_anchor_not_cta() {
        let html = r#"<html><body><a href="/about">About the company</a></body></html>"#;
        let content = extract(html);
        assert!(content.calls_to_action.is_empty());
    }

    #[test]
    fn test_cta_vocabulary_anchor() {
        let html = r#"<html><body><a href="/buy">Buy now and save</a></body></html>"#;
        let content = extract(html);
        assert_eq!(content.calls_to_action.len(), 1);
    }

    #[test]
    fn test_too_short_headline_skipped() {
        let html = "<html><body><h1>Hi</h1></body></html>";
        let content = extract(html);
        assert!(content.headlines.is_empty());
    }

    #[test]
    fn test_translucent_headline_still_extracted() {
        let html =
            r#"<html><body><h1 style="opacity: 0.85">Grow your business faster</h1></body></html>"#;
        let content = extract(html);
        assert_eq!(content.headlines.len(), 1);
    }

    #[test]
    fn test_single_word_headline_skipped() {
        let html = "<html><body><h1>Congratulations</h1></body></html>";
        let content = extract(html);
        assert!(content.headlines.is_empty());
    }

    #[test]
    fn test_headline_stoplist_phrase_skipped() {
        let html = r#"<html><body>
            <h1>We respect your privacy choices</h1>
            <h1>Grow your business faster</h1>
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.headlines.len(), 1);
        assert_eq!(content.headlines[0].text, "Grow your business faster");
    }

    #[test]
    fn test_class_keyword_buckets() {
        let html = r#"<html><body>
            <div class="main-headline">A headline carried by its class</div>
            <span class="subtitle">A subtitle carried by class</span>
            <div class="testimonial">Best tool we have adopted in years, says a happy customer.</div>
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.headlines.len(), 1);
        assert_eq!(content.subheadlines.len(), 1);
        assert_eq!(content.subheadlines[0].text, "A subtitle carried by class");
        assert_eq!(content.descriptions.len(), 1);
    }

    #[test]
    fn test_submit_input_is_cta() {
        let html = r#"<html><body>
            <form><input type="submit" value="Get my free quote"></form>
            <input type="text" value="not a call to action at all">
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.calls_to_action.len(), 1);
        assert_eq!(content.calls_to_action[0].text, "Get my free quote");
    }

    #[test]
    fn test_hero_lead_paragraph_is_subheadline() {
        let html = r#"<html><body>
            <div class="hero">
                <h1>Grow your audience on autopilot</h1>
                <p>The all-in-one toolkit for modern creators.</p>
                <p>Join thousands of creators already publishing with us today.</p>
            </div>
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.subheadlines.len(), 1);
        assert_eq!(
            content.subheadlines[0].text,
            "The all-in-one toolkit for modern creators."
        );
        assert_eq!(content.descriptions.len(), 1);
        assert!(content.descriptions[0].text.contains("thousands of creators"));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let html = r#"<html><body>
            <h1>One headline to rule them all</h1>
            <h1>One headline to rule them all</h1>
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.headlines.len(), 1);
    }

    #[test]
    fn test_noise_not_extracted() {
        let html = r#"<html><body>
            <div class="cookie-consent"><p>We use cookies to improve your experience on this site.</p></div>
            <h1>The real page headline</h1>
        </body></html>"#;
        let content = extract(html);
        assert_eq!(content.headlines.len(), 1);
        assert!(content
            .descriptions
            .iter()
            .all(|item| !item.text.contains("cookies")));
    }
}
