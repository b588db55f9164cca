//! 结构化内容提取集成测试
//!
//! 从快照输出中提取分桶文案，验证桶判定、去重、条数上限
//! 和噪音过滤在完整流水线里的行为。

use pagesnap::core::create_offline_document;
use pagesnap::extract::{extract, ContentBucket};

mod common {
    include!("common/mod.rs");
}

use common::{html_data_url, landing_page, session};

#[test]
fn test_extraction_from_snapshot_output() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    let content = extract(&html);

    assert_eq!(content.headlines.len(), 1);
    assert_eq!(content.headlines[0].text, "Build landing pages in minutes");
    assert_eq!(content.headlines[0].bucket, ContentBucket::Headline);

    assert_eq!(content.subheadlines.len(), 1);
    assert_eq!(
        content.subheadlines[0].text,
        "No designers. No developers. No waiting."
    );

    let cta_texts: Vec<&str> = content
        .calls_to_action
        .iter()
        .map(|item| item.text.as_str())
        .collect();
    assert!(cta_texts.contains(&"Start your free trial"));
    assert!(cta_texts.contains(&"Book a demo"));
}

#[test]
fn test_meta_description_is_first_description() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    let content = extract(&html);

    assert_eq!(
        content.meta_description.as_deref(),
        Some("The fastest way to build and launch landing pages.")
    );
    assert_eq!(content.descriptions[0].id, "description-1");
    assert_eq!(
        content.descriptions[0].text,
        "The fastest way to build and launch landing pages."
    );
}

#[test]
fn test_cookie_banner_and_footer_not_extracted() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    let content = extract(&html);

    assert!(content
        .descriptions
        .iter()
        .all(|item| !item.text.contains("cookies")));
    assert!(content
        .descriptions
        .iter()
        .all(|item| !item.text.contains("Copyright")));
}

#[test]
fn test_item_ids_are_sequential_per_bucket() {
    let html = r#"<html><body>
        <h2>First supporting message</h2>
        <h2>Second supporting message</h2>
        <h2>Third supporting message</h2>
    </body></html>"#;

    let content = extract(html);
    let ids: Vec<&str> = content
        .subheadlines
        .iter()
        .map(|item| item.id.as_str())
        .collect();
    assert_eq!(ids, vec!["subheadline-1", "subheadline-2", "subheadline-3"]);
}

#[test]
fn test_bucket_caps_enforced() {
    let mut body = String::new();
    for i in 0..20 {
        body.push_str(&format!("<h1>Distinct page headline {i:02}</h1>"));
        body.push_str(&format!("<h2>Distinct subheadline {i:02}</h2>"));
        body.push_str(&format!(
            "<p>Distinct credibility statement number {i:02} for this page.</p>"
        ));
        body.push_str(&format!("<button>Claim offer {i:02}</button>"));
    }
    let html = format!("<html><body>{body}</body></html>");

    let content = extract(&html);
    assert_eq!(content.headlines.len(), 3);
    assert_eq!(content.subheadlines.len(), 5);
    assert_eq!(content.descriptions.len(), 8);
    assert_eq!(content.calls_to_action.len(), 10);
    assert_eq!(content.total(), 26);
}

#[test]
fn test_hidden_elements_not_extracted() {
    let html = r#"<html><body>
        <h1 style="display:none">Hidden legacy headline text</h1>
        <h1>The visible page headline</h1>
    </body></html>"#;

    let content = extract(html);
    assert_eq!(content.headlines.len(), 1);
    assert_eq!(content.headlines[0].text, "The visible page headline");
}

#[test]
fn test_nav_links_not_treated_as_cta() {
    let html = r#"<html><body>
        <nav><a class="btn" href="/signup">Sign up today</a></nav>
        <main><a class="btn" href="/signup">Start your free trial</a></main>
    </body></html>"#;

    let content = extract(html);
    assert_eq!(content.calls_to_action.len(), 1);
    assert_eq!(content.calls_to_action[0].text, "Start your free trial");
}
