//! 文案改写端到端测试
//!
//! 快照 → 提取 → 变更 → 改写的完整链路：用提取结果里的原文
//! 构造变更，验证改写后的文档保持结构完整且只有文案变化。

use pagesnap::core::create_offline_document;
use pagesnap::extract::extract;
use pagesnap::rewrite::{apply_changes, ContentChange, MatchStrategy};

mod common {
    include!("common/mod.rs");
}

use common::{html_data_url, landing_page, session};

fn change(element_id: &str, original: &str, modified: &str) -> ContentChange {
    ContentChange {
        element_id: element_id.to_string(),
        original_text: original.to_string(),
        modified_text: modified.to_string(),
    }
}

#[test]
fn test_extracted_text_round_trips_into_rewrite() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    let content = extract(&html);
    let headline = &content.headlines[0];

    let result = apply_changes(
        &html,
        &[change(&headline.id, &headline.text, "Ship campaigns in hours")],
    );

    assert_eq!(result.applied_count, 1);
    assert!(result.html.contains("Ship campaigns in hours"));
    assert!(!result.html.contains("Build landing pages in minutes"));
}

#[test]
fn test_rewrite_keeps_document_structure_intact() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    let content = extract(&html);
    let changes: Vec<ContentChange> = vec![
        change(&content.headlines[0].id, &content.headlines[0].text, "A new headline"),
        change(
            &content.subheadlines[0].id,
            &content.subheadlines[0].text,
            "A new subheadline",
        ),
    ];

    let result = apply_changes(&html, &changes);
    assert_eq!(result.applied_count, 2);

    // 文案以外的一切逐字节保留
    assert!(result.html.contains("Content-Security-Policy"));
    assert!(result.html.contains("class=\"btn btn-primary\""));
    assert!(result.html.contains("https://example.com/signup"));
    assert_eq!(result.html.len(), html.len() - content.headlines[0].text.len()
        - content.subheadlines[0].text.len()
        + "A new headline".len()
        + "A new subheadline".len());
}

#[test]
fn test_rewrite_refuses_text_only_in_attributes() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    // meta description 的文本只存在于 content 属性里
    let result = apply_changes(
        &html,
        &[change(
            "description-1",
            "The fastest way to build and launch landing pages.",
            "Changed",
        )],
    );

    assert_eq!(result.applied_count, 0);
    assert_eq!(result.unmatched_originals.len(), 1);
    assert_eq!(result.html, html);
}

#[test]
fn test_unmatched_change_reported_per_item() {
    let mut session = session();
    let (html, _) = create_offline_document(&mut session, &html_data_url(&landing_page())).unwrap();

    let changes = vec![
        change("headline-1", "Build landing pages in minutes", "Better headline"),
        change("headline-2", "This text never existed", "irrelevant"),
    ];
    let result = apply_changes(&html, &changes);

    assert_eq!(result.applied_count, 1);
    assert_eq!(result.outcomes.len(), 2);
    assert!(result.outcomes[0].applied);
    assert_eq!(result.outcomes[0].strategy, Some(MatchStrategy::Exact));
    assert!(!result.outcomes[1].applied);
    assert_eq!(result.outcomes[1].strategy, None);
    assert_eq!(
        result.unmatched_originals,
        vec!["This text never existed".to_string()]
    );
}

#[test]
fn test_rewrite_result_serializes_for_api() {
    let result = apply_changes(
        "<h1>A headline worth changing</h1>",
        &[change("headline-1", "A headline worth changing", "Changed")],
    );

    let json = serde_json::to_value(&result.outcomes).unwrap();
    assert_eq!(json[0]["element_id"], "headline-1");
    assert_eq!(json[0]["element_type"], "headline");
    assert_eq!(json[0]["strategy"], "exact");
    assert_eq!(json[0]["applied"], true);
}
