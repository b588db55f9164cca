// 集成测试公共模块
//
// 提供测试页面构造和 data URL 工具；所有测试页面都通过
// data: URL 走完整流水线，不产生任何网络请求。

use base64::{prelude::BASE64_STANDARD, Engine};

use pagesnap::core::SnapshotOptions;
use pagesnap::network::session::Session;

/// 将 HTML 包装为 data URL，作为快照流水线的离线输入
pub fn html_data_url(html: &str) -> String {
    format!("data:text/html;base64,{}", BASE64_STANDARD.encode(html))
}

/// 默认选项的会话
pub fn session() -> Session {
    Session::new(SnapshotOptions::default()).unwrap()
}

/// 指定选项的会话
pub fn session_with(options: SnapshotOptions) -> Session {
    Session::new(options).unwrap()
}

/// 典型的营销落地页
///
/// 带 base、受限 CSP、跨域脚本、事件属性和 cookie 弹窗，
/// 覆盖快照流水线需要清理的主要情况。
pub fn landing_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
    <base href="https://example.com/landing/">
    <meta charset="UTF-8">
    <meta http-equiv="Content-Security-Policy" content="default-src 'self'">
    <meta name="description" content="The fastest way to build and launch landing pages.">
    <title>Launchly - Build landing pages fast</title>
    <script src="https://tracker.example.net/analytics.js"></script>
</head>
<body>
    <div class="cookie-banner"><p>We use cookies to personalize content and analyze traffic.</p></div>
    <h1>Build landing pages in minutes</h1>
    <h2>No designers. No developers. No waiting.</h2>
    <p>Over 12,000 marketing teams ship their campaigns with Launchly every month.</p>
    <blockquote>Launchly cut our campaign setup time from days to hours.</blockquote>
    <a class="btn btn-primary" href="/signup" onclick="track()">Start your free trial</a>
    <button>Book a demo</button>
    <footer><p>Copyright 2024 Launchly Inc. All rights reserved worldwide.</p></footer>
</body>
</html>"#
        .to_string()
}
