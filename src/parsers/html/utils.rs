/// Favicon 相关的 rel 值
pub const FAVICON_VALUES: &[&str] = &["icon", "shortcut icon"];

/// ASCII 空白字符
pub const WHITESPACES: &[char] = &[' ', '\t', '\n', '\x0c', '\r'];

/// 替换原页面 CSP 的宽松策略
///
/// 快照中所有资源都已内联为 data URI，原页面的 CSP 反而会
/// 阻止它们加载，所以整体替换为允许内联内容的策略。
pub const PERMISSIVE_CSP: &str = "default-src * data: blob: 'unsafe-inline' 'unsafe-eval'";

/// 检查是否为 favicon
pub fn is_favicon(attr_value: &str) -> bool {
    FAVICON_VALUES.contains(&attr_value.to_lowercase().as_str())
}
