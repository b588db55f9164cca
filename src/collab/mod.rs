//! # 外部协作者接口模块
//!
//! 文案建议（AI）和成稿发布（CMS）由部署方自带的服务完成，
//! 这里只定义接口缝：库内流程通过 trait 调用它们，没有实现时
//! 一切功能照常工作，只是少了建议和发布两步。

use thiserror::Error;

use crate::extract::StructuredContent;
use crate::rewrite::ContentChange;

/// 协作者调用失败
#[derive(Error, Debug)]
pub enum CollabError {
    /// 上游服务不可达或返回错误
    #[error("upstream service error: {0}")]
    Upstream(String),

    /// 上游返回的数据无法使用
    #[error("invalid response from upstream: {0}")]
    InvalidResponse(String),
}

/// 文案建议服务
///
/// 输入提取出的结构化文案，输出建议的变更列表。
pub trait CopySuggester {
    fn suggest(&self, content: &StructuredContent) -> Result<Vec<ContentChange>, CollabError>;
}

/// 成稿发布服务
///
/// 把改写后的 HTML 推送到外部系统（如 CMS），返回发布后的地址。
pub trait Publisher {
    fn publish(&self, title: &str, html: &str) -> Result<String, CollabError>;
}

/// 用建议服务补全变更列表
///
/// 调用方已有的变更优先；建议服务失败时原样返回已有变更，
/// 不让外部服务故障影响主流程。
pub fn enrich_changes(
    suggester: Option<&dyn CopySuggester>,
    content: &StructuredContent,
    mut changes: Vec<ContentChange>,
) -> Vec<ContentChange> {
    let Some(suggester) = suggester else {
        return changes;
    };

    match suggester.suggest(content) {
        Ok(suggestions) => {
            for suggestion in suggestions {
                let already_covered = changes
                    .iter()
                    .any(|change| change.element_id == suggestion.element_id);
                if !already_covered {
                    changes.push(suggestion);
                }
            }
            changes
        }
        Err(e) => {
            tracing::warn!("文案建议服务失败，继续使用已有变更: {}", e);
            changes
        }
    }
}
