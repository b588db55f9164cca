//! Web 服务器配置
//!
//! 全部来自环境变量，解析失败时记录警告并退回默认值。

use std::time::Duration;

use crate::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};

/// Web 服务器配置
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// 绑定地址（PAGESNAP_BIND）
    pub bind_addr: String,
    /// 端口（PAGESNAP_PORT）
    pub port: u16,
    /// 快照缓存容量（PAGESNAP_CACHE_CAPACITY）
    pub cache_capacity: usize,
    /// 快照缓存存活时间（PAGESNAP_CACHE_TTL_SECS）
    pub cache_ttl: Duration,
}

impl WebConfig {
    /// 从环境变量创建配置
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("PAGESNAP_BIND", "127.0.0.1".to_string(), |v| {
                Some(v.to_string())
            }),
            port: env_or("PAGESNAP_PORT", 7080, |v| v.parse().ok()),
            cache_capacity: env_or("PAGESNAP_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY, |v| {
                v.parse().ok()
            }),
            cache_ttl: env_or("PAGESNAP_CACHE_TTL_SECS", DEFAULT_CACHE_TTL, |v| {
                v.parse().ok().map(Duration::from_secs)
            }),
        }
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.is_empty() {
            return Err("PAGESNAP_BIND cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err("PAGESNAP_PORT cannot be 0".to_string());
        }
        if self.cache_capacity == 0 {
            return Err("PAGESNAP_CACHE_CAPACITY cannot be 0".to_string());
        }
        Ok(())
    }

    /// 获取完整的监听地址
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T>(name: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> T {
    match std::env::var(name) {
        Ok(value) => match parse(&value) {
            Some(parsed) => parsed,
            None => {
                tracing::warn!("环境变量 {} 的值无法解析，使用默认值", name);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = WebConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 7080,
            cache_capacity: 8,
            cache_ttl: Duration::from_secs(60),
        };
        assert!(config.validate().is_ok());

        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listen_address() {
        let config = WebConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            cache_capacity: 8,
            cache_ttl: Duration::from_secs(60),
        };
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
    }
}
