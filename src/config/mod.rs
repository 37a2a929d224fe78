//! Application configuration
//!
//! An immutable [`AppConfig`] is built once at process start from environment
//! variables (`.env` is loaded by `main` via dotenvy) and passed by reference
//! into each component's constructor. No component reads process state after
//! startup.

use std::env;

use anyhow::{Context, Result};

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// External base URL used when building event payloads and deep links
    pub base_url: String,
}

/// Database settings, including the retry tuning used by the storage layer
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub retry_count: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

/// Chat-platform channel (webhook handshake + deep-link page id)
#[derive(Clone, Debug)]
pub struct ChatChannelConfig {
    /// Verification secret for the GET webhook handshake
    pub verify_token: String,
    /// Page/business id used in the `m.me` deep link; empty means unconfigured
    pub page_id: String,
}

/// Messaging-app channel (signed webhook + add-contact deep link)
#[derive(Clone, Debug)]
pub struct MessagingChannelConfig {
    /// Shared secret for the HMAC-SHA256 body signature
    pub channel_secret: String,
    /// "add contact" deep-link URL; the protocol cannot echo a token back,
    /// so the token only travels in the redirect cookie
    pub add_contact_url: String,
}

/// Marketplace channel (outbound-only attribution)
#[derive(Clone, Debug)]
pub struct MarketplaceConfig {
    pub fallback_url: String,
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub chat: ChatChannelConfig,
    pub messaging: MessagingChannelConfig,
    pub marketplace: MarketplaceConfig,
}

/// Conversion-tracking API credentials; absence degrades the notifier to
/// `Skipped`, never a startup failure
#[derive(Clone, Debug)]
pub struct ConversionConfig {
    pub pixel_id: Option<String>,
    pub access_token: Option<String>,
    /// Endpoint template with a `{pixel_id}` placeholder
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub channels: ChannelConfig,
    pub conversion: ConversionConfig,
    pub logging: LoggingConfig,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    /// 从环境变量构建配置（仅在进程启动时调用一次）
    pub fn from_env() -> Result<Self> {
        let port: u16 = env_or("SERVER_PORT", "8000")
            .parse()
            .context("SERVER_PORT must be a valid port number")?;
        let pool_size: u32 = env_or("DATABASE_POOL_SIZE", "10")
            .parse()
            .context("DATABASE_POOL_SIZE must be a positive integer")?;

        Ok(AppConfig {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "127.0.0.1"),
                port,
                base_url: env_or("BASE_URL", "http://localhost:8000"),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite://data.db?mode=rwc"),
                pool_size,
                retry_count: env_or("DATABASE_RETRY_COUNT", "3").parse().unwrap_or(3),
                retry_base_delay_ms: env_or("DATABASE_RETRY_BASE_DELAY_MS", "100")
                    .parse()
                    .unwrap_or(100),
                retry_max_delay_ms: env_or("DATABASE_RETRY_MAX_DELAY_MS", "2000")
                    .parse()
                    .unwrap_or(2000),
            },
            channels: ChannelConfig {
                chat: ChatChannelConfig {
                    verify_token: env_or("CHAT_VERIFY_TOKEN", ""),
                    page_id: env_or("CHAT_PAGE_ID", ""),
                },
                messaging: MessagingChannelConfig {
                    channel_secret: env_or("MESSAGING_CHANNEL_SECRET", ""),
                    add_contact_url: env_or(
                        "MESSAGING_ADD_CONTACT_URL",
                        "https://line.me/R/ti/p/@YOUR_ID",
                    ),
                },
                marketplace: MarketplaceConfig {
                    fallback_url: env_or("MARKETPLACE_FALLBACK_URL", "https://shopee.co.th"),
                },
            },
            conversion: ConversionConfig {
                pixel_id: env_opt("CONVERSION_PIXEL_ID"),
                access_token: env_opt("CONVERSION_ACCESS_TOKEN"),
                api_url: env_or(
                    "CONVERSION_API_URL",
                    "https://graph.facebook.com/v18.0/{pixel_id}/events",
                ),
            },
            logging: LoggingConfig {
                level: env_or("LOG_LEVEL", "info"),
                format: env_or("LOG_FORMAT", "plain"),
                file: env_opt("LOG_FILE"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_default() {
        assert_eq!(env_or("LINKHUB_TEST_MISSING_KEY", "fallback"), "fallback");
    }

    #[test]
    fn test_env_opt_empty_is_none() {
        // SAFETY: 测试进程内单线程设置环境变量
        unsafe { env::set_var("LINKHUB_TEST_EMPTY_KEY", "") };
        assert_eq!(env_opt("LINKHUB_TEST_EMPTY_KEY"), None);
        unsafe { env::remove_var("LINKHUB_TEST_EMPTY_KEY") };
    }
}
