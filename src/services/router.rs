//! Click router
//!
//! Accepts a tracking request with channel-selection metadata, mints a token,
//! persists the Click + Choice pair, fires the conversion notifier, and
//! resolves the destination to a redirect target bound to the token.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::ChannelConfig;
use crate::errors::{LinkhubError, Result};
use crate::services::notifier::ConversionNotifier;
use crate::services::token;
use crate::storage::{AttributionStore, NewClick};
use crate::structs::Destination;

use migration::entities::click;

/// 令牌碰撞时的最大重新生成次数
const MAX_TOKEN_ATTEMPTS: u32 = 3;

/// Outcome of a routing decision
#[derive(Debug, Clone)]
pub struct RoutedClick {
    pub click: click::Model,
    pub destination: Destination,
    /// Relative redirect URL handed back to the landing page
    pub redirect_to: String,
}

pub struct ClickRouter {
    storage: Arc<AttributionStore>,
    notifier: Arc<ConversionNotifier>,
    channels: ChannelConfig,
}

impl ClickRouter {
    pub fn new(
        storage: Arc<AttributionStore>,
        notifier: Arc<ConversionNotifier>,
        channels: ChannelConfig,
    ) -> Self {
        Self {
            storage,
            notifier,
            channels,
        }
    }

    /// Record a Click + Choice and return the token-bound redirect target.
    ///
    /// Destination parsing happens before any persistence, so an unknown tag
    /// leaves no Click behind. A missing channel config is only discovered
    /// after persistence, mirroring the fact that the click itself is valid.
    #[instrument(skip(self, query, user_agent, ip), fields(dest = %dest_raw))]
    pub async fn route(
        &self,
        dest_raw: &str,
        query: &HashMap<String, String>,
        user_agent: Option<String>,
        ip: Option<String>,
    ) -> Result<RoutedClick> {
        let destination: Destination = dest_raw
            .parse()
            .map_err(LinkhubError::validation)?;

        let click = self.persist_click(query, user_agent, ip).await?;
        self.storage.create_choice(click.id, destination).await?;

        // 点击事件通知：best-effort，不阻塞响应
        self.notifier.dispatch("LeadClick", click.clone(), None);

        // 配置缺失在此处浮出（500 契约）；深链本身由 /go 再次构建
        self.deep_link(destination, &click.ref_token)?;

        let redirect_to = format!("/go/{}?ref={}", destination.as_ref(), click.ref_token);
        debug!("Routed token={} to {}", click.ref_token, redirect_to);

        Ok(RoutedClick {
            click,
            destination,
            redirect_to,
        })
    }

    /// Insert the Click, regenerating the token on the (practically
    /// impossible) collision. The unique index is the authoritative guard.
    async fn persist_click(
        &self,
        query: &HashMap<String, String>,
        user_agent: Option<String>,
        ip: Option<String>,
    ) -> Result<click::Model> {
        let get = |key: &str| query.get(key).filter(|v| !v.is_empty()).cloned();

        let mut last_err = LinkhubError::conflict("令牌生成重试次数耗尽");
        for attempt in 0..MAX_TOKEN_ATTEMPTS {
            let new_click = NewClick {
                ref_token: token::generate(),
                src: get("src").unwrap_or_else(|| "tiktok".to_string()),
                platform_click_id: get("ttclid"),
                utm_source: get("utm_source"),
                utm_campaign: get("utm_campaign"),
                utm_adset: get("utm_adset"),
                utm_ad: get("utm_ad"),
                user_agent: user_agent.clone(),
                ip: ip.clone(),
            };

            match self.storage.create_click(new_click).await {
                Ok(model) => return Ok(model),
                Err(e @ LinkhubError::Conflict(_)) => {
                    warn!("Token collision on attempt {}, regenerating", attempt + 1);
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }

    /// Resolve a destination + token to the external deep link.
    pub fn deep_link(&self, destination: Destination, token: &str) -> Result<String> {
        Self::resolve_deep_link(&self.channels, destination, token)
    }

    fn resolve_deep_link(
        channels: &ChannelConfig,
        destination: Destination,
        token: &str,
    ) -> Result<String> {
        match destination {
            Destination::ChatPlatform => {
                let page_id = &channels.chat.page_id;
                if page_id.is_empty() {
                    return Err(LinkhubError::configuration(
                        "CHAT_PAGE_ID missing".to_string(),
                    ));
                }
                Ok(format!(
                    "https://m.me/{}?ref={}",
                    page_id,
                    urlencoding::encode(token)
                ))
            }
            // 该渠道的协议不回传令牌，令牌只经由 cookie 关联
            Destination::MessagingApp => {
                let url = &channels.messaging.add_contact_url;
                if url.is_empty() {
                    return Err(LinkhubError::configuration(
                        "MESSAGING_ADD_CONTACT_URL missing".to_string(),
                    ));
                }
                Ok(url.clone())
            }
            Destination::Marketplace => Ok(channels.marketplace.fallback_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChatChannelConfig, MarketplaceConfig, MessagingChannelConfig};

    fn channels(page_id: &str) -> ChannelConfig {
        ChannelConfig {
            chat: ChatChannelConfig {
                verify_token: "secret".to_string(),
                page_id: page_id.to_string(),
            },
            messaging: MessagingChannelConfig {
                channel_secret: "shh".to_string(),
                add_contact_url: "https://line.me/R/ti/p/@demo".to_string(),
            },
            marketplace: MarketplaceConfig {
                fallback_url: "https://shopee.co.th".to_string(),
            },
        }
    }

    #[test]
    fn test_deep_link_chat_carries_token() {
        let link = ClickRouter::resolve_deep_link(
            &channels("12345"),
            Destination::ChatPlatform,
            "abcd1234abcd1234",
        )
        .unwrap();
        assert_eq!(link, "https://m.me/12345?ref=abcd1234abcd1234");
    }

    #[test]
    fn test_deep_link_chat_missing_page_id() {
        let err = ClickRouter::resolve_deep_link(
            &channels(""),
            Destination::ChatPlatform,
            "abcd1234abcd1234",
        )
        .unwrap_err();
        assert!(matches!(err, LinkhubError::Configuration(_)));
    }

    #[test]
    fn test_deep_link_messaging_ignores_token() {
        let link = ClickRouter::resolve_deep_link(
            &channels("12345"),
            Destination::MessagingApp,
            "abcd1234abcd1234",
        )
        .unwrap();
        assert_eq!(link, "https://line.me/R/ti/p/@demo");
    }
}
