//! Conversion notifier
//!
//! Best-effort relay of attribution events ("LeadClick", "Lead") to the
//! external conversion-tracking API. Every failure mode is captured as a
//! [`NotifyOutcome`] and logged; nothing ever reaches the request path, and
//! there is exactly one attempt per event.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::config::ConversionConfig;
use migration::entities::{click, lead};

/// 通知超时：超过即放弃并记为 Failed(timeout)
const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// 全局 HTTP Agent（ureq 的 Agent 是 Send + Sync）
static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(NOTIFY_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// Outcome of a single notification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// 2xx response from the conversion API
    Sent(u16),
    /// Not attempted (credentials absent)
    Skipped(&'static str),
    /// Network error, non-2xx response, or timeout
    Failed(String),
}

pub struct ConversionNotifier {
    pixel_id: Option<String>,
    access_token: Option<String>,
    api_url: String,
    event_source_url: String,
}

impl ConversionNotifier {
    pub fn new(config: &ConversionConfig, base_url: &str) -> Self {
        Self {
            pixel_id: config.pixel_id.clone(),
            access_token: config.access_token.clone(),
            api_url: config.api_url.clone(),
            event_source_url: format!("{}/choose", base_url.trim_end_matches('/')),
        }
    }

    /// Fire an event without blocking the caller. The spawned task owns the
    /// whole lifecycle: timeout, outcome capture, logging.
    pub fn dispatch(
        self: &Arc<Self>,
        event_name: &'static str,
        click: click::Model,
        lead: Option<lead::Model>,
    ) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.notify(event_name, &click, lead.as_ref()).await;
            match &outcome {
                NotifyOutcome::Sent(status) => {
                    info!(
                        "Conversion event '{}' sent for token={} (status {})",
                        event_name, click.ref_token, status
                    );
                }
                NotifyOutcome::Skipped(reason) => {
                    debug!(
                        "Conversion event '{}' skipped for token={}: {}",
                        event_name, click.ref_token, reason
                    );
                }
                NotifyOutcome::Failed(err) => {
                    warn!(
                        "Conversion event '{}' failed for token={}: {}",
                        event_name, click.ref_token, err
                    );
                }
            }
        });
    }

    /// Single best-effort delivery attempt. Never returns an error.
    pub async fn notify(
        &self,
        event_name: &str,
        click: &click::Model,
        lead: Option<&lead::Model>,
    ) -> NotifyOutcome {
        let (Some(pixel_id), Some(access_token)) = (&self.pixel_id, &self.access_token) else {
            return NotifyOutcome::Skipped("conversion api credentials not configured");
        };

        let url = format!(
            "{}?access_token={}",
            self.api_url.replace("{pixel_id}", pixel_id),
            urlencoding::encode(access_token)
        );
        let payload = self.build_payload(event_name, click, lead);

        let send = tokio::task::spawn_blocking(move || send_sync(&url, &payload));
        match tokio::time::timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS), send).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => NotifyOutcome::Failed(format!("task panicked: {}", join_err)),
            Err(_) => NotifyOutcome::Failed(format!(
                "timed out after {}s, attempt abandoned",
                NOTIFY_TIMEOUT_SECS
            )),
        }
    }

    fn build_payload(
        &self,
        event_name: &str,
        click: &click::Model,
        lead: Option<&lead::Model>,
    ) -> serde_json::Value {
        json!({
            "data": [{
                "event_name": event_name,
                "event_time": chrono::Utc::now().timestamp(),
                "action_source": "website",
                "event_source_url": self.event_source_url,
                "user_data": {
                    "client_ip_address": click.ip.clone().unwrap_or_default(),
                    "client_user_agent": click.user_agent.clone().unwrap_or_default(),
                },
                "custom_data": {
                    "ref": click.ref_token,
                    "src": click.src,
                    "utm_campaign": click.utm_campaign,
                    "lead_channel": lead.map(|l| l.channel.clone()),
                },
            }]
        })
    }
}

/// 同步发送（在 spawn_blocking 线程池中执行）
fn send_sync(url: &str, payload: &serde_json::Value) -> NotifyOutcome {
    let agent = get_agent();

    match agent.post(url).send_json(payload) {
        Ok(resp) => NotifyOutcome::Sent(resp.status().as_u16()),
        Err(ureq::Error::StatusCode(code)) => {
            NotifyOutcome::Failed(format!("conversion api returned status {}", code))
        }
        Err(e) => NotifyOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use chrono::Utc;

    fn sample_click() -> click::Model {
        click::Model {
            id: 1,
            ref_token: "abcdef0123456789".to_string(),
            src: "tiktok".to_string(),
            platform_click_id: None,
            utm_source: Some("tt".to_string()),
            utm_campaign: Some("spring".to_string()),
            utm_adset: None,
            utm_ad: None,
            user_agent: Some("UnitTest/1.0".to_string()),
            ip: Some("203.0.113.7".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notify_skipped_without_credentials() {
        let notifier = ConversionNotifier::new(
            &ConversionConfig {
                pixel_id: None,
                access_token: None,
                api_url: "https://capi.invalid/{pixel_id}/events".to_string(),
            },
            "http://localhost:8000",
        );

        let outcome = notifier.notify("LeadClick", &sample_click(), None).await;
        assert!(matches!(outcome, NotifyOutcome::Skipped(_)));
    }

    #[test]
    fn test_payload_shape() {
        let notifier = ConversionNotifier::new(
            &ConversionConfig {
                pixel_id: Some("px1".to_string()),
                access_token: Some("tok".to_string()),
                api_url: "https://capi.invalid/{pixel_id}/events".to_string(),
            },
            "http://localhost:8000/",
        );

        let payload = notifier.build_payload("Lead", &sample_click(), None);
        let event = &payload["data"][0];
        assert_eq!(event["event_name"], "Lead");
        assert_eq!(event["action_source"], "website");
        assert_eq!(event["event_source_url"], "http://localhost:8000/choose");
        assert_eq!(event["custom_data"]["ref"], "abcdef0123456789");
        assert_eq!(event["user_data"]["client_ip_address"], "203.0.113.7");
    }
}
