//! Webhook reconciler
//!
//! Per-channel inbound event handling: verify authenticity, extract an
//! identifying token (or user id), and upsert a Lead bound to the original
//! Click. Events that cannot be attributed are acknowledged and dropped;
//! that is policy, not an error.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

use crate::errors::Result;
use crate::services::notifier::ConversionNotifier;
use crate::storage::{AttributionStore, NewLead};

/// 合成回退令牌前缀 + 截断长度（该渠道协议不回传令牌）
const FALLBACK_TOKEN_PREFIX: &str = "msg-";
const FALLBACK_TOKEN_USER_CHARS: usize = 12;

/// Chat-platform handshake: echo the challenge only when the mode is
/// "subscribe" and the supplied token matches the configured secret.
pub fn verify_chat_handshake<'a>(
    mode: Option<&str>,
    verify_token: Option<&str>,
    challenge: Option<&'a str>,
    configured_secret: &str,
) -> Option<&'a str> {
    if configured_secret.is_empty() {
        return None;
    }
    match (mode, verify_token, challenge) {
        (Some("subscribe"), Some(token), Some(challenge)) if token == configured_secret => {
            Some(challenge)
        }
        _ => None,
    }
}

/// Messaging-app signature check: HMAC-SHA256 over the raw body, compared
/// against the base64 signature header in constant time.
pub fn verify_messaging_signature(secret: &str, body: &[u8], signature_b64: &str) -> bool {
    if secret.is_empty() || signature_b64.is_empty() {
        return false;
    }
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let digest = mac.finalize().into_bytes();

    let Ok(provided) = BASE64.decode(signature_b64) else {
        return false;
    };
    // ct_eq 对不等长输入直接判否，等长时恒定时间比较
    digest.ct_eq(provided.as_slice()).into()
}

/// Deterministic fallback identity for channels that cannot echo a token.
/// Such Leads can never be joined back to a Click (documented gap).
pub fn fallback_token(user_id: &str) -> String {
    let truncated: String = user_id.chars().take(FALLBACK_TOKEN_USER_CHARS).collect();
    format!("{}{}", FALLBACK_TOKEN_PREFIX, truncated)
}

pub struct WebhookReconciler {
    storage: Arc<AttributionStore>,
    notifier: Arc<ConversionNotifier>,
}

impl WebhookReconciler {
    pub fn new(storage: Arc<AttributionStore>, notifier: Arc<ConversionNotifier>) -> Self {
        Self { storage, notifier }
    }

    /// Ingest a chat-platform event batch. Returns the number of Leads this
    /// delivery actually created (idempotent repeats count zero).
    #[instrument(skip_all)]
    pub async fn ingest_chat(&self, payload: &Value) -> Result<u32> {
        let mut created = 0;

        let entries = payload.get("entry").and_then(Value::as_array);
        let Some(entries) = entries else {
            return Ok(0);
        };

        for entry in entries {
            let Some(events) = entry.get("messaging").and_then(Value::as_array) else {
                continue;
            };
            for event in events {
                let sender = event
                    .pointer("/sender/id")
                    .and_then(Value::as_str)
                    .map(String::from);
                let token = event
                    .pointer("/referral/ref")
                    .or_else(|| event.pointer("/postback/referral/ref"))
                    .and_then(Value::as_str);

                // 无令牌：无法归因，静默确认
                let Some(token) = token else {
                    continue;
                };

                // 令牌对不上已知 Click：同样静默确认
                let Some(click) = self.storage.find_click_by_token(token).await else {
                    debug!("Webhook referral token has no matching click: {}", token);
                    continue;
                };

                let (lead, inserted) = self
                    .storage
                    .upsert_lead(NewLead {
                        click_id: Some(click.id),
                        ref_token: token.to_string(),
                        channel: "chat".to_string(),
                        external_user_id: sender,
                        raw: Some(event.to_string()),
                    })
                    .await?;

                // 只有真正插入时才上报转化事件，幂等重复不再上报
                if inserted {
                    created += 1;
                    self.notifier.dispatch("Lead", click, Some(lead));
                }
            }
        }

        Ok(created)
    }

    /// Ingest a messaging-app event batch (already signature-verified).
    /// First-contact ("follow") and message events become fallback Leads.
    #[instrument(skip_all)]
    pub async fn ingest_messaging(&self, payload: &Value) -> Result<u32> {
        let mut created = 0;

        let Some(events) = payload.get("events").and_then(Value::as_array) else {
            return Ok(0);
        };

        for event in events {
            let event_type = event.get("type").and_then(Value::as_str);
            if !matches!(event_type, Some("follow") | Some("message")) {
                continue;
            }
            let Some(user_id) = event.pointer("/source/userId").and_then(Value::as_str) else {
                continue;
            };

            let (_, inserted) = self
                .storage
                .upsert_lead(NewLead {
                    click_id: None,
                    ref_token: fallback_token(user_id),
                    channel: "messaging".to_string(),
                    external_user_id: Some(user_id.to_string()),
                    raw: Some(event.to_string()),
                })
                .await?;

            // 无 Click 可关联，无法上报转化事件
            if inserted {
                created += 1;
            }
        }

        Ok(created)
    }
}
