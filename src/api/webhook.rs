use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::{Value, json};
use tracing::{debug, error, instrument};

use crate::api::error_response;
use crate::config::AppConfig;
use crate::errors::LinkhubError;
use crate::services::WebhookReconciler;
use crate::services::reconciler::{verify_chat_handshake, verify_messaging_signature};

/// Signature header carried by messaging-app deliveries
const SIGNATURE_HEADER: &str = "X-Signature";

pub struct WebhookService {}

impl WebhookService {
    /// GET /webhook/chat-platform: subscription handshake.
    pub async fn chat_verify(
        query: web::Query<HashMap<String, String>>,
        config: web::Data<AppConfig>,
    ) -> impl Responder {
        let q = query.into_inner();
        let echoed = verify_chat_handshake(
            q.get("hub.mode").map(String::as_str),
            q.get("hub.verify_token").map(String::as_str),
            q.get("hub.challenge").map(String::as_str),
            &config.channels.chat.verify_token,
        );

        match echoed {
            Some(challenge) => HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(challenge.to_string()),
            None => HttpResponse::Forbidden().finish(),
        }
    }

    /// POST /webhook/chat-platform: event deliveries.
    ///
    /// Always acknowledged with 200: a non-2xx would make the platform
    /// redeliver, and redelivery cannot fix a malformed payload.
    #[instrument(skip_all)]
    pub async fn chat_events(
        body: web::Bytes,
        reconciler: web::Data<Arc<WebhookReconciler>>,
    ) -> impl Responder {
        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => {
                if let Err(e) = reconciler.ingest_chat(&payload).await {
                    error!("Chat webhook ingestion failed: {}", e);
                }
            }
            Err(e) => {
                debug!("Malformed chat webhook payload acknowledged: {}", e);
            }
        }
        HttpResponse::Ok().json(json!({ "ok": true }))
    }

    /// POST /webhook/messaging-app: signed event deliveries.
    #[instrument(skip_all)]
    pub async fn messaging_events(
        req: HttpRequest,
        body: web::Bytes,
        reconciler: web::Data<Arc<WebhookReconciler>>,
        config: web::Data<AppConfig>,
    ) -> impl Responder {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        // 签名校验失败：拒绝，不做任何处理
        if !verify_messaging_signature(
            &config.channels.messaging.channel_secret,
            &body,
            signature,
        ) {
            return error_response(&LinkhubError::authentication("invalid webhook signature"));
        }

        match serde_json::from_slice::<Value>(&body) {
            Ok(payload) => {
                if let Err(e) = reconciler.ingest_messaging(&payload).await {
                    error!("Messaging webhook ingestion failed: {}", e);
                }
            }
            Err(e) => {
                debug!("Malformed messaging webhook payload acknowledged: {}", e);
            }
        }
        HttpResponse::Ok().json(json!({ "ok": true }))
    }
}
