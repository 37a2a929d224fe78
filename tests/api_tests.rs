//! HTTP surface integration tests: status-code contracts and the full
//! click → webhook → lead flow over a temporary SQLite database.

use std::sync::Arc;

use actix_web::{App, test, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use tempfile::TempDir;

use linkhub::config::{
    AppConfig, ChannelConfig, ChatChannelConfig, ConversionConfig, DatabaseConfig, LoggingConfig,
    MarketplaceConfig, MessagingChannelConfig, ServerConfig,
};
use linkhub::services::{ClickRouter, ConversionNotifier, WebhookReconciler};
use linkhub::storage::AttributionStore;

const CHANNEL_SECRET: &str = "test-channel-secret";
const VERIFY_TOKEN: &str = "verify-me";

struct TestState {
    storage: Arc<AttributionStore>,
    router: Arc<ClickRouter>,
    reconciler: Arc<WebhookReconciler>,
    config: AppConfig,
    _dir: TempDir,
}

fn test_config(dir: &TempDir, page_id: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://localhost:8000".to_string(),
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display()),
            pool_size: 5,
            retry_count: 3,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 100,
        },
        channels: ChannelConfig {
            chat: ChatChannelConfig {
                verify_token: VERIFY_TOKEN.to_string(),
                page_id: page_id.to_string(),
            },
            messaging: MessagingChannelConfig {
                channel_secret: CHANNEL_SECRET.to_string(),
                add_contact_url: "https://line.me/R/ti/p/@demo".to_string(),
            },
            marketplace: MarketplaceConfig {
                fallback_url: "https://shopee.co.th".to_string(),
            },
        },
        conversion: ConversionConfig {
            pixel_id: None,
            access_token: None,
            api_url: "https://capi.invalid/{pixel_id}/events".to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "plain".to_string(),
            file: None,
        },
    }
}

async fn test_state_with(page_id: &str) -> TestState {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, page_id);

    let storage = Arc::new(AttributionStore::new(&config.database).await.unwrap());
    let notifier = Arc::new(ConversionNotifier::new(
        &config.conversion,
        &config.server.base_url,
    ));
    let router = Arc::new(ClickRouter::new(
        storage.clone(),
        notifier.clone(),
        config.channels.clone(),
    ));
    let reconciler = Arc::new(WebhookReconciler::new(storage.clone(), notifier));

    TestState {
        storage,
        router,
        reconciler,
        config,
        _dir: dir,
    }
}

async fn test_state() -> TestState {
    test_state_with("987654").await
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.storage.clone()))
                .app_data(web::Data::new($state.router.clone()))
                .app_data(web::Data::new($state.reconciler.clone()))
                .app_data(web::Data::new($state.config.clone()))
                .configure(linkhub::api::configure),
        )
        .await
    };
}

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// POST /track and return the minted token from redirect_to.
macro_rules! track {
    ($app:expr, $dest:expr) => {{
        let req = test::TestRequest::post()
            .uri("/track")
            .set_json(json!({
                "dest": $dest,
                "query": { "utm_campaign": "spring", "ttclid": "tt-click-1" },
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        assert_eq!(body["ok"], true);

        let redirect_to = body["redirect_to"].as_str().unwrap();
        redirect_to.split("ref=").nth(1).unwrap().to_string()
    }};
}

#[actix_web::test]
async fn test_track_unknown_dest_is_rejected() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/track")
        .set_json(json!({ "dest": "telegram" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], false);

    // 校验失败不得留下任何 Click
    assert_eq!(state.storage.count_clicks().await.unwrap(), 0);
}

#[actix_web::test]
async fn test_track_mints_token_and_persists_click() {
    let state = test_state().await;
    let app = init_app!(state);

    let token = track!(app, "chat-platform");
    assert_eq!(token.len(), 16);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

    let click = state.storage.find_click_by_token(&token).await.unwrap();
    assert_eq!(click.utm_campaign.as_deref(), Some("spring"));
    assert_eq!(click.platform_click_id.as_deref(), Some("tt-click-1"));
    assert_eq!(click.src, "tiktok");
}

#[actix_web::test]
async fn test_track_missing_page_id_is_server_error() {
    let state = test_state_with("").await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/track")
        .set_json(json!({ "dest": "chat-platform" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}

#[actix_web::test]
async fn test_go_sets_cookie_and_redirects() {
    let state = test_state().await;
    let app = init_app!(state);
    let token = track!(app, "chat-platform");

    let req = test::TestRequest::get()
        .uri(&format!("/go/chat-platform?ref={}", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);

    let location = resp.headers().get("location").unwrap().to_str().unwrap();
    assert_eq!(location, format!("https://m.me/987654?ref={}", token));

    let cookie = resp
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("lh_ref={}", token)));
    assert!(cookie.contains("HttpOnly"));
    // 30 天
    assert!(cookie.contains("Max-Age=2592000"));
}

#[actix_web::test]
async fn test_go_marketplace_has_short_cookie() {
    let state = test_state().await;
    let app = init_app!(state);
    let token = track!(app, "marketplace");

    let req = test::TestRequest::get()
        .uri(&format!("/go/marketplace?ref={}", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(
        resp.headers().get("location").unwrap().to_str().unwrap(),
        "https://shopee.co.th"
    );

    let cookie = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
    // 7 天
    assert!(cookie.contains("Max-Age=604800"));
}

#[actix_web::test]
async fn test_go_rejects_bad_input() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/go/telegram?ref=aaaabbbbccccdddd")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get().uri("/go/marketplace").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

#[actix_web::test]
async fn test_chat_handshake() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri(&format!(
            "/webhook/chat-platform?hub.mode=subscribe&hub.verify_token={}&hub.challenge=12345",
            VERIFY_TOKEN
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(test::read_body(resp).await, "12345");

    let req = test::TestRequest::get()
        .uri("/webhook/chat-platform?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    assert!(test::read_body(resp).await.is_empty());
}

#[actix_web::test]
async fn test_chat_webhook_creates_lead_once() {
    let state = test_state().await;
    let app = init_app!(state);
    let token = track!(app, "chat-platform");

    let delivery = json!({
        "entry": [{
            "messaging": [{
                "sender": { "id": "psid-42" },
                "referral": { "ref": token },
            }]
        }]
    });

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/webhook/chat-platform")
            .set_json(&delivery)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ok"], true);
    }

    // 重复投递只产生一条 Lead
    assert_eq!(state.storage.count_leads().await.unwrap(), 1);
    let lead = state.storage.find_lead_by_token(&token).await.unwrap();
    assert_eq!(lead.channel, "chat");
    assert_eq!(lead.external_user_id.as_deref(), Some("psid-42"));
    assert!(lead.click_id.is_some());
}

#[actix_web::test]
async fn test_chat_webhook_acks_malformed_and_unknown() {
    let state = test_state().await;
    let app = init_app!(state);

    // 非 JSON 负载也确认收到
    let req = test::TestRequest::post()
        .uri("/webhook/chat-platform")
        .set_payload("definitely not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // 未知令牌静默丢弃
    let req = test::TestRequest::post()
        .uri("/webhook/chat-platform")
        .set_json(json!({
            "entry": [{ "messaging": [{
                "sender": { "id": "psid-1" },
                "referral": { "ref": "0000000000000000" },
            }]}]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    assert_eq!(state.storage.count_leads().await.unwrap(), 0);
}

#[actix_web::test]
async fn test_messaging_webhook_rejects_bad_signature() {
    let state = test_state().await;
    let app = init_app!(state);

    let body = json!({ "events": [{ "type": "follow", "source": { "userId": "U123" } }] });
    let raw = serde_json::to_vec(&body).unwrap();

    // 缺失签名
    let req = test::TestRequest::post()
        .uri("/webhook/messaging-app")
        .set_payload(raw.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // 错误密钥签名
    let req = test::TestRequest::post()
        .uri("/webhook/messaging-app")
        .insert_header(("X-Signature", sign("wrong-secret", &raw)))
        .set_payload(raw)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    assert_eq!(state.storage.count_leads().await.unwrap(), 0);
}

#[actix_web::test]
async fn test_messaging_webhook_creates_fallback_lead() {
    let state = test_state().await;
    let app = init_app!(state);

    let body = json!({
        "events": [{ "type": "follow", "source": { "userId": "U1234567890abcdef" } }]
    });
    let raw = serde_json::to_vec(&body).unwrap();

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/webhook/messaging-app")
            .insert_header(("X-Signature", sign(CHANNEL_SECRET, &raw)))
            .set_payload(raw.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    assert_eq!(state.storage.count_leads().await.unwrap(), 1);
    let lead = state
        .storage
        .find_lead_by_token("msg-U1234567890a")
        .await
        .unwrap();
    assert_eq!(lead.channel, "messaging");
    assert!(lead.click_id.is_none());
}

#[actix_web::test]
async fn test_messaging_webhook_ignores_other_event_types() {
    let state = test_state().await;
    let app = init_app!(state);

    let body = json!({
        "events": [{ "type": "unfollow", "source": { "userId": "U1234567890abcdef" } }]
    });
    let raw = serde_json::to_vec(&body).unwrap();

    let req = test::TestRequest::post()
        .uri("/webhook/messaging-app")
        .insert_header(("X-Signature", sign(CHANNEL_SECRET, &raw)))
        .set_payload(raw)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    assert_eq!(state.storage.count_leads().await.unwrap(), 0);
}

#[actix_web::test]
async fn test_admin_stats() {
    let state = test_state().await;
    let app = init_app!(state);

    let token = track!(app, "chat-platform");
    let _ = track!(app, "marketplace");

    let delivery = json!({
        "entry": [{ "messaging": [{
            "sender": { "id": "psid-1" },
            "referral": { "ref": token },
        }]}]
    });
    let req = test::TestRequest::post()
        .uri("/webhook/chat-platform")
        .set_json(&delivery)
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/admin/stats").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["clicks"], 2);
    assert_eq!(body["leads"], 1);
    assert_eq!(body["clicks_by_campaign"]["spring"], 2);
}

#[actix_web::test]
async fn test_choose_page_serves_html() {
    let state = test_state().await;
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/choose").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
}
