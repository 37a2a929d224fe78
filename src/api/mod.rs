//! HTTP surface
//!
//! Route registration plus the handler service structs. `configure` is shared
//! between the server runtime and the integration tests so both exercise the
//! exact same routing table.

pub mod page;
pub mod redirect;
pub mod stats;
pub mod track;
pub mod webhook;

use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::errors::LinkhubError;

pub use page::PageService;
pub use redirect::RedirectService;
pub use stats::StatsService;
pub use track::TrackService;
pub use webhook::WebhookService;

/// Register every route on the given service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/choose", web::get().to(PageService::choose))
        .route("/track", web::post().to(TrackService::track))
        .route("/go/{channel}", web::get().to(RedirectService::go))
        .route(
            "/webhook/chat-platform",
            web::get().to(WebhookService::chat_verify),
        )
        .route(
            "/webhook/chat-platform",
            web::post().to(WebhookService::chat_events),
        )
        .route(
            "/webhook/messaging-app",
            web::post().to(WebhookService::messaging_events),
        )
        .route("/admin/stats", web::get().to(StatsService::stats));
}

/// 统一错误响应体：{"ok": false, "error": ...}
pub(crate) fn error_response(err: &LinkhubError) -> HttpResponse {
    HttpResponse::build(err.http_status()).json(json!({
        "ok": false,
        "error": err.message(),
    }))
}
