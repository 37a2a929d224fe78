use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::api::error_response;
use crate::services::ClickRouter;
use crate::utils::ip::extract_client_ip;

#[derive(Debug, Deserialize)]
pub struct TrackPayload {
    /// Destination channel tag
    pub dest: String,
    /// Landing-page query string (src, ttclid, utm_*) passed through as-is
    #[serde(default)]
    pub query: HashMap<String, String>,
    /// Optional explicit user agent; falls back to the request header
    pub user_agent: Option<String>,
}

pub struct TrackService {}

impl TrackService {
    #[instrument(skip(req, router, payload), fields(dest = %payload.dest))]
    pub async fn track(
        req: HttpRequest,
        router: web::Data<Arc<ClickRouter>>,
        payload: web::Json<TrackPayload>,
    ) -> impl Responder {
        let payload = payload.into_inner();

        let user_agent = payload.user_agent.clone().or_else(|| {
            req.headers()
                .get("user-agent")
                .and_then(|h| h.to_str().ok())
                .map(String::from)
        });
        let ip = extract_client_ip(&req);

        match router
            .route(&payload.dest, &payload.query, user_agent, ip)
            .await
        {
            Ok(routed) => HttpResponse::Ok().json(json!({
                "ok": true,
                "redirect_to": routed.redirect_to,
            })),
            Err(e) => error_response(&e),
        }
    }
}
