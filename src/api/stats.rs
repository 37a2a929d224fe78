use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

use crate::api::error_response;
use crate::storage::AttributionStore;

pub struct StatsService {}

impl StatsService {
    /// GET /admin/stats: totals plus per-campaign click counts.
    pub async fn stats(storage: web::Data<Arc<AttributionStore>>) -> impl Responder {
        let clicks = match storage.count_clicks().await {
            Ok(v) => v,
            Err(e) => return error_response(&e),
        };
        let leads = match storage.count_leads().await {
            Ok(v) => v,
            Err(e) => return error_response(&e),
        };
        let by_campaign = match storage.clicks_by_campaign().await {
            Ok(v) => v,
            Err(e) => return error_response(&e),
        };

        HttpResponse::Ok().json(json!({
            "clicks": clicks,
            "leads": leads,
            "clicks_by_campaign": by_campaign,
        }))
    }
}
