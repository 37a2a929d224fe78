//! Server mode
//!
//! Builds the shared components once (store, notifier, router, reconciler),
//! hands them to every worker via `web::Data`, and runs the HTTP server.
//!
//! **Note**: Logging system must be initialized before calling `run_server`.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, middleware::Compress, web};
use anyhow::Result;
use tracing::warn;

use crate::api;
use crate::config::AppConfig;
use crate::services::{ClickRouter, ConversionNotifier, WebhookReconciler};
use crate::storage::AttributionStore;

/// Run the HTTP server until it exits.
pub async fn run_server(config: AppConfig) -> Result<()> {
    let storage = Arc::new(AttributionStore::new(&config.database).await.map_err(|e| {
        tracing::error!("Storage initialization failed: {}", e);
        anyhow::Error::new(e)
    })?);

    let notifier = Arc::new(ConversionNotifier::new(
        &config.conversion,
        &config.server.base_url,
    ));
    let router = Arc::new(ClickRouter::new(
        storage.clone(),
        notifier.clone(),
        config.channels.clone(),
    ));
    let reconciler = Arc::new(WebhookReconciler::new(storage.clone(), notifier.clone()));

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);

    let app_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(router.clone()))
            .app_data(web::Data::new(reconciler.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::PayloadConfig::new(1024 * 1024))
            .configure(api::configure)
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}
