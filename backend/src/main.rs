mod classification;
mod config;
mod inference;
mod page;
mod routes;
mod storage;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use classification::service::ClassificationService;
use config::AppConfig;
use inference::clip::ClipModel;
use routes::configure_routes;
use std::sync::Arc;
use std::time::Duration;
use storage::upload_store::UploadStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;
    log::info!("Configuration: {:?}", config);

    let store = UploadStore::new(&config.upload_dir, config.max_upload_bytes).map_err(|e| {
        log::error!(
            "Failed to create upload directory {}: {}",
            config.upload_dir.display(),
            e
        );
        std::io::Error::other(format!("Upload directory error: {}", e))
    })?;

    log::info!(
        "Loading CLIP model {} from {}",
        config.model_name,
        config.model_cache_dir.display()
    );
    let model = ClipModel::load(&config.model_cache_dir, &config.model_name).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    log::info!("Model loaded");

    let classifier = ClassificationService::new(
        Arc::new(model),
        Duration::from_secs(config.inference_timeout_secs),
    );

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(classifier.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
