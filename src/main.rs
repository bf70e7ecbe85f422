// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, database, geocoder and start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Config;
use db::PgRentalRepository;
use dotenv::dotenv;
use services::{
    GeocodeResolver, GoogleCandidateSchema, GoogleGeocodingClient, RentalService,
    SubmissionSettings,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting rental-market service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Initialize database connection pool
    let pool = match config::init_db_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    // 5. Geocoder client, shared by the places pass-through and the resolver
    let geocoder = match GoogleGeocodingClient::new(
        config.google_places_api_key.clone(),
        Duration::from_secs(config.geocoder_timeout_secs),
        config.geocoder_requests_per_second,
        config.places_country_code.clone(),
    ) {
        Ok(client) => Arc::new(client.with_base_url(config.geocoder_base_url.clone())),
        Err(e) => {
            log::error!("Failed to initialize geocoding client: {}", e);
            std::process::exit(1);
        }
    };
    let resolver = web::Data::new(GeocodeResolver::new(
        geocoder.clone(),
        Arc::new(GoogleCandidateSchema::new(config.target_country.clone())),
    ));
    log::info!(
        "Geocoder ready (timeout {}s, {} req/s, country {})",
        config.geocoder_timeout_secs,
        config.geocoder_requests_per_second,
        config.target_country
    );

    // 6. Rental submissions
    if let Err(e) = tokio::fs::create_dir_all(&config.assets_base_path).await {
        log::error!(
            "Failed to create asset directory {}: {}",
            config.assets_base_path,
            e
        );
        std::process::exit(1);
    }
    let rental_service = web::Data::new(RentalService::new(
        Arc::new(PgRentalRepository::new(pool)),
        SubmissionSettings::from(&config),
    ));

    // 7. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let geocoder = web::Data::new(geocoder);
    let app_config = web::Data::new(config.clone());

    HttpServer::new(move || {
        App::new()
            // Application state
            .app_data(app_config.clone())
            .app_data(geocoder.clone())
            .app_data(resolver.clone())
            .app_data(rental_service.clone())
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::places_config)
            .configure(handlers::rentals_config)
            .configure(handlers::media_config(
                &app_config.media_url_prefix,
                &app_config.assets_base_path,
            ))
    })
    .bind(&server_addr)?
    .run()
    .await
}
