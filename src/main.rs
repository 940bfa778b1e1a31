use actix_cors::Cors;
use actix_files::Files;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{middleware::NormalizePath, web, App, HttpServer};
use tracing_actix_web::TracingLogger;

use portfolio_media_backend::{
    constants::UPLOADS_URL_PREFIX,
    graceful_shutdown::shutdown_signal,
    routes::configure_routes,
    settings::AppConfig,
    AppState,
};

fn build_cors(origins: &[String]) -> Cors {
    if origins.iter().any(|o| o == "*") {
        Cors::permissive()
    } else {
        origins.iter().fold(
            Cors::default().allow_any_method().allow_any_header(),
            |cors, origin| cors.allowed_origin(origin),
        )
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match AppConfig::new() {
        Ok(cfg) => {
            tracing::info!("Loaded configuration: {:?}", cfg);
            cfg
        },
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&config.upload_dir)?;

    let app_state = web::Data::new(AppState::new(&config));

    let server_addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        "🚀 Starting Portfolio Media API v{} on {}",
        env!("CARGO_PKG_VERSION"),
        server_addr
    );

    let upload_dir = config.upload_dir.clone();
    let cors_origins = config.cors_origins();
    let max_upload_bytes = config.max_upload_bytes;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(max_upload_bytes)
                    .memory_limit(2 * 1024 * 1024),
            )
            .wrap(NormalizePath::trim())
            .wrap(TracingLogger::default())
            .wrap(build_cors(&cors_origins))
            .configure(configure_routes)
            .service(Files::new(UPLOADS_URL_PREFIX, &upload_dir))
    })
    .workers(config.worker_count)
    .bind(server_addr)?
    .run();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => Ok(()),
    }
}
