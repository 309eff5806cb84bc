use api::auth::middleware::log_request;
use api::routes::routes;
use api::state::AppState;
use axum::{Router, middleware::from_fn};
use common::config::AppConfig;
use migration::Migrator;
use sea_orm_migration::MigratorTrait;
use services::qr_token::TokenSigner;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    let _log_guard = common::logger::init_logging();

    let db = db::connect().await;
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let app_state = AppState::new(db, TokenSigner::from_config());

    let cors = CorsLayer::very_permissive();

    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .layer(from_fn(log_request))
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = {
        let cfg = AppConfig::global();
        format!("{}:{}", cfg.host, cfg.port)
            .parse()
            .expect("Invalid address")
    };

    println!(
        "Starting {} on http://{}",
        AppConfig::global().project_name,
        addr
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}
