use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use meetingfinder_server::config::Config;
use meetingfinder_server::db::{self, ExpirationReaper};
use meetingfinder_server::routes::create_routes;
use meetingfinder_server::state::AppState;
use meetingfinder_server::websocket::Broadcaster;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meetingfinder_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();

    let pool = db::connect(&config)
        .await
        .expect("Failed to open database");

    tracing::info!("Database ready at {}", config.database_url);

    let reaper = ExpirationReaper::new(pool.clone()).spawn(config.reaper_interval);
    tracing::info!(
        "Expired events are swept every {}s",
        config.reaper_interval.as_secs()
    );

    let validator = config.slot_validator();
    tracing::info!("Timeslots are checked against UTC{}", validator.reference());

    let state = AppState::new(pool, Broadcaster::new(config.broadcast_buffer), validator);
    let app = create_routes(state, &config);

    let addr = config.server_addr();
    tracing::info!("MeetingFinder backend listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    reaper.abort();
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
