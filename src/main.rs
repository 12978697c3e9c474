use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use tessera_server::config::Config;
use tessera_server::handlers::AppState;
use tessera_server::jobs::spawn_background_jobs;
use tessera_server::notify::{HolderNotifier, TracingNotifier};
use tessera_server::routes::create_routes;
use tessera_server::store::{PgTicketStore, TicketStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store: Arc<dyn TicketStore> = Arc::new(PgTicketStore::new(pool));
    let notifier: Arc<dyn HolderNotifier> = Arc::new(TracingNotifier);
    let state = AppState::new(store, notifier, &config);

    spawn_background_jobs(&state, &config);

    let app: Router = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
