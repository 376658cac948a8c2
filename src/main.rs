use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use checkin_server::config::Config;
use checkin_server::routes::create_routes;
use checkin_server::services::auth::ensure_user;
use checkin_server::state::AppState;
use checkin_server::store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Successfully connected to database");

    sqlx::migrate!().run(&pool).await?;

    info!("Migrations run successfully");

    let store = Arc::new(PgStore::new(pool.clone()));

    if let Some(seed) = &config.admin_seed {
        let created = ensure_user(
            &*store,
            &seed.email,
            &seed.name,
            &seed.password,
            bcrypt::DEFAULT_COST,
        )
        .await?;
        if created {
            info!(email = %seed.email, "Created staff account");
        }
    }

    let app = create_routes(
        AppState::from_config(store, &config),
        &config.allowed_origins,
    );

    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("Server running at http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Database pool closed, bye");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
