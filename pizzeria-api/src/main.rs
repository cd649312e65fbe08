use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use pizzeria_restaurant_service::{
    RestaurantRepository, build_pool, establish_connection, run_migrations, seed::seed,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod handlers;
mod models;

use handlers::{AppState, app};

#[derive(Parser)]
#[command(version, about = "Restaurants, pizzas and their prices over HTTP")]
struct Cli {
    /// SQLite database path
    #[arg(long, env = "DATABASE_URL", default_value = "app.db", global = true)]
    database_url: String,

    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:5555", global = true)]
    listen: String,

    /// Maximum number of pooled database connections
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 8, global = true)]
    pool_size: u32,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Default)]
enum Commands {
    /// Apply pending migrations and serve the HTTP API
    #[default]
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Replace the database contents with demo data
    Seed,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or_default() {
        Commands::Serve => serve(&cli.database_url, &cli.listen, cli.pool_size).await,
        Commands::Migrate => {
            let mut conn = establish_connection(&cli.database_url)?;
            run_migrations(&mut conn)?;
            Ok(())
        }
        Commands::Seed => {
            let mut conn = establish_connection(&cli.database_url)?;
            run_migrations(&mut conn)?;
            seed(&mut RestaurantRepository::new(&mut conn))?;
            Ok(())
        }
    }
}

async fn serve(
    database_url: &str,
    listen: &str,
    pool_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = build_pool(database_url, pool_size)?;
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    drop(conn);

    let app = app(AppState { pool });

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Pizzeria API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
