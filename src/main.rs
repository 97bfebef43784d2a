mod routes;
mod handlers;
mod models;
mod database;
mod middleware;
mod state;
mod dtos;
mod error;
mod auth;
mod config;
mod clock;
mod services;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, StoreBackend};
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return;
        }
    };

    let store: Arc<dyn Store> = match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on exit");
            let memory = MemoryStore::new();
            for branch in config.seed_branches.iter().cloned() {
                memory.add_branch(branch);
            }
            tracing::info!(branches = config.seed_branches.len(), "Branch directory seeded");
            Arc::new(memory)
        }
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let pool = match database::create_pool(url, config.db_max_connections).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create database pool");
                    return;
                }
            };
            if let Err(e) = database::run_migrations(&pool).await {
                tracing::error!(error = %e, "Failed to run migrations");
                return;
            }
            Arc::new(PgStore::new(pool))
        }
    };

    let (host, base_port) = (config.host, config.port);
    tracing::info!(lease_seconds = config.claim_lease.num_seconds(), "Claim lease configured");
    let app = routes::app(state::AppState::new(store, config));

    // Try base_port..base_port+20 to avoid crash when address is in use
    let listener = {
        let mut bound = None;
        for offset in 0u16..=20 {
            let port = base_port.saturating_add(offset);
            let addr = SocketAddr::from((host, port));
            match TcpListener::bind(addr).await {
                Ok(l) => { bound = Some((l, addr)); break; }
                Err(e) => {
                    if offset == 0 { tracing::warn!(%addr, error=%e, "Port in use, trying next"); }
                }
            }
        }
        match bound {
            Some((l, addr)) => {
                tracing::info!("Server running on {}", addr);
                l
            }
            None => {
                tracing::error!("Failed to bind to any port starting at {} on {}", base_port, host);
                return;
            }
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error=%e, "Server error");
    }
}
