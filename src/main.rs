use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use taskboard::api::session::MemorySessionStore;
use taskboard::models::{Identity, Role};
use taskboard::store::{MemoryTaskStore, PgTaskStore, TaskStore};
use taskboard::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskboard=info,tower_http=info")),
        )
        .init();

    dotenvy::dotenv().ok();

    let store: Arc<dyn TaskStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            info!("connecting to database");
            let pool = sqlx::PgPool::connect(&database_url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            let store = PgTaskStore::new(pool);
            store.ensure_schema().await.context("schema setup failed")?;
            Arc::new(store)
        }
        Err(_) => {
            warn!("DATABASE_URL not set, falling back to in-memory store");
            Arc::new(MemoryTaskStore::new())
        }
    };

    let sessions = Arc::new(MemorySessionStore::new());
    if let Ok(spec) = std::env::var("DEV_SESSIONS") {
        seed_sessions(&sessions, &spec).await?;
    }

    let state = AppState::new(store, sessions);
    let app = taskboard::router(state);

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);
    let addr = format!(
        "{}:{port}",
        std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string())
    );

    info!("starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed development sessions from `DEV_SESSIONS`, a comma-separated list of
/// `token=user_id:role` entries. Production session provisioning belongs to
/// the external auth service; this exists so a local server is usable.
async fn seed_sessions(sessions: &MemorySessionStore, spec: &str) -> anyhow::Result<()> {
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (token, rest) = entry
            .split_once('=')
            .with_context(|| format!("malformed DEV_SESSIONS entry: {entry}"))?;
        let (id, role) = rest
            .split_once(':')
            .with_context(|| format!("malformed DEV_SESSIONS entry: {entry}"))?;
        let role = match role {
            "admin" => Role::Admin,
            _ => Role::User,
        };
        let identity = Identity {
            id: id.parse().with_context(|| format!("bad user id in DEV_SESSIONS: {id}"))?,
            role,
        };
        sessions.insert(token.to_string(), identity).await;
        info!("seeded dev session for {} ({:?})", identity.id, identity.role);
    }
    Ok(())
}
