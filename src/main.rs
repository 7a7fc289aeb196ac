//! golive - Twitch go-live announcement service
//!
//! Startup sequence: tracing → configuration → database → upstream client →
//! chat gateway (verified before the loop starts) → reconciliation loop →
//! status server.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use golive::config::BotConfig;
use golive::discord::DiscordRestGateway;
use golive::services::{Notifier, Reconciler};
use golive::twitch::TwitchClient;
use golive::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting golive announcement service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = BotConfig::load()?;
    info!("Database: {}", config.database_path.display());

    let db_pool = golive::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let twitch = Arc::new(TwitchClient::new(
        config.twitch_client_id.clone(),
        config.twitch_client_secret.clone(),
    )?);

    // The reconciliation loop must not start against a half-initialized
    // collaborator; connect() verifies the token before we continue.
    let chat: Arc<dyn golive::discord::ChatGateway> =
        Arc::new(DiscordRestGateway::connect(config.discord_token.clone()).await?);

    let state = AppState::new(db_pool.clone(), config.poll_interval_secs);

    let notifier = Notifier::new(chat.clone(), config.mention_role_id.clone());
    let reconciler = Arc::new(Reconciler::new(
        db_pool,
        twitch,
        chat,
        notifier,
        config.live_role.clone(),
        state.last_tick.clone(),
        state.last_error.clone(),
    ));
    reconciler.spawn(config.poll_interval_secs);
    info!(
        "Reconciliation loop scheduled every {}s",
        config.poll_interval_secs
    );

    let app = golive::build_router(state);

    let addr = format!("127.0.0.1:{}", config.status_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Status server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
