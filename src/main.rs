use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;

use polywatch::api::router::create_router;
use polywatch::chain::RpcClient;
use polywatch::config::{AppConfig, SideResolverKind};
use polywatch::errors::{ConfigError, FatalError};
use polywatch::execution::{PaperConfig, PaperTrader};
use polywatch::health::HealthState;
use polywatch::ingestion::{
    EventDecoder, Pipeline, PipelineConfig, PollSettings, Poller, PriceThresholdResolver,
    SideResolver, TokenMapResolver, TokenParityResolver,
};
use polywatch::intelligence::{ScoringParams, WalletRegistry};
use polywatch::metrics::init_metrics;
use polywatch::polymarket::DataClient;
use polywatch::services::wallet_seeder::{SeedCriteria, WalletSeeder};
use polywatch::services::AlertSink;
use polywatch::store::StateStore;
use polywatch::AppState;

const LEADERBOARD_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => {
            tracing::info!("Shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            e.exit_code()
        }
    }
}

async fn run() -> Result<(), FatalError> {
    let config = AppConfig::from_env()?;

    let metrics_handle = init_metrics().context("failed to install Prometheus recorder")?;
    let health = HealthState::new();

    // --- Keep-alive server: reads health + metrics only ---
    if config.health_enabled {
        let state = AppState {
            health: health.clone(),
            metrics_handle,
            stale_secs: config.health_stale_secs,
        };
        let addr = format!("{}:{}", config.host, config.port);
        tokio::spawn(serve_health(addr, state));
    }

    // --- Chain source ---
    let chain = RpcClient::new(
        config.polygon_rpc.clone(),
        Duration::from_secs(config.rpc_timeout_secs),
    )
    .map_err(FatalError::Connectivity)?;

    // --- Intelligence ---
    let decoder = EventDecoder::new(build_resolver(&config)?);

    let params = ScoringParams {
        min_trades: config.min_scored_trades,
        volume_cap: config.volume_cap,
        ..ScoringParams::default()
    };
    let mut registry =
        WalletRegistry::new(config.classifier_policy, params, config.score_threshold);
    registry.extend_allow_list(config.smart_wallets.iter().copied());

    let mut pipeline = Pipeline::new(decoder, registry, PipelineConfig::from_app(&config));
    if config.paper_trading_enabled {
        let paper = PaperTrader::new(PaperConfig {
            bankroll: config.paper_bankroll,
            stake: config.paper_stake,
            sizing: config.paper_sizing,
            take_profit_pct: config.paper_take_profit_pct,
            stop_loss_pct: config.paper_stop_loss_pct,
        });
        pipeline = pipeline.with_paper_trader(paper);
        tracing::info!(
            bankroll = %config.paper_bankroll,
            sizing = %config.paper_sizing,
            "Paper trading enabled"
        );
    }

    // --- Alerts ---
    let sink = AlertSink::from_credentials(config.telegram_token.clone(), config.chat_id.clone());
    if !config.has_telegram() {
        tracing::warn!("TELEGRAM_TOKEN/CHAT_ID not set, alerts go to the log");
    }

    let settings = PollSettings::from_app(&config, sink.name());
    let mut poller = Poller::new(
        chain,
        sink,
        pipeline,
        config.exchange_addresses.clone(),
        settings,
        health,
    );

    if let Some(dir) = &config.state_dir {
        match StateStore::open(dir) {
            Ok(store) => poller = poller.with_store(store),
            Err(e) => tracing::warn!(error = %e, "State directory unusable, running without persistence"),
        }
    }

    if config.leaderboard_enabled {
        let http = reqwest::Client::builder()
            .timeout(LEADERBOARD_TIMEOUT)
            .build()
            .context("failed to build leaderboard HTTP client")?;
        let seeder = WalletSeeder::new(
            DataClient::new(http, config.leaderboard_url.clone()),
            SeedCriteria {
                limit: config.leaderboard_limit,
                min_pnl: config.leaderboard_min_pnl,
                min_volume: config.leaderboard_min_volume,
            },
            Duration::from_secs(config.leaderboard_refresh_secs),
        );
        poller = poller.with_seeder(seeder);
    }

    tracing::info!(
        exchanges = ?config.exchange_addresses,
        policy = ?config.classifier_policy,
        smart_wallets = config.smart_wallets.len(),
        min_wallets = config.min_wallets,
        min_volume = %config.min_volume,
        window_secs = config.window_secs,
        "Starting surveillance"
    );

    tokio::select! {
        res = poller.run() => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C");
            Ok(())
        }
    }
}

fn build_resolver(config: &AppConfig) -> Result<Box<dyn SideResolver>, ConfigError> {
    let resolver: Box<dyn SideResolver> = match config.side_resolver {
        SideResolverKind::Price => Box::new(PriceThresholdResolver::default()),
        SideResolverKind::Parity => Box::new(TokenParityResolver),
        SideResolverKind::Map => {
            let path = config
                .side_map_file
                .as_ref()
                .ok_or(ConfigError::Missing("SIDE_MAP_FILE"))?;
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
                path: path.display().to_string(),
                source,
            })?;
            let map = TokenMapResolver::from_csv(&contents)?;
            tracing::info!(tokens = map.len(), "Loaded token side map");
            Box::new(map)
        }
    };
    Ok(resolver)
}

/// Bind failures are logged; surveillance keeps running without the endpoint.
async fn serve_health(addr: String, state: AppState) {
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, addr = %addr, "Failed to bind health server");
            return;
        }
    };
    tracing::info!("Health server listening on {addr}");
    if let Err(e) = axum::serve(listener, create_router(state)).await {
        tracing::error!(error = %e, "Health server stopped");
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
