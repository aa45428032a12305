//! DEALHUNTER — Autonomous deal scanning and alerting agent
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the deal source, estimators and notifier, restores memory from
//! disk, and runs the planning loop on a fixed interval with graceful
//! shutdown.

use anyhow::Result;
use secrecy::SecretString;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use dealhunter::config::{AppConfig, LlmConfig};
use dealhunter::dashboard::{self, routes::{DashboardState, RunLogEntry}};
use dealhunter::engine::framework::DealAgentFramework;
use dealhunter::engine::planner::PlanningAgent;
use dealhunter::engine::scanner::RssDealSource;
use dealhunter::knowledge::ProductIndex;
use dealhunter::llm::client::ChatClient;
use dealhunter::llm::frontier::FrontierEstimator;
use dealhunter::llm::specialist::SpecialistEstimator;
use dealhunter::notify::pushover::PushoverNotifier;
use dealhunter::notify::{LogNotifier, Notifier};

const BANNER: &str = r#"
 ____  _____    _    _     _   _ _   _ _   _ _____ _____ ____
|  _ \| ____|  / \  | |   | | | | | | | \ | |_   _| ____|  _ \
| | | |  _|   / _ \ | |   | |_| | | | |  \| | | | |  _| | |_) |
| |_| | |___ / ___ \| |___|  _  | |_| | |\  | | | | |___|  _ <
|____/|_____/_/   \_\_____|_| |_|\___/|_| \_| |_| |_____|_| \_\

  Scan. Price. Rank. Alert.
  v0.1.0 — Autonomous Agent
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        agent_name = %cfg.agent.name,
        scan_interval_secs = cfg.agent.scan_interval_secs,
        deal_threshold = cfg.agent.deal_threshold,
        feeds = cfg.feeds.urls.len(),
        "DEALHUNTER starting up"
    );

    // -- Initialise components -------------------------------------------

    let api_key = AppConfig::resolve_secret(Some(&cfg.llm.api_key_env));
    if api_key.is_none() {
        warn!(env = %cfg.llm.api_key_env, "No LLM API key set, sending unauthenticated requests");
    }

    // Product catalogue for retrieval
    let index = ProductIndex::load_or_empty(Path::new(&cfg.knowledge.catalog_path))?;

    // Estimators
    let mut frontier = FrontierEstimator::new(
        chat_client(&cfg.llm, api_key.clone(), &cfg.llm.frontier_model)?,
        Arc::new(index),
    )
    .with_neighbours(cfg.knowledge.neighbours);

    if let Some(pre) = &cfg.llm.preprocess {
        let key = AppConfig::resolve_secret(pre.api_key_env.as_deref());
        info!(model = %pre.model, "Using description preprocessor");
        frontier = frontier.with_preprocessor(Arc::new(ChatClient::new(&pre.base_url, key, &pre.model)?));
    }

    let specialist =
        SpecialistEstimator::new(chat_client(&cfg.llm, api_key.clone(), &cfg.llm.specialist_model)?);

    // Deal source
    let mut source = RssDealSource::new(
        cfg.feeds.urls.clone(),
        cfg.feeds.items_per_feed,
        Duration::from_secs(cfg.feeds.timeout_secs),
    )?;
    if let Some(model) = &cfg.llm.curator_model {
        info!(model = %model, "Using LLM deal curator");
        source = source.with_curator(chat_client(&cfg.llm, api_key.clone(), model)?);
    }

    // Notifier
    let notifier = build_notifier(&cfg, api_key)?;

    let planner = PlanningAgent::new(
        Arc::new(source),
        Arc::new(frontier),
        Arc::new(specialist),
        notifier,
    )
    .with_threshold(cfg.agent.deal_threshold)
    .with_estimator_timeout(Duration::from_secs(cfg.agent.estimator_timeout_secs));

    let mut framework = DealAgentFramework::new(planner, cfg.agent.memory_file.clone())?;

    // Dashboard
    let dashboard_state = if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(cfg.agent.name.clone(), cfg.agent.deal_threshold));
        *state.opportunities.write().await = framework.memory().to_vec();
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await?;
        Some(state)
    } else {
        None
    };

    // -- Main loop -------------------------------------------------------

    let scan_interval = Duration::from_secs(cfg.agent.scan_interval_secs);
    let mut interval = tokio::time::interval(scan_interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.agent.scan_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);

        // Dropping the run future cancels in-flight estimator and notifier calls.
        let result = tokio::select! {
            result = framework.run().instrument(span) => result,
            _ = &mut shutdown => {
                info!("Shutdown signal received mid-run, abandoning run.");
                break;
            }
        };

        match &result {
            Ok(outcome) => info!(run_id = %run_id, outcome = %outcome, "Run complete"),
            Err(e) => error!(run_id = %run_id, error = %e, "Run failed, continuing to next"),
        }

        if let Some(state) = &dashboard_state {
            state
                .record_run(RunLogEntry::new(&run_id, &result), framework.stats(), framework.memory())
                .await;
        }
    }

    let stats = framework.stats();
    info!(
        runs = stats.runs,
        failed_runs = stats.failed_runs,
        surfaced = stats.opportunities_surfaced,
        remembered = framework.memory().len(),
        "DEALHUNTER shut down cleanly."
    );

    Ok(())
}

/// Chat client for one model on the configured endpoint.
fn chat_client(llm: &LlmConfig, api_key: Option<SecretString>, model: &str) -> Result<Arc<ChatClient>> {
    let client = ChatClient::new(&llm.base_url, api_key, model)?
        .with_max_tokens(llm.max_tokens)
        .with_seed(llm.seed);
    Ok(Arc::new(client))
}

/// Pushover when credentials are present, otherwise log-only alerts.
fn build_notifier(cfg: &AppConfig, api_key: Option<SecretString>) -> Result<Arc<dyn Notifier>> {
    let user = AppConfig::resolve_secret(cfg.alerts.pushover_user_env.as_deref());
    let token = AppConfig::resolve_secret(cfg.alerts.pushover_token_env.as_deref());

    let (Some(user), Some(token)) = (user, token) else {
        warn!("No Pushover credentials configured, alerts will only be logged (dry run)");
        return Ok(Arc::new(LogNotifier));
    };

    let mut notifier = PushoverNotifier::new(user, token)?;
    if cfg.alerts.craft_messages {
        let model = cfg
            .alerts
            .copywriter_model
            .as_deref()
            .unwrap_or(&cfg.llm.frontier_model);
        info!(model, "Alert messages will be written by a copywriter model");
        notifier = notifier.with_copywriter(chat_client(&cfg.llm, api_key, model)?);
    }
    info!("Pushover notifications enabled");
    Ok(Arc::new(notifier))
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dealhunter=info"));

    let json_logging = std::env::var("DEALHUNTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
