mod config;
mod logging;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use collector_engine::{
    ApiStrategy, BrowserStrategy, FetchStrategy, HttpStrategy, Ledger, MemoryLedger, Pacer,
    SelectorSet, SheetsLedger, SheetsSettings, StrategyChain,
};
use config::{CollectorConfig, LedgerBackend};
use engine_logging::{engine_info, engine_warn};

const DEFAULT_CONFIG_PATH: &str = "collector.ron";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::load(Path::new(&config_path))?;

    logging::initialize(&config.logging);
    if Path::new(&config_path).exists() {
        engine_info!("Loaded configuration from {config_path}");
    } else {
        engine_info!("No config file at {config_path}; using defaults");
    }

    let ledger = build_ledger(&config)?;
    let pacer = Arc::new(Pacer::new(config.pacer_config()));
    let selectors = SelectorSet::new(&config.selector_patterns);
    if selectors.is_empty() {
        engine_warn!("No usable selector patterns configured; page strategies will find nothing");
    }

    let mut strategies: Vec<Box<dyn FetchStrategy>> = vec![
        Box::new(HttpStrategy::new(
            config.http_settings(),
            selectors.clone(),
            pacer.clone(),
        )),
        Box::new(ApiStrategy::new(config.api_settings(), pacer.clone())),
    ];
    if config.use_browser {
        strategies.push(Box::new(BrowserStrategy::new(
            config.browser_settings(),
            selectors,
            pacer.clone(),
        )));
    }
    let chain = StrategyChain::new(strategies, config.retry_policy());

    // Ctrl-C finishes the in-flight batch and skips the rest.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_warn!("Interrupt received; finishing current batch");
            signal_cancel.cancel();
        }
    });

    let stats = collector_engine::run(
        ledger.as_ref(),
        &chain,
        &pacer,
        &config.scheduler_config(),
        &cancel,
    )
    .await
    .context("initial ledger scan failed")?;

    engine_info!(
        "Done: {} processed, {} collected, {} failed",
        stats.processed,
        stats.succeeded,
        stats.failed
    );
    Ok(())
}

fn build_ledger(config: &CollectorConfig) -> anyhow::Result<Box<dyn Ledger>> {
    match &config.ledger {
        LedgerBackend::Sheets {
            spreadsheet_id,
            worksheet,
            token_env,
        } => {
            let mut settings = SheetsSettings::new(spreadsheet_id.clone(), worksheet.clone());
            settings.columns = config.columns.clone().into();
            settings.bearer_token = match std::env::var(token_env) {
                Ok(token) if !token.is_empty() => Some(token),
                _ => {
                    engine_warn!("No token in ${token_env}; talking to the sheet unauthenticated");
                    None
                }
            };
            let ledger = SheetsLedger::new(settings)
                .with_context(|| format!("connecting ledger {spreadsheet_id:?}"))?;
            Ok(Box::new(ledger))
        }
        LedgerBackend::Memory { terms } => {
            engine_info!("Using in-memory ledger with {} term(s)", terms.len());
            Ok(Box::new(MemoryLedger::from_terms(terms.clone())))
        }
    }
}
