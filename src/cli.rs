//! CLI definition and dispatch.

use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::{CsvPriceAdapter, load_sentiment};
use crate::adapters::csv_result_adapter::CsvResultStore;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, DEFAULT_STEP_INTERVAL, run_and_store, run_policy};
use crate::domain::config_validation::{
    validate_data_config, validate_policy_config, validate_results_config,
    validate_simulation_config,
};
use crate::domain::error::StratbenchError;
use crate::domain::exact::Exact;
use crate::domain::metrics::{DEFAULT_RISK_FREE_RATE, SUMMARY_COLUMNS, SummaryRecord};
use crate::domain::policy::{AllIn, AllInAtExtreme, Dca, FearGreed, Policy, PolicyKind};
use crate::domain::price_series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PriceSource;
use crate::ports::result_port::ResultStore;

#[derive(Parser, Debug)]
#[command(name = "stratbench", about = "Exact-arithmetic trading policy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one policy over one price window
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        window: String,
        /// Overrides [policy] kind
        #[arg(short, long)]
        policy: Option<String>,
        /// Overrides [simulation] step_interval (seconds)
        #[arg(long)]
        step: Option<i64>,
        /// Print the summary without writing results
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show available price windows, or details of one
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        window: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            window,
            policy,
            step,
            dry_run,
        } => run_simulation(&config, &window, policy.as_deref(), step, dry_run),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, window } => run_info(&config, window.as_deref()),
    }
}

fn fail(e: &StratbenchError) -> ExitCode {
    error!("{e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    step_override: Option<i64>,
) -> Result<BacktestConfig, StratbenchError> {
    let defaults = BacktestConfig::default();
    let step_interval = match step_override {
        Some(step) if step <= 0 => {
            return Err(StratbenchError::invalid_argument(format!(
                "--step must be a positive number of seconds, got {step}"
            )));
        }
        Some(step) => step,
        None => adapter.get_int("simulation", "step_interval", DEFAULT_STEP_INTERVAL),
    };

    Ok(BacktestConfig {
        starting_cash: adapter.get_exact("simulation", "starting_cash", defaults.starting_cash)?,
        starting_asset: adapter.get_exact("simulation", "starting_asset", defaults.starting_asset)?,
        fee_rate: adapter.get_exact("simulation", "fee_rate", defaults.fee_rate)?,
        step_interval,
        risk_free_rate: adapter.get_double("simulation", "risk_free_rate", DEFAULT_RISK_FREE_RATE),
        save_results: adapter.get_bool("simulation", "save_results", defaults.save_results),
    })
}

fn threshold(adapter: &dyn ConfigPort, key: &str, default: u8) -> Result<u8, StratbenchError> {
    let value = adapter.get_int("policy", key, i64::from(default));
    u8::try_from(value).map_err(|_| StratbenchError::ConfigInvalid {
        section: "policy".into(),
        key: key.into(),
        reason: format!("{value} is not between 0 and 100"),
    })
}

pub fn build_policy(
    adapter: &dyn ConfigPort,
    kind: PolicyKind,
    step_interval: i64,
) -> Result<Box<dyn Policy>, StratbenchError> {
    let policy: Box<dyn Policy> = match kind {
        PolicyKind::AllIn => Box::new(AllIn),
        PolicyKind::AllInBottom => Box::new(AllInAtExtreme::bottom()),
        PolicyKind::AllInTop => Box::new(AllInAtExtreme::top()),
        PolicyKind::Dca => {
            let pct = adapter.get_exact(
                "policy",
                "initial_buy_pct",
                Exact::from(Dca::DEFAULT_INITIAL_BUY_PCT),
            )?;
            Box::new(Dca::new(step_interval, pct)?)
        }
        PolicyKind::FearGreed => {
            let path = adapter.get_string("policy", "sentiment_path").ok_or_else(|| {
                StratbenchError::ConfigMissing {
                    section: "policy".into(),
                    key: "sentiment_path".into(),
                }
            })?;
            let sentiment = load_sentiment(Path::new(&path))?;
            Box::new(FearGreed::new(
                sentiment,
                step_interval,
                threshold(adapter, "buy_threshold", FearGreed::DEFAULT_BUY_THRESHOLD)?,
                threshold(adapter, "sell_threshold", FearGreed::DEFAULT_SELL_THRESHOLD)?,
            )?)
        }
    };
    Ok(policy)
}

pub fn resolve_policy_kind(
    override_kind: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<PolicyKind, StratbenchError> {
    match override_kind {
        Some(kind) => kind.parse(),
        None => adapter
            .get_string("policy", "kind")
            .ok_or_else(|| StratbenchError::ConfigMissing {
                section: "policy".into(),
                key: "kind".into(),
            })?
            .parse(),
    }
}

fn price_source(adapter: &dyn ConfigPort) -> Result<CsvPriceAdapter, StratbenchError> {
    let dir = adapter
        .get_string("data", "price_dir")
        .ok_or_else(|| StratbenchError::ConfigMissing {
            section: "data".into(),
            key: "price_dir".into(),
        })?;
    Ok(CsvPriceAdapter::new(PathBuf::from(dir)))
}

/// The configured result store; `None` for the `none` backend.
pub fn open_result_store(
    adapter: &dyn ConfigPort,
) -> Result<Option<Box<dyn ResultStore>>, StratbenchError> {
    let backend = adapter
        .get_string("results", "backend")
        .unwrap_or_else(|| "csv".to_string());
    match backend.trim() {
        "none" => Ok(None),
        "csv" => {
            let dir = adapter
                .get_string("results", "dir")
                .unwrap_or_else(|| "results".to_string());
            Ok(Some(Box::new(CsvResultStore::new(PathBuf::from(dir)))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqliteResultStore;
            Ok(Some(Box::new(SqliteResultStore::from_config(adapter)?)))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(StratbenchError::ConfigInvalid {
            section: "results".into(),
            key: "backend".into(),
            reason: "sqlite feature is not enabled in this build".into(),
        }),
        other => Err(StratbenchError::ConfigInvalid {
            section: "results".into(),
            key: "backend".into(),
            reason: format!("unknown backend '{other}'"),
        }),
    }
}

pub fn format_summary(summary: &SummaryRecord) -> Result<String, StratbenchError> {
    let mut out = format!(
        "{:<24} {}\n{:<24} {}\n",
        "Policy", summary.policy_name, "Price Period", summary.window_name
    );
    for ((_, header), value) in SUMMARY_COLUMNS.iter().zip(summary.fields()?) {
        out.push_str(&format!("{header:<24} {value}\n"));
    }
    Ok(out)
}

fn run_simulation(
    config_path: &Path,
    window: &str,
    policy_override: Option<&str>,
    step_override: Option<i64>,
    dry_run: bool,
) -> ExitCode {
    // Stage 1: load and validate config
    info!(path = %config_path.display(), "loading config");
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let checks = validate_simulation_config(&adapter)
        .and_then(|_| validate_data_config(&adapter))
        .and_then(|_| validate_results_config(&adapter))
        .and_then(|_| match policy_override {
            Some(_) => Ok(()),
            None => validate_policy_config(&adapter),
        });
    if let Err(e) = checks {
        return fail(&e);
    }

    // Stage 2: build config, policy and inputs
    let bt_config = match build_backtest_config(&adapter, step_override) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let mut policy = match resolve_policy_kind(policy_override, &adapter)
        .and_then(|kind| build_policy(&adapter, kind, bt_config.step_interval))
    {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let series = match price_source(&adapter).and_then(|source| source.load_window(window)) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    // Stage 3: run, persisting unless this is a dry run
    let outcome = if dry_run {
        run_policy(policy.as_mut(), &series, &bt_config)
    } else {
        match open_result_store(&adapter) {
            Ok(Some(mut store)) => run_and_store(policy.as_mut(), &series, &bt_config, store.as_mut()),
            Ok(None) => run_policy(policy.as_mut(), &series, &bt_config),
            Err(e) => Err(e),
        }
    };
    let result = match outcome {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    match format_summary(&result.summary) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let checks = validate_simulation_config(&adapter)
        .and_then(|_| validate_data_config(&adapter))
        .and_then(|_| validate_results_config(&adapter))
        .and_then(|_| validate_policy_config(&adapter));
    match checks {
        Ok(()) => {
            println!("{}: configuration is valid", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn describe_window(series: &PriceSeries) -> String {
    let min = &series.rows()[series.index_of_min_price()];
    let max = &series.rows()[series.index_of_max_price()];
    let stddev = series
        .display_price_stddev()
        .map(|sd| format!("{sd:.2}"))
        .unwrap_or_else(|| "undefined".to_string());
    format!(
        "window:  {}\nrows:    {}\nstart:   {}\nend:     {}\nlow:     {} at {}\nhigh:    {} at {}\nstddev:  {}\n",
        series.name(),
        series.len(),
        format_time(series.start_time()),
        format_time(series.end_time()),
        min.display_price,
        format_time(min.timestamp),
        max.display_price,
        format_time(max.timestamp),
        stddev
    )
}

fn run_info(config_path: &Path, window: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let source = match price_source(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match window {
        Some(name) => match source.load_window(name) {
            Ok(series) => {
                print!("{}", describe_window(&series));
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
        None => match source.list_windows() {
            Ok(windows) if windows.is_empty() => {
                println!("no price windows found");
                ExitCode::SUCCESS
            }
            Ok(windows) => {
                for name in windows {
                    println!("{name}");
                }
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
    }
}
