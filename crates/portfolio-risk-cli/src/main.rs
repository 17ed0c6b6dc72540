mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::stress::HistoricalArgs;
use commands::InputArgs;
use portfolio_risk_core::config::EngineConfig;

/// Portfolio risk, optimization and stress testing
#[derive(Parser)]
#[command(
    name = "prisk",
    version,
    about = "Portfolio risk, optimization and stress testing",
    long_about = "A CLI for multi-asset portfolio analysis: correlation matrices, \
                  stochastic-search optimization, efficient frontiers, Monte Carlo \
                  projections, stress tests, parametric VaR and rebalancing."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// JSON engine config; fills keys missing from the input
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine diagnostics to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pearson correlation matrix from price history
    Correlation(InputArgs),
    /// Covariance matrix from asset profiles
    Covariance(InputArgs),
    /// Best-Sharpe portfolio within a risk profile's volatility band
    Optimize(InputArgs),
    /// Efficient frontier by target-return sweep
    Frontier(InputArgs),
    /// Monte Carlo projection of portfolio wealth
    Project(InputArgs),
    /// Monte Carlo path stress test (VaR, CVaR)
    StressMc(InputArgs),
    /// Replay a historical crisis against holdings
    StressHistorical(HistoricalArgs),
    /// List available crisis scenarios
    Scenarios,
    /// Factor sensitivity sweep
    Sensitivity(InputArgs),
    /// Parametric Value at Risk
    Var(InputArgs),
    /// Drift-based rebalancing trades
    Rebalance(InputArgs),
    /// Performance metrics from an equity curve
    Performance(InputArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "portfolio_risk_core=debug"
    } else {
        "portfolio_risk_core=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&str>) -> Result<Option<EngineConfig>, Box<dyn std::error::Error>> {
    path.map(input::file::read_json::<EngineConfig>).transpose()
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };
    if let Some(cfg) = &config {
        tracing::debug!(?cfg, "engine config loaded");
    }
    let cfg = config.as_ref();

    let result: commands::CommandResult = match cli.command {
        Commands::Correlation(args) => commands::correlation::run_correlation(args, cfg),
        Commands::Covariance(args) => commands::optimization::run_covariance(args, cfg),
        Commands::Optimize(args) => commands::optimization::run_optimize(args, cfg),
        Commands::Frontier(args) => commands::optimization::run_frontier(args, cfg),
        Commands::Project(args) => commands::monte_carlo::run_projection(args, cfg),
        Commands::StressMc(args) => commands::stress::run_path_stress(args, cfg),
        Commands::StressHistorical(args) => commands::stress::run_historical(args, cfg),
        Commands::Scenarios => commands::stress::run_list_scenarios(),
        Commands::Sensitivity(args) => commands::stress::run_sensitivity(args, cfg),
        Commands::Var(args) => commands::stress::run_var(args, cfg),
        Commands::Rebalance(args) => commands::rebalancing::run_rebalance(args, cfg),
        Commands::Performance(args) => commands::analytics::run_performance(args, cfg),
        Commands::Version => {
            println!("prisk {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
