mod amount;
mod api;
mod config;
mod dates;
mod error;
mod fields;
mod finding;
mod html;
mod output;
mod page;
mod scenario;
mod scrape;
mod wait;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::scenario::{Context, ScenarioKind};

#[derive(Parser)]
#[command(name = "editais-e2e", about = "End-to-end checks for the editais web app")]
struct Cli {
    /// Config file; built-in defaults are used when it does not exist
    #[arg(long, default_value = "editais-e2e.toml")]
    config: PathBuf,
    /// Target app URL (overrides config and EDITAIS_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,
    /// Artifact directory (overrides config and EDITAIS_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Page driver (overrides config)
    #[arg(long, value_enum)]
    driver: Option<config::DriverKind>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run scenarios (all of them when none is named)
    Run {
        #[arg(value_enum)]
        scenarios: Vec<ScenarioKind>,
    },
    /// List available scenarios
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            list_scenarios();
            Ok(())
        }
        Command::Run { ref scenarios } => run(&cli, scenarios).await,
    }
}

fn list_scenarios() {
    for kind in ScenarioKind::ALL {
        if let Some(value) = kind.to_possible_value() {
            let help = value.get_help().map(|h| h.to_string()).unwrap_or_default();
            println!("{:<12} {}", value.get_name(), help);
        }
    }
}

async fn run(cli: &Cli, scenarios: &[ScenarioKind]) -> anyhow::Result<()> {
    // 1. Config: file, then env, then flags
    let mut cfg = config::Config::load_or_default(&cli.config)?;
    cfg.apply_env();
    if let Some(url) = &cli.base_url {
        cfg.target.base_url = url.clone();
    }
    if let Some(dir) = &cli.output_dir {
        cfg.output.dir = dir.clone();
    }
    if let Some(driver) = cli.driver {
        cfg.target.driver = driver;
    }

    let kinds: Vec<ScenarioKind> = if scenarios.is_empty() {
        ScenarioKind::ALL.to_vec()
    } else {
        scenarios.to_vec()
    };

    // 2. Shared client + artifact writer
    let ctx = Context::new(cfg)?;
    tracing::info!(
        base_url = %ctx.base_url(),
        driver = ?ctx.config.target.driver,
        output = %ctx.writer.dir().display(),
        count = kinds.len(),
        "Starting run"
    );

    // 3. Scenarios, one at a time
    let outcomes = scenario::run_scenarios(&ctx, &kinds).await;

    // 4. Summary
    let failed: Vec<&str> = outcomes.iter().filter(|o| !o.passed()).map(|o| o.name).collect();
    let stats: Vec<String> = outcomes
        .iter()
        .map(|o| {
            format!(
                "{}:{}({}ms)",
                o.name,
                if o.passed() { "ok" } else { "FAIL" },
                o.elapsed.as_millis()
            )
        })
        .collect();
    tracing::info!(
        "Run done: {} passed / {} failed | {}",
        outcomes.len() - failed.len(),
        failed.len(),
        stats.join(" ")
    );

    if !failed.is_empty() {
        anyhow::bail!("{} scenario(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
