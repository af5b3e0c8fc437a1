//! Statecraft - NationStates issue autopilot
//!
//! Answers pending NationStates issues with a local Ollama model and keeps an
//! append-only record of every choice.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use statecraft::config::{BotConfig, ConfigLayer};
use statecraft::decision_log::{DecisionLog, DEFAULT_LOG_FILE};
use statecraft::llm::OllamaProvider;
use statecraft::nationstates::{DryRunSubmitter, NationStatesClient, Submitter};
use statecraft::orchestrator::{CycleReport, Orchestrator};
use statecraft::{DecisionEngine, StatecraftError};

#[derive(Parser)]
#[command(name = "statecraft")]
#[command(version)]
#[command(about = "Answer NationStates issues with a local LLM and a random fallback")]
#[command(long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to ./statecraft.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer pending issues, once or on a daily cycle
    Run(ConfigArgs),

    /// Print the resolved configuration and check the model server
    CheckConfig(ConfigArgs),

    /// Count the records in a decision log
    Log {
        /// Log file (defaults to the configured log file)
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
}

/// Settings accepted on the command line, each with an environment fallback.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Nation to govern
    #[arg(long, env = "NATION")]
    nation: Option<String>,

    /// Nation password
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// User agent identifying the operator to NationStates
    #[arg(long, env = "USER_AGENT")]
    user_agent: Option<String>,

    /// Seconds between NationStates requests
    #[arg(long, env = "SLEEP_BETWEEN_REQUESTS", value_name = "SECS")]
    request_delay: Option<u64>,

    /// Decide and log without submitting answers
    #[arg(long, alias = "test-mode", env = "TEST_MODE", num_args = 0..=1,
          require_equals = true, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    dry_run: Option<bool>,

    /// Run one cycle and exit
    #[arg(long, env = "SINGLE_RUN", num_args = 0..=1,
          require_equals = true, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    single_run: Option<bool>,

    /// Ollama model name
    #[arg(long, env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Model calls per issue before the random fallback
    #[arg(long, env = "MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Ask the model for reasoning and keep it in the log
    #[arg(long, env = "LOG_REASONING", num_args = 0..=1,
          require_equals = true, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    log_reasoning: Option<bool>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_HOST")]
    ollama_host: Option<String>,

    /// Seconds allowed for one model call
    #[arg(long, env = "MODEL_TIMEOUT", value_name = "SECS")]
    model_timeout: Option<u64>,

    /// First backoff delay in seconds
    #[arg(long, value_name = "SECS")]
    backoff_base: Option<u64>,

    /// Largest backoff delay in seconds
    #[arg(long, value_name = "SECS")]
    backoff_ceiling: Option<u64>,

    /// Seconds between cycles in continuous mode
    #[arg(long, env = "CYCLE_INTERVAL", value_name = "SECS")]
    cycle_interval: Option<u64>,

    /// Longest option text shown to the model, in characters
    #[arg(long)]
    max_option_chars: Option<usize>,

    /// Decision log file
    #[arg(long, env = "LOG_FILE", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// NationStates API endpoint
    #[arg(long, env = "NATIONSTATES_API", value_name = "URL")]
    api_base: Option<String>,
}

impl ConfigArgs {
    fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            nation: self.nation,
            password: self.password,
            user_agent: self.user_agent,
            request_delay_secs: self.request_delay,
            dry_run: self.dry_run,
            single_run: self.single_run,
            model: self.model,
            max_retries: self.max_retries,
            log_reasoning: self.log_reasoning,
            ollama_host: self.ollama_host,
            model_timeout_secs: self.model_timeout,
            backoff_base_secs: self.backoff_base,
            backoff_ceiling_secs: self.backoff_ceiling,
            cycle_interval_secs: self.cycle_interval,
            max_option_chars: self.max_option_chars,
            log_file: self.log_file,
            api_base: self.api_base,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Err(e) = dispatch(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let code = e
            .downcast_ref::<StatecraftError>()
            .map_or(1, StatecraftError::exit_code);
        std::process::exit(code);
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "statecraft=debug,info"
    } else {
        "statecraft=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let config = resolve_config(cli.config.as_deref(), args)?;
            run(config).await
        }
        Commands::CheckConfig(args) => {
            let config = resolve_config(cli.config.as_deref(), args)?;
            check_config(&config).await;
            Ok(())
        }
        Commands::Log { file } => {
            let path = match file {
                Some(path) => path,
                None => ConfigLayer::discover(cli.config.as_deref(), Path::new("."))?
                    .log_file
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            };
            show_log(&path)
        }
    }
}

fn resolve_config(config_path: Option<&Path>, args: ConfigArgs) -> anyhow::Result<BotConfig> {
    let file = ConfigLayer::discover(config_path, Path::new("."))?;
    let config = BotConfig::from_layer(args.into_layer().merge(file))?;
    Ok(config)
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    let client = Arc::new(
        NationStatesClient::new(
            &config.api_base,
            &config.nation,
            config.password.expose(),
            &config.user_agent,
        )
        .context("Failed to set up the NationStates client")?,
    );
    let llm = Arc::new(
        OllamaProvider::new(&config.model, Some(&config.ollama_host))
            .context("Failed to set up the Ollama client")?
            .with_timeout(config.model_timeout.as_secs()),
    );

    if !llm.available().await {
        warn!(
            "Model {} is not available at {}; decisions will fall back to random choices",
            config.model,
            llm.host()
        );
    }

    let submitter: Arc<dyn Submitter> = if config.dry_run {
        Arc::new(DryRunSubmitter)
    } else {
        client.clone()
    };

    println!(
        "{} governing {} with {} ({})",
        "Statecraft".bold(),
        client.nation().cyan(),
        config.model.cyan(),
        if config.dry_run {
            "dry run".yellow()
        } else {
            "live".green()
        }
    );

    let mut orchestrator = Orchestrator::new(
        client,
        submitter,
        config.formatter(),
        DecisionEngine::new(llm, config.engine_config()),
        DecisionLog::new(&config.log_file),
        config.orchestrator_settings(),
    );

    let summary = orchestrator.run(print_cycle).await?;
    println!(
        "{} {} cycle(s), {} issue(s) resolved, {} failed",
        "Done:".green().bold(),
        summary.cycles,
        summary.resolved,
        summary.failed
    );
    Ok(())
}

fn print_cycle(report: &CycleReport) {
    println!(
        "{} {} fetched, {} resolved ({} AI, {} RANDOM), {} failed",
        "Cycle complete:".bold(),
        report.fetched,
        report.resolved(),
        report.ai(),
        report.random(),
        report.failed()
    );
    for decision in &report.decisions {
        println!(
            "  {} #{} {} -> option {} [{}]",
            "✓".green(),
            decision.issue_id,
            decision.title,
            decision.option_id,
            decision.method
        );
    }
    for failure in &report.failures {
        println!(
            "  {} #{} failed at {} ({}, {} attempt(s)): {}",
            "✗".red(),
            failure.issue_id,
            failure.stage,
            failure.kind,
            failure.attempts,
            failure.message
        );
    }
}

async fn check_config(config: &BotConfig) {
    println!("{}", "Resolved configuration".bold());
    println!("  nation:            {}", config.nation);
    println!("  password:          {:?}", config.password);
    println!("  user agent:        {}", config.user_agent);
    println!("  api base:          {}", config.api_base);
    println!("  request delay:     {}s", config.request_delay.as_secs());
    println!("  dry run:           {}", config.dry_run);
    println!("  single run:        {}", config.single_run);
    println!("  cycle interval:    {}s", config.cycle_interval.as_secs());
    println!("  model:             {}", config.model);
    println!("  ollama host:       {}", config.ollama_host);
    println!("  model timeout:     {}s", config.model_timeout.as_secs());
    println!("  max retries:       {}", config.max_retries);
    println!(
        "  backoff:           {}s doubling to {}s",
        config.backoff_base.as_secs(),
        config.backoff_ceiling.as_secs()
    );
    println!("  log reasoning:     {}", config.log_reasoning);
    println!("  max option chars:  {}", config.max_option_chars);
    println!("  log file:          {}", config.log_file.display());

    let status = match OllamaProvider::new(&config.model, Some(&config.ollama_host)) {
        Ok(provider) => match provider.check_availability().await {
            Ok(true) => "available".green(),
            Ok(false) => "model not installed".yellow(),
            Err(e) => format!("unreachable ({e})").red(),
        },
        Err(e) => format!("client error ({e})").red(),
    };
    println!("  model status:      {status}");
}

fn show_log(path: &Path) -> anyhow::Result<()> {
    let scan = DecisionLog::new(path)
        .read_all()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let stats = scan.stats();

    println!(
        "{}: {} valid records ({} AI, {} RANDOM)",
        path.display(),
        stats.total,
        stats.ai,
        stats.random
    );
    if stats.skipped > 0 {
        println!(
            "{}",
            format!("{} unreadable line(s) skipped", stats.skipped).yellow()
        );
    }
    Ok(())
}
