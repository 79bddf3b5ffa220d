//! ContractCheck - contract compliance checker
//!
//! CLI entry point: runs the web service or the analysis chains one-shot.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use sessionstore::{SessionStore, TokenCodec};
use tracing::{debug, info};

use contractcheck::analysis::{ComplianceAnalyzer, ContractExtractor};
use contractcheck::cli::{Cli, Command, OutputFormat};
use contractcheck::config::Config;
use contractcheck::documents::{read_contract_text, read_tasks};
use contractcheck::domain::TaskAnalysis;
use contractcheck::llm::create_client;
use contractcheck::prompts::PromptLoader;
use contractcheck::server::{self, AppState};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contractcheck")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("contractcheck.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("ContractCheck loaded config: provider={} model={}", config.llm.provider, config.llm.model);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { host, port } => cmd_serve(config, host, port).await,
        Command::Extract { contract } => cmd_extract(&config, &contract).await,
        Command::Analyze {
            contract,
            tasks,
            format,
        } => cmd_analyze(&config, &contract, &tasks, format).await,
    }
}

async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    debug!(?host, ?port, "cmd_serve: called");
    // The signing secret is checked before anything else touches the network
    let codec = TokenCodec::from_env(&config.session.secret_env)?;
    config.validate()?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let (extractor, analyzer) = build_chains(&config)?;
    let state = AppState {
        sessions: Arc::new(SessionStore::new(codec)),
        extractor,
        analyzer,
    };

    println!(
        "{} Serving on {}",
        "✓".green(),
        format!("http://{}:{}", config.server.host, config.server.port).cyan()
    );
    server::serve(&config, state).await
}

async fn cmd_extract(config: &Config, contract_path: &Path) -> Result<()> {
    debug!(?contract_path, "cmd_extract: called");
    let text = read_contract(contract_path)?;
    let (extractor, _) = build_chains(config)?;

    let contract = extractor.extract(&text).await?;
    println!("{}", serde_json::to_string_pretty(&contract)?);
    Ok(())
}

async fn cmd_analyze(config: &Config, contract_path: &Path, tasks_path: &Path, format: OutputFormat) -> Result<()> {
    debug!(?contract_path, ?tasks_path, ?format, "cmd_analyze: called");
    let text = read_contract(contract_path)?;
    let tasks = read_tasks(&file_name(tasks_path)?, &read_file(tasks_path)?)?;
    let (extractor, analyzer) = build_chains(config)?;

    let contract = extractor.extract(&text).await?;
    let verdicts = analyzer.analyze_all(&contract, &tasks).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "results": verdicts }))?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Contract:".bold(), contract.title);
            for verdict in &verdicts {
                print_verdict(verdict);
            }
            let compliant = verdicts.iter().filter(|v| v.compliance).count();
            println!("\n{}/{} tasks compliant", compliant, verdicts.len());
        }
    }
    Ok(())
}

fn print_verdict(verdict: &TaskAnalysis) {
    let label = if verdict.ambiguous {
        "AMBIGUOUS".yellow()
    } else if verdict.compliance {
        "COMPLIANT".green()
    } else {
        "NOT COMPLIANT".red()
    };
    println!(
        "\n{} {} {}",
        label.bold(),
        verdict.task_description,
        format!("({:.2})", verdict.task_cost).dimmed()
    );
    println!("  {}", verdict.reasoning);
    for term in &verdict.applicable_terms {
        println!("  {} {}", "-".dimmed(), term.title.cyan());
    }
}

fn build_chains(config: &Config) -> Result<(ContractExtractor, ComplianceAnalyzer)> {
    let client = create_client(&config.llm)?;
    let prompts = Arc::new(PromptLoader::new(config.prompts.dir.as_deref()));
    Ok((
        ContractExtractor::new(client.clone(), prompts.clone()),
        ComplianceAnalyzer::new(client, prompts),
    ))
}

fn read_contract(path: &Path) -> Result<String> {
    Ok(read_contract_text(&file_name(path)?, &read_file(path)?)?)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).context(format!("Failed to read {}", path.display()))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| eyre!("Not a file path: {}", path.display()))
}
