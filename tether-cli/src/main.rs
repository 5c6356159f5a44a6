use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tether_config::{ConfigLoader, TetherConfig};
use tether_ipc::SenderIdentity;
use tether_logging::{init_logging_from_config, init_simple_tracing};
use tracing::{error, info};

mod cli;
mod runtime;

use cli::{Cli, Commands, ConfigCommands};
use runtime::{parse_bindings, sender_guard, LocalRuntime};

fn load_config(config_path: Option<&PathBuf>) -> Result<TetherConfig> {
    ConfigLoader::new()
        .load(config_path)
        .with_context(|| match config_path {
            Some(path) => format!("Failed to load configuration from {:?}", path),
            None => "Failed to load configuration from environment".to_string(),
        })
}

async fn handle_eval(
    mut config: TetherConfig,
    expression: &str,
    bindings: &[String],
    timeout_ms: Option<u64>,
) -> Result<()> {
    if let Some(ms) = timeout_ms {
        config.sandbox.eval_timeout = Duration::from_millis(ms);
    }

    let bindings = parse_bindings(bindings)?;
    let runtime = LocalRuntime::start(&config)?;
    let response = runtime.evaluate(expression, bindings).await?;

    if response.get("success").and_then(|v| v.as_bool()) == Some(true) {
        let result = response.get("result").cloned().unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    } else {
        let message = response
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("evaluation failed");
        let code = response.get("code").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");
        Err(anyhow!("{} ({})", message, code))
    }
}

fn handle_check_sender(
    config: &TetherConfig,
    declared_id: Option<String>,
    url: Option<String>,
    tab: bool,
) -> Result<()> {
    let sender = SenderIdentity {
        declared_id,
        url,
        has_tab_context: tab,
    };

    let guard = sender_guard(&config.guard);
    if guard.allows(Some(&sender)) {
        println!("privileged");
    } else {
        println!("not privileged (expected id {}, origin {})", guard.expected_id(), guard.origin_prefix());
    }
    Ok(())
}

fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow!("Configuration file not found: {:?}", config_file));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(_config) => {
            println!("Configuration file is valid");
            Ok(())
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            Err(anyhow!("Configuration validation failed: {}", e))
        }
    }
}

fn handle_config_sample(output: Option<&PathBuf>, force: bool) -> Result<()> {
    let sample = TetherConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    fs::write(output, sample).with_context(|| format!("Failed to write {:?}", output))?;

    println!("Sample configuration written to {:?}", output);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Validating a file must not depend on the environment being loadable
    if let Commands::Config {
        config_cmd: ConfigCommands::Validate { config_file },
    } = &cli.command
    {
        init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
        return handle_config_validate(config_file);
    }

    let config = load_config(cli.config.as_ref())?;
    match cli.log_level.as_deref() {
        Some(level) => init_simple_tracing(level)?,
        None => init_logging_from_config(&config.logging)?,
    }

    match cli.command {
        Commands::Eval {
            expression,
            bindings,
            timeout_ms,
        } => handle_eval(config, &expression, &bindings, timeout_ms).await,
        Commands::CheckSender {
            declared_id,
            url,
            tab,
        } => handle_check_sender(&config, declared_id, url, tab),
        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Sample { output, force } => handle_config_sample(output.as_ref(), force),
            ConfigCommands::Validate { config_file } => handle_config_validate(&config_file),
        },
    }
}
