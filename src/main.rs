use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use subgen::config::GenerationConfig;
use subgen::generator::generate;

#[derive(Parser)]
#[command(name = "subgen")]
#[command(about = "Merge proxy subscriptions and rule lists into one routing configuration")]
struct Args {
    /// Generation config file path (.json, .toml or .ron)
    #[arg(short, long)]
    config: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Base config file path
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Log level
    #[arg(long)]
    loglevel: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !args.config.exists() {
        bail!("Invalid config file path: {}", args.config.display());
    }
    if let Some(base) = &args.base {
        if !base.exists() {
            bail!("Invalid config file base path: {}", base.display());
        }
    }

    // Load configuration
    let mut config = GenerationConfig::from_file(&args.config)
        .with_context(|| format!("Loading config file {} failed", args.config.display()))?;

    // Override config with command line arguments
    config
        .override_log_level(args.loglevel.as_deref(), args.debug)
        .context("Invalid log level")?;

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.level))
        .init();

    info!(
        "Configuration loaded: {} subscriptions, {} proxy groups, {} rule sets",
        config.subscriptions.len(),
        config.proxy_groups.len(),
        config.rulesets.len()
    );
    info!("Configuration:");
    info!("  Config: {}", args.config.display());
    info!("  Output: {}", args.output.display());
    info!("  Cache dir: {}", config.cache.dir.display());

    if let Err(e) = generate(&config, args.base.as_deref(), &args.output).await {
        error!("Generation failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
