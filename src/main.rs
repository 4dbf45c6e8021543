use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use url_transcriber::cli::{Cli, Commands};
use url_transcriber::config::Config;
use url_transcriber::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command() {
        Commands::Serve { bind } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            init_tracing(&config, cli.verbose);
            config.validate()?;

            tracing::info!(version = env!("CARGO_PKG_VERSION"), "url-transcriber starting");
            server::serve(config).await?;
        }
        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::default_path()
                        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
                };
                if path.exists() {
                    anyhow::bail!("Config file already exists: {}", path.display());
                }
                Config::default().save(&path)?;
                println!("Configuration template written to: {}", path.display());
            }
            if show || !init {
                Config::load(cli.config.as_deref())?.display();
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins, then the configured level; `--verbose` forces debug
fn init_tracing(config: &Config, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            config.server.log_level.parse::<EnvFilter>().unwrap_or_else(|e| {
                eprintln!(
                    "WARN: log level '{}' is not a valid tracing filter ({}); falling back to 'info'",
                    config.server.log_level, e
                );
                EnvFilter::new("info")
            })
        })
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if config.server.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
