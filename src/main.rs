use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zha_exporter::collectors::CollectionStatus;
use zha_exporter::config::{Config, Overrides};
use zha_exporter::exporter::{self, Output};
use zha_exporter::zha;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Hostname for Home Assistant, e.g. homeassistant.local (overrides config)
    #[arg(long, env = "ZHA_HASS_HOSTNAME", global = true)]
    hass_hostname: Option<String>,

    /// Port for Home Assistant, e.g. 8123 (overrides config)
    #[arg(long, env = "ZHA_HASS_PORT", global = true)]
    hass_port: Option<u16>,

    /// Home Assistant long-lived access token (overrides config)
    #[arg(long, env = "ZHA_HASS_TOKEN", global = true, hide_env_values = true)]
    hass_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every device as a router-config-style block
    GetDevices,

    /// Print the raw device records as JSON
    DumpDevices,

    /// Scrape the hub and print Prometheus metrics
    Metrics {
        /// Write the exposition to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep scraping every `scrape_interval_seconds`
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let overrides = Overrides {
        hostname: args.hass_hostname,
        port: args.hass_port,
        token: args.hass_token,
    };
    let config = Config::load_with_overrides(&args.config, overrides)?;
    info!("Hub endpoint: {}", config.homeassistant.websocket_url());

    if let Err(e) = run(args.command, &config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::GetDevices => {
            let devices = zha::fetch_devices(&config.homeassistant).await?;
            for device in devices {
                println!("{}", device.as_cisco());
            }
        }
        Command::DumpDevices => {
            let devices = zha::fetch_raw_devices(&config.homeassistant).await?;
            println!("{}", serde_json::to_string_pretty(&devices)?);
        }
        Command::Metrics { output, watch } => {
            let output = output.map_or(Output::Stdout, Output::File);
            if watch {
                info!(
                    "Scraping every {}s",
                    config.metrics.scrape_interval_seconds
                );
                exporter::run_loop(config, &output).await?;
            } else if exporter::run_once(config, &output).await? == CollectionStatus::Failed {
                anyhow::bail!("Failed to collect device metrics from the hub");
            }
        }
    }

    Ok(())
}
