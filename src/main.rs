use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vulnmap::{config, data, render, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate styled layers, legends and the indicator catalog
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Indicator for the main panel (defaults to the composite index)
        #[arg(long)]
        main: Option<String>,
        /// Indicator for the vulnerability comparison panel
        #[arg(long)]
        compare_vul: Option<String>,
        /// Indicator for the nutrition comparison panel
        #[arg(long)]
        compare_nut: Option<String>,
    },
    /// Serve the generated layers, the region query API and the update endpoint
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            main,
            compare_vul,
            compare_nut,
        } => {
            info!("Generating map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let dataset = data::load_data(&app_config)?;
            let selection = render::PanelSelection {
                main,
                compare_vul,
                compare_nut,
            };
            render::generate_layers(&app_config, dataset, &selection)?;
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let dataset = data::load_data(&app_config)?;
            server::start_server(app_config, dataset).await?;
        }
    }

    Ok(())
}
