//! soilsense - crop, fertilizer and soil predictions from whatever models are on disk.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use soilsense_server::commands::{
    classify_command, fields_command, predict_command, recommend_command, report_command,
    scan_command, status_command,
};
use soilsense_server::{CliArgs, Command, SoilsenseConfig};
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: CliArgs, config: SoilsenseConfig) -> Result<()> {
    match args.command {
        Command::Scan => print_json(&scan_command(&config)?),
        Command::Status => print_json(&status_command(&config)?),
        Command::Predict {
            capability,
            input,
            image,
        } => {
            let result =
                predict_command(&config, capability, input.as_deref(), image.as_deref()).await?;
            print_json(&result)
        }
        Command::Recommend {
            soil_label,
            season,
            date,
        } => print_json(&recommend_command(&soil_label, season, date.as_deref())?),
        Command::Report { input, image } => {
            print_json(&report_command(&config, &input, image.as_deref())?)
        }
        Command::Classify {
            image,
            season,
            date,
        } => print_json(&classify_command(&config, &image, season, date.as_deref())?),
        Command::Fields => print_json(&fields_command()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = SoilsenseConfig::load(&args)?;

    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Configuration: {:?}", config);

    if let Err(err) = run(args, config).await {
        error!("{:#}", err);
        return Err(err);
    }
    Ok(())
}
