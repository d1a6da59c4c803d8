//! Configuration for the soilsense CLI.
//!
//! Sources, highest priority first:
//! - CLI arguments
//! - Environment variables (`SOILSENSE_*`, read by clap)
//! - TOML config file
//! - Defaults

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Capability;
use serde::{Deserialize, Serialize};
use soilsense_agronomy::Season;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL_DIRS: [&str; 3] = ["ml_model", "models", "soil-quality-backend/ml_model"];
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "soilsense")]
#[command(about = "SoilSense - crop, fertilizer and soil predictions from whatever models are on disk")]
#[command(version)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(long, short = 'c', default_value = "soilsense.toml", env = "SOILSENSE_CONFIG", global = true)]
    pub config: PathBuf,

    /// Model directory; repeat or comma-separate, earlier directories win
    #[arg(long = "model-dir", short = 'd', env = "SOILSENSE_MODEL_DIRS", value_delimiter = ',', global = true)]
    pub model_dirs: Vec<PathBuf>,

    /// Per-prediction deadline in milliseconds
    #[arg(long, env = "SOILSENSE_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// Log filter (e.g. "info", "soilsense_registry=debug")
    #[arg(long, env = "SOILSENSE_LOG", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the artifacts found in the model directories
    Scan,

    /// Load every artifact and print the registry report
    Status,

    /// Run one capability and print the prediction
    Predict {
        /// Capability name, e.g. crop-recommender
        capability: Capability,

        /// JSON file with the input fields
        #[arg(long, short = 'i', conflicts_with = "image")]
        input: Option<PathBuf>,

        /// Image file for image capabilities
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Seasonal crop recommendations for a soil type
    Recommend {
        /// Soil label, e.g. "Clay" or "red sandy soil"
        soil_label: String,

        /// Kharif, Rabi or Zaid; overrides --date
        #[arg(long, short = 's')]
        season: Option<Season>,

        /// Date (YYYY-MM-DD) to derive the season from; defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Full report for one manual soil reading
    Report {
        /// JSON file with the reading
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Soil photo used when the reading names no soil type
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Classify a soil photo and recommend crops for the predicted soil type
    Classify {
        /// Soil photo
        #[arg(long)]
        image: PathBuf,

        /// Kharif, Rabi or Zaid; overrides --date
        #[arg(long, short = 's')]
        season: Option<Season>,

        /// Date (YYYY-MM-DD) to derive the season from; defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// List the accepted input fields per capability
    Fields,
}

/// Merged settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilsenseConfig {
    /// Searched in order; the first directory holding an artifact wins
    pub model_dirs: Vec<PathBuf>,
    pub inference_timeout_ms: u64,
    pub log_level: String,
}

/// Config file contents. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    model_dirs: Option<Vec<PathBuf>>,
    inference_timeout_ms: Option<u64>,
    log_level: Option<String>,
}

impl Default for SoilsenseConfig {
    fn default() -> Self {
        Self {
            model_dirs: DEFAULT_MODEL_DIRS.iter().map(PathBuf::from).collect(),
            inference_timeout_ms: DEFAULT_TIMEOUT_MS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SoilsenseConfig {
    /// Load configuration from CLI args and the optional config file.
    ///
    /// A missing config file is not an error; an unreadable or invalid one is.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = Self::default();

        if args.config.exists() {
            let file = Self::from_file(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?;
            config = config.merge(file);
        }

        if !args.model_dirs.is_empty() {
            config.model_dirs = args.model_dirs.clone();
        }
        if let Some(ms) = args.timeout_ms {
            config.inference_timeout_ms = ms;
        }
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<FileConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn merge(mut self, file: FileConfig) -> Self {
        if let Some(dirs) = file.model_dirs {
            self.model_dirs = dirs;
        }
        if let Some(ms) = file.inference_timeout_ms {
            self.inference_timeout_ms = ms;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = SoilsenseConfig::default();
        assert_eq!(config.model_dirs.len(), 3);
        assert_eq!(config.model_dirs[0], PathBuf::from("ml_model"));
        assert_eq!(config.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_cli_args_override() {
        let args = parse(&[
            "soilsense",
            "--config",
            "nonexistent.toml",
            "-d",
            "a,b",
            "--timeout-ms",
            "50",
            "status",
        ]);
        let config = SoilsenseConfig::load(&args).unwrap();
        assert_eq!(config.model_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(config.inference_timeout_ms, 50);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_subcommand_values() {
        let args = parse(&["soilsense", "predict", "crop-recommender", "--input", "x.json"]);
        match args.command {
            Command::Predict { capability, input, image } => {
                assert_eq!(capability, Capability::CropRecommender);
                assert_eq!(input, Some(PathBuf::from("x.json")));
                assert!(image.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let args = parse(&["soilsense", "recommend", "Clay", "--season", "kharif"]);
        assert!(matches!(
            args.command,
            Command::Recommend { season: Some(Season::Kharif), .. }
        ));

        let args = parse(&["soilsense", "classify", "--image", "soil.jpg", "--date", "2024-04-02"]);
        match args.command {
            Command::Classify { image, season, date } => {
                assert_eq!(image, PathBuf::from("soil.jpg"));
                assert!(season.is_none());
                assert_eq!(date.as_deref(), Some("2024-04-02"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(CliArgs::try_parse_from(["soilsense", "classify"]).is_err());

        assert!(CliArgs::try_parse_from(["soilsense", "predict", "yield-forecaster"]).is_err());
    }
}
