//! aqi CLI: train, query and inspect the AQI estimator.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aqi_estimator::{
    AqiError, Dataset, FeatureVector, ModelArtifact, Settings, assess, classify, load_model,
    training,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aqi")]
#[command(about = "Estimate and classify the Air Quality Index")]
#[command(version)]
struct Cli {
    /// TOML settings file (defaults to $AQI_CONFIG, then ./aqi.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and save the artifact
    Train {
        /// Labeled CSV (8 feature columns + AQI); synthetic data when omitted
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output artifact file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of synthetic samples
        #[arg(long)]
        samples: Option<usize>,

        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,

        /// Seed for data generation, splitting and bootstrap sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Estimate the AQI for one set of readings
    #[command(allow_negative_numbers = true)]
    Predict {
        /// PM2.5 in μg/m³
        #[arg(long)]
        pm25: f64,
        /// PM10 in μg/m³
        #[arg(long)]
        pm10: f64,
        /// NO2 in μg/m³
        #[arg(long)]
        no2: f64,
        /// SO2 in μg/m³
        #[arg(long)]
        so2: f64,
        /// CO in mg/m³
        #[arg(long)]
        co: f64,
        /// O3 in μg/m³
        #[arg(long)]
        o3: f64,
        /// Temperature in °C
        #[arg(long)]
        temp: f64,
        /// Relative humidity in %
        #[arg(long)]
        humidity: f64,

        /// Model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Classify an AQI value
    #[command(allow_negative_numbers = true)]
    Classify {
        aqi: f64,
    },

    /// Display model artifact information
    Info {
        /// Model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Write a synthetic labeled CSV
    Generate {
        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Number of samples
        #[arg(long)]
        samples: Option<usize>,

        /// Generator seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed loading settings")?;

    match cli.command {
        Commands::Train {
            csv,
            output,
            samples,
            trees,
            seed,
        } => {
            if let Some(v) = samples {
                settings.training.samples = v;
            }
            if let Some(v) = trees {
                settings.training.forest.n_estimators = v;
            }
            if let Some(v) = seed {
                settings.training.seed = v;
                settings.training.forest.seed = Some(v);
            }
            settings.validate()?;
            let output = output.unwrap_or(settings.model_path.clone());
            cmd_train(&settings, csv.as_deref(), &output)
        }
        Commands::Predict {
            pm25,
            pm10,
            no2,
            so2,
            co,
            o3,
            temp,
            humidity,
            model,
        } => {
            let features =
                FeatureVector::from_array([pm25, pm10, no2, so2, co, o3, temp, humidity]);
            cmd_predict(&features, &model.unwrap_or(settings.model_path))
        }
        Commands::Classify { aqi } => print_json(&classify(aqi)),
        Commands::Info { model } => cmd_info(&model.unwrap_or(settings.model_path)),
        Commands::Generate {
            output,
            samples,
            seed,
        } => {
            if let Some(v) = samples {
                settings.training.samples = v;
            }
            if let Some(v) = seed {
                settings.training.seed = v;
            }
            cmd_generate(&settings, &output)
        }
    }
}

fn cmd_train(settings: &Settings, csv: Option<&Path>, output: &Path) -> Result<()> {
    let dataset = match csv {
        Some(path) => {
            info!(path = %path.display(), "loading labeled dataset");
            Dataset::from_csv_path(path)
                .with_context(|| format!("failed reading dataset {}", path.display()))?
        }
        None => {
            info!(
                samples = settings.training.samples,
                seed = settings.training.seed,
                "generating synthetic dataset"
            );
            settings.training.synthetic_dataset()?
        }
    };

    let report = training::train_and_save(&dataset, &settings.training, output)
        .with_context(|| format!("training failed, nothing written to {}", output.display()))?;
    print_json(&report)
}

fn cmd_predict(features: &FeatureVector, model_path: &Path) -> Result<()> {
    let estimator = load_model(model_path);
    if !estimator.is_ready() {
        log_load_failure(model_path);
        return Err(AqiError::ModelUnavailable)
            .with_context(|| format!("no usable model at {}", model_path.display()));
    }
    let assessment = assess(&estimator, features).context("prediction failed")?;
    print_json(&assessment)
}

fn log_load_failure(model_path: &Path) {
    if let Err(err) = ModelArtifact::read(model_path).and_then(ModelArtifact::into_model) {
        warn!(path = %model_path.display(), error = %err, "model could not be loaded");
    }
}

fn cmd_info(model_path: &Path) -> Result<()> {
    let artifact = ModelArtifact::read(model_path)
        .with_context(|| format!("failed reading model {}", model_path.display()))?;
    let format_version = artifact.format_version;
    let evaluation = artifact.evaluation;
    let model = artifact.into_model()?;
    let forest = model.forest();

    print_json(&json!({
        "path": model_path.display().to_string(),
        "format_version": format_version,
        "feature_names": model.feature_names(),
        "n_trees": forest.n_trees(),
        "n_features": forest.n_features(),
        "evaluation": evaluation,
        "feature_importances": model.feature_importances(),
    }))
}

fn cmd_generate(settings: &Settings, output: &Path) -> Result<()> {
    let dataset = settings.training.synthetic_dataset()?;
    let file = File::create(output)
        .with_context(|| format!("failed creating {}", output.display()))?;
    dataset.write_csv(file)?;
    info!(path = %output.display(), samples = dataset.len(), "synthetic dataset written");
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
