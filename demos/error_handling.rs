//! Error Handling Example for the AQI estimator
//!
//! This example walks through the failure modes of the estimator: querying
//! before a model is loaded, malformed form input and unusable model artifacts.
//!
//! Run with: cargo run --example error_handling

use std::collections::HashMap;

use aqi_estimator::{
    AqiError, Estimator, ForestParams, ModelArtifact, assess_fields, load_model, synthetic,
    training,
};

/// Statistics for error tracking
#[derive(Debug, Default)]
struct ErrorStats {
    total_attempts: u32,
    successful: u32,
    input_errors: u32,
    model_errors: u32,
    other_errors: u32,
}

impl ErrorStats {
    fn record(&mut self, result: &Result<f64, AqiError>) {
        self.total_attempts += 1;
        match result {
            Ok(_) => self.successful += 1,
            Err(err) if err.is_input_error() => self.input_errors += 1,
            Err(AqiError::ModelUnavailable) => self.model_errors += 1,
            Err(_) => self.other_errors += 1,
        }
    }
}

fn form(overrides: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    let mut fields: HashMap<_, _> = [
        ("pm25", "10"),
        ("pm10", "20"),
        ("no2", "10"),
        ("so2", "5"),
        ("co", "1"),
        ("o3", "10"),
        ("temp", "25"),
        ("humidity", "50"),
    ]
    .into_iter()
    .collect();
    for &(key, value) in overrides {
        if value.is_empty() {
            fields.remove(&key);
        } else {
            fields.insert(key, value);
        }
    }
    fields
}

fn run(
    estimator: &Estimator,
    description: &str,
    fields: HashMap<&str, &str>,
    stats: &mut ErrorStats,
) {
    println!("  Testing: {description}");
    let result = assess_fields(estimator, fields).map(|a| a.aqi);
    match &result {
        Ok(aqi) => println!("    ✅ AQI {aqi:.2}"),
        Err(AqiError::MissingFeature(name)) => println!("    ❌ Missing field: {name}"),
        Err(AqiError::InvalidInput { field, value }) => {
            println!("    ❌ {field} rejected: {value:?}");
        }
        Err(err) => println!("    ❌ {err}"),
    }
    stats.record(&result);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🛡️  AQI Estimator - Error Handling Example\n");
    let mut stats = ErrorStats::default();

    // Before any model exists every query reports ModelUnavailable
    println!("📭 Unloaded estimator");
    println!("=====================");
    let unloaded = Estimator::default();
    run(&unloaded, "Valid readings, no model", form(&[]), &mut stats);
    run(&unloaded, "Garbage readings, no model", form(&[("co", "abc")]), &mut stats);

    println!();

    println!("🏋️ Trained estimator");
    println!("====================");
    let data = synthetic::generate(300, 42)?;
    let params = ForestParams {
        n_estimators: 20,
        ..ForestParams::default()
    };
    let estimator = training::train(&data, &params)?;

    run(&estimator, "Valid readings", form(&[]), &mut stats);
    run(&estimator, "Missing ozone", form(&[("o3", "")]), &mut stats);
    run(&estimator, "Text instead of number", form(&[("pm25", "high")]), &mut stats);
    run(&estimator, "Infinite CO", form(&[("co", "inf")]), &mut stats);
    run(&estimator, "Extra keys are ignored", form(&[("city", "Delhi")]), &mut stats);

    println!();

    println!("📦 Model artifacts");
    println!("==================");
    let dir = std::env::temp_dir().join(format!("aqi-error-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    let missing = dir.join("missing.json");
    let corrupt = dir.join("corrupt.json");
    std::fs::write(&corrupt, "{ \"format_version\": 1, \"forest\": ")?;
    let future = dir.join("future.json");
    std::fs::write(&future, "{ \"format_version\": 99 }")?;

    for path in [&missing, &corrupt, &future] {
        let estimator = load_model(path);
        print!("  {}: ready={}", path.display(), estimator.is_ready());
        match ModelArtifact::read(path) {
            Ok(_) => println!(),
            Err(err) => println!(" ({err})"),
        }
    }
    std::fs::remove_dir_all(&dir)?;

    println!();
    println!("📈 Summary: {stats:#?}");

    Ok(())
}
