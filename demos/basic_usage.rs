//! Basic Usage Example for the AQI estimator
//!
//! This example trains a small model on synthetic data, assesses a few sets of
//! readings and shows the classification of raw AQI values.
//!
//! Run with: cargo run --example basic_usage

use aqi_estimator::{
    AqiCategory, Estimator, Feature, FeatureVector, ForestParams, TrainingConfig, assess, classify,
    training,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🌫️  AQI Estimator - Basic Usage Example\n");

    // Example 1: Train on synthetic data
    println!("🏋️ Example 1: Training");
    println!("=====================");

    let config = TrainingConfig {
        forest: ForestParams {
            n_estimators: 30,
            ..ForestParams::default()
        },
        ..TrainingConfig::default()
    };
    let dataset = config.synthetic_dataset()?;
    let (model, report) = training::fit_and_evaluate(&dataset, &config)?;
    println!(
        "Samples: {} (train {}, test {})",
        report.n_samples, report.n_train, report.n_test
    );
    println!(
        "Held-out MAE: {:.2}, R²: {:.4}",
        report.evaluation.mae, report.evaluation.r2
    );
    println!("Top features:");
    for (feature, importance) in report.feature_importances.iter().take(3) {
        println!("  {:<12} {:.3}", feature.name(), importance);
    }
    let estimator = Estimator::from(model);

    println!();

    // Example 2: Assess readings
    println!("🔎 Example 2: Assessing Readings");
    println!("================================");

    let samples = [
        ("Clean morning", [10.0, 20.0, 10.0, 5.0, 1.0, 10.0, 25.0, 50.0]),
        ("Busy street", [55.0, 90.0, 70.0, 20.0, 2.5, 60.0, 30.0, 45.0]),
        ("Smog episode", [250.0, 380.0, 150.0, 60.0, 7.0, 150.0, 18.0, 80.0]),
    ];
    for (name, values) in samples {
        let readings = FeatureVector::from_array(values);
        let result = assess(&estimator, &readings)?;
        println!(
            "  {:<14} AQI {:>7.2}  {} [{}]",
            name, result.aqi, result.classification.label, result.classification.severity_tag
        );
        println!("                 {}", result.classification.advice);
        for feature in readings.out_of_range() {
            println!("                 ⚠️  {} outside its expected range", feature);
        }
    }

    println!();

    // Example 3: Classification only
    println!("📊 Example 3: Classification Tiers");
    println!("==================================");

    for category in AqiCategory::ALL {
        let bound = category
            .upper_bound()
            .map_or_else(|| "∞".to_string(), |b| format!("{b}"));
        println!("  ≤ {:>4}  {}", bound, category.label());
    }
    for aqi in [0.0, 50.0, 50.0001, 420.0] {
        println!("  classify({aqi}) = {}", classify(aqi).category);
    }

    println!();
    println!(
        "Readings are ordered as {:?}",
        Feature::ALL.map(Feature::name)
    );

    Ok(())
}
