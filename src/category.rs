//! AQI severity tiers and health advice
//!
//! Tiers are checked with `<=` against ascending upper bounds, first match wins,
//! so a value sitting exactly on a boundary belongs to the lower tier.

use serde::{Deserialize, Serialize};

/// Severity tier of an AQI value, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiCategory {
    /// AQI <= 50
    Good,
    /// 50 < AQI <= 100
    Satisfactory,
    /// 100 < AQI <= 200
    Moderate,
    /// 200 < AQI <= 300
    Poor,
    /// 300 < AQI <= 400
    #[serde(rename = "Very Poor")]
    VeryPoor,
    /// AQI > 400
    Severe,
}

impl AqiCategory {
    /// All tiers in ascending severity
    pub const ALL: [Self; 6] = [
        Self::Good,
        Self::Satisfactory,
        Self::Moderate,
        Self::Poor,
        Self::VeryPoor,
        Self::Severe,
    ];

    /// Inclusive upper bound of the tier; `None` for the open-ended top tier
    #[must_use]
    pub fn upper_bound(self) -> Option<f64> {
        match self {
            Self::Good => Some(50.0),
            Self::Satisfactory => Some(100.0),
            Self::Moderate => Some(200.0),
            Self::Poor => Some(300.0),
            Self::VeryPoor => Some(400.0),
            Self::Severe => None,
        }
    }

    /// Tier for an AQI value. Total: negatives map to `Good`, NaN to `Severe`.
    #[must_use]
    pub fn from_aqi(aqi: f64) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| tier.upper_bound().is_some_and(|bound| aqi <= bound))
            .unwrap_or(Self::Severe)
    }

    /// Display label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Severe => "Severe",
        }
    }

    /// Style tag used by presentation layers to colour the tier
    #[must_use]
    pub fn style_tag(self) -> &'static str {
        match self {
            Self::Good => "bg-success",
            Self::Satisfactory => "bg-info",
            Self::Moderate => "bg-warning",
            Self::Poor => "bg-orange",
            Self::VeryPoor => "bg-danger",
            Self::Severe => "bg-purple",
        }
    }

    /// Health advisory text
    #[must_use]
    pub fn advice(self) -> &'static str {
        match self {
            Self::Good => "Air quality is good. Perfect for outdoor activities.",
            Self::Satisfactory => {
                "Air quality is satisfactory. Minor breathing discomfort to sensitive people."
            }
            Self::Moderate => {
                "Air quality is moderate. Breathing discomfort to people with lung disease."
            }
            Self::Poor => {
                "Air quality is poor. Breathing discomfort to most people on prolonged exposure."
            }
            Self::VeryPoor => {
                "Air quality is very poor. Respiratory illness on prolonged exposure."
            }
            Self::Severe => concat!(
                "Air quality is severe. Affects healthy people and seriously impacts those ",
                "with existing diseases."
            ),
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Category, style tag and advice for one AQI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: AqiCategory,
    pub label: &'static str,
    pub severity_tag: &'static str,
    pub advice: &'static str,
}

impl From<AqiCategory> for Classification {
    fn from(category: AqiCategory) -> Self {
        Self {
            category,
            label: category.label(),
            severity_tag: category.style_tag(),
            advice: category.advice(),
        }
    }
}

/// Classify an AQI value into its severity tier
///
/// # Example
///
/// ```rust
/// use aqi_estimator::{AqiCategory, classify};
///
/// assert_eq!(classify(50.0).category, AqiCategory::Good);
/// assert_eq!(classify(50.0001).label, "Satisfactory");
/// ```
#[must_use]
pub fn classify(aqi: f64) -> Classification {
    AqiCategory::from_aqi(aqi).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_debug_snapshot;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, AqiCategory::Good)]
    #[case(50.0, AqiCategory::Good)]
    #[case(50.0001, AqiCategory::Satisfactory)]
    #[case(100.0, AqiCategory::Satisfactory)]
    #[case(100.0001, AqiCategory::Moderate)]
    #[case(200.0, AqiCategory::Moderate)]
    #[case(200.0001, AqiCategory::Poor)]
    #[case(300.0, AqiCategory::Poor)]
    #[case(300.0001, AqiCategory::VeryPoor)]
    #[case(400.0, AqiCategory::VeryPoor)]
    #[case(400.0001, AqiCategory::Severe)]
    #[case(500.0, AqiCategory::Severe)]
    #[case(-12.5, AqiCategory::Good)] // below scale -> first tier
    #[case(f64::MAX, AqiCategory::Severe)]
    #[case(f64::INFINITY, AqiCategory::Severe)]
    #[case(f64::NAN, AqiCategory::Severe)] // fails every <= check
    fn tier_boundaries(#[case] aqi: f64, #[case] expected: AqiCategory) {
        assert_eq!(classify(aqi).category, expected, "classify({aqi})");
    }

    #[rstest]
    #[case(AqiCategory::Good, "Good", "bg-success")]
    #[case(AqiCategory::Satisfactory, "Satisfactory", "bg-info")]
    #[case(AqiCategory::Moderate, "Moderate", "bg-warning")]
    #[case(AqiCategory::Poor, "Poor", "bg-orange")]
    #[case(AqiCategory::VeryPoor, "Very Poor", "bg-danger")]
    #[case(AqiCategory::Severe, "Severe", "bg-purple")]
    fn labels_and_tags(#[case] category: AqiCategory, #[case] label: &str, #[case] tag: &str) {
        assert_eq!(category.label(), label);
        assert_eq!(category.style_tag(), tag);
        assert!(category.advice().starts_with("Air quality is "));

        // JSON names a tier by its display label
        let json = serde_json::to_value(category).unwrap();
        assert_eq!(json, serde_json::json!(label));
        assert_eq!(serde_json::from_value::<AqiCategory>(json).unwrap(), category);
    }

    #[test]
    fn classification_snapshot() {
        let poor = classify(250.0);
        assert_debug_snapshot!((poor.category, poor.label, poor.severity_tag), @r#"
        (
            Poor,
            "Poor",
            "bg-orange",
        )
        "#);
        assert_eq!(
            poor.advice,
            "Air quality is poor. Breathing discomfort to most people on prolonged exposure."
        );
    }

    #[test]
    fn upper_bounds_ascend() {
        let bounds: Vec<f64> = AqiCategory::ALL
            .iter()
            .filter_map(|tier| tier.upper_bound())
            .collect();
        assert_eq!(bounds, vec![50.0, 100.0, 200.0, 300.0, 400.0]);
    }

    proptest! {
        #[test]
        fn classify_is_total(aqi in any::<f64>()) {
            let result = classify(aqi);
            prop_assert_eq!(result.label, result.category.label());
        }

        #[test]
        fn severity_is_monotonic(a in -100.0f64..1000.0, b in -100.0f64..1000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(lo).category <= classify(hi).category);
        }
    }
}
