//! Feature vector definition
//!
//! The estimator consumes the eight readings as a fixed-order array. The order of
//! [`Feature::ALL`] is the single name-to-position mapping shared by training,
//! the persisted model artifact and inference.

use serde::{Deserialize, Serialize};

use crate::error::{AqiError, Result};

/// Number of readings in a feature vector
pub const FEATURE_COUNT: usize = 8;

/// Canonical feature names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "PM2.5",
    "PM10",
    "NO2",
    "SO2",
    "CO",
    "O3",
    "Temperature",
    "Humidity",
];

/// One of the eight model inputs, serialized by its canonical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Fine particulate matter in μg/m³
    #[serde(rename = "PM2.5")]
    Pm25,
    /// Coarse particulate matter in μg/m³
    #[serde(rename = "PM10")]
    Pm10,
    /// Nitrogen dioxide in μg/m³
    #[serde(rename = "NO2")]
    No2,
    /// Sulphur dioxide in μg/m³
    #[serde(rename = "SO2")]
    So2,
    /// Carbon monoxide in mg/m³
    #[serde(rename = "CO")]
    Co,
    /// Ozone in μg/m³
    #[serde(rename = "O3")]
    O3,
    /// Air temperature in °C
    Temperature,
    /// Relative humidity in %
    Humidity,
}

impl Feature {
    /// All features in canonical order
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::Pm25,
        Self::Pm10,
        Self::No2,
        Self::So2,
        Self::Co,
        Self::O3,
        Self::Temperature,
        Self::Humidity,
    ];

    /// Position of this feature in the model input array
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical name, as persisted in the model artifact and CSV headers
    #[must_use]
    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Short lowercase key accepted from form-style input
    #[must_use]
    pub fn form_key(self) -> &'static str {
        match self {
            Self::Pm25 => "pm25",
            Self::Pm10 => "pm10",
            Self::No2 => "no2",
            Self::So2 => "so2",
            Self::Co => "co",
            Self::O3 => "o3",
            Self::Temperature => "temp",
            Self::Humidity => "humidity",
        }
    }

    /// Range the reading is expected to fall in. Not enforced.
    #[must_use]
    pub fn expected_range(self) -> (f64, f64) {
        match self {
            Self::Pm25 | Self::Pm10 => (0.0, 500.0),
            Self::No2 | Self::O3 => (0.0, 200.0),
            Self::So2 => (0.0, 100.0),
            Self::Co => (0.0, 10.0),
            Self::Temperature => (10.0, 40.0),
            Self::Humidity => (20.0, 90.0),
        }
    }

    /// Look up a feature by canonical name or form key (ASCII case-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|feature| {
            feature.name().eq_ignore_ascii_case(name)
                || feature.form_key().eq_ignore_ascii_case(name)
        })
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight readings consumed by the estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "PM2.5")]
    pub pm2_5: f64,
    #[serde(rename = "PM10")]
    pub pm10: f64,
    #[serde(rename = "NO2")]
    pub no2: f64,
    #[serde(rename = "SO2")]
    pub so2: f64,
    #[serde(rename = "CO")]
    pub co: f64,
    #[serde(rename = "O3")]
    pub o3: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
}

impl FeatureVector {
    /// Build from values given in canonical order
    #[must_use]
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [pm2_5, pm10, no2, so2, co, o3, temperature, humidity] = values;
        Self {
            pm2_5,
            pm10,
            no2,
            so2,
            co,
            o3,
            temperature,
            humidity,
        }
    }

    /// Values in canonical order
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.pm2_5,
            self.pm10,
            self.no2,
            self.so2,
            self.co,
            self.o3,
            self.temperature,
            self.humidity,
        ]
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.to_array()[feature.index()]
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::Pm25 => &mut self.pm2_5,
            Feature::Pm10 => &mut self.pm10,
            Feature::No2 => &mut self.no2,
            Feature::So2 => &mut self.so2,
            Feature::Co => &mut self.co,
            Feature::O3 => &mut self.o3,
            Feature::Temperature => &mut self.temperature,
            Feature::Humidity => &mut self.humidity,
        };
        *slot = value;
    }

    /// Parse a feature vector from named text readings
    ///
    /// Keys may be canonical names (`PM2.5`) or form keys (`pm25`). Unknown keys
    /// are ignored; a repeated key keeps its last value, and only that value is
    /// parsed. Features are checked in canonical order and the first problem is
    /// reported.
    ///
    /// # Errors
    ///
    /// * `AqiError::MissingFeature` - A feature is absent
    /// * `AqiError::InvalidInput` - A value is not a finite real number
    pub fn from_fields<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw: [Option<V>; FEATURE_COUNT] = std::array::from_fn(|_| None);
        for (key, value) in fields {
            if let Some(feature) = Feature::from_name(key.as_ref()) {
                raw[feature.index()] = Some(value);
            }
        }

        let mut out = [0.0; FEATURE_COUNT];
        for feature in Feature::ALL {
            let value = raw[feature.index()]
                .as_ref()
                .ok_or_else(|| AqiError::MissingFeature(feature.name().to_string()))?;
            out[feature.index()] = parse_reading(feature, value.as_ref())?;
        }
        Ok(Self::from_array(out))
    }

    /// Check that every reading is finite
    ///
    /// # Errors
    ///
    /// * `AqiError::InvalidInput` - First non-finite reading in canonical order
    pub fn validate(&self) -> Result<()> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            if !value.is_finite() {
                return Err(AqiError::invalid_input(feature.name(), &value.to_string()));
            }
        }
        Ok(())
    }

    /// Features whose reading lies outside [`Feature::expected_range`]
    #[must_use]
    pub fn out_of_range(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|&feature| {
                let (lo, hi) = feature.expected_range();
                let value = self.get(feature);
                !(lo..=hi).contains(&value)
            })
            .collect()
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_array(values)
    }
}

fn parse_reading(feature: Feature, raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AqiError::invalid_input(feature.name(), raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(skip: Option<&str>) -> Vec<(&'static str, &'static str)> {
        [
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
        .filter(|(key, _)| Some(*key) != skip)
        .collect()
    }

    #[test]
    fn canonical_order_is_stable() {
        for (position, feature) in Feature::ALL.into_iter().enumerate() {
            assert_eq!(feature.index(), position);
            assert_eq!(feature.name(), FEATURE_NAMES[position]);
        }
    }

    #[rstest]
    #[case("PM2.5", Some(Feature::Pm25))]
    #[case("pm25", Some(Feature::Pm25))]
    #[case("pm2.5", Some(Feature::Pm25))]
    #[case(" temp ", Some(Feature::Temperature))]
    #[case("Temperature", Some(Feature::Temperature))]
    #[case("HUMIDITY", Some(Feature::Humidity))]
    #[case("CO2", None)]
    #[case("", None)]
    fn from_name_cases(#[case] name: &str, #[case] expected: Option<Feature>) {
        assert_eq!(Feature::from_name(name), expected);
    }

    #[test]
    fn parse_form_fields() {
        let fv = FeatureVector::from_fields(form(None)).unwrap();
        assert_eq!(
            fv.to_array(),
            [10.0, 20.0, 10.0, 5.0, 1.0, 10.0, 25.0, 50.0]
        );
    }

    #[test]
    fn parse_ignores_unknown_keys() {
        let mut fields = form(None);
        fields.push(("city", "Hyderabad"));
        assert!(FeatureVector::from_fields(fields).is_ok());
    }

    #[rstest]
    #[case("pm25", "PM2.5")]
    #[case("pm10", "PM10")]
    #[case("no2", "NO2")]
    #[case("so2", "SO2")]
    #[case("co", "CO")]
    #[case("o3", "O3")]
    #[case("temp", "Temperature")]
    #[case("humidity", "Humidity")]
    fn missing_field_is_reported(#[case] skip: &str, #[case] name: &str) {
        let err = FeatureVector::from_fields(form(Some(skip))).unwrap_err();
        assert_eq!(err, AqiError::MissingFeature(name.to_string()));
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    #[case("12,5")]
    #[case("NaN")]
    #[case("inf")]
    fn invalid_value_is_reported(#[case] raw: &str) {
        let mut fields = form(Some("co"));
        fields.push(("co", raw));
        let err = FeatureVector::from_fields(fields).unwrap_err();
        assert_eq!(err, AqiError::invalid_input("CO", raw));
    }

    #[rstest]
    #[case::bad_then_good(&["abc", "10"], Ok(10.0))]
    #[case::good_then_bad(&["10", "abc"], Err(AqiError::invalid_input("PM2.5", "abc")))]
    #[case::twice_good(&["10", "12.5"], Ok(12.5))]
    fn repeated_key_keeps_last_value(
        #[case] values: &[&'static str],
        #[case] expected: Result<f64>,
    ) {
        let mut fields = form(Some("pm25"));
        for &value in values {
            fields.push(("pm25", value));
        }
        let parsed = FeatureVector::from_fields(fields).map(|fv| fv.pm2_5);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn canonical_name_and_form_key_are_the_same_field() {
        let mut fields = form(None);
        fields.push(("PM2.5", "oops"));
        fields.push(("pm25", "42"));
        assert_eq!(FeatureVector::from_fields(fields).unwrap().pm2_5, 42.0);
    }

    #[test]
    fn missing_field_wins_over_later_invalid_field() {
        let mut fields = form(Some("pm10"));
        fields.retain(|(key, _)| *key != "co");
        fields.push(("co", "abc"));
        assert_eq!(
            FeatureVector::from_fields(fields).unwrap_err(),
            AqiError::MissingFeature("PM10".into())
        );
    }

    #[rstest]
    #[case(Feature::Pm25, "PM2.5")]
    #[case(Feature::Pm10, "PM10")]
    #[case(Feature::No2, "NO2")]
    #[case(Feature::So2, "SO2")]
    #[case(Feature::Co, "CO")]
    #[case(Feature::O3, "O3")]
    #[case(Feature::Temperature, "Temperature")]
    #[case(Feature::Humidity, "Humidity")]
    fn feature_json_uses_canonical_name(#[case] feature: Feature, #[case] name: &str) {
        let json = serde_json::to_value(feature).unwrap();
        assert_eq!(json, serde_json::json!(name));
        assert_eq!(json, serde_json::json!(feature.name()));
        assert_eq!(serde_json::from_value::<Feature>(json).unwrap(), feature);
    }

    #[test]
    fn get_and_set_follow_canonical_order() {
        let mut fv = FeatureVector::from_array([0.0; FEATURE_COUNT]);
        for feature in Feature::ALL {
            fv.set(feature, feature.index() as f64);
        }
        assert_eq!(fv.to_array(), [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(fv.get(Feature::O3), 5.0);
    }

    #[test]
    fn out_of_range_is_informational() {
        let fv = FeatureVector::from_array([10.0, 20.0, 10.0, 5.0, 1.0, 10.0, 45.0, 10.0]);
        assert_eq!(fv.out_of_range(), vec![Feature::Temperature, Feature::Humidity]);
        assert!(fv.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_finite() {
        let fv = FeatureVector::from_array([1.0, 1.0, f64::NAN, 1.0, 1.0, 1.0, 20.0, 50.0]);
        assert!(matches!(
            fv.validate(),
            Err(AqiError::InvalidInput { ref field, .. }) if field == "NO2"
        ));
    }

    #[test]
    fn serializes_with_canonical_names() {
        let fv = FeatureVector::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let json = serde_json::to_value(fv).unwrap();
        assert_eq!(json["PM2.5"], 1.0);
        assert_eq!(json["Humidity"], 8.0);
    }
}
