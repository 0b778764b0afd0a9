//! Configuration for the jet-latitude diagnostic.
//!
//! Every numeric knob of the pipeline is a plain value here; nothing is read
//! from fixed paths. Sources, later ones winning: defaults, a JSON document,
//! `CLIMDIAG_*` environment variables, then whatever the caller sets.

use serde::{Deserialize, Serialize};

use crate::climatology::DEFAULT_HARMONICS;
use crate::density::DensityEstimator;
use crate::error::{DiagError, Result};
use crate::filter::{lanczos_bandpass_weights, lanczos_weights, TemporalFilter};

/// How the temporal filter kernel is obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Precomputed weights.
    Weights { weights: Vec<f64> },
    /// Lanczos low-pass, `cutoff` in cycles per step.
    Lanczos { window: usize, cutoff: f64 },
    /// Lanczos band-pass between `low` and `high` cycles per step.
    LanczosBandpass { window: usize, low: f64, high: f64 },
}

impl Default for FilterSpec {
    /// 10-day low-pass over 61 daily weights.
    fn default() -> Self {
        FilterSpec::Lanczos { window: 61, cutoff: 0.1 }
    }
}

impl FilterSpec {
    pub fn build(&self) -> Result<TemporalFilter> {
        match self {
            FilterSpec::Weights { weights } => TemporalFilter::new(weights.clone()),
            FilterSpec::Lanczos { window, cutoff } => TemporalFilter::new(lanczos_weights(*window, *cutoff)?),
            FilterSpec::LanczosBandpass { window, low, high } => {
                TemporalFilter::new(lanczos_bandpass_weights(*window, *low, *high)?)
            }
        }
    }
}

/// Which per-season samples feed the density estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityInput {
    /// Samples minus their seasonal climatology.
    #[default]
    Residual,
    /// The samples themselves.
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    pub filter: FilterSpec,
    /// Fourier coefficients kept when smoothing the day-of-year climatology.
    pub n_harmonics: usize,
    pub density: DensityEstimator,
    pub density_input: DensityInput,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            filter: FilterSpec::default(),
            n_harmonics: DEFAULT_HARMONICS,
            density: DensityEstimator::default(),
            density_input: DensityInput::default(),
        }
    }
}

impl DiagnosticConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DiagError::InvalidConfig(format!("config JSON: {e}")))
    }

    /// Override fields from `CLIMDIAG_*` environment variables.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from any key/value source.
    pub fn with_vars<F>(mut self, get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("CLIMDIAG_BIN_WIDTH") {
            self.density.bin_width = parse_var("CLIMDIAG_BIN_WIDTH", &v)?;
        }
        if let Some(v) = get("CLIMDIAG_BANDWIDTH_SCALE") {
            self.density.bandwidth_scale = parse_var("CLIMDIAG_BANDWIDTH_SCALE", &v)?;
        }
        if let Some(v) = get("CLIMDIAG_KDE_POINTS") {
            self.density.n_points = parse_var("CLIMDIAG_KDE_POINTS", &v)?;
        }
        if let Some(v) = get("CLIMDIAG_HARMONICS") {
            self.n_harmonics = parse_var("CLIMDIAG_HARMONICS", &v)?;
        }
        if let Some(v) = get("CLIMDIAG_DENSITY_INPUT") {
            self.density_input = match v.to_ascii_lowercase().as_str() {
                "residual" => DensityInput::Residual,
                "absolute" => DensityInput::Absolute,
                other => {
                    return Err(DiagError::InvalidConfig(format!(
                        "CLIMDIAG_DENSITY_INPUT must be `residual` or `absolute`, got `{other}`"
                    )))
                }
            };
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_harmonics == 0 {
            return Err(DiagError::InvalidConfig("n_harmonics must be > 0".into()));
        }
        self.density.validate()?;
        self.filter.build().map(|_| ())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DiagError::InvalidConfig(format!("{key}: cannot parse `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let c = DiagnosticConfig::default();
        c.validate().unwrap();
        assert_eq!(c.n_harmonics, 3);
        assert_eq!(c.density.bin_width, 2.5);
        assert_eq!(c.density.n_points, 100);
        assert_eq!(c.filter.build().unwrap().len(), 61);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = DiagnosticConfig::from_json(
            r#"{ "filter": { "kind": "weights", "weights": [0.25, 0.5, 0.25] }, "density_input": "absolute" }"#,
        )
        .unwrap();
        assert_eq!(c.filter.build().unwrap().weights(), &[0.25, 0.5, 0.25]);
        assert_eq!(c.density_input, DensityInput::Absolute);
        assert_eq!(c.n_harmonics, 3);
    }

    #[test]
    fn vars_override_and_validate() {
        let vars: HashMap<&str, &str> = [("CLIMDIAG_BIN_WIDTH", "5"), ("CLIMDIAG_HARMONICS", "4")].into();
        let c = DiagnosticConfig::default()
            .with_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.density.bin_width, 5.0);
        assert_eq!(c.n_harmonics, 4);

        let bad: HashMap<&str, &str> = [("CLIMDIAG_KDE_POINTS", "many")].into();
        let err = DiagnosticConfig::default()
            .with_vars(|k| bad.get(k).map(|v| v.to_string()))
            .unwrap_err();
        assert!(matches!(err, DiagError::InvalidConfig(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut c = DiagnosticConfig::default();
        c.density.bin_width = 0.0;
        assert!(c.validate().is_err());

        let c = DiagnosticConfig {
            filter: FilterSpec::Weights { weights: vec![] },
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }
}
