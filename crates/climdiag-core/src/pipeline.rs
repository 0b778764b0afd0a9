//! Jet-latitude diagnostic orchestrator.
//!
//! Pipeline order per dataset alias:
//!   1. Temporal filter of the zonal wind
//!   2. Jet extraction (peak wind, latitude of peak)
//!   3. For wind and latitude separately: climatology, day-of-year anomaly,
//!      seasonal residuals, per-season density estimate

use std::collections::BTreeMap;

#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::anomaly::{day_of_year_anomaly, seasonal_residuals};
use crate::calendar::Season;
use crate::climatology::{Climatology, ClimatologyBuilder};
use crate::config::{DensityInput, DiagnosticConfig};
use crate::density::{DensityEstimate, DensityEstimator};
use crate::error::Result;
use crate::filter::TemporalFilter;
use crate::jet::extract_jet;
use crate::series::GriddedSeries;

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Everything derived from one jet variable (wind or latitude).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableResult {
    pub series: GriddedSeries,
    pub climatology: Climatology,
    /// `series` minus its smoothed day-of-year climatology.
    pub anomaly: GriddedSeries,
    pub densities: BTreeMap<Season, DensityEstimate>,
}

/// Output of one alias, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JetLatitudeResult {
    pub alias: String,
    pub wind: VariableResult,
    pub latitude: VariableResult,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JetLatitudeDiagnostic {
    filter: TemporalFilter,
    climatology: ClimatologyBuilder,
    density: DensityEstimator,
    density_input: DensityInput,
}

impl JetLatitudeDiagnostic {
    pub fn new(config: &DiagnosticConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: config.filter.build()?,
            climatology: ClimatologyBuilder::new(config.n_harmonics)?,
            density: config.density,
            density_input: config.density_input,
        })
    }

    pub fn filter(&self) -> &TemporalFilter {
        &self.filter
    }

    /// Run the full pipeline on the zonal wind `ua` of one alias.
    pub fn run(&self, alias: &str, ua: &GriddedSeries) -> Result<JetLatitudeResult> {
        let _span = tracing::info_span!("jet_latitude", alias).entered();
        tracing::info!(shape = ?ua.shape(), "processing");

        let filtered = self.filter.apply(ua)?;
        let jet = extract_jet(&filtered)?;
        drop(filtered);

        let wind = self.analyse(jet.wind)?;
        let latitude = self.analyse(jet.latitude)?;

        tracing::info!(
            wind_seasons = wind.densities.len(),
            latitude_seasons = latitude.densities.len(),
            "done"
        );
        Ok(JetLatitudeResult {
            alias: alias.to_string(),
            wind,
            latitude,
        })
    }

    /// Climatology, anomaly and seasonal densities of one derived series.
    pub fn analyse(&self, series: GriddedSeries) -> Result<VariableResult> {
        let climatology = self.climatology.build(&series)?;
        let anomaly = day_of_year_anomaly(&series, &climatology.day_of_year)?;
        tracing::debug!(variable = series.name(), anomaly = %anomaly.summary(), "anomaly");

        let residuals = seasonal_residuals(&series, &climatology.seasonal)?;
        let mut densities = BTreeMap::new();
        for (season, samples) in &residuals.seasons {
            let input = match self.density_input {
                DensityInput::Residual => &samples.residual,
                DensityInput::Absolute => &samples.absolute,
            };
            tracing::debug!(variable = series.name(), %season, samples = input.len(), "density");
            densities.insert(*season, self.density.estimate(input)?);
        }

        Ok(VariableResult {
            series,
            climatology,
            anomaly,
            densities,
        })
    }

    /// Run independent aliases; one failure never affects the others.
    /// With the `threading` feature the aliases run in parallel.
    pub fn run_batch(&self, inputs: &[(String, GriddedSeries)]) -> Vec<(String, Result<JetLatitudeResult>)> {
        let run_one = |(alias, ua): &(String, GriddedSeries)| {
            let result = self.run(alias, ua);
            if let Err(e) = &result {
                tracing::error!(alias = alias.as_str(), error = %e, "alias failed");
            }
            (alias.clone(), result)
        };

        #[cfg(feature = "threading")]
        let results: Vec<_> = inputs.par_iter().map(run_one).collect();
        #[cfg(not(feature = "threading"))]
        let results: Vec<_> = inputs.iter().map(run_one).collect();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterSpec;
    use crate::synthetic::SyntheticJet;

    fn small_config() -> DiagnosticConfig {
        DiagnosticConfig {
            filter: FilterSpec::Lanczos { window: 11, cutoff: 0.2 },
            ..Default::default()
        }
    }

    #[test]
    fn synthetic_alias_produces_four_seasons() {
        let ua = SyntheticJet { n_days: 2 * 365, n_lon: 2, ..Default::default() }
            .generate()
            .unwrap();
        let diag = JetLatitudeDiagnostic::new(&small_config()).unwrap();
        let res = diag.run("synthetic", &ua).unwrap();

        assert_eq!(res.alias, "synthetic");
        assert_eq!(res.latitude.series.shape(), vec![2 * 365, 2]);
        assert_eq!(res.latitude.anomaly.shape(), res.latitude.series.shape());
        assert_eq!(res.latitude.densities.len(), 4);
        assert_eq!(res.wind.densities.len(), 4);
        for d in res.latitude.densities.values() {
            assert_eq!(d.kde.points.len(), 100);
        }
    }

    #[test]
    fn batch_isolates_failures() {
        let good = SyntheticJet { n_days: 365, n_lon: 1, ..Default::default() }
            .generate()
            .unwrap();
        // Too short for a full day-of-year climatology.
        let short = SyntheticJet { n_days: 40, n_lon: 1, ..Default::default() }
            .generate()
            .unwrap();
        let diag = JetLatitudeDiagnostic::new(&small_config()).unwrap();
        let out = diag.run_batch(&[("good".into(), good), ("short".into(), short)]);
        assert_eq!(out.len(), 2);
        assert!(out[0].1.is_ok());
        assert!(out[1].1.is_err());
    }
}
