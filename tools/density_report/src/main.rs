//! Per-season summary of jet-latitude diagnostic output.
//! Reads `<alias>_jet_latitude.json` files written by `climdiag jet-latitude`,
//! rebuilds the seasonal samples from the stored series and climatology, and
//! reports n/mean/std/p10/p90 plus the KDE mode for wind and latitude.
//! The KDE is refitted on the summarised samples, so the mode stays on the
//! same axis as the other columns whichever density input the run used.
//! Optional output: one summary JSON per alias.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use climdiag_core::anomaly::seasonal_residuals;
use climdiag_core::calendar::Season;
use climdiag_core::density::{DensityEstimate, DensityEstimator};
use climdiag_core::pipeline::VariableResult;
use climdiag_core::JetLatitudeResult;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "density_report", about = "Summarise seasonal jet densities per alias")]
struct Args {
    /// Diagnostic result JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Summarise absolute samples instead of seasonal residuals.
    #[arg(long)]
    absolute: bool,

    /// Directory for `<alias>_summary.json` files.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ── Output types ──────────────────────────────────────────────────────────────

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
struct SeasonStats {
    n: usize,
    mean: f64,
    std: f64,
    p10: f64,
    p90: f64,
    /// Location of the KDE maximum.
    mode: f64,
}

#[derive(Serialize, Debug)]
struct AliasSummary {
    alias: String,
    wind: BTreeMap<Season, SeasonStats>,
    latitude: BTreeMap<Season, SeasonStats>,
}

// ── Statistics ────────────────────────────────────────────────────────────────

fn sample_stats(samples: &[f64], density: &DensityEstimate) -> Option<SeasonStats> {
    let mut valid: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let std = (valid.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    valid.sort_by(|a, b| a.total_cmp(b));
    let p10 = valid[((valid.len() - 1) as f64 * 0.1) as usize];
    let p90 = valid[((valid.len() - 1) as f64 * 0.9) as usize];
    Some(SeasonStats {
        n: valid.len(),
        mean,
        std,
        p10,
        p90,
        mode: kde_mode(density),
    })
}

fn kde_mode(density: &DensityEstimate) -> f64 {
    density
        .kde
        .points
        .iter()
        .zip(&density.kde.density)
        .fold((f64::NAN, f64::NEG_INFINITY), |(bx, by), (&x, &y)| if y > by { (x, y) } else { (bx, by) })
        .0
}

fn variable_stats(var: &VariableResult, absolute: bool) -> Result<BTreeMap<Season, SeasonStats>> {
    let residuals = seasonal_residuals(&var.series, &var.climatology.seasonal)
        .with_context(|| format!("rebuilding seasonal samples of `{}`", var.series.name()))?;
    let estimator = DensityEstimator::default();
    let mut out = BTreeMap::new();
    for (season, samples) in &residuals.seasons {
        let input = if absolute { &samples.absolute } else { &samples.residual };
        let density = match estimator.estimate(input) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Warning: `{}` {}: {}, skipping", var.series.name(), season, e);
                continue;
            }
        };
        if let Some(s) = sample_stats(input, &density) {
            out.insert(*season, s);
        }
    }
    Ok(out)
}

fn summarise(result: &JetLatitudeResult, absolute: bool) -> Result<AliasSummary> {
    Ok(AliasSummary {
        alias: result.alias.clone(),
        wind: variable_stats(&result.wind, absolute)?,
        latitude: variable_stats(&result.latitude, absolute)?,
    })
}

fn print_table(summary: &AliasSummary) {
    eprintln!("\n{}", summary.alias);
    eprintln!(
        "{:<10} {:<6} {:>7} {:>9} {:>8} {:>9} {:>9} {:>9}",
        "Variable", "Season", "N", "Mean", "Std", "P10", "P90", "Mode"
    );
    eprintln!("{}", "-".repeat(75));
    for (name, table) in [("ua_max", &summary.wind), ("jet_lat", &summary.latitude)] {
        for (season, s) in table {
            eprintln!(
                "{:<10} {:<6} {:>7} {:>9.3} {:>8.3} {:>9.3} {:>9.3} {:>9.3}",
                name, season.label(), s.n, s.mean, s.std, s.p10, s.p90, s.mode
            );
        }
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn load(path: &Path) -> Result<JetLatitudeResult> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(dir) = &args.output {
        fs::create_dir_all(dir)?;
    }

    for path in &args.inputs {
        let result = load(path)?;
        let summary = summarise(&result, args.absolute)?;
        print_table(&summary);

        if let Some(dir) = &args.output {
            let out_path = dir.join(format!("{}_summary.json", summary.alias));
            fs::write(&out_path, serde_json::to_string_pretty(&summary)?)?;
            eprintln!("  -> {}", out_path.display());
        }
    }

    eprintln!("\nDone. {} aliases summarised.", args.inputs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use climdiag_core::config::FilterSpec;
    use climdiag_core::density::DensityEstimator;
    use climdiag_core::synthetic::SyntheticJet;
    use climdiag_core::{DiagnosticConfig, JetLatitudeDiagnostic};

    #[test]
    fn test_sample_stats_percentiles() {
        let samples: Vec<f64> = (0..=100).map(|v| v as f64).collect();
        let d = DensityEstimator::default().estimate(&samples).unwrap();
        let s = sample_stats(&samples, &d).unwrap();
        assert_eq!(s.n, 101);
        assert!((s.mean - 50.0).abs() < 1e-12);
        assert_eq!(s.p10, 10.0);
        assert_eq!(s.p90, 90.0);
        assert!(s.mode > 10.0 && s.mode < 90.0, "mode {}", s.mode);
    }

    #[test]
    fn test_sample_stats_ignores_nan() {
        let samples = vec![1.0, f64::NAN, 3.0, 2.0];
        let d = DensityEstimator::default().estimate(&samples).unwrap();
        let s = sample_stats(&samples, &d).unwrap();
        assert_eq!(s.n, 3);
        assert!((s.mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_covers_all_seasons() {
        let ua = SyntheticJet { n_days: 2 * 365, n_lon: 1, ..Default::default() }
            .generate()
            .unwrap();
        let config = DiagnosticConfig {
            filter: FilterSpec::Lanczos { window: 11, cutoff: 0.2 },
            ..Default::default()
        };
        let result = JetLatitudeDiagnostic::new(&config).unwrap().run("synthetic", &ua).unwrap();
        let summary = summarise(&result, false).unwrap();
        assert_eq!(summary.latitude.len(), 4);
        assert_eq!(summary.wind.len(), 4);
        for s in summary.latitude.values() {
            assert!(s.p10 <= s.p90);
            assert!(s.std > 0.0);
        }
    }

    #[test]
    fn test_absolute_mode_sits_on_the_absolute_axis() {
        let ua = SyntheticJet { n_days: 2 * 365, n_lon: 1, ..Default::default() }
            .generate()
            .unwrap();
        // Residual densities stored, absolute samples summarised.
        let config = DiagnosticConfig {
            filter: FilterSpec::Lanczos { window: 11, cutoff: 0.2 },
            ..Default::default()
        };
        let result = JetLatitudeDiagnostic::new(&config).unwrap().run("synthetic", &ua).unwrap();
        let summary = summarise(&result, true).unwrap();
        assert_eq!(summary.latitude.len(), 4);
        for (season, s) in &summary.latitude {
            assert!(s.mean > 15.0 && s.mean < 75.0, "{season}: mean {}", s.mean);
            assert!(s.mode > 15.0 && s.mode < 75.0, "{season}: mode {} off the latitude axis", s.mode);
        }
    }
}
