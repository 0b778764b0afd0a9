/// Command-line front end for the climdiag diagnostics.
///
/// Series are exchanged as `GriddedSeries` JSON documents; loading native
/// gridded formats and drawing figures are left to external tools.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use climdiag_core::config::{DensityInput, FilterSpec};
use climdiag_core::filter::{lanczos_bandpass_weights, lanczos_weights};
use climdiag_core::pet::{debruin_pet, PetConstants, PetUnits};
use climdiag_core::synthetic::SyntheticJet;
use climdiag_core::{DiagnosticConfig, GriddedSeries, JetLatitudeDiagnostic};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "climdiag", about = "Jet-latitude and potential evapotranspiration diagnostics")]
struct Args {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Jet latitude climatology and seasonal densities for one or more aliases.
    JetLatitude {
        /// Zonal-wind series JSON files; the file stem is the alias.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Diagnostic config JSON (defaults apply to missing fields).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON array of precomputed filter weights; overrides the config filter.
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Histogram bin width.
        #[arg(long)]
        bin_width: Option<f64>,

        /// Feed absolute values instead of seasonal residuals to the densities.
        #[arg(long)]
        absolute: bool,

        /// Output directory for `<alias>_jet_latitude.json`.
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },

    /// De Bruin (2016) potential evapotranspiration.
    Pet {
        #[arg(long)]
        psl: PathBuf,
        #[arg(long)]
        rsds: PathBuf,
        #[arg(long)]
        rsdt: PathBuf,
        #[arg(long)]
        tas: PathBuf,
        /// Units of tas: K or degC.
        #[arg(long, default_value = "K")]
        tas_units: String,
        /// Units of psl: Pa or hPa.
        #[arg(long, default_value = "Pa")]
        psl_units: String,
        /// Output series JSON.
        #[arg(short, long, default_value = "evspsblpot.json")]
        output: PathBuf,
    },

    /// Write a synthetic zonal-wind series with a meandering jet.
    Synth {
        #[arg(long, default_value = "42")]
        seed: u64,
        #[arg(long, default_value = "1979-01-01")]
        start: NaiveDate,
        #[arg(long, default_value = "1461")]
        days: usize,
        #[arg(long, default_value = "4")]
        longitudes: usize,
        #[arg(short, long, default_value = "synthetic.json")]
        output: PathBuf,
    },

    /// Print Lanczos filter weights as a JSON array.
    Lanczos {
        /// Kernel length (odd).
        #[arg(long, default_value = "61")]
        window: usize,
        /// Low-pass cutoff in cycles per step.
        #[arg(long, default_value = "0.1")]
        cutoff: f64,
        /// Upper cutoff; turns the kernel into a band-pass between the two.
        #[arg(long)]
        high: Option<f64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    match args.command {
        Command::JetLatitude {
            inputs,
            config,
            weights,
            bin_width,
            absolute,
            output,
        } => run_jet_latitude(&inputs, config.as_deref(), weights.as_deref(), bin_width, absolute, &output),
        Command::Pet {
            psl,
            rsds,
            rsdt,
            tas,
            tas_units,
            psl_units,
            output,
        } => run_pet(&psl, &rsds, &rsdt, &tas, &tas_units, &psl_units, &output),
        Command::Synth {
            seed,
            start,
            days,
            longitudes,
            output,
        } => {
            let synth = SyntheticJet {
                seed,
                start,
                n_days: days,
                n_lon: longitudes,
                ..Default::default()
            };
            let series = synth.generate()?;
            write_json(&output, &series)?;
            info!(path = %output.display(), shape = ?series.shape(), "synthetic series written");
            Ok(())
        }
        Command::Lanczos { window, cutoff, high } => {
            let w = match high {
                Some(high) => lanczos_bandpass_weights(window, cutoff, high)?,
                None => lanczos_weights(window, cutoff)?,
            };
            println!("{}", serde_json::to_string(&w)?);
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_jet_latitude(
    inputs: &[PathBuf],
    config_path: Option<&Path>,
    weights_path: Option<&Path>,
    bin_width: Option<f64>,
    absolute: bool,
    output: &Path,
) -> Result<()> {
    let mut config = match config_path {
        Some(p) => {
            let text = fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?;
            DiagnosticConfig::from_json(&text)?
        }
        None => DiagnosticConfig::default(),
    }
    .with_env()?;

    if let Some(p) = weights_path {
        let weights: Vec<f64> = read_json(p)?;
        config.filter = FilterSpec::Weights { weights };
    }
    if let Some(w) = bin_width {
        config.density.bin_width = w;
    }
    if absolute {
        config.density_input = DensityInput::Absolute;
    }

    let diag = JetLatitudeDiagnostic::new(&config)?;
    info!(kernel = diag.filter().len(), aliases = inputs.len(), "jet latitude diagnostic");

    let mut batch = Vec::with_capacity(inputs.len());
    for path in inputs {
        let alias = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("no alias in {}", path.display()))?
            .to_string();
        let series: GriddedSeries = read_json(path)?;
        batch.push((alias, series));
    }

    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;

    let mut failed = Vec::new();
    for (alias, result) in diag.run_batch(&batch) {
        match result {
            Ok(res) => {
                let path = output.join(format!("{alias}_jet_latitude.json"));
                write_json(&path, &res)?;
                info!(alias = alias.as_str(), path = %path.display(), "written");
            }
            Err(e) => failed.push(format!("{alias}: {e}")),
        }
    }

    if !failed.is_empty() {
        bail!("{} of {} aliases failed:\n  {}", failed.len(), batch.len(), failed.join("\n  "));
    }
    Ok(())
}

fn run_pet(
    psl: &Path,
    rsds: &Path,
    rsdt: &Path,
    tas: &Path,
    tas_units: &str,
    psl_units: &str,
    output: &Path,
) -> Result<()> {
    let units = PetUnits::from_strings(tas_units, psl_units)?;
    let psl: GriddedSeries = read_json(psl)?;
    let rsds: GriddedSeries = read_json(rsds)?;
    let rsdt: GriddedSeries = read_json(rsdt)?;
    let tas: GriddedSeries = read_json(tas)?;

    let pet = debruin_pet(&psl, &rsds, &rsdt, &tas, &PetConstants::default(), &units)?;
    info!(summary = %pet.summary(), "PET computed");
    write_json(output, &pet)
}

// ── JSON helpers ──────────────────────────────────────────────────────────────

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
