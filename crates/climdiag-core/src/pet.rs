//! Potential evapotranspiration after De Bruin et al. (2016), equation 6.
//!
//! De Bruin, H. A. R., Trigo, I. F., Bosveld, F. C., Meirink, J. F.: A
//! Thermodynamically Based Model for Actual Evapotranspiration of an Extensive
//! Grass Field Close to FAO Reference, Suitable for Remote Sensing Application,
//! J. Hydrometeor., 17, 1373-1382, doi:10.1175/JHM-D-15-0006.1, 2016.

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};
use crate::series::GriddedSeries;

/// Physical and empirical constants of the formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetConstants {
    /// Tetens empirical constant a (dimensionless).
    pub tetens_a: f64,
    /// Tetens empirical constant b (°C).
    pub tetens_b: f64,
    /// Saturation vapour pressure at 0 °C (hPa).
    pub e0: f64,
    /// Gas constant of water vapour (J K-1 kg-1).
    pub rv: f64,
    /// Gas constant of dry air (J K-1 kg-1).
    pub rd: f64,
    /// Latent heat of vaporisation (J kg-1).
    pub lambda: f64,
    /// Specific heat of dry air at constant pressure (J K-1 kg-1).
    pub cp: f64,
    /// Correction constant (W m-2).
    pub beta: f64,
    /// Empirical constant Cs (W m-2).
    pub cs: f64,
    /// Fraction of incoming shortwave kept after albedo (1 - 0.23).
    pub net_shortwave_fraction: f64,
}

impl Default for PetConstants {
    fn default() -> Self {
        Self {
            tetens_a: 17.67,
            tetens_b: 243.5,
            e0: 6.112,
            rv: 461.51,
            rd: 287.0,
            lambda: 2.5e6,
            cp: 1004.0,
            beta: 20.0,
            cs: 110.0,
            net_shortwave_fraction: 1.0 - 0.23,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Kelvin,
    Celsius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    #[default]
    Pa,
    #[serde(rename = "hpa")]
    HPa,
}

/// Units of the incoming `tas` and `psl` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PetUnits {
    pub tas: TemperatureUnit,
    pub psl: PressureUnit,
}

impl PetUnits {
    pub fn from_strings(tas: &str, psl: &str) -> Result<Self> {
        let tas = match tas {
            "K" | "k" | "kelvin" => TemperatureUnit::Kelvin,
            "degC" | "C" | "celsius" => TemperatureUnit::Celsius,
            other => return Err(DiagError::InvalidConfig(format!("unsupported temperature unit `{other}`"))),
        };
        let psl = match psl {
            "Pa" | "pa" => PressureUnit::Pa,
            "hPa" | "hpa" | "mbar" => PressureUnit::HPa,
            other => return Err(DiagError::InvalidConfig(format!("unsupported pressure unit `{other}`"))),
        };
        Ok(Self { tas, psl })
    }

    fn tas_celsius(&self, v: f64) -> f64 {
        match self.tas {
            TemperatureUnit::Kelvin => v - 273.15,
            TemperatureUnit::Celsius => v,
        }
    }

    fn psl_hpa(&self, v: f64) -> f64 {
        match self.psl {
            PressureUnit::Pa => v / 100.0,
            PressureUnit::HPa => v,
        }
    }
}

/// Derivative of Tetens' saturation vapour pressure, des/dT in hPa °C-1.
pub fn tetens_derivative(tas_c: f64, c: &PetConstants) -> f64 {
    let denom = tas_c + c.tetens_b;
    c.tetens_a * c.tetens_b * c.e0 * (c.tetens_a * tas_c / denom).exp() / (denom * denom)
}

/// Reference evaporation at one point, kg m-2 s-1.
pub fn debruin_pet_point(psl_hpa: f64, rsds: f64, rsdt: f64, tas_c: f64, c: &PetConstants) -> f64 {
    let delta = tetens_derivative(tas_c, c);
    let gamma = c.rv / c.rd * c.cp * psl_hpa / c.lambda;
    let rad_term = c.net_shortwave_fraction * rsds - c.cs * rsds / rsdt;
    let ref_evap = delta / (delta + gamma) * rad_term + c.beta;
    ref_evap / c.lambda
}

/// Elementwise PET over four fields sharing dims and shape. The result keeps
/// the grid of `tas` and holds single-precision values.
pub fn debruin_pet(
    psl: &GriddedSeries,
    rsds: &GriddedSeries,
    rsdt: &GriddedSeries,
    tas: &GriddedSeries,
    constants: &PetConstants,
    units: &PetUnits,
) -> Result<GriddedSeries> {
    for other in [psl, rsds, rsdt] {
        if other.dims() != tas.dims() || other.shape() != tas.shape() {
            return Err(DiagError::ShapeMismatch(format!(
                "`{}` {:?} does not match `{}` {:?}",
                other.name(),
                other.shape(),
                tas.name(),
                tas.shape()
            )));
        }
    }

    let values = tas
        .values()
        .iter()
        .zip(psl.values())
        .zip(rsds.values())
        .zip(rsdt.values())
        .map(|(((&t, &p), &sd), &st)| {
            let pet = debruin_pet_point(units.psl_hpa(p), sd, st, units.tas_celsius(t), constants);
            f64::from(pet as f32)
        })
        .collect();

    tracing::debug!(points = tas.len(), "computed De Bruin PET");

    Ok(tas.with_values(values)?.renamed("evspsblpot", "kg m-2 s-1"))
}
