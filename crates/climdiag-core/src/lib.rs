//! Climate diagnostics: jet-latitude climatology and De Bruin (2016) PET.
//!
//! The jet-latitude chain runs
//!   [`filter`] → [`jet`] → [`climatology`] → [`anomaly`] → [`density`],
//! orchestrated per dataset alias by [`pipeline::JetLatitudeDiagnostic`].
//! [`pet`] is an independent elementwise formula.

pub mod anomaly;
pub mod calendar;
pub mod climatology;
pub mod config;
pub mod density;
pub mod error;
pub mod filter;
pub mod jet;
pub mod pet;
pub mod pipeline;
pub mod series;
pub mod synthetic;

pub use config::DiagnosticConfig;
pub use error::{DiagError, Result};
pub use pipeline::{JetLatitudeDiagnostic, JetLatitudeResult};
pub use series::{Coordinate, Dimension, GriddedSeries};
