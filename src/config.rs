//! Processor configuration
//!
//! Every field has a default, so a JSON file only needs to list the values
//! it changes.

use crate::types::{AcError, AcResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SALINITY: f64 = 35.0;
pub const DEFAULT_TEMPERATURE: f64 = 15.0;
pub const DEFAULT_OZONE: f64 = 330.0;
pub const DEFAULT_SURFACE_PRESSURE: f64 = 1000.0;
pub const DEFAULT_TOSA_RATIO_THRESHOLDS: [f64; 2] = [0.95, 1.05];

// Open intervals accepted for scene constants
const SALINITY_RANGE: (f64, f64) = (0.000028, 43.0);
const TEMPERATURE_RANGE: (f64, f64) = (0.000111, 36.0);
const OZONE_RANGE: (f64, f64) = (0.0, 1000.0);
const PRESSURE_RANGE: (f64, f64) = (800.0, 1040.0);

/// Complete processor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Scene salinity (PSU)
    pub salinity: f64,
    /// Scene water temperature (°C)
    pub temperature: f64,
    /// Ozone (DU) used when no auxiliary data is available
    pub ozone: f64,
    /// Sea-level air pressure (hPa) used when no auxiliary data is available
    pub surface_pressure: f64,
    /// Bounds of the auto-associative TOSA ratio outside of which a pixel is out of scope
    pub tosa_ratio_thresholds: [f64; 2],
    /// Reference ozone optical depth subtracted before transmission
    pub model_ozone: f64,
    /// Local ancillary archive; enables time-dependent ozone and pressure
    pub atmospheric_auxdata_path: Option<PathBuf>,
    /// Download missing ancillary files into the archive
    pub download_ancillary: bool,
    /// Write remote-sensing reflectance (rhow / pi) instead of rhow
    pub output_as_rrs: bool,
    /// Also write TOSA input and reconstructed TOSA bands
    pub output_rtosa: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            salinity: DEFAULT_SALINITY,
            temperature: DEFAULT_TEMPERATURE,
            ozone: DEFAULT_OZONE,
            surface_pressure: DEFAULT_SURFACE_PRESSURE,
            tosa_ratio_thresholds: DEFAULT_TOSA_RATIO_THRESHOLDS,
            model_ozone: 0.0,
            atmospheric_auxdata_path: None,
            download_ancillary: true,
            output_as_rrs: false,
            output_rtosa: false,
        }
    }
}

impl ProcessorConfig {
    /// Read and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> AcResult<Self> {
        log::info!("Reading processor configuration: {}", path.as_ref().display());
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_json_str(&content)?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> AcResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AcResult<()> {
        check_open_interval("salinity", self.salinity, SALINITY_RANGE)?;
        check_open_interval("temperature", self.temperature, TEMPERATURE_RANGE)?;
        check_open_interval("ozone", self.ozone, OZONE_RANGE)?;
        check_open_interval("surface_pressure", self.surface_pressure, PRESSURE_RANGE)?;

        let [low, high] = self.tosa_ratio_thresholds;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(AcError::Configuration(format!(
                "tosa_ratio_thresholds must satisfy low < high, got [{}, {}]",
                low, high
            )));
        }
        if !self.model_ozone.is_finite() {
            return Err(AcError::Configuration("model_ozone must be finite".to_string()));
        }
        Ok(())
    }
}

/// Platform cache directory for downloaded ancillary files
pub fn default_auxdata_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("acnet")
        .join("auxdata")
}

fn check_open_interval(name: &str, value: f64, (min, max): (f64, f64)) -> AcResult<()> {
    if value > min && value < max {
        Ok(())
    } else {
        Err(AcError::Configuration(format!(
            "{} = {} is outside the valid interval ({}, {})",
            name, value, min, max
        )))
    }
}
