use crate::types::{AcError, AcResult};
use serde::{Deserialize, Serialize};

/// Names of the retrieved inherent optical properties, in network output order
pub const IOP_NAMES: [&str; 5] = ["apig", "adet", "agelb", "bpart", "bwit"];

/// Resource paths of the three networks used per sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPaths {
    /// log(TOSA) -> log(rw)
    pub rtosa_rw: String,
    /// Auto-associative log(TOSA) reconstruction
    pub rtosa_aann: String,
    /// log(rw) -> log(IOP)
    pub rw_iop: String,
}

/// Per-sensor band tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    /// Band centre wavelengths (nm)
    pub wavelengths: Vec<u32>,
    /// Ozone absorption coefficient per band
    pub absorb_ozone: Vec<f64>,
    /// Number of log(rw) bands fed to the IOP network, counted from the first band
    pub iop_input_bands: usize,
    /// Solar flux per band for radiance input (mW/(m² sr nm))
    pub solar_flux: Option<Vec<f64>>,
    pub networks: NetworkPaths,
}

impl SensorConfig {
    /// VIIRS M1-M7 configuration
    pub fn viirs() -> Self {
        Self {
            name: "VIIRS".to_string(),
            wavelengths: vec![410, 443, 486, 551, 671, 745, 862],
            // 745nm adapted from the SeaWiFS 765nm value
            absorb_ozone: vec![0.0, 0.0027, 0.0205, 0.0898, 0.0463, 0.0095, 0.0],
            iop_input_bands: 6,
            solar_flux: None,
            networks: NetworkPaths {
                rtosa_aann: "viirs/coastcolour_atmo_press_20150221/rtoa_viirs_aaNN7/31x7x31_228.7.net".to_string(),
                rtosa_rw: "viirs/coastcolour_atmo_press_20150221/rtoa_rw_viirs_nn3/33x73x53x33_420666.6.net"
                    .to_string(),
                rw_iop: "viirs/coastcolour_wat_20140318/inv_viirs_logrw_logiop_20140318_noise_p5/87x77x37_15389.9.net"
                    .to_string(),
            },
        }
    }

    /// SeaWiFS configuration (radiance input)
    pub fn seawifs() -> Self {
        Self {
            name: "SeaWiFS".to_string(),
            wavelengths: vec![412, 443, 490, 510, 555, 670, 765, 865],
            absorb_ozone: vec![0.0, 0.0027, 0.0205, 0.0382, 0.0898, 0.0463, 0.0083, 0.0],
            iop_input_bands: 7,
            solar_flux: Some(vec![
                1735.518167,
                1858.404314,
                1981.076667,
                1881.566829,
                1874.005,
                1537.254783,
                1230.04,
                957.6122143,
            ]),
            networks: NetworkPaths {
                rtosa_aann: "seawifs/coastcolour_atmo_press_20150221/rtoa_seaw_aaNN7/31x7x31_215.9.net".to_string(),
                rtosa_rw: "seawifs/coastcolour_atmo_press_20150221/rtoa_rw_seaw_nn3/33x73x53x33_515179.0.net"
                    .to_string(),
                rw_iop: "seawifs/coastcolour_wat_20140318/inv_seawifs_logrw_logiop_20140318_noise_p5/87x77x37_14386.6.net"
                    .to_string(),
            },
        }
    }

    pub fn band_count(&self) -> usize {
        self.wavelengths.len()
    }

    /// Length of the atmosphere network input vector
    pub fn atmosphere_input_len(&self) -> usize {
        7 + self.band_count()
    }

    /// Length of the IOP network input vector
    pub fn iop_input_len(&self) -> usize {
        5 + self.iop_input_bands
    }

    pub fn validate(&self) -> AcResult<()> {
        if self.wavelengths.is_empty() {
            return Err(AcError::Configuration(format!("sensor {} has no bands", self.name)));
        }
        if self.absorb_ozone.len() != self.band_count() {
            return Err(AcError::Configuration(format!(
                "sensor {} has {} bands but {} ozone absorption coefficients",
                self.name,
                self.band_count(),
                self.absorb_ozone.len()
            )));
        }
        if self.iop_input_bands == 0 || self.iop_input_bands > self.band_count() {
            return Err(AcError::Configuration(format!(
                "sensor {} feeds {} bands to the IOP network, must be within 1..={}",
                self.name,
                self.iop_input_bands,
                self.band_count()
            )));
        }
        if let Some(flux) = &self.solar_flux {
            if flux.len() != self.band_count() {
                return Err(AcError::Configuration(format!(
                    "sensor {} has {} bands but {} solar flux values",
                    self.name,
                    self.band_count(),
                    flux.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_consistent() {
        for sensor in [SensorConfig::viirs(), SensorConfig::seawifs()] {
            sensor.validate().unwrap();
            assert_eq!(sensor.iop_input_bands, sensor.band_count() - 1);
        }
        assert_eq!(SensorConfig::viirs().atmosphere_input_len(), 14);
        assert_eq!(SensorConfig::viirs().iop_input_len(), 11);
    }

    #[test]
    fn test_mismatched_table_is_rejected() {
        let mut sensor = SensorConfig::viirs();
        sensor.absorb_ozone.pop();
        assert!(matches!(sensor.validate(), Err(AcError::Configuration(_))));
    }
}
