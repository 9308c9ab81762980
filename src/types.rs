use serde::{Deserialize, Serialize};

/// Time as Modified Julian Day counted from 2000-01-01T00:00:00Z
pub type Mjd = f64;

/// Observation geometry of a single pixel (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSet {
    pub sun_zenith: f64,
    pub sun_azimuth: f64,
    pub view_zenith: f64,
    pub view_azimuth: f64,
}

impl AngleSet {
    pub fn new(sun_zenith: f64, sun_azimuth: f64, view_zenith: f64, view_azimuth: f64) -> Self {
        Self {
            sun_zenith,
            sun_azimuth,
            view_zenith,
            view_azimuth,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.sun_zenith.is_finite()
            && self.sun_azimuth.is_finite()
            && self.view_zenith.is_finite()
            && self.view_azimuth.is_finite()
    }
}

/// Everything the inversion needs to know about one pixel
#[derive(Debug, Clone, PartialEq)]
pub struct PixelObservation {
    /// TOA reflectance, one value per sensor band
    pub toa_reflectance: Vec<f64>,
    pub angles: AngleSet,
    /// DEM altitude in meters
    pub altitude: f64,
    pub time_mjd: Mjd,
    pub latitude: f64,
    pub longitude: f64,
    /// Caller-determined validity (land/cloud mask, radiance threshold)
    pub valid: bool,
}

impl PixelObservation {
    /// True when the caller marked the pixel valid and every sample is usable
    pub fn has_valid_samples(&self) -> bool {
        self.valid
            && self.angles.is_finite()
            && self.altitude.is_finite()
            && self.toa_reflectance.iter().all(|r| r.is_finite())
    }
}

/// Per-pixel output of the inversion
#[derive(Debug, Clone, PartialEq)]
pub struct InversionResult {
    /// Water-leaving reflectance per band
    pub rw: Vec<f64>,
    /// Inherent optical properties (apig, adet, agelb, bpart, bwit)
    pub iops: Vec<f64>,
    /// Gas-corrected TOSA reflectance fed into the networks
    pub rtosa_in: Vec<f64>,
    /// TOSA reflectance reconstructed by the auto-associative network
    pub rtosa_out: Vec<f64>,
    pub rtosa_ratio_min: f64,
    pub rtosa_ratio_max: f64,
    pub flags: u32,
}

impl InversionResult {
    /// No-data result for pixels that never entered the pipeline
    pub fn invalid(band_count: usize, iop_count: usize) -> Self {
        Self {
            rw: vec![f64::NAN; band_count],
            iops: vec![f64::NAN; iop_count],
            rtosa_in: vec![f64::NAN; band_count],
            rtosa_out: vec![f64::NAN; band_count],
            rtosa_ratio_min: f64::NAN,
            rtosa_ratio_max: f64::NAN,
            flags: 0,
        }
    }
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }
}

/// Error types for atmospheric correction processing
#[derive(Debug, thiserror::Error)]
pub enum AcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resource load error: {0}")]
    ResourceLoad(String),

    #[error("Ancillary data unavailable: {0}")]
    AuxDataUnavailable(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for atmospheric correction operations
pub type AcResult<T> = Result<T, AcError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> PixelObservation {
        PixelObservation {
            toa_reflectance: vec![0.1, 0.08, 0.05],
            angles: AngleSet::new(30.0, 100.0, 5.0, 110.0),
            altitude: 0.0,
            time_mjd: 6000.5,
            latitude: 54.0,
            longitude: 10.0,
            valid: true,
        }
    }

    #[test]
    fn test_sample_validity() {
        let mut obs = observation();
        assert!(obs.has_valid_samples());

        obs.toa_reflectance[1] = f64::NAN;
        assert!(!obs.has_valid_samples());

        let mut obs = observation();
        obs.valid = false;
        assert!(!obs.has_valid_samples());
    }

    #[test]
    fn test_invalid_result_is_no_data() {
        let result = InversionResult::invalid(7, 5);
        assert_eq!(result.rw.len(), 7);
        assert_eq!(result.iops.len(), 5);
        assert!(result.rw.iter().all(|v| v.is_nan()));
        assert_eq!(result.flags, 0);
    }
}
