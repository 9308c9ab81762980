//! Whole-scene processing
//!
//! Ancillary brackets covering the scene are loaded before the first pixel
//! is inverted, so worker threads never wait on downloads. Each worker owns
//! its own network contexts.

use crate::ancillary::{AncillaryResolver, AncillaryVariable};
use crate::config::ProcessorConfig;
use crate::core::flags::InversionFlags;
use crate::core::geometry::radiance_to_reflectance;
use crate::core::pipeline::{InversionWorkspace, PixelInverter};
use crate::core::sensor::{SensorConfig, IOP_NAMES};
use crate::types::{AcError, AcResult, AngleSet, InversionResult, Mjd, PixelObservation};
use ndarray::{Array2, Zip};
use std::f64::consts::PI;

/// Name of the flag band
pub const FLAG_BAND_NAME: &str = "c2rcc_flags";

/// Acquisition time per scene line
#[derive(Debug, Clone, PartialEq)]
pub enum TimeCoding {
    /// One time for the whole scene
    Constant(Mjd),
    /// One time per line
    PerLine(Vec<Mjd>),
}

impl TimeCoding {
    /// Mid-scene constant time
    pub fn from_start_end(start: Mjd, end: Mjd) -> Self {
        TimeCoding::Constant((start + end) / 2.0)
    }

    pub fn time(&self, line: usize) -> Mjd {
        match self {
            TimeCoding::Constant(time) => *time,
            TimeCoding::PerLine(times) => times.get(line).copied().unwrap_or(f64::NAN),
        }
    }

    /// Earliest and latest finite time
    pub fn span(&self) -> Option<(Mjd, Mjd)> {
        let times: Vec<Mjd> = match self {
            TimeCoding::Constant(time) => vec![*time],
            TimeCoding::PerLine(times) => times.clone(),
        };
        times
            .into_iter()
            .filter(|t| t.is_finite())
            .fold(None, |span, t| match span {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            })
    }
}

/// Co-registered input rasters of one scene
#[derive(Debug, Clone)]
pub struct SceneInput {
    /// TOA reflectance, one raster per sensor band
    pub toa_reflectance: Vec<Array2<f64>>,
    pub sun_zenith: Array2<f64>,
    pub sun_azimuth: Array2<f64>,
    pub view_zenith: Array2<f64>,
    pub view_azimuth: Array2<f64>,
    pub latitude: Array2<f64>,
    pub longitude: Array2<f64>,
    /// DEM altitude in meters; sea level when absent
    pub altitude: Option<Array2<f64>>,
    /// Caller-determined validity; every pixel valid when absent
    pub valid_mask: Option<Array2<bool>>,
    pub time_coding: TimeCoding,
}

impl SceneInput {
    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.latitude.dim()
    }

    pub fn validate(&self, sensor: &SensorConfig) -> AcResult<()> {
        if self.toa_reflectance.len() != sensor.band_count() {
            return Err(AcError::Configuration(format!(
                "scene has {} reflectance bands, {} expects {}",
                self.toa_reflectance.len(),
                sensor.name,
                sensor.band_count()
            )));
        }

        let dim = self.dim();
        let mut shapes = vec![
            ("sun_zenith", self.sun_zenith.dim()),
            ("sun_azimuth", self.sun_azimuth.dim()),
            ("view_zenith", self.view_zenith.dim()),
            ("view_azimuth", self.view_azimuth.dim()),
            ("longitude", self.longitude.dim()),
        ];
        shapes.extend(self.toa_reflectance.iter().map(|band| ("toa_reflectance", band.dim())));
        if let Some(altitude) = &self.altitude {
            shapes.push(("altitude", altitude.dim()));
        }
        if let Some(mask) = &self.valid_mask {
            shapes.push(("valid_mask", mask.dim()));
        }
        if let Some((name, shape)) = shapes.into_iter().find(|(_, shape)| *shape != dim) {
            return Err(AcError::InvalidFormat(format!(
                "{} raster is {:?}, scene is {:?}",
                name, shape, dim
            )));
        }

        if let TimeCoding::PerLine(times) = &self.time_coding {
            if times.len() != dim.0 {
                return Err(AcError::InvalidFormat(format!(
                    "{} line times for {} scene lines",
                    times.len(),
                    dim.0
                )));
            }
        }
        Ok(())
    }

    /// Observation of the pixel at column `x`, line `y`
    pub fn observation(&self, x: usize, y: usize) -> PixelObservation {
        let idx = [y, x];
        PixelObservation {
            toa_reflectance: self.toa_reflectance.iter().map(|band| band[idx]).collect(),
            angles: AngleSet::new(
                self.sun_zenith[idx],
                self.sun_azimuth[idx],
                self.view_zenith[idx],
                self.view_azimuth[idx],
            ),
            altitude: self.altitude.as_ref().map(|a| a[idx]).unwrap_or(0.0),
            time_mjd: self.time_coding.time(y),
            latitude: self.latitude[idx],
            longitude: self.longitude[idx],
            valid: self.valid_mask.as_ref().map(|m| m[idx]).unwrap_or(true),
        }
    }
}

/// TOA reflectance rasters from TOA radiance rasters (mW/(cm² sr µm))
pub fn reflectance_from_radiance(
    radiance: &[Array2<f64>],
    solar_flux: &[f64],
    sun_zenith: &Array2<f64>,
) -> AcResult<Vec<Array2<f64>>> {
    if radiance.len() != solar_flux.len() {
        return Err(AcError::Configuration(format!(
            "{} radiance bands but {} solar flux values",
            radiance.len(),
            solar_flux.len()
        )));
    }
    let cos_sun = sun_zenith.mapv(|sza| sza.to_radians().cos());
    radiance
        .iter()
        .zip(solar_flux)
        .map(|(band, &flux)| {
            if band.dim() != cos_sun.dim() {
                return Err(AcError::InvalidFormat("radiance band does not match the sun zenith raster".to_string()));
            }
            Ok(Zip::from(band)
                .and(&cos_sun)
                .map_collect(|&rad, &cos| radiance_to_reflectance(&[rad], &[flux], cos)[0]))
        })
        .collect()
}

/// Which optional bands to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Remote-sensing reflectance (rhow / pi) instead of rhow
    pub as_rrs: bool,
    /// TOSA input and reconstructed TOSA bands
    pub output_rtosa: bool,
}

impl From<&ProcessorConfig> for OutputOptions {
    fn from(config: &ProcessorConfig) -> Self {
        Self {
            as_rrs: config.output_as_rrs,
            output_rtosa: config.output_rtosa,
        }
    }
}

/// Names of the float output bands, in output order
pub fn output_band_names(sensor: &SensorConfig, iop_count: usize, options: &OutputOptions) -> Vec<String> {
    let prefix = if options.as_rrs { "rrs" } else { "rhow" };
    let mut names: Vec<String> = sensor
        .wavelengths
        .iter()
        .map(|wl| format!("{}_{}", prefix, wl))
        .collect();
    names.extend((0..iop_count).map(|i| match IOP_NAMES.get(i) {
        Some(name) => format!("iop_{}", name),
        None => format!("iop_{}", i),
    }));
    names.push("rtosa_ratio_min".to_string());
    names.push("rtosa_ratio_max".to_string());
    if options.output_rtosa {
        names.extend(sensor.wavelengths.iter().map(|wl| format!("rtosa_in_{}", wl)));
        names.extend(sensor.wavelengths.iter().map(|wl| format!("rtosa_out_{}", wl)));
    }
    names
}

/// One named output raster
#[derive(Debug, Clone)]
pub struct OutputBand {
    pub name: String,
    pub data: Array2<f32>,
}

/// Processed scene
#[derive(Debug, Clone)]
pub struct SceneOutput {
    pub bands: Vec<OutputBand>,
    pub flags: Array2<u32>,
}

impl SceneOutput {
    pub fn band(&self, name: &str) -> Option<&Array2<f32>> {
        self.bands.iter().find(|b| b.name == name).map(|b| &b.data)
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Resolve ancillary values and invert one pixel
pub fn process_pixel(
    inverter: &PixelInverter,
    resolver: &AncillaryResolver,
    workspace: &mut InversionWorkspace,
    input: &SceneInput,
    x: usize,
    y: usize,
) -> InversionResult {
    let observation = input.observation(x, y);
    if !observation.has_valid_samples() {
        return InversionResult::invalid(inverter.sensor().band_count(), inverter.iop_count());
    }
    let (t, lat, lon) = (observation.time_mjd, observation.latitude, observation.longitude);
    let ozone = resolver.resolve_pixel(AncillaryVariable::Ozone, x, y, t, lat, lon);
    let pressure = resolver.resolve_pixel(AncillaryVariable::SurfacePressure, x, y, t, lat, lon);
    inverter.invert(workspace, &observation, ozone, pressure)
}

/// Invert every pixel of a scene
pub fn process_scene(
    inverter: &PixelInverter,
    resolver: &AncillaryResolver,
    input: &SceneInput,
    options: &OutputOptions,
) -> AcResult<SceneOutput> {
    let sensor = inverter.sensor();
    input.validate(sensor)?;
    let (height, width) = input.dim();
    log::info!("Processing {} scene {}x{}", sensor.name, width, height);

    if let Some((start, end)) = input.time_coding.span() {
        resolver.prefetch(start, end);
    }

    let rows = invert_rows(inverter, resolver, input, height, width);

    let names = output_band_names(sensor, inverter.iop_count(), options);
    let mut bands: Vec<Array2<f32>> = names.iter().map(|_| Array2::from_elem((height, width), f32::NAN)).collect();
    let mut flags = Array2::<u32>::zeros((height, width));

    let reflectance_scale = if options.as_rrs { 1.0 / PI } else { 1.0 };
    for (y, row) in rows.into_iter().enumerate() {
        for (x, result) in row.into_iter().enumerate() {
            let values = result
                .rw
                .iter()
                .map(|v| v * reflectance_scale)
                .chain(result.iops.iter().copied())
                .chain([result.rtosa_ratio_min, result.rtosa_ratio_max]);
            let values: Vec<f64> = if options.output_rtosa {
                values
                    .chain(result.rtosa_in.iter().copied())
                    .chain(result.rtosa_out.iter().copied())
                    .collect()
            } else {
                values.collect()
            };
            for (band, value) in bands.iter_mut().zip(values) {
                band[[y, x]] = value as f32;
            }
            flags[[y, x]] = result.flags;
        }
    }

    let valid = flags.iter().filter(|&&f| InversionFlags::from_bits(f).valid()).count();
    log::info!("Inverted {} of {} pixels", valid, width * height);

    Ok(SceneOutput {
        bands: names
            .into_iter()
            .zip(bands)
            .map(|(name, data)| OutputBand { name, data })
            .collect(),
        flags,
    })
}

#[cfg(feature = "parallel")]
fn invert_rows(
    inverter: &PixelInverter,
    resolver: &AncillaryResolver,
    input: &SceneInput,
    height: usize,
    width: usize,
) -> Vec<Vec<InversionResult>> {
    use rayon::prelude::*;

    (0..height)
        .into_par_iter()
        .map_init(
            || inverter.workspace(),
            |workspace, y| {
                (0..width)
                    .map(|x| process_pixel(inverter, resolver, workspace, input, x, y))
                    .collect()
            },
        )
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn invert_rows(
    inverter: &PixelInverter,
    resolver: &AncillaryResolver,
    input: &SceneInput,
    height: usize,
    width: usize,
) -> Vec<Vec<InversionResult>> {
    let mut workspace = inverter.workspace();
    (0..height)
        .map(|y| {
            (0..width)
                .map(|x| process_pixel(inverter, resolver, &mut workspace, input, x, y))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_time_coding() {
        let constant = TimeCoding::from_start_end(10.0, 10.5);
        assert_eq!(constant.time(7), 10.25);
        assert_eq!(constant.span(), Some((10.25, 10.25)));

        let per_line = TimeCoding::PerLine(vec![1.0, f64::NAN, 1.5]);
        assert_eq!(per_line.time(2), 1.5);
        assert!(per_line.time(3).is_nan());
        assert_eq!(per_line.span(), Some((1.0, 1.5)));
    }

    #[test]
    fn test_output_band_names() {
        let sensor = SensorConfig::viirs();
        let names = output_band_names(&sensor, 5, &OutputOptions::default());
        assert_eq!(names.len(), 7 + 5 + 2);
        assert_eq!(names[0], "rhow_410");
        assert_eq!(names[7], "iop_apig");
        assert_eq!(names[13], "rtosa_ratio_max");

        let options = OutputOptions {
            as_rrs: true,
            output_rtosa: true,
        };
        let names = output_band_names(&sensor, 5, &options);
        assert_eq!(names[0], "rrs_410");
        assert_eq!(names.len(), 7 + 5 + 2 + 14);
        assert_eq!(names.last().map(String::as_str), Some("rtosa_out_862"));
    }

    #[test]
    fn test_reflectance_from_radiance() {
        let radiance = vec![Array2::from_elem((1, 2), 10.0)];
        let sza = Array2::from_elem((1, 2), 60.0);
        let refl = reflectance_from_radiance(&radiance, &[1000.0], &sza).unwrap();
        assert_abs_diff_eq!(refl[0][[0, 1]], PI * 100.0 / 1000.0 / 0.5, epsilon = 1e-9);
        assert!(reflectance_from_radiance(&radiance, &[1.0, 2.0], &sza).is_err());
    }
}
