use crate::config::{ProcessorConfig, DEFAULT_SALINITY, DEFAULT_TEMPERATURE, DEFAULT_TOSA_RATIO_THRESHOLDS};
use crate::core::flags::{
    is_out_of_range, InversionFlags, FLAG_INDEX_RHOW_OOR, FLAG_INDEX_RTOSA_OOR, FLAG_INDEX_RTOSA_OOS,
    FLAG_INDEX_VALID_PE,
};
use crate::core::geometry::{altitude_corrected_pressure, correct_gas_absorption, ViewGeometry};
use crate::core::sensor::SensorConfig;
use crate::nn::{NetworkDefinition, NetworkRepository, NeuralNetwork};
use crate::types::{AcError, AcResult, InversionResult, PixelObservation};
use std::sync::Arc;

/// Scene constants and thresholds used by the inversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InversionParams {
    pub temperature: f64,
    pub salinity: f64,
    /// [low, high] bounds of the auto-associative TOSA ratio
    pub tosa_ratio_thresholds: [f64; 2],
    pub model_ozone: f64,
}

impl Default for InversionParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            salinity: DEFAULT_SALINITY,
            tosa_ratio_thresholds: DEFAULT_TOSA_RATIO_THRESHOLDS,
            model_ozone: 0.0,
        }
    }
}

impl From<&ProcessorConfig> for InversionParams {
    fn from(config: &ProcessorConfig) -> Self {
        Self {
            temperature: config.temperature,
            salinity: config.salinity,
            tosa_ratio_thresholds: config.tosa_ratio_thresholds,
            model_ozone: config.model_ozone,
        }
    }
}

/// Network evaluation contexts owned by one worker
pub struct InversionWorkspace {
    rtosa_rw: Box<dyn NeuralNetwork + Send>,
    rtosa_aann: Box<dyn NeuralNetwork + Send>,
    rw_iop: Box<dyn NeuralNetwork + Send>,
}

/// Per-pixel atmospheric correction and IOP retrieval.
///
/// Holds the shared network definitions; every worker thread evaluates
/// through its own [`InversionWorkspace`].
#[derive(Debug, Clone)]
pub struct PixelInverter {
    sensor: SensorConfig,
    params: InversionParams,
    rtosa_rw: Arc<dyn NetworkDefinition>,
    rtosa_aann: Arc<dyn NetworkDefinition>,
    rw_iop: Arc<dyn NetworkDefinition>,
}

impl PixelInverter {
    /// Create an inverter, checking network dimensions against the sensor tables
    pub fn new(
        sensor: SensorConfig,
        params: InversionParams,
        rtosa_rw: Arc<dyn NetworkDefinition>,
        rtosa_aann: Arc<dyn NetworkDefinition>,
        rw_iop: Arc<dyn NetworkDefinition>,
    ) -> AcResult<Self> {
        sensor.validate()?;
        let bands = sensor.band_count();
        check_dimensions("rtosa->rw", rtosa_rw.as_ref(), sensor.atmosphere_input_len(), Some(bands))?;
        check_dimensions("rtosa auto-associative", rtosa_aann.as_ref(), sensor.atmosphere_input_len(), Some(bands))?;
        check_dimensions("rw->iop", rw_iop.as_ref(), sensor.iop_input_len(), None)?;

        let [low, high] = params.tosa_ratio_thresholds;
        if !(low < high) {
            return Err(AcError::Configuration(format!(
                "invalid TOSA ratio thresholds [{}, {}]",
                low, high
            )));
        }

        log::info!(
            "Pixel inverter ready for {} ({} bands, {} IOPs)",
            sensor.name,
            bands,
            rw_iop.output_count()
        );
        Ok(Self {
            sensor,
            params,
            rtosa_rw,
            rtosa_aann,
            rw_iop,
        })
    }

    /// Load the sensor's three networks from a repository
    pub fn from_repository(
        sensor: SensorConfig,
        params: InversionParams,
        repository: &NetworkRepository,
    ) -> AcResult<Self> {
        let rtosa_aann = repository.load(&sensor.networks.rtosa_aann)?;
        let rtosa_rw = repository.load(&sensor.networks.rtosa_rw)?;
        let rw_iop = repository.load(&sensor.networks.rw_iop)?;
        Self::new(sensor, params, rtosa_rw, rtosa_aann, rw_iop)
    }

    pub fn sensor(&self) -> &SensorConfig {
        &self.sensor
    }

    pub fn params(&self) -> &InversionParams {
        &self.params
    }

    pub fn iop_count(&self) -> usize {
        self.rw_iop.output_count()
    }

    /// Fresh evaluation contexts for one worker
    pub fn workspace(&self) -> InversionWorkspace {
        InversionWorkspace {
            rtosa_rw: self.rtosa_rw.create_context(),
            rtosa_aann: self.rtosa_aann.create_context(),
            rw_iop: self.rw_iop.create_context(),
        }
    }

    /// Invert one pixel.
    ///
    /// Invalid input (caller mask, non-finite samples, non-positive
    /// reflectance, sun or sensor below the horizon) short-circuits to a
    /// no-data result with the valid bit cleared.
    pub fn invert(
        &self,
        workspace: &mut InversionWorkspace,
        observation: &PixelObservation,
        ozone: f64,
        pressure: f64,
    ) -> InversionResult {
        let band_count = self.sensor.band_count();
        if !self.accepts(observation, ozone, pressure) {
            return InversionResult::invalid(band_count, self.iop_count());
        }

        let geometry = ViewGeometry::from_angles(&observation.angles);
        if !geometry.is_above_horizon() {
            return InversionResult::invalid(band_count, self.iop_count());
        }

        self.run(workspace, observation, &geometry, ozone, pressure)
    }

    fn accepts(&self, observation: &PixelObservation, ozone: f64, pressure: f64) -> bool {
        observation.has_valid_samples()
            && observation.toa_reflectance.len() == self.sensor.band_count()
            && observation.toa_reflectance.iter().all(|&r| r > 0.0)
            && ozone.is_finite()
            && pressure.is_finite()
    }

    fn run(
        &self,
        workspace: &mut InversionWorkspace,
        observation: &PixelObservation,
        geometry: &ViewGeometry,
        ozone: f64,
        pressure: f64,
    ) -> InversionResult {
        let p = &self.params;
        let angles = &observation.angles;

        // Ozone correction to TOSA
        let r_tosa = correct_gas_absorption(
            &observation.toa_reflectance,
            &self.sensor.absorb_ozone,
            ozone,
            p.model_ozone,
            geometry,
        );
        let log_rtosa: Vec<f64> = r_tosa.iter().map(|r| r.ln()).collect();

        let alti_press = altitude_corrected_pressure(pressure, observation.altitude);

        // [sun_zeni, x, y, z, temperature, salinity, alti_press, log_rtosa]
        let mut nn_in = Vec::with_capacity(self.sensor.atmosphere_input_len());
        nn_in.extend_from_slice(&[
            angles.sun_zenith,
            geometry.x,
            geometry.y,
            geometry.z,
            p.temperature,
            p.salinity,
            alti_press,
        ]);
        nn_in.extend_from_slice(&log_rtosa);

        let log_rw = workspace.rtosa_rw.evaluate(&nn_in);
        let rw: Vec<f64> = log_rw.iter().map(|v| v.exp()).collect();

        // Auto-associative reconstruction as out-of-scope diagnostic
        let rtosa_aann: Vec<f64> = workspace.rtosa_aann.evaluate(&nn_in).iter().map(|v| v.exp()).collect();
        let (ratio_min, ratio_max) = ratio_extrema(&rtosa_aann, &r_tosa);

        let mut flags = InversionFlags::empty();
        let [low, high] = p.tosa_ratio_thresholds;
        let out_of_scope = !(ratio_min.is_finite() && ratio_max.is_finite()) || ratio_min < low || ratio_max > high;
        flags.set(FLAG_INDEX_RTOSA_OOS, out_of_scope);

        flags.set(
            FLAG_INDEX_RTOSA_OOR,
            is_out_of_range(&nn_in, workspace.rtosa_aann.input_min(), workspace.rtosa_aann.input_max()),
        );

        // [sun_zeni, view_zeni, azi_diff_deg, temperature, salinity, log_rw(first bands)]
        let mut nn_in_inv = Vec::with_capacity(self.sensor.iop_input_len());
        nn_in_inv.extend_from_slice(&[
            angles.sun_zenith,
            angles.view_zenith,
            geometry.azi_diff_deg,
            p.temperature,
            p.salinity,
        ]);
        nn_in_inv.extend_from_slice(&log_rw[..self.sensor.iop_input_bands]);

        let iops: Vec<f64> = workspace.rw_iop.evaluate(&nn_in_inv).iter().map(|v| v.exp()).collect();

        flags.set(
            FLAG_INDEX_RHOW_OOR,
            is_out_of_range(&nn_in_inv, workspace.rw_iop.input_min(), workspace.rw_iop.input_max()),
        );
        flags.set(FLAG_INDEX_VALID_PE, observation.valid);

        InversionResult {
            rw,
            iops,
            rtosa_in: r_tosa,
            rtosa_out: rtosa_aann,
            rtosa_ratio_min: ratio_min,
            rtosa_ratio_max: ratio_max,
            flags: flags.bits(),
        }
    }
}

/// Min and max of the elementwise ratio `numerator / denominator`
fn ratio_extrema(numerator: &[f64], denominator: &[f64]) -> (f64, f64) {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| n / d)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            if r.is_nan() {
                (f64::NAN, f64::NAN)
            } else {
                (lo.min(r), hi.max(r))
            }
        })
}

fn check_dimensions(
    name: &str,
    network: &dyn NetworkDefinition,
    inputs: usize,
    outputs: Option<usize>,
) -> AcResult<()> {
    if network.input_count() != inputs {
        return Err(AcError::Configuration(format!(
            "{} network expects {} inputs, the sensor provides {}",
            name,
            network.input_count(),
            inputs
        )));
    }
    if let Some(outputs) = outputs {
        if network.output_count() != outputs {
            return Err(AcError::Configuration(format!(
                "{} network produces {} outputs, the sensor has {} bands",
                name,
                network.output_count(),
                outputs
            )));
        }
    }
    Ok(())
}
