use crate::ancillary::grid::AncillaryGrid;
use crate::types::{AcError, AcResult, Mjd};
use std::sync::Arc;

/// Linear-in-time, nearest-cell-in-space interpolation between two grids
#[derive(Debug, Clone)]
pub struct SpatiotemporalInterpolator {
    start: Arc<AncillaryGrid>,
    end: Arc<AncillaryGrid>,
    start_mjd: Mjd,
    end_mjd: Mjd,
    default_value: f64,
}

impl SpatiotemporalInterpolator {
    /// `default_value` replaces non-finite grid samples
    pub fn new(
        start: Arc<AncillaryGrid>,
        end: Arc<AncillaryGrid>,
        start_mjd: Mjd,
        end_mjd: Mjd,
        default_value: f64,
    ) -> AcResult<Self> {
        if !(start_mjd.is_finite() && end_mjd.is_finite() && end_mjd > start_mjd) {
            return Err(AcError::InvalidFormat(format!(
                "interpolation interval [{}, {}] is empty",
                start_mjd, end_mjd
            )));
        }
        Ok(Self {
            start,
            end,
            start_mjd,
            end_mjd,
            default_value,
        })
    }

    pub fn start_mjd(&self) -> Mjd {
        self.start_mjd
    }

    pub fn end_mjd(&self) -> Mjd {
        self.end_mjd
    }

    /// Value at a time and position. Times outside the interval extrapolate linearly.
    pub fn value(&self, time: Mjd, lat: f64, lon: f64) -> f64 {
        let start_value = self.sample(&self.start, lat, lon);
        let end_value = self.sample(&self.end, lat, lon);
        let weight = (time - self.start_mjd) / (self.end_mjd - self.start_mjd);
        start_value + weight * (end_value - start_value)
    }

    fn sample(&self, grid: &AncillaryGrid, lat: f64, lon: f64) -> f64 {
        let value = grid.sample(lat, lon);
        if value.is_finite() {
            value
        } else {
            self.default_value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn constant_grid(value: f32) -> Arc<AncillaryGrid> {
        Arc::new(AncillaryGrid::global(Array2::from_elem((18, 36), value)).unwrap())
    }

    #[test]
    fn test_boundaries_and_midpoint() {
        let interp = SpatiotemporalInterpolator::new(constant_grid(300.0), constant_grid(340.0), 0.375, 0.625, 330.0)
            .unwrap();
        assert_abs_diff_eq!(interp.value(0.375, 10.0, 10.0), 300.0);
        assert_abs_diff_eq!(interp.value(0.5, 10.0, 10.0), 320.0, epsilon = 1e-9);
        assert_abs_diff_eq!(interp.value(0.625 - 1e-9, 10.0, 10.0), 340.0, epsilon = 1e-4);
    }

    #[test]
    fn test_nan_sample_uses_default() {
        let interp =
            SpatiotemporalInterpolator::new(constant_grid(f32::NAN), constant_grid(340.0), 0.0, 1.0, 330.0).unwrap();
        assert_abs_diff_eq!(interp.value(0.5, 0.0, 0.0), 335.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_interval_is_rejected() {
        assert!(SpatiotemporalInterpolator::new(constant_grid(1.0), constant_grid(1.0), 1.0, 1.0, 0.0).is_err());
    }
}
