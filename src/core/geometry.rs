use crate::types::AngleSet;

/// Altitude (m) above which surface pressure is scaled down
pub const ALTITUDE_CORRECTION_THRESHOLD: f64 = 10.0;

/// Scale height (m) of the simplified barometric formula
pub const PRESSURE_SCALE_HEIGHT: f64 = 8000.0;

/// Trigonometric quantities derived from one pixel's sun/view angles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewGeometry {
    pub cos_sun: f64,
    pub cos_view: f64,
    pub sin_sun: f64,
    pub sin_view: f64,
    pub cos_azi_diff: f64,
    pub sin_azi_diff: f64,
    /// Relative azimuth in degrees, folded into [0, 180]
    pub azi_diff_deg: f64,
    /// View direction unit vector
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ViewGeometry {
    pub fn from_angles(angles: &AngleSet) -> Self {
        let cos_sun = angles.sun_zenith.to_radians().cos();
        let cos_view = angles.view_zenith.to_radians().cos();
        let sin_sun = angles.sun_zenith.to_radians().sin();
        let sin_view = angles.view_zenith.to_radians().sin();

        let cos_azi_diff = (angles.view_azimuth - angles.sun_azimuth).to_radians().cos();
        // acos of a cosine can leave [-1, 1] by one ulp
        let azi_diff_rad = cos_azi_diff.clamp(-1.0, 1.0).acos();
        let sin_azi_diff = azi_diff_rad.sin();

        Self {
            cos_sun,
            cos_view,
            sin_sun,
            sin_view,
            cos_azi_diff,
            sin_azi_diff,
            azi_diff_deg: azi_diff_rad.to_degrees(),
            x: sin_view * cos_azi_diff,
            y: sin_view * sin_azi_diff,
            z: cos_view,
        }
    }

    /// Both zenith cosines strictly positive (sun and sensor above the horizon)
    pub fn is_above_horizon(&self) -> bool {
        self.cos_sun > 0.0 && self.cos_view > 0.0
    }
}

/// Two-way ozone transmission for one band.
///
/// Downward and upward paths are computed independently from their own
/// zenith cosines and multiplied.
pub fn ozone_transmission(
    absorb_ozone: f64,
    ozone_du: f64,
    model_ozone: f64,
    cos_sun: f64,
    cos_view: f64,
) -> f64 {
    let optical_depth = absorb_ozone * ozone_du / 1000.0 - model_ozone;
    let trans_down = (-optical_depth / cos_sun).exp();
    let trans_up = (-optical_depth / cos_view).exp();
    trans_down * trans_up
}

/// Convert TOA reflectance to TOSA reflectance by removing ozone absorption
pub fn correct_gas_absorption(
    toa_reflectance: &[f64],
    absorb_ozone: &[f64],
    ozone_du: f64,
    model_ozone: f64,
    geometry: &ViewGeometry,
) -> Vec<f64> {
    toa_reflectance
        .iter()
        .zip(absorb_ozone)
        .map(|(&toa, &absorb)| {
            toa / ozone_transmission(absorb, ozone_du, model_ozone, geometry.cos_sun, geometry.cos_view)
        })
        .collect()
}

/// Surface pressure corrected for terrain altitude.
///
/// Simplified barometric formula; identity at or below 10 m so sea-level
/// pixels keep the ancillary pressure exactly.
pub fn altitude_corrected_pressure(pressure: f64, altitude: f64) -> f64 {
    if altitude > ALTITUDE_CORRECTION_THRESHOLD {
        pressure * (-altitude / PRESSURE_SCALE_HEIGHT).exp()
    } else {
        pressure
    }
}

/// TOA radiance to TOA reflectance for sensors delivering radiances.
///
/// Radiances in mW/(cm² sr µm) are scaled by 10 to match solar fluxes in
/// mW/(m² sr nm).
pub fn radiance_to_reflectance(toa_radiance: &[f64], solar_flux: &[f64], cos_sun: f64) -> Vec<f64> {
    toa_radiance
        .iter()
        .zip(solar_flux)
        .map(|(&rad, &flux)| std::f64::consts::PI * rad * 10.0 / flux / cos_sun)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_nadir_geometry() {
        let geometry = ViewGeometry::from_angles(&AngleSet::new(0.0, 0.0, 0.0, 0.0));
        assert_abs_diff_eq!(geometry.cos_sun, 1.0);
        assert_abs_diff_eq!(geometry.z, 1.0);
        assert_abs_diff_eq!(geometry.x, 0.0);
        assert_abs_diff_eq!(geometry.azi_diff_deg, 0.0);
    }

    #[test]
    fn test_relative_azimuth_is_folded() {
        let a = ViewGeometry::from_angles(&AngleSet::new(30.0, 100.0, 5.0, 110.0));
        let b = ViewGeometry::from_angles(&AngleSet::new(30.0, 110.0, 5.0, 100.0));
        assert_abs_diff_eq!(a.azi_diff_deg, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.azi_diff_deg, 10.0, epsilon = 1e-9);

        let c = ViewGeometry::from_angles(&AngleSet::new(30.0, 10.0, 5.0, 350.0));
        assert_abs_diff_eq!(c.azi_diff_deg, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_view_vector_is_unit_length() {
        let g = ViewGeometry::from_angles(&AngleSet::new(45.0, 30.0, 40.0, 170.0));
        assert_abs_diff_eq!(g.x * g.x + g.y * g.y + g.z * g.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_absorption_is_identity() {
        let geometry = ViewGeometry::from_angles(&AngleSet::new(30.0, 100.0, 5.0, 110.0));
        let rtosa = correct_gas_absorption(&[0.1, 0.2], &[0.0, 0.0], 330.0, 0.0, &geometry);
        assert_eq!(rtosa, vec![0.1, 0.2]);
    }

    #[test]
    fn test_ozone_correction_increases_reflectance() {
        let geometry = ViewGeometry::from_angles(&AngleSet::new(30.0, 100.0, 5.0, 110.0));
        let rtosa = correct_gas_absorption(&[0.05], &[0.0898], 330.0, 0.0, &geometry);

        let tau = 0.0898 * 0.33;
        let expected = 0.05 / ((-tau / geometry.cos_sun).exp() * (-tau / geometry.cos_view).exp());
        assert_abs_diff_eq!(rtosa[0], expected, epsilon = 1e-15);
        assert!(rtosa[0] > 0.05);
    }

    #[test]
    fn test_altitude_threshold_is_exclusive() {
        assert_eq!(altitude_corrected_pressure(1013.0, 0.0), 1013.0);
        assert_eq!(altitude_corrected_pressure(1013.0, 10.0), 1013.0);

        let above = altitude_corrected_pressure(1013.0, 10.0 + 1e-9);
        assert!(above < 1013.0);
        assert_abs_diff_eq!(
            altitude_corrected_pressure(1000.0, 800.0),
            1000.0 * (-0.1f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_radiance_to_reflectance() {
        let refl = radiance_to_reflectance(&[10.0], &[1000.0], 0.5);
        assert_abs_diff_eq!(refl[0], std::f64::consts::PI * 100.0 / 1000.0 / 0.5, epsilon = 1e-12);
    }
}
