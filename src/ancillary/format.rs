use crate::ancillary::bracket::BracketPolicy;

/// Ancillary variables resolved per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AncillaryVariable {
    Ozone,
    SurfacePressure,
}

impl AncillaryVariable {
    pub fn name(&self) -> &'static str {
        match self {
            AncillaryVariable::Ozone => "ozone",
            AncillaryVariable::SurfacePressure => "surface_pressure",
        }
    }
}

/// Everything needed to find and read one ancillary variable
#[derive(Debug, Clone, PartialEq)]
pub struct AncillaryDataSpec {
    pub variable: AncillaryVariable,
    /// Value used when no source delivers data
    pub default_value: f64,
    /// Band names holding the variable, in lookup order
    pub band_names: Vec<String>,
    /// File name suffixes appended to the `N<yyyy><ddd><hh>` prefix, in lookup order
    pub file_suffixes: Vec<String>,
    pub policy: BracketPolicy,
}

impl AncillaryDataSpec {
    /// Daily total column ozone (DU) from TOMS/OMI products
    pub fn ozone(default_value: f64) -> Self {
        Self {
            variable: AncillaryVariable::Ozone,
            default_value,
            band_names: vec!["ozone".to_string()],
            file_suffixes: with_bz2(&[
                "_O3_TOMSOMI_24h.hdf",
                "_O3_N7TOMS_24h.hdf",
                "_O3_EPTOMS_24h.hdf",
                "_O3_AURAOMI_24h.hdf",
            ]),
            policy: BracketPolicy::daily(),
        }
    }

    /// Six-hourly sea-level pressure (hPa) from NCEP products
    pub fn pressure(default_value: f64) -> Self {
        Self {
            variable: AncillaryVariable::SurfacePressure,
            default_value,
            band_names: vec!["press".to_string()],
            file_suffixes: with_bz2(&["_MET_NCEPR2_6h.hdf", "_MET_NCEPN_6h.hdf"]),
            policy: BracketPolicy::six_hourly(),
        }
    }

    /// Candidate file names for one prefix, in lookup order
    pub fn file_names(&self, prefix: &str) -> Vec<String> {
        self.file_suffixes
            .iter()
            .map(|suffix| format!("{}{}", prefix, suffix))
            .collect()
    }
}

/// Each product directly followed by its compressed variant
fn with_bz2(suffixes: &[&str]) -> Vec<String> {
    suffixes
        .iter()
        .flat_map(|s| [s.to_string(), format!("{}.bz2", s)])
        .collect()
}
