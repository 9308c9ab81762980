use crate::ancillary::grid::AncillaryGrid;
use crate::types::AcResult;
use std::fmt::Debug;
use std::path::Path;

/// Opens an ancillary product and reads one named band into memory
pub trait AncillaryRasterReader: Send + Sync + Debug {
    /// Read the first of `band_names` present in the product
    fn read_grid(&self, path: &Path, band_names: &[String]) -> AcResult<AncillaryGrid>;
}

#[cfg(feature = "gdal")]
pub use self::gdal_reader::GdalRasterReader;

#[cfg(feature = "gdal")]
mod gdal_reader {
    use super::AncillaryRasterReader;
    use crate::ancillary::bracket::datetime_to_mjd;
    use crate::ancillary::grid::{AncillaryGrid, GridGeoCoding};
    use crate::types::{AcError, AcResult, GeoTransform, Mjd};
    use chrono::{NaiveDate, TimeZone, Utc};
    use gdal::{Dataset, Metadata};
    use ndarray::Array2;
    use std::path::Path;

    const DEFAULT_GEOTRANSFORM: [f64; 6] = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

    /// Reads HDF4/NetCDF/GeoTIFF ancillary products through GDAL.
    ///
    /// Multi-variable containers are searched by subdataset name, single
    /// datasets by band description.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct GdalRasterReader;

    impl AncillaryRasterReader for GdalRasterReader {
        fn read_grid(&self, path: &Path, band_names: &[String]) -> AcResult<AncillaryGrid> {
            log::debug!("Opening ancillary product: {}", path.display());
            let dataset = Dataset::open(path)?;
            let time_mjd = metadata_time(&dataset);

            for band_name in band_names {
                if let Some(subdataset) = find_subdataset(&dataset, band_name) {
                    log::debug!("Reading subdataset {}", subdataset);
                    let sub = Dataset::open(Path::new(&subdataset))?;
                    return read_band(&sub, 1, time_mjd);
                }
                if let Some(index) = find_band(&dataset, band_name) {
                    return read_band(&dataset, index, time_mjd);
                }
            }

            Err(AcError::InvalidFormat(format!(
                "none of the bands {:?} found in {}",
                band_names,
                path.display()
            )))
        }
    }

    fn find_subdataset(dataset: &Dataset, band_name: &str) -> Option<String> {
        let entries = dataset.metadata_domain("SUBDATASETS")?;
        let mut names = Vec::new();
        let mut descriptions = Vec::new();
        for entry in entries {
            if let Some((key, value)) = entry.split_once('=') {
                if key.ends_with("_NAME") {
                    names.push(value.to_string());
                } else if key.ends_with("_DESC") {
                    descriptions.push(value.to_string());
                }
            }
        }

        names.into_iter().enumerate().find_map(|(i, name)| {
            let by_name = name.rsplit(':').next() == Some(band_name);
            let by_desc = descriptions
                .get(i)
                .map(|desc| desc.split_whitespace().any(|tok| tok == band_name))
                .unwrap_or(false);
            (by_name || by_desc).then_some(name)
        })
    }

    fn find_band(dataset: &Dataset, band_name: &str) -> Option<isize> {
        (1..=dataset.raster_count()).find(|&index| {
            dataset
                .rasterband(index)
                .and_then(|band| band.description())
                .map(|desc| desc == band_name)
                .unwrap_or(false)
        })
    }

    fn read_band(dataset: &Dataset, index: isize, time_mjd: Option<Mjd>) -> AcResult<AncillaryGrid> {
        let (width, height) = dataset.raster_size();
        let band = dataset.rasterband(index)?;
        let buffer = band.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
        let mut data = Array2::from_shape_vec((height, width), buffer.data)
            .map_err(|e| AcError::InvalidFormat(format!("Failed to reshape ancillary band: {}", e)))?;

        if let Some(no_data) = band.no_data_value() {
            data.mapv_inplace(|v| if v as f64 == no_data { f32::NAN } else { v });
        }
        let scale = band.scale().unwrap_or(1.0);
        let offset = band.offset().unwrap_or(0.0);
        if scale != 1.0 || offset != 0.0 {
            data.mapv_inplace(|v| (v as f64 * scale + offset) as f32);
        }

        let geocoding = match dataset.geo_transform() {
            Ok(gt) if gt != DEFAULT_GEOTRANSFORM => GridGeoCoding::Affine(GeoTransform::from_gdal(gt)),
            _ => GridGeoCoding::Global,
        };
        log::debug!("Ancillary band {}x{} with {:?} geocoding", width, height, geocoding);

        let grid = AncillaryGrid::new(data, geocoding)?;
        Ok(match time_mjd {
            Some(time) => grid.with_time(time),
            None => grid,
        })
    }

    /// Product time from OBPG global attributes ("Start Year", "Start Day", "Start Millisec")
    fn metadata_time(dataset: &Dataset) -> Option<Mjd> {
        let item = |key: &str| dataset.metadata_item(key, "").and_then(|v| v.trim().parse::<i64>().ok());
        let year = item("Start Year")?;
        let day = item("Start Day")?;
        let millis = item("Start Millisec")?;

        let date = NaiveDate::from_yo_opt(year as i32, day as u32)?.and_hms_opt(0, 0, 0)?;
        let midnight = Utc.from_utc_datetime(&date);
        Some(datetime_to_mjd(&midnight) + millis as f64 / 86_400_000.0)
    }
}
