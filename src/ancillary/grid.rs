use crate::types::{AcError, AcResult, GeoTransform, Mjd};
use ndarray::Array2;

/// How grid cells map to geographic coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridGeoCoding {
    /// Equirectangular world grid, row 0 at +90°, column 0 at -180°
    Global,
    /// North-up affine geotransform in degrees
    Affine(GeoTransform),
}

/// One ancillary raster band held in memory
#[derive(Debug, Clone)]
pub struct AncillaryGrid {
    pub data: Array2<f32>,
    pub geocoding: GridGeoCoding,
    /// Acquisition time from the product metadata, if present
    pub time_mjd: Option<Mjd>,
}

impl AncillaryGrid {
    pub fn new(data: Array2<f32>, geocoding: GridGeoCoding) -> AcResult<Self> {
        let (height, width) = data.dim();
        if height == 0 || width == 0 {
            return Err(AcError::InvalidFormat("ancillary grid is empty".to_string()));
        }
        if let GridGeoCoding::Affine(gt) = geocoding {
            if gt.pixel_width == 0.0 || gt.pixel_height == 0.0 {
                return Err(AcError::InvalidFormat(
                    "ancillary geotransform has zero pixel size".to_string(),
                ));
            }
        }
        Ok(Self {
            data,
            geocoding,
            time_mjd: None,
        })
    }

    /// Global grid without georeferencing
    pub fn global(data: Array2<f32>) -> AcResult<Self> {
        Self::new(data, GridGeoCoding::Global)
    }

    pub fn with_time(mut self, time_mjd: Mjd) -> Self {
        self.time_mjd = Some(time_mjd);
        self
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Cell (row, col) containing a geographic position, clamped to the grid
    pub fn pixel_position(&self, lat: f64, lon: f64) -> (usize, usize) {
        let (w, h) = (self.width() as f64, self.height() as f64);
        let (col, row) = match self.geocoding {
            GridGeoCoding::Global => (((lon + 180.0) / 360.0 * w).floor(), ((90.0 - lat) / 180.0 * h).floor()),
            GridGeoCoding::Affine(gt) => (
                ((lon - gt.top_left_x) / gt.pixel_width).floor(),
                ((lat - gt.top_left_y) / gt.pixel_height).floor(),
            ),
        };
        (clamp_index(row, self.height()), clamp_index(col, self.width()))
    }

    /// Nearest-cell sample at a geographic position
    pub fn sample(&self, lat: f64, lon: f64) -> f64 {
        let (row, col) = self.pixel_position(lat, lon);
        self.data[[row, col]] as f64
    }
}

fn clamp_index(value: f64, len: usize) -> usize {
    if value.is_nan() || value < 0.0 {
        0
    } else {
        (value as usize).min(len - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_global_lookup() {
        // 2 rows (north, south) x 4 columns
        let grid = AncillaryGrid::global(array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]).unwrap();
        assert_eq!(grid.pixel_position(45.0, -170.0), (0, 0));
        assert_eq!(grid.pixel_position(-45.0, 100.0), (1, 3));
        assert_eq!(grid.sample(10.0, 10.0), 3.0);
    }

    #[test]
    fn test_global_lookup_is_clamped_at_edges() {
        let grid = AncillaryGrid::global(array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(grid.pixel_position(90.0, 180.0), (0, 1));
        assert_eq!(grid.pixel_position(-90.0, -180.0), (1, 0));
    }

    #[test]
    fn test_affine_lookup() {
        let gt = GeoTransform::from_gdal([0.0, 1.0, 0.0, 60.0, 0.0, -1.0]);
        let grid = AncillaryGrid::new(Array2::from_elem((10, 10), 0.0), GridGeoCoding::Affine(gt)).unwrap();
        assert_eq!(grid.pixel_position(55.5, 3.2), (4, 3));
    }

    #[test]
    fn test_empty_grid_is_rejected() {
        assert!(AncillaryGrid::global(Array2::zeros((0, 4))).is_err());
    }
}
