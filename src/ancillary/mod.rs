//! Ancillary ozone and surface pressure
//!
//! Values come from a per-pixel raster, a local archive of bracketed files
//! (downloaded on demand), a pair of supplied products, or a constant
//! default, in that order of priority. Missing data never fails a pixel: it
//! is replaced by the variable's default.

pub mod bracket;
pub mod download;
pub mod format;
pub mod grid;
pub mod interpolator;
pub mod reader;
pub mod repository;
pub mod resolver;

pub use bracket::{datetime_to_mjd, file_prefix, mjd_to_datetime, parse_file_time, Bracket, BracketPolicy};
pub use download::{
    write_payload, AncillaryFetcher, DownloadSettings, FallbackFetcher, MirrorFetcher, OceanDataFetcher,
};
pub use format::{AncillaryDataSpec, AncillaryVariable};
pub use grid::{AncillaryGrid, GridGeoCoding};
pub use interpolator::SpatiotemporalInterpolator;
pub use reader::AncillaryRasterReader;
#[cfg(feature = "gdal")]
pub use reader::GdalRasterReader;
pub use repository::AncillaryRepository;
pub use resolver::{AncillaryResolver, AncillaryResolverBuilder, ResolverMode, StaticProduct};
