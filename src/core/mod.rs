//! Per-pixel inversion and scene processing

pub mod flags;
pub mod geometry;
pub mod pipeline;
pub mod scene;
pub mod sensor;

// Re-export main types
pub use flags::{InversionFlags, FLAG_CODING};
pub use geometry::ViewGeometry;
pub use pipeline::{InversionParams, InversionWorkspace, PixelInverter};
pub use scene::{process_scene, OutputOptions, SceneInput, SceneOutput, TimeCoding, FLAG_BAND_NAME};
pub use sensor::{NetworkPaths, SensorConfig, IOP_NAMES};
