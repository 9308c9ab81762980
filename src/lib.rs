//! acnet: neural-network atmospheric correction for ocean-colour imagery
//!
//! Converts top-of-atmosphere reflectance into water-leaving reflectance
//! and inherent optical properties with three trained networks per sensor,
//! using ozone and surface pressure resolved from ancillary archives.

pub mod ancillary;
pub mod config;
pub mod core;
pub mod nn;
pub mod types;

// Re-export main types and functions for easier access
pub use ancillary::{AncillaryDataSpec, AncillaryResolver, AncillaryVariable, BracketPolicy};
pub use config::ProcessorConfig;
pub use crate::core::{
    process_scene, InversionFlags, InversionParams, OutputOptions, PixelInverter, SceneInput, SceneOutput,
    SensorConfig, TimeCoding,
};
pub use nn::{NetworkDefinition, NetworkRepository, NeuralNetwork};
pub use types::{AcError, AcResult, AngleSet, InversionResult, Mjd, PixelObservation};
