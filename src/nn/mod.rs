//! Neural network port
//!
//! A trained network is split in two halves: an immutable definition that is
//! shared by every worker, and an evaluation context that owns the scratch
//! buffers used during a forward pass. Contexts are cheap to create and are
//! never shared between threads.

pub mod ffbp;
pub mod repository;

use std::fmt::Debug;

pub use ffbp::{FfbpContext, FfbpDefinition};
pub use repository::NetworkRepository;

/// Forward evaluation of one trained network
pub trait NeuralNetwork {
    /// Evaluate the network. Mutates internal scratch state.
    fn evaluate(&mut self, input: &[f64]) -> Vec<f64>;

    /// Smallest value of each input seen during training
    fn input_min(&self) -> &[f64];

    /// Largest value of each input seen during training
    fn input_max(&self) -> &[f64];

    fn input_count(&self) -> usize {
        self.input_min().len()
    }

    fn output_count(&self) -> usize;
}

/// Shared, read-only network definition that hands out evaluation contexts
pub trait NetworkDefinition: Send + Sync + Debug {
    fn create_context(&self) -> Box<dyn NeuralNetwork + Send>;

    fn input_count(&self) -> usize;

    fn output_count(&self) -> usize;
}
