//! Layers for dense feed-forward regression networks.
//!
//! Every layer works on a flat slice of parameters owned by the `Model`, so
//! composing layers is just a matter of splitting that slice.

mod activation;
mod input;
mod linear;
mod parallel;
mod sequence;
mod stack;

pub use activation::{Activation, ActivationLayer, Relu, Sigmoid, Tanh};
pub use input::InputLayer;
pub use linear::{BiasLayer, LinearLayer};
pub use parallel::ParallelLayer;
pub use sequence::Sequence;
pub use stack::{DynLayer, Stack};
