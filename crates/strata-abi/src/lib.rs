//! Strata ABI crate: stable contracts shared by the sampler and the model layer.

pub mod samplers;
pub mod sampling;
pub mod token;
pub mod vocab;

pub use samplers::*;
pub use sampling::*;
pub use token::*;
pub use vocab::*;
