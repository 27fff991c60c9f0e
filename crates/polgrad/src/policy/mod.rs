//! Neural network components.
//!
//! Provides the two halves of the recurrent policy:
//! - `Encoder` - LSTM that compresses a warm-up observation sequence into a context vector
//! - `PolicyNet` - context-seeded recurrent net emitting hybrid discrete/continuous actions

mod distribution;
mod encoder;
mod net;

pub use distribution::{DiagNormal, OneHotCategorical};
pub use encoder::Encoder;
pub use net::{PolicyNet, PolicyStep, RecurrentState};
