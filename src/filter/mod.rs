//! Signal filters used by the built-in stages

pub mod emphasis;
pub mod gain;
pub mod normalize;
pub mod remix;
pub mod resample;

pub use emphasis::PreEmphasis;
pub use gain::Gain;
pub use normalize::{Normalize, NormalizeMode};
pub use remix::downmix;
pub use resample::Resample;

use crate::core::Signal;
use crate::error::PipelineResult;

/// Trait for whole-signal filters
pub trait Filter {
    /// Process a signal through this filter
    fn process(&mut self, signal: &Signal) -> PipelineResult<Signal>;
}
