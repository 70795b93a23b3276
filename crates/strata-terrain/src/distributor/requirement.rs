//! Requirements: predicates gating whether a rule matches.
//!
//! The variant set is closed at configuration-load time, so requirements are
//! a tagged enum rather than an open trait.

use super::{ClassifyError, NoiseContext};

/// A predicate over the sampled noise context and the running strength.
/// All requirements of a rule must hold for the rule to match (logical AND).
#[derive(Clone, Debug)]
pub enum Requirement {
    /// The tagged noise value falls inside any of the `[min, max]` intervals.
    NoiseRange {
        /// Noise layer tag to read from the context.
        tag: String,
        /// Inclusive intervals; matching any one suffices.
        ranges: Vec<(f64, f64)>,
    },
    /// The running strength is at least this value.
    MinStrength(f64),
    /// The running strength is at most this value.
    MaxStrength(f64),
}

impl Requirement {
    /// Evaluates the predicate.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::UnknownNoiseTag`] if a referenced tag is absent from
    /// the context, which is a configuration bug.
    pub fn satisfied(&self, ctx: &NoiseContext, strength: f64) -> Result<bool, ClassifyError> {
        match self {
            Requirement::NoiseRange { tag, ranges } => {
                let value = ctx.get(tag)?;
                Ok(ranges.iter().any(|&(min, max)| value >= min && value <= max))
            }
            Requirement::MinStrength(min) => Ok(strength >= *min),
            Requirement::MaxStrength(max) => Ok(strength <= *max),
        }
    }
}
