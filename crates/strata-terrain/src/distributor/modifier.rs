//! Modifiers: transformations of the running blend strength.
//!
//! Strength starts at 1.0 and is multiplied down by each modifier in a rule's
//! chain, producing soft transitions between adjacent regions and biomes
//! instead of hard boundaries.

use super::{ClassifyError, NoiseContext};

/// A strength transformation. Each variant returns a factor in `[0.0, 1.0]`
/// multiplied into the current strength.
#[derive(Clone, Debug)]
pub enum Modifier {
    /// Piecewise-linear falloff on a tagged noise value: full effect inside
    /// `[full_min, full_max]`, zero outside `[min, max]`, linear in between.
    RangedLinear {
        /// Noise layer tag to read from the context.
        tag: String,
        /// Outer cutoff (lower).
        min: f64,
        /// Inner full-effect bound (lower).
        full_min: f64,
        /// Inner full-effect bound (upper).
        full_max: f64,
        /// Outer cutoff (upper).
        max: f64,
    },
    /// Constant attenuation, independent of the context.
    Scale {
        /// Factor multiplied into the strength, expected in `[0.0, 1.0]`.
        factor: f64,
    },
}

impl Modifier {
    /// Applies the modifier to the current strength.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::UnknownNoiseTag`] if a referenced tag is absent from
    /// the context.
    pub fn apply(&self, strength: f64, ctx: &NoiseContext) -> Result<f64, ClassifyError> {
        match self {
            Modifier::RangedLinear {
                tag,
                min,
                full_min,
                full_max,
                max,
            } => {
                let value = ctx.get(tag)?;
                let factor = if value < *min || value > *max {
                    0.0
                } else if value >= *full_min && value <= *full_max {
                    1.0
                } else if value < *full_min {
                    (value - min) / (full_min - min)
                } else {
                    (max - value) / (max - full_max)
                };
                Ok(strength * factor)
            }
            Modifier::Scale { factor } => Ok(strength * factor.clamp(0.0, 1.0)),
        }
    }
}
