//! Tag-to-value context the rule engine evaluates against.

use hashbrown::HashMap;

use super::ClassifyError;

/// String-keyed noise values sampled for one coordinate.
///
/// Global layers are sampled once per classification; region-local layers are
/// resampled (and shadow earlier values) as the walk descends.
#[derive(Default)]
pub struct NoiseContext {
    values: HashMap<String, f64>,
}

impl NoiseContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or shadows) the value for a tag.
    pub fn set(&mut self, tag: &str, value: f64) {
        self.values.insert(tag.to_owned(), value);
    }

    /// Returns the value for a tag.
    ///
    /// A missing tag is a configuration bug: the referencing rule names a
    /// noise layer that is not in scope at its level.
    pub fn get(&self, tag: &str) -> Result<f64, ClassifyError> {
        self.values
            .get(tag)
            .copied()
            .ok_or_else(|| ClassifyError::UnknownNoiseTag {
                tag: tag.to_owned(),
                region: String::new(),
            })
    }

    /// Returns `true` if the tag is in scope.
    pub fn contains(&self, tag: &str) -> bool {
        self.values.contains_key(tag)
    }
}
