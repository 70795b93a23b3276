//! Layered rule-based biome/region classification.
//!
//! A dimension's spatial layout is a tree of [`Region`]s terminating in
//! biomes. Classification walks the tree depth-first: at every level the
//! region's local noise layers are sampled into the tag context, child rules
//! are tried in declared order (first match wins), and the matched rule's
//! modifier chain reduces the running blend strength. Rule ordering is part
//! of the configuration contract; there is no best-match scoring.

mod context;
mod modifier;
mod region;
mod requirement;

pub use context::NoiseContext;
pub use modifier::Modifier;
pub use region::{Region, RegionId, Rule};
pub use requirement::Requirement;

use std::sync::Arc;

use strata_voxel::BiomeId;

use crate::biome::BiomeRegistry;
use crate::noise::NoiseInstance;

/// Errors surfaced during classification. All of these are configuration
/// bugs, not recoverable runtime conditions; they abort the chunk that
/// triggered them.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// A requirement or modifier referenced a noise tag absent from the
    /// context at its level.
    #[error("noise tag '{tag}' missing from context in region '{region}'")]
    UnknownNoiseTag { tag: String, region: String },
    /// No rule matched and the region declares no fallback.
    #[error("region '{region}' matched no rule and has no fallback")]
    MissingFallback { region: String },
    /// Region nesting exceeded the number of known regions, which is only
    /// possible if the configured graph is not a tree.
    #[error("region nesting exceeded {limit} levels; region graph is not a tree")]
    DepthExceeded { limit: usize },
}

impl ClassifyError {
    /// Fills in the region diagnostic on tag errors raised below the
    /// distributor (requirements and modifiers do not know their region).
    fn in_region(self, name: &str) -> Self {
        match self {
            Self::UnknownNoiseTag { tag, region } if region.is_empty() => {
                Self::UnknownNoiseTag {
                    tag,
                    region: name.to_owned(),
                }
            }
            other => other,
        }
    }
}

/// The result of classifying one world coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    /// The resolved biome.
    pub biome: BiomeId,
    /// Blend strength in `[0.0, 1.0]`, rounded to the biome's precision.
    pub strength: f64,
}

/// Classifies world coordinates into biomes using the configured region tree.
///
/// Usable standalone (e.g. by a map renderer) without running full chunk
/// generation.
#[derive(Debug)]
pub struct Distributor {
    regions: Vec<Region>,
    root: RegionId,
    global_noise: Vec<(String, NoiseInstance)>,
    biomes: Arc<BiomeRegistry>,
}

impl Distributor {
    /// Creates a distributor over a linked region arena.
    ///
    /// `regions` is the arena all [`RegionId`]s index into; `root` is the
    /// dimension-level region classification starts from.
    pub fn new(
        regions: Vec<Region>,
        root: RegionId,
        global_noise: Vec<(String, NoiseInstance)>,
        biomes: Arc<BiomeRegistry>,
    ) -> Self {
        Self {
            regions,
            root,
            global_noise,
            biomes,
        }
    }

    /// The biome registry classifications resolve against.
    pub fn biomes(&self) -> &BiomeRegistry {
        &self.biomes
    }

    /// Returns the region for an id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the arena.
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0 as usize]
    }

    /// Classifies a surface coordinate (2D biome layouts).
    pub fn classify(&self, x: f64, z: f64) -> Result<Classification, ClassifyError> {
        self.classify_at(x, None, z)
    }

    /// Classifies a full 3D coordinate (volumetric biome layouts).
    pub fn classify_3d(&self, x: f64, y: f64, z: f64) -> Result<Classification, ClassifyError> {
        self.classify_at(x, Some(y), z)
    }

    fn classify_at(
        &self,
        x: f64,
        y: Option<f64>,
        z: f64,
    ) -> Result<Classification, ClassifyError> {
        let mut ctx = NoiseContext::new();
        sample_layers(&mut ctx, &self.global_noise, x, y, z);

        let mut current = self.root;
        let mut strength = 1.0_f64;
        // A tree never revisits a region, so a walk longer than the arena
        // means the configuration contains a cycle.
        let limit = self.regions.len() + 1;

        for _ in 0..limit {
            let region = &self.regions[current.0 as usize];
            sample_layers(&mut ctx, &region.noise_layers, x, y, z);

            if let Some(rule) = first_match(&region.region_rules, &ctx, strength)
                .map_err(|e| e.in_region(&region.name))?
            {
                strength = apply_modifiers(rule, region, strength, &ctx)
                    .map_err(|e| e.in_region(&region.name))?;
                current = rule.target;
                continue;
            }

            if let Some(fallback) = region.fallback_region {
                current = fallback;
                continue;
            }

            if let Some(rule) = first_match(&region.biome_rules, &ctx, strength)
                .map_err(|e| e.in_region(&region.name))?
            {
                strength = apply_modifiers(rule, region, strength, &ctx)
                    .map_err(|e| e.in_region(&region.name))?;
                return Ok(self.resolve(rule.target, strength));
            }

            if let Some(biome) = region.fallback_biome {
                // Fallback selection has no rule target; the region's own
                // precision applies.
                return Ok(Classification {
                    biome,
                    strength: round_strength(strength, region.strength_precision),
                });
            }

            return Err(ClassifyError::MissingFallback {
                region: region.name.clone(),
            });
        }

        Err(ClassifyError::DepthExceeded { limit })
    }

    fn resolve(&self, biome: BiomeId, strength: f64) -> Classification {
        let precision = self.biomes.get(biome).strength_precision;
        Classification {
            biome,
            strength: round_strength(strength, precision),
        }
    }
}

/// Rounds a strength to the target's configured precision.
pub(crate) fn round_strength(strength: f64, precision: f64) -> f64 {
    if precision <= 0.0 {
        return strength;
    }
    (strength * precision).round() / precision
}

fn sample_layers(
    ctx: &mut NoiseContext,
    layers: &[(String, NoiseInstance)],
    x: f64,
    y: Option<f64>,
    z: f64,
) {
    for (tag, noise) in layers {
        let value = match y {
            Some(y) => noise.sample_3d(x, y, z),
            None => noise.sample_2d(x, z),
        };
        ctx.set(tag, value);
    }
}

/// Returns the first rule whose requirements are all satisfied, in declared
/// order.
fn first_match<'a, T>(
    rules: &'a [Rule<T>],
    ctx: &NoiseContext,
    strength: f64,
) -> Result<Option<&'a Rule<T>>, ClassifyError> {
    for rule in rules {
        let mut all = true;
        for req in &rule.requirements {
            if !req.satisfied(ctx, strength)? {
                all = false;
                break;
            }
        }
        if all {
            return Ok(Some(rule));
        }
    }
    Ok(None)
}

fn apply_modifiers<T>(
    rule: &Rule<T>,
    region: &Region,
    strength: f64,
    ctx: &NoiseContext,
) -> Result<f64, ClassifyError> {
    let mut strength = strength;
    if rule.use_default_modifiers {
        for modifier in &region.default_modifiers {
            strength = modifier.apply(strength, ctx)?;
        }
    }
    for modifier in &rule.modifiers {
        strength = modifier.apply(strength, ctx)?;
    }
    Ok(strength)
}
