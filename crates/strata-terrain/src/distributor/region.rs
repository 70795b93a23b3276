//! Regions: the nodes of the spatial classification tree.

use strata_voxel::BiomeId;

use super::{Modifier, Requirement};
use crate::noise::NoiseInstance;

/// Index into the distributor's region arena.
///
/// Regions reference each other by id rather than ownership so the linked
/// configuration graph stays a plain `Vec` with no reference cycles to manage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionId(pub u16);

/// One classification rule: a gated, strength-modifying edge to a child
/// target (a sub-region or a biome).
#[derive(Clone, Debug)]
pub struct Rule<T> {
    /// The region or biome selected when this rule matches.
    pub target: T,
    /// Predicates that must all hold for the rule to match.
    pub requirements: Vec<Requirement>,
    /// Whether the owning region's default modifier chain applies before
    /// this rule's own modifiers.
    pub use_default_modifiers: bool,
    /// Strength modifiers applied in declared order on match.
    pub modifiers: Vec<Modifier>,
}

/// A node of the region tree.
///
/// Child rules are evaluated in declared order with first-match semantics;
/// every non-leaf level must provide a fallback (region or biome) or
/// classification fails with a configuration fault.
#[derive(Debug)]
pub struct Region {
    /// Configuration name, used in diagnostics.
    pub name: String,
    /// Noise layers local to this region, sampled into the context (and
    /// shadowing inherited tags) when the walk enters the region.
    pub noise_layers: Vec<(String, NoiseInstance)>,
    /// Ordered rules selecting child regions.
    pub region_rules: Vec<Rule<RegionId>>,
    /// Ordered rules selecting biomes at this level.
    pub biome_rules: Vec<Rule<BiomeId>>,
    /// Region to descend into when no child region rule matches.
    pub fallback_region: Option<RegionId>,
    /// Biome selected when no biome rule matches.
    pub fallback_biome: Option<BiomeId>,
    /// Modifier chain applied by rules with `use_default_modifiers`.
    pub default_modifiers: Vec<Modifier>,
    /// Strength rounding precision used when this region's fallback biome is
    /// selected directly.
    pub strength_precision: f64,
}
