//! Data-driven generation configuration.
//!
//! Worlds are described by a plain serde definition tree ([`GenerationDef`])
//! in which every cross-reference is a name: rules name their target regions
//! and biomes, requirements and modifiers name noise tags, biomes name their
//! surface blocks. [`GenerationDef::link`] is the second phase: it resolves
//! every name once, validates the region graph, and produces an immutable
//! [`GenerationConfig`] in which all references are index-based handles. After
//! linking, generation never touches a string again.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use strata_voxel::{BiomeLayout, BlockRegistry, SECTION_SIZE};

use crate::biome::{BiomeDef, BiomeRegistry, BiomeRegistryError};
use crate::distributor::{Distributor, Modifier, Region, RegionId, Requirement, Rule};
use crate::noise::{NoiseAlgorithm, NoiseInstance};
use crate::terrain::{
    FbmTerrain, LayeredTerrain, Terrain, TerrainLayer, TerrainNoiseLayer, TerrainStack,
};

fn default_true() -> bool {
    true
}

fn default_precision() -> f64 {
    100.0
}

fn default_interpolation_scale() -> f64 {
    8.0
}

/// A named noise field definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoiseDef {
    /// Tag this field is registered under in the classification context, and
    /// the instance name used in diagnostics.
    pub name: String,
    /// Noise algorithm.
    pub algorithm: NoiseAlgorithm,
    /// Salt mixed into the world seed.
    pub salt: u64,
    /// Frequency applied to every input coordinate.
    pub frequency: f64,
}

/// A rule predicate, referencing noise layers by tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementDef {
    /// The tagged noise value must fall inside one of the inclusive ranges.
    NoiseRange {
        noise: String,
        ranges: Vec<(f64, f64)>,
    },
    /// The running strength must be at least this value.
    MinStrength { value: f64 },
    /// The running strength must be at most this value.
    MaxStrength { value: f64 },
}

/// A strength modifier, referencing noise layers by tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierDef {
    /// Piecewise-linear falloff on a tagged noise value.
    RangedLinear {
        noise: String,
        min: f64,
        full_min: f64,
        full_max: f64,
        max: f64,
    },
    /// Constant attenuation.
    Scale { factor: f64 },
}

/// A classification rule targeting a region or biome by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleDef {
    /// Name of the target region or biome.
    pub target: String,
    /// Predicates, all of which must hold.
    #[serde(default)]
    pub requirements: Vec<RequirementDef>,
    /// Whether the owning region's default modifier chain applies first.
    #[serde(default = "default_true")]
    pub use_default_modifiers: bool,
    /// Rule-local modifiers.
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
}

/// One node of the region tree, with all references by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionDef {
    /// Unique region name.
    pub name: String,
    /// Noise layers sampled when the walk enters this region.
    #[serde(default)]
    pub noise: Vec<NoiseDef>,
    /// Ordered rules selecting child regions.
    #[serde(default)]
    pub regions: Vec<RuleDef>,
    /// Ordered rules selecting biomes.
    #[serde(default)]
    pub biomes: Vec<RuleDef>,
    /// Region to descend into when no child region rule matches.
    #[serde(default)]
    pub fallback_region: Option<String>,
    /// Biome selected when no biome rule matches.
    #[serde(default)]
    pub fallback_biome: Option<String>,
    /// Modifier chain applied by rules that opt into defaults.
    #[serde(default)]
    pub default_modifiers: Vec<ModifierDef>,
    /// Strength rounding precision for direct fallback-biome selection.
    #[serde(default = "default_precision")]
    pub strength_precision: f64,
}

/// One noise layer of a layered terrain definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainLayerDef {
    pub noise: NoiseDef,
    pub zoom: f64,
    pub coefficient: f64,
}

/// A terrain formula. The base height comes from the owning biome (or is zero
/// for stack shapers), so definitions only carry the deviation parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainDef {
    /// Sum of independent `(zoom, coefficient)` noise layers.
    Layered { layers: Vec<TerrainLayerDef> },
    /// Fixed multi-octave fBm, deviation scaled by biome strength.
    Fbm {
        noise: NoiseDef,
        octaves: u32,
        lacunarity: f64,
        persistence: f64,
        amplitude: f64,
    },
}

/// A biome definition with block references by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiomeConfig {
    /// Unique biome name.
    pub name: String,
    /// Height the terrain deviates around.
    pub base_height: f64,
    /// Block name placed at the surface.
    pub surface_block: String,
    /// Block name placed directly below the surface.
    pub subsurface_block: String,
    /// Strength rounding precision.
    #[serde(default = "default_precision")]
    pub strength_precision: f64,
    /// Terrain formula for this biome.
    pub terrain: TerrainDef,
}

/// One band of the vertical terrain stack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StackLayerDef {
    /// Band name, used in diagnostics.
    pub name: String,
    /// Lowest preliminary height this band shapes (inclusive).
    pub min_y: i32,
    /// Highest preliminary height this band shapes (inclusive).
    pub max_y: i32,
    /// Additive shaping terrain for the band.
    pub terrain: TerrainDef,
}

/// Dimension-wide settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DimensionDef {
    /// Dimension name.
    pub name: String,
    /// Lowest stored world Y (inclusive).
    pub min_y: i32,
    /// Highest stored world Y (exclusive).
    pub max_y: i32,
    /// Whether biomes are stored per column or per cell.
    #[serde(default)]
    pub biome_layout: BiomeLayout,
    /// Grid spacing of the surface interpolator, in blocks.
    #[serde(default = "default_interpolation_scale")]
    pub interpolation_scale: f64,
}

/// The complete unlinked configuration of one dimension's generator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationDef {
    pub dimension: DimensionDef,
    /// Noise layers available to every region.
    #[serde(default)]
    pub noise: Vec<NoiseDef>,
    pub biomes: Vec<BiomeConfig>,
    pub regions: Vec<RegionDef>,
    /// Name of the region classification starts from.
    pub root_region: String,
    /// Optional vertical shaping bands applied on top of biome terrain.
    #[serde(default)]
    pub terrain_stack: Vec<StackLayerDef>,
}

/// Errors raised while linking a [`GenerationDef`].
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A biome referenced a block name absent from the block registry.
    #[error("unknown block '{block}' referenced by biome '{biome}'")]
    UnknownBlock { block: String, biome: String },
    /// A rule or fallback referenced an undefined biome.
    #[error("unknown biome '{biome}' referenced by region '{region}'")]
    UnknownBiome { biome: String, region: String },
    /// A rule, fallback, or the root reference named an undefined region.
    #[error("unknown region '{target}' referenced by '{referrer}'")]
    UnknownRegion { target: String, referrer: String },
    /// Two regions share a name.
    #[error("duplicate region name '{0}'")]
    DuplicateRegion(String),
    /// A region declares neither a fallback region nor a fallback biome, so
    /// classification could dead-end inside it.
    #[error("region '{0}' has no fallback region or fallback biome")]
    MissingFallback(String),
    /// The region graph reaches some region twice, so it is not a tree.
    #[error("region graph is not a tree: '{0}' is reachable through itself")]
    RegionCycle(String),
    /// The dimension height band is empty or not section-aligned.
    #[error("dimension height band [{min_y}, {max_y}) must be a positive multiple of {SECTION_SIZE}")]
    InvalidHeightBand { min_y: i32, max_y: i32 },
    /// Biome registration failed.
    #[error(transparent)]
    Biome(#[from] BiomeRegistryError),
}

/// Immutable dimension settings carried through generation.
#[derive(Clone, Debug)]
pub struct DimensionSettings {
    pub name: String,
    pub min_y: i32,
    pub max_y: i32,
    pub biome_layout: BiomeLayout,
    pub interpolation_scale: f64,
}

/// The fully linked, immutable configuration the engine runs against.
#[derive(Debug)]
pub struct GenerationConfig {
    /// Seed every deterministic source is derived from.
    pub world_seed: u64,
    pub dimension: DimensionSettings,
    /// The linked region tree.
    pub distributor: Distributor,
    /// Vertical shaping bands (possibly empty).
    pub terrain_stack: TerrainStack,
    /// Shared biome registry, also held by the distributor.
    pub biomes: Arc<BiomeRegistry>,
}

impl GenerationDef {
    /// Links this definition against a block registry, resolving all name
    /// references for the given world seed.
    pub fn link(
        &self,
        world_seed: u64,
        blocks: &BlockRegistry,
    ) -> Result<GenerationConfig, LinkError> {
        let height = self.dimension.max_y - self.dimension.min_y;
        if height <= 0 || height as usize % SECTION_SIZE != 0 {
            return Err(LinkError::InvalidHeightBand {
                min_y: self.dimension.min_y,
                max_y: self.dimension.max_y,
            });
        }

        let mut registry = BiomeRegistry::new();
        for biome in &self.biomes {
            let surface = lookup_block(blocks, &biome.surface_block, &biome.name)?;
            let subsurface = lookup_block(blocks, &biome.subsurface_block, &biome.name)?;
            registry.register(BiomeDef {
                name: biome.name.clone(),
                base_height: biome.base_height,
                surface_block: surface,
                subsurface_block: subsurface,
                strength_precision: biome.strength_precision,
                terrain: link_terrain(&biome.terrain, biome.base_height, world_seed),
            })?;
        }
        let registry = Arc::new(registry);

        let mut region_ids: HashMap<&str, RegionId> = HashMap::new();
        for (index, region) in self.regions.iter().enumerate() {
            if region_ids
                .insert(region.name.as_str(), RegionId(index as u16))
                .is_some()
            {
                return Err(LinkError::DuplicateRegion(region.name.clone()));
            }
        }

        let mut regions = Vec::with_capacity(self.regions.len());
        for def in &self.regions {
            regions.push(link_region(def, &region_ids, &registry, world_seed)?);
        }

        let root = *region_ids
            .get(self.root_region.as_str())
            .ok_or_else(|| LinkError::UnknownRegion {
                target: self.root_region.clone(),
                referrer: self.dimension.name.clone(),
            })?;
        check_tree(&regions, root)?;

        let global_noise = self
            .noise
            .iter()
            .map(|n| (n.name.clone(), link_noise(n, world_seed)))
            .collect();

        let terrain_stack = TerrainStack::new(
            self.terrain_stack
                .iter()
                .map(|band| TerrainLayer {
                    name: band.name.clone(),
                    terrain: link_terrain(&band.terrain, 0.0, world_seed),
                    min_y: band.min_y,
                    max_y: band.max_y,
                })
                .collect(),
        );

        info!(
            dimension = %self.dimension.name,
            biomes = registry.len(),
            regions = regions.len(),
            "generation configuration linked"
        );

        Ok(GenerationConfig {
            world_seed,
            dimension: DimensionSettings {
                name: self.dimension.name.clone(),
                min_y: self.dimension.min_y,
                max_y: self.dimension.max_y,
                biome_layout: self.dimension.biome_layout,
                interpolation_scale: self.dimension.interpolation_scale,
            },
            distributor: Distributor::new(regions, root, global_noise, Arc::clone(&registry)),
            terrain_stack,
            biomes: registry,
        })
    }
}

fn lookup_block(
    blocks: &BlockRegistry,
    name: &str,
    biome: &str,
) -> Result<strata_voxel::BlockTypeId, LinkError> {
    blocks
        .lookup_by_name(name)
        .ok_or_else(|| LinkError::UnknownBlock {
            block: name.to_owned(),
            biome: biome.to_owned(),
        })
}

fn link_noise(def: &NoiseDef, world_seed: u64) -> NoiseInstance {
    NoiseInstance::new(
        Some(def.name.clone()),
        def.algorithm,
        def.salt,
        def.frequency,
        world_seed,
    )
}

fn link_terrain(def: &TerrainDef, base_height: f64, world_seed: u64) -> Arc<dyn Terrain> {
    match def {
        TerrainDef::Layered { layers } => Arc::new(LayeredTerrain::new(
            base_height,
            layers
                .iter()
                .map(|layer| TerrainNoiseLayer {
                    noise: link_noise(&layer.noise, world_seed),
                    zoom: layer.zoom,
                    coefficient: layer.coefficient,
                })
                .collect(),
        )),
        TerrainDef::Fbm {
            noise,
            octaves,
            lacunarity,
            persistence,
            amplitude,
        } => Arc::new(FbmTerrain::new(
            base_height,
            link_noise(noise, world_seed),
            *octaves,
            *lacunarity,
            *persistence,
            *amplitude,
        )),
    }
}

fn link_requirement(def: &RequirementDef) -> Requirement {
    match def {
        RequirementDef::NoiseRange { noise, ranges } => Requirement::NoiseRange {
            tag: noise.clone(),
            ranges: ranges.clone(),
        },
        RequirementDef::MinStrength { value } => Requirement::MinStrength(*value),
        RequirementDef::MaxStrength { value } => Requirement::MaxStrength(*value),
    }
}

fn link_modifier(def: &ModifierDef) -> Modifier {
    match def {
        ModifierDef::RangedLinear {
            noise,
            min,
            full_min,
            full_max,
            max,
        } => Modifier::RangedLinear {
            tag: noise.clone(),
            min: *min,
            full_min: *full_min,
            full_max: *full_max,
            max: *max,
        },
        ModifierDef::Scale { factor } => Modifier::Scale { factor: *factor },
    }
}

fn link_rule<T: Copy>(
    def: &RuleDef,
    resolve: impl Fn(&str) -> Result<T, LinkError>,
) -> Result<Rule<T>, LinkError> {
    Ok(Rule {
        target: resolve(&def.target)?,
        requirements: def.requirements.iter().map(link_requirement).collect(),
        use_default_modifiers: def.use_default_modifiers,
        modifiers: def.modifiers.iter().map(link_modifier).collect(),
    })
}

fn link_region(
    def: &RegionDef,
    region_ids: &HashMap<&str, RegionId>,
    biomes: &BiomeRegistry,
    world_seed: u64,
) -> Result<Region, LinkError> {
    let resolve_region = |target: &str| {
        region_ids
            .get(target)
            .copied()
            .ok_or_else(|| LinkError::UnknownRegion {
                target: target.to_owned(),
                referrer: def.name.clone(),
            })
    };
    let resolve_biome = |target: &str| {
        biomes
            .lookup_by_name(target)
            .ok_or_else(|| LinkError::UnknownBiome {
                biome: target.to_owned(),
                region: def.name.clone(),
            })
    };

    let region_rules = def
        .regions
        .iter()
        .map(|rule| link_rule(rule, resolve_region))
        .collect::<Result<Vec<_>, _>>()?;
    let biome_rules = def
        .biomes
        .iter()
        .map(|rule| link_rule(rule, resolve_biome))
        .collect::<Result<Vec<_>, _>>()?;
    let fallback_region = def
        .fallback_region
        .as_deref()
        .map(resolve_region)
        .transpose()?;
    let fallback_biome = def
        .fallback_biome
        .as_deref()
        .map(resolve_biome)
        .transpose()?;

    if fallback_region.is_none() && fallback_biome.is_none() {
        return Err(LinkError::MissingFallback(def.name.clone()));
    }

    Ok(Region {
        name: def.name.clone(),
        noise_layers: def
            .noise
            .iter()
            .map(|n| (n.name.clone(), link_noise(n, world_seed)))
            .collect(),
        region_rules,
        biome_rules,
        fallback_region,
        fallback_biome,
        default_modifiers: def.default_modifiers.iter().map(link_modifier).collect(),
        strength_precision: def.strength_precision,
    })
}

/// Verifies the region graph reachable from `root` is a tree: a depth-first
/// walk over rule targets and fallbacks must never re-enter a region.
fn check_tree(regions: &[Region], root: RegionId) -> Result<(), LinkError> {
    fn visit(regions: &[Region], id: RegionId, seen: &mut [bool]) -> Result<(), LinkError> {
        let index = id.0 as usize;
        if seen[index] {
            return Err(LinkError::RegionCycle(regions[index].name.clone()));
        }
        seen[index] = true;
        let region = &regions[index];
        for rule in &region.region_rules {
            visit(regions, rule.target, seen)?;
        }
        if let Some(fallback) = region.fallback_region {
            visit(regions, fallback, seen)?;
        }
        Ok(())
    }
    visit(regions, root, &mut vec![false; regions.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_voxel::BlockDef;

    fn block_registry() -> BlockRegistry {
        let mut reg = BlockRegistry::new();
        for name in ["strata:stone", "strata:grass", "strata:dirt", "strata:sand"] {
            reg.register(BlockDef {
                name: name.into(),
                solid: true,
            })
            .unwrap();
        }
        reg
    }

    fn noise_def(name: &str, salt: u64) -> NoiseDef {
        NoiseDef {
            name: name.into(),
            algorithm: NoiseAlgorithm::Simplex,
            salt,
            frequency: 0.01,
        }
    }

    fn biome_config(name: &str) -> BiomeConfig {
        BiomeConfig {
            name: name.into(),
            base_height: 64.0,
            surface_block: "strata:grass".into(),
            subsurface_block: "strata:dirt".into(),
            strength_precision: 100.0,
            terrain: TerrainDef::Layered {
                layers: vec![TerrainLayerDef {
                    noise: noise_def("hills", 40),
                    zoom: 32.0,
                    coefficient: 8.0,
                }],
            },
        }
    }

    fn leaf_region(name: &str, fallback_biome: &str) -> RegionDef {
        RegionDef {
            name: name.into(),
            noise: Vec::new(),
            regions: Vec::new(),
            biomes: Vec::new(),
            fallback_region: None,
            fallback_biome: Some(fallback_biome.into()),
            default_modifiers: Vec::new(),
            strength_precision: 100.0,
        }
    }

    fn small_def() -> GenerationDef {
        let mut root = leaf_region("overworld_root", "plains");
        root.noise = vec![noise_def("climate", 1)];
        root.biomes = vec![RuleDef {
            target: "desert".into(),
            requirements: vec![RequirementDef::NoiseRange {
                noise: "climate".into(),
                ranges: vec![(0.2, 2.0)],
            }],
            use_default_modifiers: true,
            modifiers: Vec::new(),
        }];
        GenerationDef {
            dimension: DimensionDef {
                name: "overworld".into(),
                min_y: -64,
                max_y: 320,
                biome_layout: BiomeLayout::Flat,
                interpolation_scale: 8.0,
            },
            noise: vec![noise_def("temperature", 2)],
            biomes: vec![biome_config("plains"), biome_config("desert")],
            regions: vec![root],
            root_region: "overworld_root".into(),
            terrain_stack: Vec::new(),
        }
    }

    #[test]
    fn test_link_and_classify() {
        let config = small_def().link(1234, &block_registry()).unwrap();
        assert_eq!(config.biomes.len(), 2);
        let result = config.distributor.classify(100.0, -40.0).unwrap();
        assert!((result.biome.0 as usize) < config.biomes.len());
        assert!((0.0..=1.0).contains(&result.strength));
    }

    #[test]
    fn test_unknown_block_rejected() {
        let mut def = small_def();
        def.biomes[0].surface_block = "strata:no_such_block".into();
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::UnknownBlock { ref biome, .. } if biome == "plains"));
    }

    #[test]
    fn test_unknown_biome_rejected() {
        let mut def = small_def();
        def.regions[0].fallback_biome = Some("atlantis".into());
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::UnknownBiome { ref biome, .. } if biome == "atlantis"));
    }

    #[test]
    fn test_unknown_root_region_rejected() {
        let mut def = small_def();
        def.root_region = "nether_root".into();
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::UnknownRegion { ref target, .. } if target == "nether_root"));
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let mut def = small_def();
        def.regions.push(leaf_region("overworld_root", "plains"));
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::DuplicateRegion(ref name) if name == "overworld_root"));
    }

    #[test]
    fn test_region_without_fallback_rejected() {
        let mut def = small_def();
        def.regions[0].fallback_biome = None;
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::MissingFallback(_)));
    }

    #[test]
    fn test_fallback_cycle_rejected() {
        let mut def = small_def();
        let mut a = leaf_region("a", "plains");
        a.fallback_biome = None;
        a.fallback_region = Some("b".into());
        let mut b = leaf_region("b", "plains");
        b.fallback_biome = None;
        b.fallback_region = Some("a".into());
        def.regions = vec![a, b];
        def.root_region = "a".into();
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::RegionCycle(_)));
    }

    #[test]
    fn test_misaligned_height_band_rejected() {
        let mut def = small_def();
        def.dimension.max_y = 321;
        let err = def.link(1, &block_registry()).unwrap_err();
        assert!(matches!(err, LinkError::InvalidHeightBand { .. }));
    }

    #[test]
    fn test_definition_parses_from_ron() {
        let text = r#"(
            dimension: (
                name: "overworld",
                min_y: -64,
                max_y: 320,
            ),
            noise: [
                (name: "climate", algorithm: simplex, salt: 1, frequency: 0.003),
            ],
            biomes: [
                (
                    name: "plains",
                    base_height: 64.0,
                    surface_block: "strata:grass",
                    subsurface_block: "strata:dirt",
                    terrain: layered(layers: [
                        (noise: (name: "hills", algorithm: open_simplex2, salt: 10, frequency: 1.0), zoom: 48.0, coefficient: 10.0),
                    ]),
                ),
            ],
            regions: [
                (
                    name: "root",
                    biomes: [
                        (target: "plains", requirements: [
                            noise_range(noise: "climate", ranges: [(-2.0, 2.0)]),
                        ]),
                    ],
                    fallback_biome: Some("plains"),
                ),
            ],
            root_region: "root",
        )"#;
        let def: GenerationDef = ron::from_str(text).unwrap();
        assert_eq!(def.dimension.interpolation_scale, 8.0);
        assert_eq!(def.regions[0].strength_precision, 100.0);
        assert!(def.regions[0].biomes[0].use_default_modifiers);

        let config = def.link(77, &block_registry()).unwrap();
        assert_eq!(config.dimension.biome_layout, BiomeLayout::Flat);
        assert!(config.distributor.classify(0.0, 0.0).is_ok());
    }
}
