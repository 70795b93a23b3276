//! Terrain height synthesis: biome-relative surface heights from noise layers.
//!
//! The [`Terrain`] contract is only the signature and determinism; distinct
//! implementations are free to use entirely different formulas. Two are
//! provided: the layered sum the configuration format describes, and a fixed
//! multi-octave fBm blend.

use std::sync::Arc;

use crate::noise::NoiseInstance;

/// Synthesizes a surface height for a world column.
pub trait Terrain: Send + Sync {
    /// Returns the (fractional) surface height at `(x, z)`.
    ///
    /// `biome_weight` is the distributor strength for the column's biome, in
    /// `[0.0, 1.0]`; implementations may use it to flatten toward the base
    /// height near biome borders. Must be deterministic for fixed inputs.
    fn height(&self, x: f64, z: f64, biome_weight: f64) -> f64;
}

/// One noise layer of a [`LayeredTerrain`]: an independent `(zoom,
/// coefficient)` pair over a noise instance.
pub struct TerrainNoiseLayer {
    /// The noise field sampled by this layer.
    pub noise: NoiseInstance,
    /// Input divisor: larger zoom stretches features horizontally.
    pub zoom: f64,
    /// Output multiplier in blocks.
    pub coefficient: f64,
}

/// The standard layered terrain:
/// `height = base_height + Σ noise_i(x / zoom_i, z / zoom_i) * coefficient_i`.
pub struct LayeredTerrain {
    base_height: f64,
    layers: Vec<TerrainNoiseLayer>,
}

impl LayeredTerrain {
    /// Creates a layered terrain around the given biome base height.
    pub fn new(base_height: f64, layers: Vec<TerrainNoiseLayer>) -> Self {
        Self {
            base_height,
            layers,
        }
    }

    /// The biome base height this terrain deviates from.
    pub fn base_height(&self) -> f64 {
        self.base_height
    }
}

impl Terrain for LayeredTerrain {
    fn height(&self, x: f64, z: f64, _biome_weight: f64) -> f64 {
        let mut height = self.base_height;
        for layer in &self.layers {
            height += layer.noise.sample_2d(x / layer.zoom, z / layer.zoom) * layer.coefficient;
        }
        height
    }
}

/// A fixed multi-octave fBm terrain, demonstrating that the [`Terrain`]
/// contract does not prescribe the layered formula.
///
/// The deviation from the base height is scaled by `biome_weight`, so weak
/// classifications relax toward flat ground.
pub struct FbmTerrain {
    base_height: f64,
    noise: NoiseInstance,
    octaves: u32,
    lacunarity: f64,
    persistence: f64,
    amplitude: f64,
}

impl FbmTerrain {
    /// Creates an fBm terrain.
    pub fn new(
        base_height: f64,
        noise: NoiseInstance,
        octaves: u32,
        lacunarity: f64,
        persistence: f64,
        amplitude: f64,
    ) -> Self {
        Self {
            base_height,
            noise,
            octaves,
            lacunarity,
            persistence,
            amplitude,
        }
    }
}

impl Terrain for FbmTerrain {
    fn height(&self, x: f64, z: f64, biome_weight: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = self.amplitude;
        for _ in 0..self.octaves {
            total += self.noise.sample_2d(x * frequency, z * frequency) * amplitude;
            frequency *= self.lacunarity;
            amplitude *= self.persistence;
        }
        self.base_height + total * biome_weight
    }
}

/// Binds a named terrain to the inclusive height band it applies within.
pub struct TerrainLayer {
    /// Configuration name (used in diagnostics).
    pub name: String,
    /// The terrain implementation.
    pub terrain: Arc<dyn Terrain>,
    /// Lowest height this layer shapes (inclusive).
    pub min_y: i32,
    /// Highest height this layer shapes (inclusive).
    pub max_y: i32,
}

impl std::fmt::Debug for TerrainLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainLayer")
            .field("name", &self.name)
            .field("min_y", &self.min_y)
            .field("max_y", &self.max_y)
            .finish_non_exhaustive()
    }
}

/// Vertically stacked terrain shaping: ordered [`TerrainLayer`]s selected by
/// the preliminary surface height.
#[derive(Debug, Default)]
pub struct TerrainStack {
    layers: Vec<TerrainLayer>,
}

impl TerrainStack {
    /// Creates a stack from ordered layers.
    pub fn new(layers: Vec<TerrainLayer>) -> Self {
        Self { layers }
    }

    /// Returns the first layer whose band contains `y`, if any.
    pub fn select(&self, y: i32) -> Option<&TerrainLayer> {
        self.layers
            .iter()
            .find(|layer| y >= layer.min_y && y <= layer.max_y)
    }

    /// Number of layers in the stack.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the stack has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::NoiseAlgorithm;

    fn noise(salt: u64, frequency: f64) -> NoiseInstance {
        NoiseInstance::new(None, NoiseAlgorithm::Simplex, salt, frequency, 1234)
    }

    #[test]
    fn test_layered_formula_exact() {
        let terrain = LayeredTerrain::new(
            64.0,
            vec![
                TerrainNoiseLayer {
                    noise: noise(1, 1.0),
                    zoom: 32.0,
                    coefficient: 12.0,
                },
                TerrainNoiseLayer {
                    noise: noise(2, 1.0),
                    zoom: 8.0,
                    coefficient: 3.0,
                },
            ],
        );
        let (x, z) = (137.0, -52.0);
        let expected = 64.0
            + noise(1, 1.0).sample_2d(x / 32.0, z / 32.0) * 12.0
            + noise(2, 1.0).sample_2d(x / 8.0, z / 8.0) * 3.0;
        assert_eq!(terrain.height(x, z, 1.0), expected);
    }

    #[test]
    fn test_layered_no_layers_is_base_height() {
        let terrain = LayeredTerrain::new(80.0, Vec::new());
        assert_eq!(terrain.height(0.0, 0.0, 1.0), 80.0);
        assert_eq!(terrain.height(1000.0, -1000.0, 0.3), 80.0);
    }

    #[test]
    fn test_layered_deterministic() {
        let a = LayeredTerrain::new(
            64.0,
            vec![TerrainNoiseLayer {
                noise: noise(1, 0.5),
                zoom: 16.0,
                coefficient: 10.0,
            }],
        );
        let b = LayeredTerrain::new(
            64.0,
            vec![TerrainNoiseLayer {
                noise: noise(1, 0.5),
                zoom: 16.0,
                coefficient: 10.0,
            }],
        );
        for i in 0..50 {
            let x = f64::from(i) * 7.7;
            assert_eq!(a.height(x, -x, 1.0), b.height(x, -x, 1.0));
        }
    }

    #[test]
    fn test_fbm_weight_scales_deviation() {
        let terrain = FbmTerrain::new(64.0, noise(3, 0.01), 4, 2.0, 0.5, 20.0);
        let (x, z) = (321.0, 654.0);
        let full = terrain.height(x, z, 1.0) - 64.0;
        let half = terrain.height(x, z, 0.5) - 64.0;
        let zero = terrain.height(x, z, 0.0) - 64.0;
        assert!((half - full * 0.5).abs() < 1e-9);
        assert_eq!(zero, 0.0);
    }

    #[test]
    fn test_stack_selects_first_matching_band() {
        let flat: Arc<dyn Terrain> = Arc::new(LayeredTerrain::new(0.0, Vec::new()));
        let stack = TerrainStack::new(vec![
            TerrainLayer {
                name: "deep".into(),
                terrain: Arc::clone(&flat),
                min_y: -64,
                max_y: 0,
            },
            TerrainLayer {
                name: "surface".into(),
                terrain: Arc::clone(&flat),
                min_y: 0,
                max_y: 128,
            },
            TerrainLayer {
                name: "peaks".into(),
                terrain: flat,
                min_y: 129,
                max_y: 320,
            },
        ]);
        // Band bounds are inclusive; overlap resolves to declaration order.
        assert_eq!(stack.select(-64).map(|l| l.name.as_str()), Some("deep"));
        assert_eq!(stack.select(0).map(|l| l.name.as_str()), Some("deep"));
        assert_eq!(stack.select(1).map(|l| l.name.as_str()), Some("surface"));
        assert_eq!(stack.select(200).map(|l| l.name.as_str()), Some("peaks"));
        assert_eq!(stack.select(321).map(|l| l.name.as_str()), None);
    }
}
