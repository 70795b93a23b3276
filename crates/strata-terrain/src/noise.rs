//! Seeded scalar noise instances, the foundation of every other sampler.
//!
//! A [`NoiseInstance`] pairs an algorithm with a salt and a frequency. The
//! effective seed is derived by mixing the salt into the world seed
//! ([`crate::seed::noise_seed`]), so two instances with different salts never
//! share gradient state even for the same world.

// Leading `::` disambiguates the noise crate from this module.
use ::noise::{NoiseFn, OpenSimplex, Perlin, Simplex};
use serde::{Deserialize, Serialize};

use crate::seed::noise_seed;

/// Closed set of supported noise algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseAlgorithm {
    /// OpenSimplex-family direct noise.
    OpenSimplex2,
    /// Simplex noise.
    Simplex,
    /// Classic Perlin gradient noise.
    Perlin,
}

#[derive(Debug)]
enum Backend {
    OpenSimplex2(OpenSimplex),
    Simplex(Simplex),
    Perlin(Perlin),
}

impl Backend {
    fn sample2(&self, p: [f64; 2]) -> f64 {
        match self {
            Backend::OpenSimplex2(n) => n.get(p),
            Backend::Simplex(n) => n.get(p),
            Backend::Perlin(n) => n.get(p),
        }
    }

    fn sample3(&self, p: [f64; 3]) -> f64 {
        match self {
            Backend::OpenSimplex2(n) => n.get(p),
            Backend::Simplex(n) => n.get(p),
            Backend::Perlin(n) => n.get(p),
        }
    }
}

/// A named, salted, frequency-scaled noise field over 1, 2, or 3 dimensions.
///
/// Output is deterministic and approximately within `[-1, 1]`.
#[derive(Debug)]
pub struct NoiseInstance {
    name: Option<String>,
    algorithm: NoiseAlgorithm,
    salt: u64,
    frequency: f64,
    backend: Backend,
}

impl NoiseInstance {
    /// Creates an instance for the given world seed.
    ///
    /// The underlying generator is seeded with
    /// `noise_seed(world_seed, salt)` truncated to the 32 bits the noise
    /// crate accepts; the full 64-bit mix still feeds the truncation so salt
    /// bits above 32 matter.
    pub fn new(
        name: Option<String>,
        algorithm: NoiseAlgorithm,
        salt: u64,
        frequency: f64,
        world_seed: u64,
    ) -> Self {
        let seed = noise_seed(world_seed, salt) as u32;
        let backend = match algorithm {
            NoiseAlgorithm::OpenSimplex2 => Backend::OpenSimplex2(OpenSimplex::new(seed)),
            NoiseAlgorithm::Simplex => Backend::Simplex(Simplex::new(seed)),
            NoiseAlgorithm::Perlin => Backend::Perlin(Perlin::new(seed)),
        };
        Self {
            name,
            algorithm,
            salt,
            frequency,
            backend,
        }
    }

    /// Optional configuration name of this instance.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The algorithm tag.
    pub fn algorithm(&self) -> NoiseAlgorithm {
        self.algorithm
    }

    /// The salt mixed into the world seed.
    pub fn salt(&self) -> u64 {
        self.salt
    }

    /// The frequency applied to every input coordinate.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Samples the field along one axis.
    pub fn sample_1d(&self, x: f64) -> f64 {
        self.backend.sample2([x * self.frequency, 0.0])
    }

    /// Samples the field over the horizontal plane.
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        self.backend
            .sample2([x * self.frequency, z * self.frequency])
    }

    /// Samples the full 3D field.
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.backend.sample3([
            x * self.frequency,
            y * self.frequency,
            z * self.frequency,
        ])
    }
}
