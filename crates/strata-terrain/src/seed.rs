//! Deterministic seeded generation utilities.
//!
//! Provides the bit-exact avalanche mixer that derives per-chunk and per-noise
//! seeds from the world seed, the per-chunk RNG built on it, and deterministic
//! trigonometry via `libm` so generation is reproducible across platforms.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const MIX_A: u64 = 0x9e37_79b9_7f4a_7c15;
const MIX_B: u64 = 0xbf58_476d_1ce4_e5b9;
const MIX_C: u64 = 0x94d0_49bb_1331_11eb;

/// Mixes a world seed with two coordinates using a fixed avalanche function.
///
/// This is the reproducibility anchor of the whole engine and must stay
/// bit-exact:
///
/// ```text
/// r = seed
/// r ^= x * 0x9e3779b97f4a7c15
/// r ^= z * 0xbf58476d1ce4e5b9
/// r = (r ^ (r >>> 30)) * 0x94d049bb133111eb
/// r = (r ^ (r >>> 27)) * 0x9e3779b97f4a7c15
/// r ^= r >>> 31
/// ```
pub fn mix_seed(seed: u64, x: i64, z: i64) -> u64 {
    let mut r = seed;
    r ^= (x as u64).wrapping_mul(MIX_A);
    r ^= (z as u64).wrapping_mul(MIX_B);
    r = (r ^ (r >> 30)).wrapping_mul(MIX_C);
    r = (r ^ (r >> 27)).wrapping_mul(MIX_A);
    r ^ (r >> 31)
}

/// Derives the effective seed for a salted noise instance:
/// `mix_seed(world_seed, salt, salt <<< 32)`.
///
/// Feeding the salt through both mixer lanes keeps single-bit salt changes
/// fully decorrelated. Identical `(world_seed, salt)` always yields the same
/// value, bit for bit.
pub fn noise_seed(world_seed: u64, salt: u64) -> u64 {
    mix_seed(world_seed, salt as i64, salt.rotate_left(32) as i64)
}

/// Derives a deterministic RNG for chunk `(x, z)`.
///
/// The returned RNG produces an identical sequence for the same
/// `(world_seed, x, z)` triple regardless of thread or platform.
pub fn chunk_rng(world_seed: u64, x: i32, z: i32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(mix_seed(world_seed, x as i64, z as i64))
}

/// Deterministic sine using libm (not platform libc).
#[inline]
pub fn det_sin(x: f64) -> f64 {
    libm::sin(x)
}

/// Deterministic cosine using libm.
#[inline]
pub fn det_cos(x: f64) -> f64 {
    libm::cos(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_mix_seed_known_vectors() {
        // Reference values computed from the literal algorithm above.
        let table: &[(u64, i64, i64, u64)] = &[
            (0, 0, 0, 0x0000_0000_0000_0000),
            (1234, 0, 0, 0x4bff_f1f1_1931_b1ad),
            (1234, 10, -3, 0x2c0d_bcdd_7a3c_2e52),
            (0xdead_beef, -7, 42, 0x7ca7_536d_6bde_1a50),
            (u64::MAX, 1, 1, 0xfda3_5142_1020_7b70),
            (42, i32::MIN as i64, i32::MAX as i64, 0x1aa0_a797_3ec9_b280),
        ];
        for &(seed, x, z, expected) in table {
            assert_eq!(
                mix_seed(seed, x, z),
                expected,
                "mix_seed({seed:#x}, {x}, {z})"
            );
        }
    }

    #[test]
    fn test_noise_seed_known_vectors() {
        assert_eq!(noise_seed(1234, 0), 0x4bff_f1f1_1931_b1ad);
        assert_eq!(noise_seed(1234, 0xab_cdef), 0x2153_993c_39dd_92e4);
        assert_eq!(noise_seed(0, 1), 0x7360_315c_075d_ab5f);
    }

    #[test]
    fn test_mix_seed_sensitive_to_each_input() {
        let base = mix_seed(99, 5, 5);
        assert_ne!(base, mix_seed(100, 5, 5));
        assert_ne!(base, mix_seed(99, 6, 5));
        assert_ne!(base, mix_seed(99, 5, 6));
        // Swapping coordinates must not collide either.
        assert_ne!(mix_seed(99, 1, 2), mix_seed(99, 2, 1));
    }

    #[test]
    fn test_chunk_rng_repeatable() {
        let mut a = chunk_rng(1234, -3, 17);
        let mut b = chunk_rng(1234, -3, 17);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_chunk_rng_differs_between_chunks() {
        let mut a = chunk_rng(1234, 0, 0);
        let mut b = chunk_rng(1234, 0, 1);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn test_det_trig_matches_itself() {
        for i in 0..9 {
            let angle = f64::from(i) * 40.0_f64.to_radians();
            assert_eq!(det_sin(angle), det_sin(angle));
            assert_eq!(det_cos(angle), det_cos(angle));
        }
    }
}
