//! World-side data structures for the Strata generation engine.
//!
//! This crate owns the storage shapes that generation writes into: palette
//! compressed block columns, coarse biome sections, per-chunk snapshots with
//! write-once biome slots, and the per-chunk lock guard used by cross-chunk
//! world stages.

mod chunk;
mod registry;
mod section;
mod snapshot;
mod world;

pub use chunk::{CHUNK_SIZE, ChunkData};
pub use registry::{BlockDef, BlockRegistry, BlockRegistryError, BlockTypeId};
pub use section::{BiomeId, BiomeLayout, BiomeSection, SECTION_SIZE, SECTIONS_PER_AXIS};
pub use snapshot::{ChunkSnapshot, SnapshotError, SnapshotState};
pub use world::{ChunkLockGuard, WorldLockError, WorldSnapshot, pack_chunk_key};
