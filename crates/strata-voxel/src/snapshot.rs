//! Mutable, bounded view of one chunk's generation-time state.
//!
//! A [`ChunkSnapshot`] owns the block column plus the coarse biome-section
//! arrays for a chunk while it is being generated. Biome slots are write-once:
//! the engine populates each section exactly once before any stage runs, and a
//! second write to the same slot is a bug that surfaces as
//! [`SnapshotError::SectionAlreadySet`]. Once the snapshot is finished it
//! degrades to a read-only context: block writes are rejected.

use tracing::debug;

use crate::chunk::{CHUNK_SIZE, ChunkData};
use crate::registry::BlockTypeId;
use crate::section::{BiomeLayout, BiomeSection, SECTION_SIZE, SECTIONS_PER_AXIS};

/// Lifecycle of a chunk snapshot as the engine advances it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SnapshotState {
    /// Freshly created; biome sections not yet populated.
    Unpopulated,
    /// All biome sections populated; chunk-local stages may run.
    BiomesPopulated,
    /// All chunk-local stages have been applied.
    StagesApplied,
    /// Generation complete; block writes are rejected.
    Finished,
}

/// Errors raised by snapshot access.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A biome section coordinate is outside the snapshot's section grid.
    #[error("biome section ({sx}, {sy}, {sz}) outside section grid {nx}x{ny}x{nz}")]
    SectionOutOfBounds {
        sx: usize,
        sy: usize,
        sz: usize,
        nx: usize,
        ny: usize,
        nz: usize,
    },
    /// A biome section slot was written twice.
    #[error("biome section ({sx}, {sy}, {sz}) already populated")]
    SectionAlreadySet { sx: usize, sy: usize, sz: usize },
    /// A block coordinate is outside the chunk bounds.
    #[error("block ({x}, {y}, {z}) outside chunk bounds 16x16x[{min_y}, {max_y})")]
    BlockOutOfBounds {
        x: usize,
        y: i32,
        z: usize,
        min_y: i32,
        max_y: i32,
    },
    /// A write was attempted after the snapshot was finished.
    #[error("chunk ({chunk_x}, {chunk_z}) snapshot is finished; writes are rejected")]
    Finished { chunk_x: i32, chunk_z: i32 },
    /// A lifecycle transition was requested out of order.
    #[error("invalid snapshot transition from {from:?} to {to:?}")]
    InvalidTransition { from: SnapshotState, to: SnapshotState },
    /// Biome population was declared complete while slots remain empty.
    #[error("chunk ({chunk_x}, {chunk_z}) has unpopulated biome sections")]
    SectionsIncomplete { chunk_x: i32, chunk_z: i32 },
}

/// Mutable, bounded view of one chunk during generation.
#[derive(Debug)]
pub struct ChunkSnapshot {
    chunk_x: i32,
    chunk_z: i32,
    layout: BiomeLayout,
    blocks: ChunkData,
    /// 4×4 column sections, always maintained (z-major).
    columns: Vec<Option<BiomeSection>>,
    /// 4×4×N cell sections, only allocated for [`BiomeLayout::Volumetric`].
    cells: Vec<Option<BiomeSection>>,
    sections_y: usize,
    state: SnapshotState,
}

impl ChunkSnapshot {
    /// Creates an empty snapshot for chunk `(chunk_x, chunk_z)` over the
    /// world-height band `[min_y, max_y)`.
    pub fn new(chunk_x: i32, chunk_z: i32, min_y: i32, max_y: i32, layout: BiomeLayout) -> Self {
        let blocks = ChunkData::new_air(min_y, max_y);
        let sections_y = blocks.height() / SECTION_SIZE;
        let cells = match layout {
            BiomeLayout::Flat => Vec::new(),
            BiomeLayout::Volumetric => {
                vec![None; SECTIONS_PER_AXIS * SECTIONS_PER_AXIS * sections_y]
            }
        };
        Self {
            chunk_x,
            chunk_z,
            layout,
            blocks,
            columns: vec![None; SECTIONS_PER_AXIS * SECTIONS_PER_AXIS],
            cells,
            sections_y,
            state: SnapshotState::Unpopulated,
        }
    }

    /// Chunk X coordinate.
    pub fn chunk_x(&self) -> i32 {
        self.chunk_x
    }

    /// Chunk Z coordinate.
    pub fn chunk_z(&self) -> i32 {
        self.chunk_z
    }

    /// Lowest stored world Y (inclusive).
    pub fn min_y(&self) -> i32 {
        self.blocks.min_y()
    }

    /// Highest stored world Y (exclusive).
    pub fn max_y(&self) -> i32 {
        self.blocks.max_y()
    }

    /// The biome layout this snapshot stores.
    pub fn layout(&self) -> BiomeLayout {
        self.layout
    }

    /// Number of biome sections along the vertical axis.
    pub fn sections_y(&self) -> usize {
        self.sections_y
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SnapshotState {
        self.state
    }

    /// Returns `true` once [`ChunkSnapshot::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.state == SnapshotState::Finished
    }

    // -- biome sections -----------------------------------------------------

    /// Populates the 4×4 column section at section-relative `(sx, sz)`.
    ///
    /// Slots are write-once; a second write returns
    /// [`SnapshotError::SectionAlreadySet`].
    pub fn set_column_section(
        &mut self,
        sx: usize,
        sz: usize,
        section: BiomeSection,
    ) -> Result<(), SnapshotError> {
        let idx = self.column_index(sx, sz)?;
        if self.columns[idx].is_some() {
            return Err(SnapshotError::SectionAlreadySet { sx, sy: 0, sz });
        }
        self.columns[idx] = Some(section);
        Ok(())
    }

    /// Returns the column section at section-relative `(sx, sz)`, or `None`
    /// if not yet populated.
    pub fn column_section(&self, sx: usize, sz: usize) -> Result<Option<BiomeSection>, SnapshotError> {
        let idx = self.column_index(sx, sz)?;
        Ok(self.columns[idx])
    }

    /// Populates the 4×4×4 cell section at section-relative `(sx, sy, sz)`.
    ///
    /// Only valid for [`BiomeLayout::Volumetric`] snapshots; slots are
    /// write-once like their 2D counterparts.
    pub fn set_cell_section(
        &mut self,
        sx: usize,
        sy: usize,
        sz: usize,
        section: BiomeSection,
    ) -> Result<(), SnapshotError> {
        let idx = self.cell_index(sx, sy, sz)?;
        if self.cells[idx].is_some() {
            return Err(SnapshotError::SectionAlreadySet { sx, sy, sz });
        }
        self.cells[idx] = Some(section);
        Ok(())
    }

    /// Returns the cell section at section-relative `(sx, sy, sz)`.
    pub fn cell_section(
        &self,
        sx: usize,
        sy: usize,
        sz: usize,
    ) -> Result<Option<BiomeSection>, SnapshotError> {
        let idx = self.cell_index(sx, sy, sz)?;
        Ok(self.cells[idx])
    }

    /// Returns the biome context for a block-local position, resolving through
    /// whichever layout the snapshot stores. Biome reads remain legal after
    /// the snapshot is finished.
    pub fn biome_at(&self, x: usize, y: i32, z: usize) -> Result<Option<BiomeSection>, SnapshotError> {
        if !self.blocks.in_bounds(x, y, z) {
            return Err(self.block_oob(x, y, z));
        }
        let sx = x / SECTION_SIZE;
        let sz = z / SECTION_SIZE;
        match self.layout {
            BiomeLayout::Flat => self.column_section(sx, sz),
            BiomeLayout::Volumetric => {
                let sy = (y - self.min_y()) as usize / SECTION_SIZE;
                self.cell_section(sx, sy, sz)
            }
        }
    }

    /// Returns `true` when every biome slot required by the layout is populated.
    pub fn sections_fully_populated(&self) -> bool {
        let columns_done = self.columns.iter().all(Option::is_some);
        match self.layout {
            BiomeLayout::Flat => columns_done,
            BiomeLayout::Volumetric => columns_done && self.cells.iter().all(Option::is_some),
        }
    }

    // -- blocks -------------------------------------------------------------

    /// Returns the block at chunk-local `(x, y, z)` (`y` is a world coordinate).
    pub fn block(&self, x: usize, y: i32, z: usize) -> Result<BlockTypeId, SnapshotError> {
        if !self.blocks.in_bounds(x, y, z) {
            return Err(self.block_oob(x, y, z));
        }
        Ok(self.blocks.get(x, y, z))
    }

    /// Sets the block at chunk-local `(x, y, z)`.
    ///
    /// Rejected with [`SnapshotError::Finished`] once the snapshot is finished.
    pub fn set_block(
        &mut self,
        x: usize,
        y: i32,
        z: usize,
        block: BlockTypeId,
    ) -> Result<(), SnapshotError> {
        if self.is_finished() {
            return Err(SnapshotError::Finished {
                chunk_x: self.chunk_x,
                chunk_z: self.chunk_z,
            });
        }
        if !self.blocks.in_bounds(x, y, z) {
            return Err(self.block_oob(x, y, z));
        }
        self.blocks.set(x, y, z, block);
        Ok(())
    }

    /// Borrow the underlying block column (e.g. for hashing or hand-off).
    pub fn blocks(&self) -> &ChunkData {
        &self.blocks
    }

    // -- lifecycle ----------------------------------------------------------

    /// Marks biome population complete. Requires every slot to be filled.
    pub fn mark_biomes_populated(&mut self) -> Result<(), SnapshotError> {
        self.transition(SnapshotState::Unpopulated, SnapshotState::BiomesPopulated)?;
        if !self.sections_fully_populated() {
            self.state = SnapshotState::Unpopulated;
            return Err(SnapshotError::SectionsIncomplete {
                chunk_x: self.chunk_x,
                chunk_z: self.chunk_z,
            });
        }
        Ok(())
    }

    /// Marks all chunk-local stages applied.
    pub fn mark_stages_applied(&mut self) -> Result<(), SnapshotError> {
        self.transition(SnapshotState::BiomesPopulated, SnapshotState::StagesApplied)
    }

    /// Finishes the snapshot; subsequent block writes are rejected.
    pub fn finish(&mut self) -> Result<(), SnapshotError> {
        self.transition(SnapshotState::StagesApplied, SnapshotState::Finished)?;
        debug!(
            chunk_x = self.chunk_x,
            chunk_z = self.chunk_z,
            "chunk snapshot finished"
        );
        Ok(())
    }

    fn transition(&mut self, from: SnapshotState, to: SnapshotState) -> Result<(), SnapshotError> {
        if self.state != from {
            return Err(SnapshotError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    fn column_index(&self, sx: usize, sz: usize) -> Result<usize, SnapshotError> {
        if sx >= SECTIONS_PER_AXIS || sz >= SECTIONS_PER_AXIS {
            return Err(SnapshotError::SectionOutOfBounds {
                sx,
                sy: 0,
                sz,
                nx: SECTIONS_PER_AXIS,
                ny: 1,
                nz: SECTIONS_PER_AXIS,
            });
        }
        Ok(sx + sz * SECTIONS_PER_AXIS)
    }

    fn cell_index(&self, sx: usize, sy: usize, sz: usize) -> Result<usize, SnapshotError> {
        if self.layout != BiomeLayout::Volumetric
            || sx >= SECTIONS_PER_AXIS
            || sz >= SECTIONS_PER_AXIS
            || sy >= self.sections_y
        {
            return Err(SnapshotError::SectionOutOfBounds {
                sx,
                sy,
                sz,
                nx: SECTIONS_PER_AXIS,
                ny: if self.layout == BiomeLayout::Volumetric {
                    self.sections_y
                } else {
                    0
                },
                nz: SECTIONS_PER_AXIS,
            });
        }
        Ok(sx + sz * SECTIONS_PER_AXIS + sy * SECTIONS_PER_AXIS * SECTIONS_PER_AXIS)
    }

    fn block_oob(&self, x: usize, y: i32, z: usize) -> SnapshotError {
        SnapshotError::BlockOutOfBounds {
            x,
            y,
            z,
            min_y: self.min_y(),
            max_y: self.max_y(),
        }
    }
}

// Keep the unused-constant lint honest: CHUNK_SIZE is the footprint every
// section computation above divides into.
const _: () = assert!(CHUNK_SIZE == SECTION_SIZE * SECTIONS_PER_AXIS);
