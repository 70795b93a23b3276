//! Palette-compressed block storage for a 16×16 chunk column.
//!
//! The vertical extent is dimension-defined (`[min_y, max_y)`), so storage is
//! sized at construction rather than being a fixed cube. Blocks are stored as
//! bit-packed indices into a per-chunk palette; the bit width scales with the
//! number of distinct block types present, so a freshly generated air column
//! costs no index storage at all.

use serde::{Deserialize, Serialize};

use crate::registry::BlockTypeId;

/// Horizontal side length of a chunk in blocks.
pub const CHUNK_SIZE: usize = 16;

/// Palette-compressed block storage for one chunk column.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkData {
    /// Lowest world Y stored by this column (inclusive).
    min_y: i32,
    /// Highest world Y stored by this column (exclusive).
    max_y: i32,
    /// Palette mapping local indices to global [`BlockTypeId`] values.
    palette: Vec<BlockTypeId>,
    /// Bit-packed block indices into the palette, little-endian within words.
    words: Vec<u64>,
    /// Current bits per index (0, 2, 4, 8, or 16).
    bit_width: u8,
}

impl ChunkData {
    /// Creates a column spanning `[min_y, max_y)` filled with the given block.
    ///
    /// # Panics
    ///
    /// Panics if `max_y <= min_y` or the height is not a multiple of 4
    /// (biome sections must tile the band exactly).
    pub fn new(min_y: i32, max_y: i32, fill: BlockTypeId) -> Self {
        assert!(
            max_y > min_y,
            "invalid height band [{min_y}, {max_y}): max_y must exceed min_y"
        );
        assert!(
            (max_y - min_y) % 4 == 0,
            "height band [{min_y}, {max_y}) is not section-aligned"
        );
        Self {
            min_y,
            max_y,
            palette: vec![fill],
            words: Vec::new(),
            bit_width: 0,
        }
    }

    /// Creates a column spanning `[min_y, max_y)` filled with air.
    pub fn new_air(min_y: i32, max_y: i32) -> Self {
        Self::new(min_y, max_y, BlockTypeId::AIR)
    }

    /// Lowest stored world Y (inclusive).
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Highest stored world Y (exclusive).
    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Number of blocks along the vertical axis.
    pub fn height(&self) -> usize {
        (self.max_y - self.min_y) as usize
    }

    /// Total number of blocks stored.
    pub fn volume(&self) -> usize {
        CHUNK_SIZE * CHUNK_SIZE * self.height()
    }

    /// Returns `true` if `(x, y, z)` addresses a stored block. `x` and `z`
    /// are chunk-local, `y` is a world coordinate.
    pub fn in_bounds(&self, x: usize, y: i32, z: usize) -> bool {
        x < CHUNK_SIZE && z < CHUNK_SIZE && y >= self.min_y && y < self.max_y
    }

    /// Returns the block at `(x, y, z)`.
    ///
    /// # Panics
    ///
    /// Panics with coordinate context if the position is out of bounds.
    pub fn get(&self, x: usize, y: i32, z: usize) -> BlockTypeId {
        let index = self.linear_index(x, y, z);
        if self.bit_width == 0 {
            return self.palette[0];
        }
        let palette_index = self.read_index(index);
        self.palette[palette_index]
    }

    /// Sets the block at `(x, y, z)`, growing the palette (and index width)
    /// if `block` is not yet present.
    ///
    /// # Panics
    ///
    /// Panics with coordinate context if the position is out of bounds.
    pub fn set(&mut self, x: usize, y: i32, z: usize, block: BlockTypeId) {
        let palette_idx = self.palette_index_or_insert(block);
        let index = self.linear_index(x, y, z);
        if self.bit_width == 0 {
            // Still uniform: writing the fill type is a no-op.
            return;
        }
        self.write_index(index, palette_idx);
    }

    /// Number of entries in the palette.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// Current bits per block index.
    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Approximate bytes used by index storage.
    pub fn storage_bytes(&self) -> usize {
        self.words.len() * 8
    }

    fn linear_index(&self, x: usize, y: i32, z: usize) -> usize {
        assert!(
            self.in_bounds(x, y, z),
            "block ({x}, {y}, {z}) outside chunk bounds 16x16x[{}, {})",
            self.min_y,
            self.max_y
        );
        let ly = (y - self.min_y) as usize;
        x + z * CHUNK_SIZE + ly * CHUNK_SIZE * CHUNK_SIZE
    }

    fn read_index(&self, index: usize) -> usize {
        let bits = self.bit_width as usize;
        let per_word = 64 / bits;
        let word = self.words[index / per_word];
        let shift = (index % per_word) * bits;
        let mask = (1u64 << bits) - 1;
        ((word >> shift) & mask) as usize
    }

    fn write_index(&mut self, index: usize, value: usize) {
        let bits = self.bit_width as usize;
        let per_word = 64 / bits;
        let shift = (index % per_word) * bits;
        let mask = (1u64 << bits) - 1;
        let word = &mut self.words[index / per_word];
        *word = (*word & !(mask << shift)) | ((value as u64 & mask) << shift);
    }

    fn word_count(volume: usize, bits: usize) -> usize {
        if bits == 0 {
            return 0;
        }
        let per_word = 64 / bits;
        volume.div_ceil(per_word)
    }

    fn bits_for_palette_size(size: usize) -> u8 {
        match size {
            0 | 1 => 0,
            2..=4 => 2,
            5..=16 => 4,
            17..=256 => 8,
            _ => 16,
        }
    }

    fn palette_index_or_insert(&mut self, block: BlockTypeId) -> usize {
        if let Some(idx) = self.palette.iter().position(|&b| b == block) {
            return idx;
        }
        let new_bits = Self::bits_for_palette_size(self.palette.len() + 1);
        if new_bits != self.bit_width {
            self.widen_storage(new_bits);
        }
        let idx = self.palette.len();
        self.palette.push(block);
        idx
    }

    /// Rebuilds index storage at a wider bit width, preserving contents.
    fn widen_storage(&mut self, new_bits: u8) {
        let volume = self.volume();
        let old_bits = self.bit_width;
        let old_words = std::mem::replace(
            &mut self.words,
            vec![0u64; Self::word_count(volume, new_bits as usize)],
        );
        self.bit_width = new_bits;
        if old_bits == 0 {
            // Uniform column: every index was 0, and the new words are zeroed.
            return;
        }
        let per_word = 64 / old_bits as usize;
        let mask = (1u64 << old_bits) - 1;
        for i in 0..volume {
            let old = (old_words[i / per_word] >> ((i % per_word) * old_bits as usize)) & mask;
            self.write_index(i, old as usize);
        }
    }
}
