//! Block registry: maps [`BlockTypeId`] to [`BlockDef`] with name-based lookup.

use rustc_hash::FxHashMap;

/// Unique identifier for a block type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BlockTypeId(pub u16);

impl BlockTypeId {
    /// The air block, present in every world.
    pub const AIR: Self = Self(0);
}

/// Descriptor for a block type the generator can place.
#[derive(Clone, Debug)]
pub struct BlockDef {
    /// Namespaced block name (e.g. "strata:basalt").
    pub name: String,
    /// Whether the block occupies its cell for collision/terrain purposes.
    pub solid: bool,
}

/// Errors that can occur when registering block types.
#[derive(Debug, thiserror::Error)]
pub enum BlockRegistryError {
    /// A block with this name is already registered.
    #[error("duplicate block name: {0}")]
    DuplicateName(String),
}

/// Stores all registered block definitions with O(1) lookup by ID.
///
/// Slot 0 is always air; the registry is created with it pre-registered.
pub struct BlockRegistry {
    blocks: Vec<BlockDef>,
    name_to_id: FxHashMap<String, BlockTypeId>,
}

impl BlockRegistry {
    /// Creates a registry containing only the air block.
    pub fn new() -> Self {
        let mut reg = Self {
            blocks: Vec::new(),
            name_to_id: FxHashMap::default(),
        };
        reg.blocks.push(BlockDef {
            name: "strata:air".into(),
            solid: false,
        });
        reg.name_to_id
            .insert("strata:air".into(), BlockTypeId::AIR);
        reg
    }

    /// Registers a new block definition, returning its assigned [`BlockTypeId`].
    ///
    /// # Errors
    ///
    /// Returns [`BlockRegistryError::DuplicateName`] if a block with the same
    /// name exists.
    pub fn register(&mut self, def: BlockDef) -> Result<BlockTypeId, BlockRegistryError> {
        if self.name_to_id.contains_key(&def.name) {
            return Err(BlockRegistryError::DuplicateName(def.name.clone()));
        }
        let id = BlockTypeId(self.blocks.len() as u16);
        self.name_to_id.insert(def.name.clone(), id);
        self.blocks.push(def);
        Ok(id)
    }

    /// Returns the definition for the given block ID.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn get(&self, id: BlockTypeId) -> &BlockDef {
        &self.blocks[id.0 as usize]
    }

    /// Looks up a block ID by name.
    pub fn lookup_by_name(&self, name: &str) -> Option<BlockTypeId> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the number of registered block types (including air).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
