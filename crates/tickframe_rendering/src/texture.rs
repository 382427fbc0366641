//! Texture records and tile selection.
//!
//! Textures are keyed by a session-local integer handed out in creation
//! order. Each record remembers the name hash it was created under so mods
//! can find it again, and the legacy sampler bits last set for it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tickframe_core::NameRegistry;
use tickframe_shared::constants::TEXTURE_TILES;

use crate::backend::TextureHandle;

/// Legacy "mirror" addressing bit.
pub const LEGACY_ADDRESS_MIRROR: u32 = 0x1;
/// Legacy "clamp" addressing bit.
pub const LEGACY_ADDRESS_CLAMP: u32 = 0x2;

/// Texture filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Nearest texel.
    #[default]
    Point = 0,
    /// Bilinear.
    Linear = 1,
}

/// Texture coordinate addressing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    /// Repeat.
    #[default]
    Wrap = 0,
    /// Repeat mirrored.
    Mirror = 1,
    /// Clamp to edge.
    Clamp = 2,
}

impl AddressMode {
    /// Maps legacy `cms`/`cmt` bits; clamp wins over mirror.
    #[must_use]
    pub const fn from_legacy(bits: u32) -> Self {
        if bits & LEGACY_ADDRESS_CLAMP != 0 {
            Self::Clamp
        } else if bits & LEGACY_ADDRESS_MIRROR != 0 {
            Self::Mirror
        } else {
            Self::Wrap
        }
    }
}

/// Sampler state a shader variant is compiled for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SamplerState {
    /// Filter.
    pub filter: Filter,
    /// Horizontal addressing.
    pub h_address: AddressMode,
    /// Vertical addressing.
    pub v_address: AddressMode,
}

/// One texture known to the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureRecord {
    /// Backend texture, NULL until pixels are uploaded.
    pub handle: TextureHandle,
    /// Name hash the texture was created under.
    pub hash: u64,
    /// Bilinear filtering requested.
    pub linear_filter: bool,
    /// Legacy horizontal addressing bits.
    pub cms: u32,
    /// Legacy vertical addressing bits.
    pub cmt: u32,
}

impl TextureRecord {
    /// Sampler state derived from the legacy bits.
    #[must_use]
    pub const fn sampler(&self) -> SamplerState {
        SamplerState {
            filter: if self.linear_filter { Filter::Linear } else { Filter::Point },
            h_address: AddressMode::from_legacy(self.cms),
            v_address: AddressMode::from_legacy(self.cmt),
        }
    }
}

/// All textures plus the current tile selection.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    records: Vec<TextureRecord>,
    by_hash: HashMap<u64, u32>,
    names: NameRegistry,
    current_tile: usize,
    current_ids: [u32; TEXTURE_TILES],
}

impl TextureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a texture under `name` and returns its key.
    #[allow(clippy::cast_possible_truncation)]
    pub fn create(&mut self, name: &str) -> u32 {
        let key = self.records.len() as u32;
        let hash = self.names.register(name);
        self.records.push(TextureRecord {
            handle: TextureHandle::NULL,
            hash,
            linear_filter: false,
            cms: 0,
            cmt: 0,
        });
        self.by_hash.insert(hash, key);
        key
    }

    /// Selects `key` into `tile` and makes the tile current.
    ///
    /// # Panics
    ///
    /// Panics if `tile` is not a valid tile index.
    pub fn select(&mut self, tile: usize, key: u32) {
        assert!(tile < TEXTURE_TILES, "texture tile {tile} out of range");
        self.current_tile = tile;
        self.current_ids[tile] = key;
    }

    /// Attaches uploaded pixels to the texture selected in the current tile.
    ///
    /// Returns false if the selected key was never created.
    pub fn attach_upload(&mut self, handle: TextureHandle) -> bool {
        let key = self.current_ids[self.current_tile];
        match self.records.get_mut(key as usize) {
            Some(record) => {
                record.handle = handle;
                true
            }
            None => false,
        }
    }

    /// Stores sampler bits on the texture selected in `tile`.
    ///
    /// # Panics
    ///
    /// Panics if `tile` is not a valid tile index.
    pub fn set_sampler(&mut self, tile: usize, linear_filter: bool, cms: u32, cmt: u32) {
        assert!(tile < TEXTURE_TILES, "texture tile {tile} out of range");
        let key = self.current_ids[tile];
        if let Some(record) = self.records.get_mut(key as usize) {
            record.linear_filter = linear_filter;
            record.cms = cms;
            record.cmt = cmt;
        }
    }

    /// Record selected in the current tile.
    #[must_use]
    pub fn current(&self) -> Option<&TextureRecord> {
        self.get(self.current_ids[self.current_tile])
    }

    /// Record for a key.
    #[must_use]
    pub fn get(&self, key: u32) -> Option<&TextureRecord> {
        self.records.get(key as usize)
    }

    /// Backend texture for a name hash (hash → key → handle).
    ///
    /// `None` when the hash is unknown or nothing has been uploaded yet.
    #[must_use]
    pub fn handle_for_hash(&self, hash: u64) -> Option<TextureHandle> {
        let key = *self.by_hash.get(&hash)?;
        self.get(key)
            .map(|record| record.handle)
            .filter(|handle| !handle.is_null())
    }

    /// Texture names seen so far.
    #[must_use]
    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    /// Mutable texture names (override import registers names here).
    pub fn names_mut(&mut self) -> &mut NameRegistry {
        &mut self.names
    }

    /// Number of textures created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no texture was created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickframe_core::hash_name;

    #[test]
    fn test_keys_are_monotonic() {
        let mut textures = TextureRegistry::new();
        assert_eq!(textures.create("a"), 0);
        assert_eq!(textures.create("b"), 1);
        assert_eq!(textures.len(), 2);
        assert_eq!(textures.get(1).unwrap().hash, hash_name("b"));
    }

    #[test]
    fn test_upload_goes_to_current_tile() {
        let mut textures = TextureRegistry::new();
        let a = textures.create("a");
        let b = textures.create("b");
        textures.select(0, a);
        textures.select(1, b);
        assert!(textures.attach_upload(TextureHandle::from_raw(9)));

        assert!(textures.get(a).unwrap().handle.is_null());
        assert_eq!(textures.get(b).unwrap().handle, TextureHandle::from_raw(9));
        assert_eq!(textures.handle_for_hash(hash_name("b")), Some(TextureHandle::from_raw(9)));
        assert_eq!(textures.handle_for_hash(hash_name("a")), None);
    }

    #[test]
    #[should_panic(expected = "texture tile 2 out of range")]
    fn test_select_past_second_tile_panics() {
        let mut textures = TextureRegistry::new();
        let a = textures.create("a");
        textures.select(2, a);
    }

    #[test]
    fn test_legacy_address_bits() {
        assert_eq!(AddressMode::from_legacy(0), AddressMode::Wrap);
        assert_eq!(AddressMode::from_legacy(1), AddressMode::Mirror);
        assert_eq!(AddressMode::from_legacy(2), AddressMode::Clamp);
        assert_eq!(AddressMode::from_legacy(3), AddressMode::Clamp);
    }

    #[test]
    fn test_sampler_from_record() {
        let mut textures = TextureRegistry::new();
        let a = textures.create("a");
        textures.select(0, a);
        textures.set_sampler(0, true, 2, 1);
        let sampler = textures.current().unwrap().sampler();
        assert_eq!(sampler.filter, Filter::Linear);
        assert_eq!(sampler.h_address, AddressMode::Clamp);
        assert_eq!(sampler.v_address, AddressMode::Mirror);
    }
}
