use hashbrown::HashMap;
use slab::Slab;
use tilevox_atlas::{AtlasAllocator, AtlasError};
use tilevox_model::BuildContext;
use tilevox_tiles::{PatternId, TileId, TileRegistry};

use crate::pattern::Pattern;

struct Entry {
    generation: u32,
    pattern: Pattern,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StoreStats {
    pub created: u64,
    pub evicted: u64,
    pub removed: u64,
    pub variants_added: u64,
}

/// Owns every pattern plus the canonical tile registry that links tiles back to them.
///
/// Patterns are keyed by their sorted distinct tile set, once per tier. Handles are
/// generation-checked, so a shape still pointing at an evicted pattern resolves to nothing.
#[derive(Default)]
pub struct PatternStore {
    tiles: TileRegistry,
    entries: Slab<Entry>,
    permanent: HashMap<Vec<TileId>, PatternId>,
    temp: HashMap<Vec<TileId>, PatternId>,
    next_generation: u32,
    stats: StoreStats,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    #[inline]
    pub fn tiles_mut(&mut self) -> &mut TileRegistry {
        &mut self.tiles
    }

    /// Adds `pattern` to its tier and links its tiles.
    ///
    /// A permanent pattern replaces the permanent one with the same key and evicts every
    /// provisional pattern whose tiles it covers. A provisional pattern evicts the
    /// provisional ones it covers, including an equal key.
    pub fn insert(&mut self, pattern: Pattern, atlas: &mut AtlasAllocator) -> PatternId {
        if pattern.is_permanent() {
            if let Some(old) = self.permanent.get(pattern.key()).copied() {
                self.evict(old, atlas);
            }
        }
        let covered: Vec<PatternId> = self
            .temp
            .iter()
            .filter(|(key, _)| pattern.covers(key))
            .map(|(_, id)| *id)
            .collect();
        for id in covered {
            self.evict(id, atlas);
        }

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let permanent = pattern.is_permanent();
        let key = pattern.key().to_vec();
        let index = self.entries.insert(Entry {
            generation,
            pattern,
        });
        let id = PatternId::new(index as u32, generation);
        for tile in &key {
            self.tiles.link(*tile, id, permanent);
        }
        log::debug!(
            target: "patterns",
            "new {} pattern {:?} over {} tiles",
            if permanent { "permanent" } else { "temp" },
            id,
            key.len()
        );
        if permanent {
            self.permanent.insert(key, id);
        } else {
            self.temp.insert(key, id);
        }
        self.stats.created += 1;
        id
    }

    fn evict(&mut self, id: PatternId, atlas: &mut AtlasAllocator) {
        if self.take(id, atlas) {
            self.stats.evicted += 1;
        }
    }

    /// Releases the pattern's models and unlinks its tiles. False for a stale handle.
    pub fn remove(&mut self, id: PatternId, atlas: &mut AtlasAllocator) -> bool {
        let removed = self.take(id, atlas);
        if removed {
            self.stats.removed += 1;
        }
        removed
    }

    fn take(&mut self, id: PatternId, atlas: &mut AtlasAllocator) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let mut entry = self.entries.remove(id.index as usize);
        let permanent = entry.pattern.is_permanent();
        for tile in entry.pattern.key() {
            self.tiles.unlink(*tile, id, permanent);
        }
        if permanent {
            self.permanent.remove(entry.pattern.key());
        } else {
            self.temp.remove(entry.pattern.key());
        }
        entry.pattern.release(atlas);
        log::trace!(target: "patterns", "removed pattern {:?}", id);
        true
    }

    #[inline]
    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .map(|e| &e.pattern)
    }

    #[inline]
    pub fn get_mut(&mut self, id: PatternId) -> Option<&mut Pattern> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .map(|e| &mut e.pattern)
    }

    pub fn contains(&self, id: PatternId) -> bool {
        self.get(id).is_some()
    }

    /// Permanent pattern with exactly these tiles; `key` must be sorted and deduplicated.
    pub fn find_permanent(&self, key: &[TileId]) -> Option<PatternId> {
        self.permanent.get(key).copied()
    }

    pub fn find_temp(&self, key: &[TileId]) -> Option<PatternId> {
        self.temp.get(key).copied()
    }

    /// Smallest provisional pattern whose tiles include all of `key`; ties go to the lower handle.
    pub fn find_temp_superset(&self, key: &[TileId]) -> Option<PatternId> {
        self.temp
            .iter()
            .filter_map(|(_, id)| self.get(*id).map(|p| (p, *id)))
            .filter(|(p, _)| p.covers(key))
            .min_by_key(|(p, id)| (p.key().len(), *id))
            .map(|(_, id)| id)
    }

    /// Builds every variant of the pattern.
    pub fn build(&mut self, id: PatternId, ctx: &mut BuildContext<'_>) -> Result<(), AtlasError> {
        match self.get_mut(id) {
            Some(pattern) => pattern.build(ctx),
            None => Ok(()),
        }
    }

    /// Clones variant `from` of the pattern into a new, built variant.
    pub fn add_variant(
        &mut self,
        id: PatternId,
        from: usize,
        ctx: &mut BuildContext<'_>,
    ) -> Result<Option<usize>, AtlasError> {
        let Some(pattern) = self.get_mut(id) else {
            return Ok(None);
        };
        if from >= pattern.variant_count() {
            return Ok(None);
        }
        let index = pattern.add_variant(from, ctx)?;
        self.stats.variants_added += 1;
        Ok(Some(index))
    }

    /// Removes a variant; removing the last one removes the whole pattern.
    pub fn remove_variant(&mut self, id: PatternId, index: usize, atlas: &mut AtlasAllocator) -> bool {
        let Some(pattern) = self.get_mut(id) else {
            return false;
        };
        if index >= pattern.variant_count() {
            return false;
        }
        if pattern.remove_variant(index, atlas) {
            true
        } else {
            self.remove(id, atlas)
        }
    }

    /// Frees every model while keeping the patterns themselves.
    pub fn release_models(&mut self, atlas: &mut AtlasAllocator) {
        for (_, entry) in &mut self.entries {
            entry.pattern.release(atlas);
        }
    }

    /// Rebuilds every model, e.g. after the render mode changed. Stops at the first atlas error.
    pub fn build_models(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), AtlasError> {
        for (_, entry) in &mut self.entries {
            entry.pattern.build(ctx)?;
        }
        Ok(())
    }

    /// Drops all patterns and forgets every canonical tile.
    pub fn reset(&mut self, atlas: &mut AtlasAllocator) {
        let count = self.entries.len();
        for (_, entry) in &mut self.entries {
            entry.pattern.release(atlas);
        }
        self.entries.clear();
        self.permanent.clear();
        self.temp.clear();
        self.tiles.clear();
        log::info!(target: "patterns", "reset, dropped {count} patterns");
    }

    /// Records that the pattern is on screen in `frame`.
    pub fn touch(&mut self, id: PatternId, frame: u64) {
        if let Some(pattern) = self.get_mut(id) {
            pattern.lifecycle.touch(frame);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatternId, &Pattern)> + '_ {
        self.entries
            .iter()
            .map(|(i, e)| (PatternId::new(i as u32, e.generation), &e.pattern))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn permanent_count(&self) -> usize {
        self.permanent.len()
    }

    pub fn temp_count(&self) -> usize {
        self.temp.len()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }
}
