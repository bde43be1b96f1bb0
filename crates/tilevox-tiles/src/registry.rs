use hashbrown::{HashMap, HashSet};

use crate::ids::{PatternId, TileId};
use crate::raw::RawTile;
use crate::tile::CanonicalTile;

#[derive(Default, Debug, Clone)]
struct TileLinks {
    permanent: HashSet<PatternId>,
    temp: HashSet<PatternId>,
}

/// Deduplicating store of canonical tiles plus the tile -> pattern back-references.
///
/// Tiles are never removed individually; [`TileRegistry::clear`] drops everything at once.
#[derive(Default, Debug)]
pub struct TileRegistry {
    tiles: Vec<CanonicalTile>,
    links: Vec<TileLinks>,
    index: HashMap<RawTile, TileId>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical tile for `raw`, analyzing and inserting it on first sight.
    pub fn intern(&mut self, raw: RawTile) -> TileId {
        let key = raw.normalized();
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = TileId(self.tiles.len() as u32);
        self.tiles.push(CanonicalTile::analyze(key));
        self.links.push(TileLinks::default());
        self.index.insert(key, id);
        log::trace!(target: "tiles", "new canonical tile {:?} ({} total)", id, self.tiles.len());
        id
    }

    pub fn lookup(&self, raw: &RawTile) -> Option<TileId> {
        self.index.get(&raw.normalized()).copied()
    }

    #[inline]
    pub fn get(&self, id: TileId) -> &CanonicalTile {
        &self.tiles[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn link(&mut self, tile: TileId, pattern: PatternId, permanent: bool) {
        let links = &mut self.links[tile.index()];
        if permanent {
            links.permanent.insert(pattern);
        } else {
            links.temp.insert(pattern);
        }
    }

    pub fn unlink(&mut self, tile: TileId, pattern: PatternId, permanent: bool) {
        let links = &mut self.links[tile.index()];
        if permanent {
            links.permanent.remove(&pattern);
        } else {
            links.temp.remove(&pattern);
        }
    }

    /// Permanent patterns using `tile`, sorted by handle for deterministic iteration.
    pub fn permanent_patterns(&self, tile: TileId) -> Vec<PatternId> {
        let mut out: Vec<PatternId> = self.links[tile.index()].permanent.iter().copied().collect();
        out.sort_unstable();
        out
    }

    #[inline]
    pub fn uses_permanent(&self, tile: TileId, pattern: PatternId) -> bool {
        self.links[tile.index()].permanent.contains(&pattern)
    }

    /// Some permanent pattern already covers this tile.
    #[inline]
    pub fn is_permanent(&self, tile: TileId) -> bool {
        !self.links[tile.index()].permanent.is_empty()
    }

    #[inline]
    pub fn is_temp(&self, tile: TileId) -> bool {
        !self.links[tile.index()].temp.is_empty()
    }

    /// Not referenced by any pattern yet.
    #[inline]
    pub fn is_new(&self, tile: TileId) -> bool {
        !self.is_permanent(tile) && !self.is_temp(tile)
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.links.clear();
        self.index.clear();
    }
}
