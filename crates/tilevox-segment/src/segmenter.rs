use std::collections::VecDeque;

use tilevox_atlas::AtlasError;
use tilevox_geom::IVec2;
use tilevox_model::BuildContext;
use tilevox_pattern::{Pattern, PatternStore};
use tilevox_tiles::{Dir, PatternId, TileId};

use crate::create::draft_pattern;
use crate::frame::Frame;
use crate::grid::{GridTile, Owner};
use crate::settings::SegmentSettings;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SegmentStats {
    pub bg_shapes: usize,
    pub sprite_shapes: usize,
    /// Speculative shapes that failed the acceptance test and gave their tiles back.
    pub rollbacks: usize,
    pub splits: usize,
    pub bound_existing: usize,
    pub created_permanent: usize,
    pub created_temp: usize,
}

/// Segments the ingested tiles of `frame` into shapes and binds every shape to a pattern,
/// creating and building patterns as needed.
pub fn segment(
    frame: &mut Frame,
    store: &mut PatternStore,
    ctx: &mut BuildContext<'_>,
    settings: &SegmentSettings,
) -> Result<SegmentStats, AtlasError> {
    let mut run = Segmenter {
        frame,
        store,
        ctx,
        settings,
        stats: SegmentStats::default(),
        queue: VecDeque::new(),
    };
    run.background_seeded()?;
    run.background_fresh()?;
    run.background_leftover()?;
    run.frame.mark_background_done();
    run.stats.bg_shapes = run.frame.shape_count();

    run.sprites_fresh()?;
    run.sprites_leftover()?;
    run.stats.sprite_shapes = run.frame.shape_count() - run.stats.bg_shapes;

    log::debug!(
        target: "segment",
        "frame {}: {} bg / {} sprite shapes, {} rollbacks, {} splits",
        run.frame.frame_counter(),
        run.stats.bg_shapes,
        run.stats.sprite_shapes,
        run.stats.rollbacks,
        run.stats.splits
    );
    Ok(run.stats)
}

struct Segmenter<'a, 'b> {
    frame: &'a mut Frame,
    store: &'a mut PatternStore,
    ctx: &'a mut BuildContext<'b>,
    settings: &'a SegmentSettings,
    stats: SegmentStats,
    queue: VecDeque<usize>,
}

impl Segmenter<'_, '_> {
    #[inline]
    fn tile(&self, background: bool, r: usize) -> &GridTile {
        self.frame.grid().tile(background, r)
    }

    #[inline]
    fn reaches(&self, tile: TileId, dir: Dir) -> bool {
        self.store.tiles().get(tile).reaches(dir)
    }

    fn is_permanent(&self, tile: &GridTile) -> bool {
        tile.tile.is_some_and(|t| self.store.tiles().is_permanent(t))
    }

    fn add_tile(&mut self, key: usize, r: usize) {
        self.frame.add_tile(key, r, self.store.tiles());
    }

    /// Free background neighbour of grid cell `index` in `dir` with its tile.
    fn free_neighbour(&self, index: usize, dir: Dir) -> Option<(usize, TileId)> {
        let n = self.frame.grid().neighbour(index, dir)?;
        let tile = &self.frame.grid().bg()[n];
        if !tile.is_free() {
            return None;
        }
        Some((n, tile.tile?))
    }

    /// Keeps the candidates that also use `tile` and accept a shape of `size`.
    /// `connected` tells whether the new tile touches the shape across a seam.
    fn narrow(
        &self,
        candidates: &[PatternId],
        tile: TileId,
        size: IVec2,
        connected: Option<bool>,
    ) -> Vec<PatternId> {
        let registry = self.store.tiles();
        candidates
            .iter()
            .copied()
            .filter(|id| registry.uses_permanent(tile, *id))
            .filter(|id| {
                self.store.get(*id).is_some_and(|p| {
                    p.accepts_size(size) && connected.is_none_or(|c| c || !p.self_connected)
                })
            })
            .collect()
    }

    /// Fewest tiles wins, then the lower handle.
    fn select(&self, candidates: &[PatternId]) -> Option<PatternId> {
        candidates
            .iter()
            .copied()
            .filter_map(|id| self.store.get(id).map(|p| (p.key().len(), id)))
            .min()
            .map(|(_, id)| id)
    }

    /// Pass 1: grow shapes from permanent tiles away from the screen border, keeping only
    /// growth that some known pattern still accepts. Shapes that end up neither solid nor big
    /// are rolled back once the pass is over.
    fn background_seeded(&mut self) -> Result<(), AtlasError> {
        let valid = self.frame.grid().bg_valid().to_vec();
        let mut rollback = Vec::new();
        for &seed in &valid {
            let tile = *self.tile(true, seed);
            let Some(tid) = tile.tile else { continue };
            if !tile.is_free() || !self.is_permanent(&tile) || self.frame.grid().is_border(tile.cell) {
                continue;
            }
            let key = self.frame.new_shape(true);
            let mut candidates = self.store.tiles().permanent_patterns(tid);
            self.add_tile(key, seed);

            self.queue.clear();
            self.queue.push_back(seed);
            while let Some(index) = self.queue.pop_front() {
                let cur = *self.tile(true, index);
                if self.frame.grid().is_border(cur.cell) {
                    continue;
                }
                let Some(cur_tid) = cur.tile else { continue };
                for dir in Dir::ALL {
                    let Some((n, ntid)) = self.free_neighbour(index, dir) else {
                        continue;
                    };
                    if !(self.reaches(cur_tid, dir) && self.reaches(ntid, dir.opposite())) {
                        continue;
                    }
                    let size = self.frame.pending(key).size_with(self.tile(true, n).cell);
                    let next = self.narrow(&candidates, ntid, size, None);
                    if !next.is_empty() {
                        candidates = next;
                        self.add_tile(key, n);
                        self.queue.push_back(n);
                    }
                }
            }

            let shape = self.frame.pending(key);
            let solid_enough = shape.tile_count() >= self.settings.solid_min_tiles
                && shape.distinct().len() >= self.settings.solid_min_distinct
                && shape.is_solid(self.frame.grid());
            if solid_enough || shape.is_big(self.settings) {
                match self.select(&candidates) {
                    Some(pattern) => self.bind(key, pattern),
                    None => self.finish(key)?,
                }
            } else {
                rollback.push(key);
            }
        }
        self.stats.rollbacks += rollback.len();
        for key in rollback {
            self.frame.release_shape(key);
        }
        Ok(())
    }

    /// Pass 2: tiles no permanent pattern knows yet, grown by palette and seam contact.
    /// A split gives tiles back, so the pass rescans until nothing is left.
    fn background_fresh(&mut self) -> Result<(), AtlasError> {
        let valid = self.frame.grid().bg_valid().to_vec();
        let mut i = 0;
        while i < valid.len() {
            let seed = valid[i];
            i += 1;
            let tile = *self.tile(true, seed);
            if !tile.is_free() || self.is_permanent(&tile) {
                continue;
            }
            let Some(tid) = tile.tile else { continue };
            let key = self.frame.new_shape(true);
            self.add_tile(key, seed);

            if !self.store.tiles().get(tid).is_char() {
                self.queue.clear();
                self.queue.push_back(seed);
                while let Some(index) = self.queue.pop_front() {
                    let cur = *self.tile(true, index);
                    let Some(cur_tid) = cur.tile else { continue };
                    for dir in Dir::ALL {
                        let Some((n, ntid)) = self.free_neighbour(index, dir) else {
                            continue;
                        };
                        let next = self.tile(true, n);
                        if self.store.tiles().get(ntid).is_char() || next.palette != cur.palette {
                            continue;
                        }
                        if self.reaches(cur_tid, dir) && self.reaches(ntid, dir.opposite()) {
                            self.add_tile(key, n);
                            self.queue.push_back(n);
                        }
                    }
                }
            }

            if self.process(key, true)? {
                i = 0;
            }
        }
        Ok(())
    }

    /// Pass 3: permanent tiles left over, typically on the screen border. Always bound.
    fn background_leftover(&mut self) -> Result<(), AtlasError> {
        let valid = self.frame.grid().bg_valid().to_vec();
        for &seed in &valid {
            let tile = *self.tile(true, seed);
            let Some(tid) = tile.tile else { continue };
            if !tile.is_free() || !self.is_permanent(&tile) {
                continue;
            }
            let key = self.frame.new_shape(true);
            let mut candidates = self.store.tiles().permanent_patterns(tid);
            self.add_tile(key, seed);

            self.queue.clear();
            self.queue.push_back(seed);
            while let Some(index) = self.queue.pop_front() {
                let Some(cur_tid) = self.tile(true, index).tile else { continue };
                for dir in Dir::ALL {
                    let Some((n, ntid)) = self.free_neighbour(index, dir) else {
                        continue;
                    };
                    let connect = self.reaches(cur_tid, dir) && self.reaches(ntid, dir.opposite());
                    let size = self.frame.pending(key).size_with(self.tile(true, n).cell);
                    let next = self.narrow(&candidates, ntid, size, Some(connect));
                    if !next.is_empty() {
                        candidates = next;
                        self.add_tile(key, n);
                        self.queue.push_back(n);
                    }
                }
            }
            match self.select(&candidates) {
                Some(pattern) => self.bind(key, pattern),
                None => self.finish(key)?,
            }
        }
        Ok(())
    }

    /// Direction from sprite `a` to sprite `b` when they sit side by side on the 8 pixel
    /// lattice with the same palette.
    fn sprite_side(&self, a: usize, b: usize) -> Option<Dir> {
        let (ta, tb) = (self.tile(false, a), self.tile(false, b));
        if ta.palette != tb.palette || ta.tile.is_none() || tb.tile.is_none() {
            return None;
        }
        let (pa, pb) = (ta.pos, tb.pos);
        if pa.y == pb.y && pa.x + 8 == pb.x {
            Some(Dir::Right)
        } else if pa.y == pb.y && pb.x + 8 == pa.x {
            Some(Dir::Left)
        } else if pa.x == pb.x && pa.y + 8 == pb.y {
            Some(Dir::Down)
        } else if pa.x == pb.x && pb.y + 8 == pa.y {
            Some(Dir::Up)
        } else {
            None
        }
    }

    /// Both sprites reach the seam between them.
    fn sprites_touch(&self, a: usize, b: usize, dir: Dir) -> bool {
        match (self.tile(false, a).tile, self.tile(false, b).tile) {
            (Some(ia), Some(ib)) => self.reaches(ia, dir) && self.reaches(ib, dir.opposite()),
            _ => false,
        }
    }

    /// Sprites no permanent pattern knows yet, grown over every free sprite.
    fn sprites_fresh(&mut self) -> Result<(), AtlasError> {
        let count = self.frame.grid().sprites().len();
        for seed in 0..count {
            let tile = *self.tile(false, seed);
            if !tile.is_free() || self.is_permanent(&tile) {
                continue;
            }
            let key = self.frame.new_shape(false);
            self.add_tile(key, seed);
            self.queue.clear();
            self.queue.push_back(seed);
            while let Some(cur) = self.queue.pop_front() {
                for other in 0..count {
                    if !self.tile(false, other).is_free() {
                        continue;
                    }
                    if self.sprite_side(cur, other).is_some_and(|d| self.sprites_touch(cur, other, d)) {
                        self.add_tile(key, other);
                        self.queue.push_back(other);
                    }
                }
            }
            self.process(key, false)?;
        }
        Ok(())
    }

    /// Remaining sprites, narrowed against permanent patterns and always bound.
    fn sprites_leftover(&mut self) -> Result<(), AtlasError> {
        let count = self.frame.grid().sprites().len();
        for seed in 0..count {
            let tile = *self.tile(false, seed);
            let Some(tid) = tile.tile else { continue };
            if !tile.is_free() {
                continue;
            }
            let key = self.frame.new_shape(false);
            let mut candidates = self.store.tiles().permanent_patterns(tid);
            self.add_tile(key, seed);
            self.queue.clear();
            self.queue.push_back(seed);
            while let Some(cur) = self.queue.pop_front() {
                for other in 0..count {
                    let next = *self.tile(false, other);
                    if !next.is_free() {
                        continue;
                    }
                    let (Some(dir), Some(ntid)) = (self.sprite_side(cur, other), next.tile) else {
                        continue;
                    };
                    let connect = self.sprites_touch(cur, other, dir);
                    let size = self.frame.pending(key).size_with(next.cell);
                    let narrowed = self.narrow(&candidates, ntid, size, Some(connect));
                    if !narrowed.is_empty() {
                        candidates = narrowed;
                        self.add_tile(key, other);
                        self.queue.push_back(other);
                    }
                }
            }
            match self.select(&candidates) {
                Some(pattern) => self.bind(key, pattern),
                None => self.finish(key)?,
            }
        }
        Ok(())
    }

    fn bind(&mut self, key: usize, pattern: PatternId) {
        self.frame.bind(key, pattern);
        self.frame.commit(key);
        self.stats.bound_existing += 1;
    }

    /// Splits a big, ragged shape at its first run of complete rows (or columns) and
    /// finishes the piece; otherwise finishes the shape as is. Returns true on a split.
    fn process(&mut self, key: usize, split: bool) -> Result<bool, AtlasError> {
        let shape = self.frame.pending(key);
        if split && shape.is_big(self.settings) && !shape.is_rect_solid() {
            let run = self.solid_run(key);
            if !run.is_empty() {
                let background = shape.is_background();
                self.frame.release_shape(key);
                let piece = self.frame.new_shape(background);
                for r in run {
                    self.add_tile(piece, r);
                }
                self.expand(piece);
                self.stats.splits += 1;
                self.finish(piece)?;
                return Ok(true);
            }
        }
        self.finish(key)?;
        Ok(false)
    }

    /// Grid indices of the first contiguous run of rows (wide shapes) or columns (tall
    /// shapes) the shape owns completely.
    fn solid_run(&self, key: usize) -> Vec<usize> {
        let shape = self.frame.pending(key);
        let grid = self.frame.grid();
        let (start, end) = (shape.t_start(), shape.t_end());
        let rows = shape.t_size().x >= shape.t_size().y;
        let (outer, inner) = if rows {
            (start.y..=end.y, start.x..=end.x)
        } else {
            (start.x..=end.x, start.y..=end.y)
        };
        let at = |o: i32, i: i32| {
            if rows {
                IVec2::new(i, o)
            } else {
                IVec2::new(o, i)
            }
        };
        let mut run = Vec::new();
        for o in outer {
            let line: Option<Vec<usize>> = inner
                .clone()
                .map(|i| {
                    grid.cell_at(shape.is_background(), at(o, i))
                        .filter(|t| t.owner == Owner::Shape(key))
                        .map(|t| t.index)
                })
                .collect();
            match line {
                Some(line) => run.extend(line),
                None if !run.is_empty() => break,
                None => {}
            }
        }
        run
    }

    /// Adds free neighbours whose canonical tile already appears in the shape.
    fn expand(&mut self, key: usize) {
        self.queue.clear();
        self.queue.extend(self.frame.pending(key).tiles().iter().copied());
        while let Some(index) = self.queue.pop_front() {
            for dir in Dir::ALL {
                let Some((n, ntid)) = self.free_neighbour(index, dir) else {
                    continue;
                };
                if self.frame.pending(key).distinct().contains(&ntid) {
                    self.add_tile(key, n);
                    self.queue.push_back(n);
                }
            }
        }
    }

    /// Binds a finished shape to the permanent pattern with its tiles, an unfinished one to
    /// a matching or covering provisional pattern, creating the pattern when none exists.
    fn finish(&mut self, key: usize) -> Result<(), AtlasError> {
        let shape = self.frame.pending(key);
        let pattern_key = shape.pattern_key();
        let finished = shape.is_finished(self.frame.mask(), self.frame.screen_px(), self.settings);
        let existing = if finished {
            self.store.find_permanent(&pattern_key)
        } else {
            self.store
                .find_temp(&pattern_key)
                .or_else(|| self.store.find_temp_superset(&pattern_key))
        };
        match existing {
            Some(pattern) => self.bind(key, pattern),
            None => {
                let pattern = self.create(key, finished)?;
                self.frame.bind(key, pattern);
                self.frame.commit(key);
            }
        }
        Ok(())
    }

    fn create(&mut self, key: usize, permanent: bool) -> Result<PatternId, AtlasError> {
        let draft = draft_pattern(
            self.frame.pending(key),
            self.frame.grid(),
            self.store.tiles(),
            permanent,
        );
        self.frame.set_self_connected(key, draft.self_connected);
        let pattern = Pattern::from_draft(draft, self.store.tiles());
        let id = self.store.insert(pattern, self.ctx.atlas);
        self.store.build(id, self.ctx)?;
        if permanent {
            self.stats.created_permanent += 1;
        } else {
            self.stats.created_temp += 1;
        }
        Ok(id)
    }
}
