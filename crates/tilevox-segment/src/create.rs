use std::collections::VecDeque;

use hashbrown::HashSet;
use tilevox_geom::IVec2;
use tilevox_model::Geometry;
use tilevox_pattern::{PatternDraft, UNCONSTRAINED};
use tilevox_tiles::{Density, Dir, TileId, TileRegistry};

use crate::grid::{Owner, TileGrid};
use crate::shape::Shape;

/// Depth cap, in tiles, of an auto-detected depth.
const DEPTH_TILES: i32 = 4;
/// Largest distinct tile count that is checked for a repeating unit.
const MAX_CYCLE_TILES: usize = 4;

/// Every tile reaches the next through mutually reaching borders.
pub(crate) fn detect_self_connection(shape: &Shape, grid: &TileGrid, registry: &TileRegistry) -> bool {
    if !shape.self_connected() {
        return false;
    }
    let bg = shape.is_background();
    let Some(first) = shape.tiles().first() else {
        return false;
    };
    let mut seen: HashSet<usize> = HashSet::with_capacity(shape.tile_count());
    let mut queue = VecDeque::new();
    let start = grid.tile(bg, *first).index;
    seen.insert(start);
    queue.push_back(start);
    while let Some(index) = queue.pop_front() {
        let Some(here) = grid.cell(bg, index).and_then(|t| t.tile) else {
            continue;
        };
        for dir in Dir::ALL {
            let Some(n) = grid.neighbour(index, dir) else {
                continue;
            };
            let Some(next) = grid.cell(bg, n) else {
                continue;
            };
            if seen.contains(&n) || !shape_owns(shape, grid, n) {
                continue;
            }
            let Some(there) = next.tile else {
                continue;
            };
            if registry.get(here).reaches(dir) && registry.get(there).reaches(dir.opposite()) {
                seen.insert(n);
                queue.push_back(n);
            }
        }
    }
    seen.len() == shape.tile_count()
}

#[inline]
fn shape_owns(shape: &Shape, grid: &TileGrid, index: usize) -> bool {
    grid.cell(shape.is_background(), index)
        .is_some_and(|t| t.owner == Owner::Shape(shape.key()))
}

#[inline]
fn owned_tile(shape: &Shape, grid: &TileGrid, cell: IVec2) -> Option<TileId> {
    grid.cell_at(shape.is_background(), cell)
        .filter(|t| t.owner == Owner::Shape(shape.key()))
        .and_then(|t| t.tile)
}

/// Smallest horizontal and vertical period (1 or 2) at which the shape's tiles repeat.
fn repeating_window(shape: &Shape, grid: &TileGrid) -> IVec2 {
    // 0 = unknown, 1 = repeats, -1 = broken
    let mut h = [0i8; 2];
    let mut v = [0i8; 2];
    let (start, end) = (shape.t_start(), shape.t_end());
    'scan: for y in start.y..=end.y {
        for x in start.x..=end.x {
            let Some(here) = owned_tile(shape, grid, IVec2::new(x, y)) else {
                continue;
            };
            for p in 0..2 {
                let step = p as i32 + 1;
                if h[p] != -1 && x + step <= end.x {
                    if let Some(next) = owned_tile(shape, grid, IVec2::new(x + step, y)) {
                        h[p] = if next == here { 1 } else { -1 };
                    }
                }
                if v[p] != -1 && y + step <= end.y {
                    if let Some(next) = owned_tile(shape, grid, IVec2::new(x, y + step)) {
                        v[p] = if next == here { 1 } else { -1 };
                    }
                }
            }
            if h.iter().chain(v.iter()).all(|c| *c == -1) {
                break 'scan;
            }
        }
    }
    let mut window = shape.t_size();
    if let Some(p) = h.iter().position(|c| *c == 1) {
        window.x = p as i32 + 1;
    }
    if let Some(p) = v.iter().position(|c| *c == 1) {
        window.y = p as i32 + 1;
    }
    window
}

/// Top-left cell of a `window` inside the shape that shows every distinct tile.
fn start_window(shape: &Shape, grid: &TileGrid, window: IVec2) -> IVec2 {
    let (start, end, size) = (shape.t_start(), shape.t_end(), shape.t_size());
    if size.x <= window.x && size.y <= window.y {
        return start;
    }
    let wanted = shape.distinct().len();
    let mut seen: Vec<TileId> = Vec::with_capacity(wanted);
    for sx in start.x..=end.x + 1 - window.x {
        for sy in start.y..=end.y + 1 - window.y {
            if owned_tile(shape, grid, IVec2::new(sx, sy)).is_none() {
                continue;
            }
            seen.clear();
            for x in sx..sx + window.x {
                for y in sy..sy + window.y {
                    if let Some(t) = owned_tile(shape, grid, IVec2::new(x, y)) {
                        if !seen.contains(&t) {
                            seen.push(t);
                        }
                    }
                }
            }
            if seen.len() == wanted {
                return IVec2::new(sx, sy);
            }
        }
    }
    start
}

/// Measures a shape and derives the parameters of the pattern it should create.
pub(crate) fn draft_pattern(
    shape: &Shape,
    grid: &TileGrid,
    registry: &TileRegistry,
    permanent: bool,
) -> PatternDraft {
    let self_connected = detect_self_connection(shape, grid, registry);
    let size = shape.t_size();
    let area = size.area().max(1) as u32;
    let tile_density = Density::from_ratio(shape.tile_count() as u32, area);
    let pixel_density = Density::from_ratio(shape.pixel_count(), area * 64);

    let mut geometry = if shape.all_full_rect() {
        Geometry::Box
    } else {
        Geometry::Default
    };
    let mut constraint = UNCONSTRAINED;
    if geometry == Geometry::Default {
        let single_char = shape.tile_count() == 1
            && shape.distinct().first().is_some_and(|t| registry.get(*t).is_char());
        if single_char {
            constraint = IVec2::ONE;
        } else if shape.is_background() && self_connected {
            let (p0, p1) = (shape.p_start(), shape.p_end());
            geometry = if p1.y - p0.y >= p1.x - p0.x {
                Geometry::VCylinder
            } else {
                Geometry::HCylinder
            };
        }
    }

    let scale = if geometry == Geometry::Default { 2 } else { 8 };
    let depth = DEPTH_TILES.min(size.min_elem()) * scale;

    let window = if matches!(geometry, Geometry::Default | Geometry::Box)
        && shape.distinct().len() <= MAX_CYCLE_TILES
        && shape.tile_count() > 1
    {
        repeating_window(shape, grid)
    } else {
        size
    };
    let origin = start_window(shape, grid, window);
    let mut cells = Vec::with_capacity(window.area() as usize);
    for y in 0..window.y {
        for x in 0..window.x {
            cells.push(owned_tile(shape, grid, origin + IVec2::new(x, y)));
        }
    }

    PatternDraft {
        tiles: shape.distinct().to_vec(),
        permanent,
        constraint,
        window,
        grid: cells,
        pixel_count: shape.pixel_count(),
        colors: shape.colors(),
        tile_density,
        pixel_density,
        self_connected,
        geometry,
        depth,
    }
}
