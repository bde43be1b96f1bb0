use tilevox_geom::IVec2;
use tilevox_tiles::{Dir, RawTile, TileId};

use crate::settings::VideoSettings;

/// One tile as delivered by the video source.
#[derive(Copy, Clone, Debug)]
pub struct TileRecord {
    /// Screen position of the tile's top-left pixel.
    pub x: i32,
    pub y: i32,
    pub raw: RawTile,
    pub palette: u8,
    pub background: bool,
    pub hidden: bool,
}

/// Grid cell of the tile whose top-left pixel is at (x, y); the grid has a one-cell margin.
#[inline]
pub fn world_to_grid(x: i32, y: i32) -> IVec2 {
    IVec2::new(((x + 7) >> 3) + 1, ((y + 7) >> 3) + 1)
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Owner {
    /// Empty, off-screen or margin cell; never segmented.
    #[default]
    Disabled,
    Free,
    /// Claimed by the shape stored under this key of the frame.
    Shape(usize),
}

#[derive(Copy, Clone, Debug, Default)]
pub struct GridTile {
    pub tile: Option<TileId>,
    pub owner: Owner,
    pub palette: u8,
    pub hidden: bool,
    /// Pixel position on screen.
    pub pos: IVec2,
    /// Cell in the margin grid.
    pub cell: IVec2,
    pub index: usize,
}

impl GridTile {
    #[inline]
    pub fn is_free(&self) -> bool {
        self.owner == Owner::Free
    }
}

/// Background cells in a dense grid plus the frame's sprites, which are only placed in a
/// grid of their own once a shape claims them.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: usize,
    height: usize,
    bg: Vec<GridTile>,
    bg_valid: Vec<usize>,
    sprites: Vec<GridTile>,
    sprite_cells: Vec<Option<usize>>,
}

impl TileGrid {
    pub fn new(video: &VideoSettings) -> Self {
        let width = video.width.max(0) as usize + 2;
        let height = video.height.max(0) as usize + 2;
        let bg = (0..width * height)
            .map(|i| GridTile {
                cell: IVec2::new((i % width) as i32, (i / width) as i32),
                index: i,
                ..GridTile::default()
            })
            .collect();
        Self {
            width,
            height,
            bg,
            bg_valid: Vec::new(),
            sprites: Vec::with_capacity(video.sprite_count),
            sprite_cells: vec![None; width * height],
        }
    }

    /// Disables every cell and drops all sprites.
    pub fn reset(&mut self) {
        for t in &mut self.bg {
            t.tile = None;
            t.owner = Owner::Disabled;
        }
        self.bg_valid.clear();
        self.sprites.clear();
        self.sprite_cells.fill(None);
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn index(&self, cell: IVec2) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 || cell.x as usize >= self.width || cell.y as usize >= self.height {
            return None;
        }
        Some(cell.y as usize * self.width + cell.x as usize)
    }

    #[inline]
    pub fn neighbour(&self, index: usize, dir: Dir) -> Option<usize> {
        let cell = IVec2::new((index % self.width) as i32, (index / self.width) as i32);
        self.index(cell + dir.delta())
    }

    /// Cell on, or next to, the margin.
    #[inline]
    pub fn is_border(&self, cell: IVec2) -> bool {
        cell.x <= 1
            || cell.x + 2 >= self.width as i32
            || cell.y <= 1
            || cell.y + 2 >= self.height as i32
    }

    pub(crate) fn place_background(&mut self, rec: &TileRecord, tile: TileId) -> Option<usize> {
        let index = self.index(world_to_grid(rec.x, rec.y))?;
        let t = &mut self.bg[index];
        t.tile = Some(tile);
        t.owner = Owner::Free;
        t.palette = rec.palette;
        t.hidden = rec.hidden;
        t.pos = IVec2::new(rec.x, rec.y);
        self.bg_valid.push(index);
        Some(index)
    }

    pub(crate) fn place_sprite(&mut self, rec: &TileRecord, tile: TileId) -> Option<usize> {
        let cell = world_to_grid(rec.x, rec.y);
        let index = self.index(cell)?;
        self.sprites.push(GridTile {
            tile: Some(tile),
            owner: Owner::Free,
            palette: rec.palette,
            hidden: rec.hidden,
            pos: IVec2::new(rec.x, rec.y),
            cell,
            index,
        });
        Some(self.sprites.len() - 1)
    }

    /// Background cells that hold a tile this frame, in arrival order.
    pub fn bg_valid(&self) -> &[usize] {
        &self.bg_valid
    }

    pub fn bg(&self) -> &[GridTile] {
        &self.bg
    }

    pub fn sprites(&self) -> &[GridTile] {
        &self.sprites
    }

    /// Tile `r` of a shape: a grid index for background shapes, a sprite index otherwise.
    #[inline]
    pub fn tile(&self, background: bool, r: usize) -> &GridTile {
        if background { &self.bg[r] } else { &self.sprites[r] }
    }

    #[inline]
    pub(crate) fn tile_mut(&mut self, background: bool, r: usize) -> &mut GridTile {
        if background {
            &mut self.bg[r]
        } else {
            &mut self.sprites[r]
        }
    }

    /// Tile occupying grid `index` in the background grid or the sprite grid.
    #[inline]
    pub fn cell(&self, background: bool, index: usize) -> Option<&GridTile> {
        if background {
            self.bg.get(index)
        } else {
            self.sprite_cells
                .get(index)
                .copied()
                .flatten()
                .map(|s| &self.sprites[s])
        }
    }

    #[inline]
    pub fn cell_at(&self, background: bool, cell: IVec2) -> Option<&GridTile> {
        self.index(cell).and_then(|i| self.cell(background, i))
    }

    pub(crate) fn set_sprite_cell(&mut self, sprite: usize) {
        let index = self.sprites[sprite].index;
        self.sprite_cells[index] = Some(sprite);
    }
}
