use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use rayon::prelude::*;
use tilevox_atlas::{AtlasAllocator, AtlasError, AtlasSlot, ColorFormat, TextureData};
use tilevox_geom::{IVec2, IVec3, Vec3};
use tilevox_mesh_cpu::{
    BufferPool, GreedyColoring, MarchingField, MeshBuild, Pooled, Texel, TexelSource, UvVolume,
    mesh_greedy, mesh_marching,
};
use tilevox_tiles::{TILE_SIZE, TileId};

use crate::settings::{LayerSettings, ModelSettings, RenderMode};
use crate::state::{ModelState, SharedState};
use crate::tile3d::Tile3D;
use crate::upload::{ModelUpload, TileMesh, UploadSink};
use crate::{Layer, MAX_DEPTH};

/// Tag matching every model.
pub const ALL_TAG: &str = "*";

/// Extrusion generator used by [`Pattern3D::build`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Geometry {
    /// Constant-depth stack of the texture, or a terraced relief in full-warp mode.
    Default,
    /// Columns of pixels swept into ellipses around the x axis.
    HCylinder,
    /// Rows of pixels swept into ellipses around the y axis.
    VCylinder,
    #[default]
    Box,
    HalfHCylinder,
    HalfVCylinder,
}

/// Vertex-animation parameters forwarded to the render integration.
#[derive(Clone, Debug, PartialEq)]
pub struct Deform {
    pub amplitude: Vec3,
    pub pivot: Vec3,
    pub speed: [[f32; 4]; 4],
    pub phase: [[f32; 4]; 4],
}

impl Default for Deform {
    fn default() -> Self {
        Self {
            amplitude: Vec3::ZERO,
            pivot: Vec3::splat(0.5),
            speed: [[0.0; 4]; 4],
            phase: [[FRAC_PI_2; 4]; 4],
        }
    }
}

impl Deform {
    #[inline]
    pub fn is_animated(&self) -> bool {
        self.amplitude != Vec3::ZERO
    }
}

/// Recycled voxel and mesh buffers shared by every model build.
#[derive(Clone)]
pub struct MeshPools {
    pub volumes: Arc<BufferPool<UvVolume>>,
    pub meshes: Arc<BufferPool<MeshBuild>>,
}

impl MeshPools {
    pub fn new(max_idle: usize) -> Self {
        Self {
            volumes: BufferPool::new(max_idle),
            meshes: BufferPool::new(max_idle),
        }
    }
}

impl Default for MeshPools {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Collaborators of a build.
pub struct BuildContext<'a> {
    pub atlas: &'a mut AtlasAllocator,
    pub pools: &'a MeshPools,
    pub settings: &'a ModelSettings,
    pub sink: &'a dyn UploadSink,
}

/// One renderable 3D variant of a pattern.
pub struct Pattern3D {
    pub geometry: Geometry,
    /// Voxel depth; cylinder builds shrink it to the deepest ellipse drawn.
    pub depth: i32,
    pub layer: Layer,
    pub offset: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub pivot: Vec3,
    pub alpha: f32,
    pub enabled: bool,
    /// Always mesh greedily, whatever the render mode.
    pub force_greedy: bool,
    /// Cylinder sides sample the texture along the profile instead of the projection.
    pub anti_shadow: bool,
    /// Half cylinders bulge towards the other side.
    pub flip: bool,
    /// Cylinders are filled instead of hollow shells.
    pub solid: bool,
    pub full_warp: bool,
    pub deform: Deform,
    tag_str: String,
    tags: Vec<String>,
    texture: Arc<TextureData>,
    tiles: Vec<Tile3D>,
    grid: Vec<Option<usize>>,
    grid_size: IVec2,
    state: SharedState,
}

impl Pattern3D {
    /// A model over a `grid_size` tile window; `grid` is row-major with `None` for holes.
    pub fn new(grid_size: IVec2, grid: &[Option<TileId>], texture: TextureData) -> Self {
        debug_assert_eq!(grid.len(), grid_size.area() as usize);
        let mut tiles: Vec<Tile3D> = Vec::new();
        let mut cells = Vec::with_capacity(grid.len());
        for (i, cell) in grid.iter().enumerate() {
            let Some(id) = *cell else {
                cells.push(None);
                continue;
            };
            let t = match tiles.iter().position(|t| t.tile() == id) {
                Some(t) => t,
                None => {
                    tiles.push(Tile3D::new(id));
                    tiles.len() - 1
                }
            };
            let i = i as i32;
            tiles[t].add_occurrence(IVec2::new(i % grid_size.x, i / grid_size.x) * TILE_SIZE);
            cells.push(Some(t));
        }
        Self {
            geometry: Geometry::Box,
            depth: 0,
            layer: Layer::Unidentified,
            offset: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            pivot: Vec3::splat(0.5),
            alpha: 1.0,
            enabled: true,
            force_greedy: false,
            anti_shadow: false,
            flip: false,
            solid: false,
            full_warp: false,
            deform: Deform::default(),
            tag_str: String::new(),
            tags: Vec::new(),
            texture: Arc::new(texture),
            tiles,
            grid: cells,
            grid_size,
            state: SharedState::default(),
        }
    }

    /// Same parameters and tile layout over a private copy of the texture. The copy
    /// gets its own atlas slot and starts unbuilt.
    pub fn duplicate(&self) -> Pattern3D {
        Pattern3D {
            geometry: self.geometry,
            depth: self.depth,
            layer: self.layer,
            offset: self.offset,
            rotation: self.rotation,
            scale: self.scale,
            pivot: self.pivot,
            alpha: self.alpha,
            enabled: self.enabled,
            force_greedy: self.force_greedy,
            anti_shadow: self.anti_shadow,
            flip: self.flip,
            solid: self.solid,
            full_warp: self.full_warp,
            deform: self.deform.clone(),
            tag_str: self.tag_str.clone(),
            tags: self.tags.clone(),
            texture: Arc::new(self.texture.duplicate()),
            tiles: self.tiles.iter().map(Tile3D::blank_copy).collect(),
            grid: self.grid.clone(),
            grid_size: self.grid_size,
            state: SharedState::default(),
        }
    }

    #[inline]
    pub fn grid_size(&self) -> IVec2 {
        self.grid_size
    }

    /// Extent of the model texture in pixels.
    #[inline]
    pub fn pixel_size(&self) -> IVec2 {
        self.grid_size * TILE_SIZE
    }

    pub fn tiles(&self) -> &[Tile3D] {
        &self.tiles
    }

    pub fn tile3d(&self, tile: TileId) -> Option<&Tile3D> {
        self.tiles.iter().find(|t| t.tile() == tile)
    }

    pub fn texture(&self) -> &Arc<TextureData> {
        &self.texture
    }

    /// Editable texture. The atlas slot is kept; the next build re-stamps it.
    pub fn texture_mut(&mut self) -> &mut TextureData {
        Arc::make_mut(&mut self.texture)
    }

    #[inline]
    pub fn state(&self) -> ModelState {
        self.state.get()
    }

    pub fn shared_state(&self) -> &SharedState {
        &self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.get() == ModelState::Ready
    }

    pub fn tag_str(&self) -> &str {
        &self.tag_str
    }

    /// Replaces the tags; `value` is split on `,`, `;` and whitespace.
    pub fn set_tags(&mut self, value: &str) {
        self.tag_str = value.to_owned();
        self.tags = value
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        tag == ALL_TAG || self.tags.iter().any(|t| t == tag)
    }

    /// World position of a model instance whose inclusive pixel bounds on screen are
    /// `p_start..=p_end`. Screen y is flipped so +y points up.
    pub fn position(
        &self,
        p_start: IVec2,
        p_end: IVec2,
        screen_height: i32,
        background: bool,
        layers: &LayerSettings,
    ) -> Vec3 {
        let slot = layers.slot(layers.resolve(self.layer, background));
        let half = self.depth as f32 / 2.0;
        let v1 = Vec3::new(
            p_start.x as f32,
            (screen_height - p_end.y) as f32,
            slot.offset + half * (slot.coef - 1.0),
        );
        let v2 = Vec3::new(
            (p_end.x + 1) as f32,
            (screen_height - p_start.y + 1) as f32,
            slot.offset + half * (slot.coef + 1.0),
        );
        v1.mul_elem(Vec3::ONE - self.pivot) + v2.mul_elem(self.pivot) + self.offset
    }

    #[inline]
    pub(crate) fn tile_index_at(&self, x: i32, y: i32) -> Option<usize> {
        let size = self.pixel_size();
        if x < 0 || y < 0 || x >= size.x || y >= size.y {
            return None;
        }
        self.grid[((y >> 3) * self.grid_size.x + (x >> 3)) as usize]
    }

    #[inline]
    pub(crate) fn tile_at_mut(&mut self, t: usize) -> &mut Tile3D {
        &mut self.tiles[t]
    }

    /// Texel stored for pattern pixel (x, y) (+y down) at depth `z`, as seen along `axis`.
    /// Only meaningful between the generator and the end of meshing.
    pub fn get_uv(&self, x: i32, y: i32, z: i32, axis: usize) -> Option<Texel> {
        let t = self.tile_index_at(x, y)?;
        self.tiles[t].uv(IVec3::new(x & 7, 7 - (y & 7), z), axis)
    }

    /// Registers the texture, extrudes, meshes and hands the result to `ctx.sink`.
    ///
    /// Runs on the producer thread; the model becomes `Ready` when the upload is
    /// finished on the render thread.
    pub fn build(&mut self, ctx: &mut BuildContext<'_>) -> Result<(), AtlasError> {
        let slot = ctx.atlas.register(&self.texture)?;
        let mode = if self.force_greedy {
            RenderMode::Greedy
        } else {
            ctx.settings.render_mode
        };
        self.depth = self.depth.clamp(0, ctx.settings.max_depth.min(MAX_DEPTH));
        self.state.begin_build();
        self.init_volumes(mode, &ctx.pools.volumes);
        if self.depth > 0 {
            self.generate();
        }
        self.state.set(ModelState::GeoCreated);

        debug_assert_eq!(self.state.get(), ModelState::GeoCreated);
        let meshes = self.mesh_tiles(mode, slot, ctx);
        for (tile, mesh) in self.tiles.iter_mut().zip(meshes) {
            tile.set_mesh(mesh);
            tile.release_volume();
        }
        self.state.set(ModelState::DataCreated);
        log::trace!(
            target: "model",
            "built {:?} {}x{}x{} ({} tiles, {:?})",
            self.geometry,
            self.grid_size.x,
            self.grid_size.y,
            self.depth,
            self.tiles.len(),
            mode
        );

        ctx.sink.submit(self.upload(slot, ctx.atlas.page_size()));
        Ok(())
    }

    pub(crate) fn init_volumes(&mut self, mode: RenderMode, pool: &Arc<BufferPool<UvVolume>>) {
        let depth = self.depth;
        for tile in &mut self.tiles {
            tile.init_data(depth, mode, pool);
        }
    }

    fn mesh_tiles(
        &self,
        mode: RenderMode,
        slot: AtlasSlot,
        ctx: &BuildContext<'_>,
    ) -> Vec<Pooled<MeshBuild>> {
        let texels = AtlasTexels {
            texture: &self.texture,
            slot,
            page_size: ctx.atlas.page_size(),
        };
        let coloring: GreedyColoring = ctx.settings.greedy_coloring.into();
        let pools = ctx.pools;
        let mesh_one = |tile: &Tile3D| {
            let mut out = pools.meshes.acquire();
            out.clear_keep_capacity();
            if let Some(volume) = tile.volume() {
                match mode {
                    RenderMode::Greedy => mesh_greedy(volume, &texels, coloring, &mut out),
                    RenderMode::Marching => {
                        mesh_marching(&TileField { model: self, tile }, &texels, &mut out)
                    }
                }
            }
            out
        };
        if ctx.settings.parallel_mesh {
            self.tiles.par_iter().map(mesh_one).collect()
        } else {
            self.tiles.iter().map(mesh_one).collect()
        }
    }

    fn upload(&self, slot: AtlasSlot, page_size: i32) -> ModelUpload {
        let meshes = self
            .tiles
            .iter()
            .filter_map(|t| {
                t.mesh().map(|mesh| TileMesh {
                    tile: t.tile(),
                    cells: t.cells().to_vec(),
                    mesh: Arc::clone(mesh),
                })
            })
            .collect();
        ModelUpload::new(
            self.texture.id(),
            slot,
            slot.uv_offset(page_size),
            meshes,
            self.state.clone(),
        )
    }

    /// Drops voxel and mesh data and frees the atlas slot.
    pub fn release(&mut self, atlas: &mut AtlasAllocator) {
        self.state.set(ModelState::Released);
        for tile in &mut self.tiles {
            tile.release();
        }
        atlas.deregister(self.texture.id());
    }
}

/// Texture lookups of one build, mapped through the model's atlas slot.
struct AtlasTexels<'a> {
    texture: &'a TextureData,
    slot: AtlasSlot,
    page_size: i32,
}

impl TexelSource for AtlasTexels<'_> {
    fn color(&self, texel: Texel) -> u8 {
        let p = self.texture.pixel(texel.x as i32, texel.y as i32);
        match self.texture.format() {
            ColorFormat::Index => p as u8,
            ColorFormat::Direct => u8::from(p != 0),
        }
    }

    fn coord_to_uv(&self, coord: [f32; 2]) -> [f32; 2] {
        self.slot.coord_to_uv(coord, self.page_size)
    }
}

/// Corner grid of one tile, extended one step into its neighbours through the anchors.
struct TileField<'a> {
    model: &'a Pattern3D,
    tile: &'a Tile3D,
}

impl TileField<'_> {
    fn neighbour_at(&self, v: IVec3) -> bool {
        self.tile
            .pattern_pos(v)
            .is_some_and(|p| self.model.tile_index_at(p.x, p.y).is_some())
    }
}

impl MarchingField for TileField<'_> {
    fn size(&self) -> IVec3 {
        IVec3::new(TILE_SIZE, TILE_SIZE, self.tile.depth())
    }

    fn corner(&self, p: IVec3) -> Option<Texel> {
        if (0..TILE_SIZE).contains(&p.x) && (0..TILE_SIZE).contains(&p.y) {
            return self.tile.uv(p, 0);
        }
        let q = self.tile.pattern_pos(p)?;
        self.model.get_uv(q.x, q.y, q.z, 0)
    }

    // Seam cubes on the left and bottom belong to the neighbour tile when there is one.
    fn skip_cube(&self, o: IVec3) -> bool {
        (o.x == -1 && self.neighbour_at(IVec3::new(-1, o.y.max(0), o.z)))
            || (o.y == -1 && self.neighbour_at(IVec3::new(o.x.max(0), -1, o.z)))
    }
}
