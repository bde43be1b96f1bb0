use std::sync::Arc;

use tilevox_atlas::{AtlasSlot, TextureId};
use tilevox_geom::IVec2;
use tilevox_mesh_cpu::{MeshBuild, Pooled};
use tilevox_tiles::TileId;

use crate::state::{ModelState, SharedState};

/// Finished mesh data of one tile, with the pattern pixel origins it is drawn at.
#[derive(Clone)]
pub struct TileMesh {
    pub tile: TileId,
    pub cells: Vec<IVec2>,
    pub mesh: Arc<Pooled<MeshBuild>>,
}

/// Everything the render integration needs to turn a built model into draw calls.
///
/// Produced on the building thread; [`ModelUpload::finish`] must run on the thread that
/// owns graphics resources once the meshes are uploaded.
pub struct ModelUpload {
    pub texture: TextureId,
    pub slot: AtlasSlot,
    pub uv_offset: [f32; 2],
    pub meshes: Vec<TileMesh>,
    generation: u32,
    state: SharedState,
}

impl ModelUpload {
    pub(crate) fn new(
        texture: TextureId,
        slot: AtlasSlot,
        uv_offset: [f32; 2],
        meshes: Vec<TileMesh>,
        state: SharedState,
    ) -> Self {
        Self {
            texture,
            slot,
            uv_offset,
            meshes,
            generation: state.generation(),
            state,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Build generation that produced these meshes.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The model was released or rebuilt after this upload was queued.
    pub fn is_stale(&self) -> bool {
        self.state.get() == ModelState::Released || self.state.generation() != self.generation
    }

    /// Marks the model `Ready`. Returns false when it was released or rebuilt while the
    /// upload was queued, in which case the uploaded meshes should be dropped.
    pub fn finish(self) -> bool {
        self.state.finish_upload(self.generation)
    }
}

/// Receiver of finished models; implementations hand them to the render thread.
pub trait UploadSink: Send + Sync {
    fn submit(&self, upload: ModelUpload);
}
