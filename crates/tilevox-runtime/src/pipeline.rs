use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tilevox_atlas::{AtlasAllocator, AtlasError, PaletteIndex};
use tilevox_geom::IVec2;
use tilevox_model::{BuildContext, LayerSettings, MeshPools, ModelSettings, RenderMode, UploadSink};
use tilevox_pattern::{PatternStore, StoreStats};
use tilevox_segment::{
    FrameStats, SegmentSettings, SegmentStats, Shape, ShapeInstance, TileRecord, TrackSettings,
    VideoSettings, segment,
};
use tilevox_tiles::PatternId;

use crate::error::EngineError;
use crate::frames::FrameManager;
use crate::layering::auto_layer;
use crate::script::{FrameScript, ScriptSlot, run_scripts};

/// Idle mesh buffers kept per pool.
const POOL_IDLE: usize = 64;

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub video: VideoSettings,
    pub segment: SegmentSettings,
    pub model: ModelSettings,
    pub layers: LayerSettings,
    pub tracking: TrackSettings,
    /// Wait after dropping every model so in-flight uploads can settle.
    pub reset_settle: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            video: VideoSettings::default(),
            segment: SegmentSettings::default(),
            model: ModelSettings::default(),
            layers: LayerSettings::default(),
            tracking: TrackSettings::default(),
            reset_settle: Duration::from_millis(100),
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct PipelineStats {
    pub frame: FrameStats,
    pub segment: SegmentStats,
    pub store: StoreStats,
    pub patterns: usize,
    pub permanent_patterns: usize,
    pub temp_patterns: usize,
    pub atlas_slots: usize,
    pub layer_moves: usize,
    pub frame_ms: u32,
}

/// Producer side of the engine: turns tile frames into published, bound shapes.
///
/// Readers get frames through [`FramePipeline::frames`] from any thread.
pub struct FramePipeline {
    settings: PipelineSettings,
    frames: Arc<FrameManager>,
    store: PatternStore,
    atlas: AtlasAllocator,
    pools: MeshPools,
    sink: Box<dyn UploadSink>,
    scripts: Vec<ScriptSlot>,
    frame_counter: u64,
    stats: PipelineStats,
}

fn atlas_failure(counter: u64, err: AtlasError) -> EngineError {
    log::error!(
        target: "frames",
        "frame {counter}: {err}; increase atlas.page_size or atlas.page_count"
    );
    EngineError::Atlas(err)
}

impl FramePipeline {
    pub fn new(settings: PipelineSettings, atlas: AtlasAllocator, sink: impl UploadSink + 'static) -> Self {
        let frames = Arc::new(FrameManager::new(&settings.video));
        Self {
            settings,
            frames,
            store: PatternStore::new(),
            atlas,
            pools: MeshPools::new(POOL_IDLE),
            sink: Box::new(sink),
            scripts: Vec::new(),
            frame_counter: 0,
            stats: PipelineStats::default(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Shared handle to the double buffer for reader threads.
    pub fn frames(&self) -> Arc<FrameManager> {
        Arc::clone(&self.frames)
    }

    #[inline]
    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut PatternStore {
        &mut self.store
    }

    #[inline]
    pub fn atlas(&self) -> &AtlasAllocator {
        &self.atlas
    }

    pub fn add_script(&mut self, script: Box<dyn FrameScript>) {
        self.scripts.push(ScriptSlot {
            script,
            enabled: true,
        });
    }

    /// Names of the scripts that still run.
    pub fn active_scripts(&self) -> Vec<&str> {
        self.scripts
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.script.name())
            .collect()
    }

    /// Segments one video frame and publishes it. On an atlas failure the frame is discarded
    /// and readers keep the previous one.
    pub fn process_frame(
        &mut self,
        records: &[TileRecord],
        palette: &PaletteIndex,
        mask: IVec2,
    ) -> Result<FrameStats, EngineError> {
        let started = Instant::now();
        self.frame_counter += 1;
        let counter = self.frame_counter;
        let frames = Arc::clone(&self.frames);
        let mut frame = frames.take_offline();
        frame.ingest(records, palette, mask, counter, self.store.tiles_mut());

        let mut ctx = BuildContext {
            atlas: &mut self.atlas,
            pools: &self.pools,
            settings: &self.settings.model,
            sink: self.sink.as_ref(),
        };
        let segmented = segment(&mut frame, &mut self.store, &mut ctx, &self.settings.segment)
            .map_err(|err| atlas_failure(counter, err))?;

        let mut seen: Vec<PatternId> = frame.shapes().filter_map(|s| s.pattern()).collect();
        seen.sort_unstable();
        seen.dedup();
        for id in seen {
            self.store.touch(id, counter);
        }

        let mut layer_moves = 0;
        if self.settings.layers.auto {
            frame.sort_sprites_by_area();
            layer_moves = auto_layer(&frame, &mut self.store, &self.settings.layers);
        }
        frame.sort_by_location();
        run_scripts(&mut self.scripts, &frame, &mut self.store);
        frame.refresh_instances(&self.store, &self.settings.layers);

        let stats = frame.stats();
        frame.publish();

        self.stats = PipelineStats {
            frame: stats,
            segment: segmented,
            store: self.store.stats(),
            patterns: self.store.len(),
            permanent_patterns: self.store.permanent_count(),
            temp_patterns: self.store.temp_count(),
            atlas_slots: self.atlas.live_count(),
            layer_moves,
            frame_ms: started.elapsed().as_millis().min(u128::from(u32::MAX)) as u32,
        };
        log::trace!(
            target: "frames",
            "frame {counter}: {} shapes, {} patterns, {}ms",
            stats.shape_count,
            self.stats.patterns,
            self.stats.frame_ms
        );
        Ok(stats)
    }

    /// Shape of the same kind in the published frame that stands closest to `shape`.
    pub fn track(&self, shape: &Shape) -> Option<Shape> {
        let online = self.frames.take_online();
        online.track(shape, &self.settings.tracking).cloned()
    }

    /// Instances in the published frame carrying `tag`, with their shapes.
    pub fn shapes_by_tag(&self, tag: &str) -> Vec<(Shape, ShapeInstance)> {
        let online = self.frames.take_online();
        online
            .shapes_with_tag(tag)
            .map(|(s, i)| (s.clone(), i.clone()))
            .collect()
    }

    /// Drops every pattern, canonical tile and shape, then waits for uploads to settle.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.store.reset(&mut self.atlas);
        self.atlas.reset();
        self.stats = PipelineStats::default();
        log::info!(target: "frames", "pipeline reset at frame {}", self.frame_counter);
        thread::sleep(self.settings.reset_settle);
    }

    /// Rebuilds every cached model in `mode`.
    pub fn set_render_mode(&mut self, mode: RenderMode) -> Result<(), EngineError> {
        if self.settings.model.render_mode == mode {
            return Ok(());
        }
        self.settings.model.render_mode = mode;
        self.store.release_models(&mut self.atlas);
        thread::sleep(self.settings.reset_settle);
        let mut ctx = BuildContext {
            atlas: &mut self.atlas,
            pools: &self.pools,
            settings: &self.settings.model,
            sink: self.sink.as_ref(),
        };
        self.store
            .build_models(&mut ctx)
            .map_err(|err| atlas_failure(self.frame_counter, err))?;
        log::info!(
            target: "model",
            "render mode {mode:?}, rebuilt {} patterns",
            self.store.len()
        );
        Ok(())
    }

    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    #[inline]
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }
}
