use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, select};

use tilevox::atlas::atlas_channel;
use tilevox::model::RenderMode;
use tilevox::runtime::{EngineError, FramePipeline, PipelineStats, main_thread_queue};
use tilevox::segment::Shape;
use tilevox::{EngineConfig, Scene, SyntheticSource};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Greedy,
    Marching,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Greedy => RenderMode::Greedy,
            Mode::Marching => RenderMode::Marching,
        }
    }
}

#[derive(Parser)]
#[command(name = "tilevox", about = "Turn NES tile frames into layered voxel meshes")]
struct Cli {
    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Number of frames to process
    #[arg(long, default_value_t = 300)]
    frames: u64,
    /// Synthetic scene fed to the pipeline
    #[arg(long, value_enum, default_value_t = Scene::Platformer)]
    scene: Scene,
    /// Overrides model.render_mode from the config
    #[arg(long, value_enum)]
    render_mode: Option<Mode>,
    /// Switch render mode once this frame has been processed
    #[arg(long)]
    switch_at: Option<u64>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Feeds `total` source frames through the pipeline, switching render mode once at `switch_at`.
fn produce(
    pipeline: &mut FramePipeline,
    source: &mut SyntheticSource,
    total: u64,
    switch_at: Option<u64>,
) -> Result<PipelineStats, EngineError> {
    for _ in 0..total {
        let frame = source.next_frame();
        pipeline.process_frame(&frame.tiles, &frame.palette, frame.mask)?;
        if switch_at == Some(pipeline.frame_counter()) {
            let next = match pipeline.settings().model.render_mode {
                RenderMode::Greedy => RenderMode::Marching,
                RenderMode::Marching => RenderMode::Greedy,
            };
            pipeline.set_render_mode(next)?;
        }
    }
    Ok(pipeline.stats())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => match EngineConfig::load_from_path(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("failed to load {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(mode) = cli.render_mode {
        config.model.render_mode = mode.into();
    }
    if let Err(err) = config.validate() {
        log::error!("invalid configuration: {err}");
        return ExitCode::FAILURE;
    }

    let (atlas, mut pages) = atlas_channel(&config.atlas);
    let (queue, drain) = main_thread_queue();
    let mut pipeline = FramePipeline::new(config.pipeline_settings(), atlas, queue);
    let frames = pipeline.frames();
    let tracking = config.tracking.clone();
    let mut source = SyntheticSource::new(cli.scene, &config.video);
    let (done_tx, done_rx) = bounded::<Result<PipelineStats, EngineError>>(1);

    let total = cli.frames;
    let switch_at = cli.switch_at;
    let producer = thread::Builder::new()
        .name("tilevox-producer".into())
        .spawn(move || {
            let result = produce(&mut pipeline, &mut source, total, switch_at);
            let _ = done_tx.send(result);
        });
    let producer = match producer {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("failed to spawn producer: {err}");
            return ExitCode::FAILURE;
        }
    };

    let started = Instant::now();
    let mut ready = 0usize;
    let mut vertices = 0usize;
    let mut page_flushes = 0usize;
    let mut tracked = 0u64;
    let mut last_seen = 0u64;
    let mut followed: Option<Shape> = None;
    let result = loop {
        ready += drain.drain(|upload| {
            vertices += upload
                .meshes
                .iter()
                .map(|m| m.mesh.vertex_count() * m.cells.len())
                .sum::<usize>();
        });
        page_flushes += pages.commit(|_, _| {});

        {
            let online = frames.take_online();
            if online.frame_counter() != last_seen {
                last_seen = online.frame_counter();
                if followed.as_ref().is_some_and(|s| online.track(s, &tracking).is_some()) {
                    tracked += 1;
                }
                followed = online.sprite_shapes().next().cloned();
            }
        }

        select! {
            recv(done_rx) -> msg => break msg.ok(),
            default(Duration::from_millis(4)) => {}
        }
    };
    if producer.join().is_err() {
        log::error!("producer thread panicked");
        return ExitCode::FAILURE;
    }
    ready += drain.drain(|_| {});
    page_flushes += pages.commit(|_, _| {});

    match result {
        Some(Ok(stats)) => {
            log::info!(
                "{} frames in {:.2}s: {} patterns ({} permanent, {} temp), {} atlas slots",
                stats.frame.frame_counter,
                started.elapsed().as_secs_f32(),
                stats.patterns,
                stats.permanent_patterns,
                stats.temp_patterns,
                stats.atlas_slots,
            );
            log::info!(
                "last frame: {} bg shapes, {} sprite shapes, {} splits, {} rollbacks",
                stats.segment.bg_shapes,
                stats.segment.sprite_shapes,
                stats.segment.splits,
                stats.segment.rollbacks,
            );
            log::info!(
                "uploads: {ready} models ready, {vertices} vertices, {page_flushes} page flushes; {tracked} frames tracked a sprite"
            );
            ExitCode::SUCCESS
        }
        Some(Err(err)) => {
            log::error!("pipeline stopped: {err}");
            ExitCode::FAILURE
        }
        None => {
            log::error!("producer exited without a result");
            ExitCode::FAILURE
        }
    }
}
