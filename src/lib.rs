//! Top-level engine: owns every resource system and the async loader, and
//! drives the per-frame render graph lifecycle (§4.9 of the spec).

pub mod error;
pub mod graph;
pub mod handle;
pub mod ids;
pub mod loader;
pub mod resources;
pub mod rhi;
pub mod types;

use derive_builder::Builder;

use crate::graph::{compile, RenderGraphBuilder};
use crate::ids::RenderTargetHandle;
use crate::loader::AsyncLoader;
use crate::resources::material::MaterialSystem;
use crate::resources::mesh::MeshSystem;
use crate::resources::render_pass::RenderPassCache;
use crate::resources::render_state::RenderStateCache;
use crate::resources::render_target::RenderTargetSystem;
use crate::resources::shader::ShaderSystem;
use crate::resources::texture::TextureSystem;
use crate::rhi::Rhi;
use crate::types::FrameData;

/// Slot table capacity used when a config doesn't override it, mirroring
/// the teacher's `BLOCK_SIZE`/`CHUNK_SIZE` fixed-size constants.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Construction-time configuration for an [`Engine`] (§1.1 "Configuration").
/// Not sourced from a file: the host application builds one of these
/// directly, the same way the teacher's binary crates pass concrete
/// numbers into `RenderingContext::new` rather than loading them from YAML.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct EngineConfig {
    #[builder(default = "num_worker_threads_default()")]
    pub worker_threads: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub shader_capacity: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub texture_capacity: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub mesh_capacity: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub material_capacity: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub render_pass_capacity: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub render_state_capacity: usize,
    #[builder(default = "DEFAULT_CAPACITY")]
    pub render_target_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigBuilder::default().build().expect("every field has a default")
    }
}

fn num_worker_threads_default() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Owns every resource system and the async loader (§9 "Global resource
/// systems"). Constructed once at startup; fields drop in declaration
/// order, tearing down the resource systems before the loader's worker
/// pool, which in turn outlives them all while jobs it already queued
/// finish draining.
pub struct Engine {
    pub shaders: ShaderSystem,
    pub textures: TextureSystem,
    pub meshes: MeshSystem,
    pub materials: MaterialSystem,
    pub render_passes: RenderPassCache,
    pub render_states: RenderStateCache,
    pub render_targets: RenderTargetSystem,
    loader: AsyncLoader,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        let loader = AsyncLoader::new(config.worker_threads);
        let pool = loader.pool();
        Engine {
            shaders: ShaderSystem::new(config.shader_capacity),
            textures: TextureSystem::new(config.texture_capacity, pool.clone()),
            meshes: MeshSystem::new(config.mesh_capacity, pool),
            materials: MaterialSystem::new(config.material_capacity),
            render_passes: RenderPassCache::new(config.render_pass_capacity),
            render_states: RenderStateCache::new(config.render_state_capacity),
            render_targets: RenderTargetSystem::new(config.render_target_capacity),
            loader,
        }
    }

    /// An engine whose async loads run synchronously at submission time.
    /// Intended for tests and host tooling that want deterministic,
    /// immediate completion without a background thread pool.
    pub fn new_inline(config: &EngineConfig) -> Self {
        let loader = AsyncLoader::new_inline();
        let pool = loader.pool();
        Engine {
            shaders: ShaderSystem::new(config.shader_capacity),
            textures: TextureSystem::new(config.texture_capacity, pool.clone()),
            meshes: MeshSystem::new(config.mesh_capacity, pool),
            materials: MaterialSystem::new(config.material_capacity),
            render_passes: RenderPassCache::new(config.render_pass_capacity),
            render_states: RenderStateCache::new(config.render_state_capacity),
            render_targets: RenderTargetSystem::new(config.render_target_capacity),
            loader,
        }
    }

    /// Drain every resource system's completed disk jobs into their slots,
    /// uploading textures and transitioning load states as needed. Must run
    /// on the main thread, once per frame, before `render_frame` (§4.5).
    pub fn run_main_thread_jobs(&self, rhi: &mut dyn Rhi) {
        self.textures.process_pending_loads(rhi);
        self.meshes.process_pending_loads();
    }

    /// Build, compile and execute one frame's render graph (§4.9).
    ///
    /// `build` is handed a fresh [`RenderGraphBuilder`] to declare this
    /// frame's passes against, after `color`/`depth` have been imported
    /// under the well-known viewport names.
    pub fn render_frame(
        &self,
        rhi: &mut dyn Rhi,
        dt: f32,
        frame_data: FrameData,
        color: RenderTargetHandle,
        depth: RenderTargetHandle,
        build: impl FnOnce(&mut RenderGraphBuilder),
    ) {
        let mut builder = RenderGraphBuilder::new();
        builder.import_render_target(crate::types::WELL_KNOWN_VIEWPORT_COLOR, color);
        builder.import_render_target(crate::types::WELL_KNOWN_VIEWPORT_DEPTH, depth);
        build(&mut builder);

        let plan = match compile(builder, &self.render_passes, rhi) {
            Ok(plan) => plan,
            Err(err) => {
                log::error!("render graph compile failed, skipping frame: {}", err);
                return;
            }
        };
        if plan.is_empty() {
            log::debug!("render graph compiled to an empty plan, skipping frame");
            return;
        }

        if !rhi.begin_frame(dt) {
            log::warn!("begin_frame reported a transient failure, skipping frame");
            return;
        }

        crate::graph::executor::execute(
            &plan,
            &self.render_passes,
            &self.render_states,
            &self.render_targets,
            rhi,
            frame_data,
        );

        if !rhi.end_frame(dt) {
            log::warn!("end_frame reported a transient failure");
        }
    }

    pub fn shutdown(&self, rhi: &mut dyn Rhi) {
        rhi.wait_idle();
    }

    /// The worker pool backing every resource system's async loads.
    pub fn loader(&self) -> &AsyncLoader {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::pass::{PassRecorder, PassRenderer};
    use crate::resources::render_pass::RenderPassConfig;
    use crate::resources::render_target::RenderTargetConfig;
    use crate::rhi::NullRhi;
    use crate::types::{Matrix4, PixelFormat, RenderPassType, RenderTargetUsage, SizingPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct ForwardPass {
        executed: StdArc<AtomicUsize>,
    }

    impl PassRenderer for ForwardPass {
        fn setup(&self, recorder: &mut PassRecorder) {
            recorder.writes_to_color_buffer();
        }

        fn execute(&self, _ctx: &mut crate::graph::pass::RenderContext) {
            self.executed.fetch_add(1, Ordering::Relaxed);
        }

        fn render_pass_config(&self) -> RenderPassConfig {
            RenderPassConfig {
                name: "forward".into(),
                pass_type: RenderPassType::ForwardOpaque,
                attachments: vec![],
            }
        }

        fn name(&self) -> &str {
            "forward"
        }
    }

    fn frame_data() -> FrameData {
        FrameData {
            delta_time: 0.016,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }

    #[test]
    fn default_config_fills_in_every_field() {
        let config = EngineConfig::default();
        assert_eq!(config.shader_capacity, DEFAULT_CAPACITY);
        assert!(config.worker_threads >= 1);
    }

    #[test]
    fn render_frame_runs_a_single_standalone_pass() {
        let engine = Engine::new_inline(&EngineConfig::default());
        let mut rhi = NullRhi::new();

        let color = engine
            .render_targets
            .create(
                RenderTargetConfig {
                    name: "viewport.color".into(),
                    format: PixelFormat::SwapchainColor,
                    usage: RenderTargetUsage::Color,
                    sizing_policy: SizingPolicy::RelativeToViewport,
                    width: 1.0,
                    height: 1.0,
                },
                &mut rhi,
            )
            .unwrap();
        let depth = engine
            .render_targets
            .create(
                RenderTargetConfig {
                    name: "viewport.depth".into(),
                    format: PixelFormat::SwapchainDepth,
                    usage: RenderTargetUsage::DepthStencil,
                    sizing_policy: SizingPolicy::RelativeToViewport,
                    width: 1.0,
                    height: 1.0,
                },
                &mut rhi,
            )
            .unwrap();

        let executed = StdArc::new(AtomicUsize::new(0));
        let pass_executed = executed.clone();
        engine.render_frame(&mut rhi, 0.016, frame_data(), color, depth, |builder| {
            builder.add_pass(
                "forward",
                Box::new(ForwardPass {
                    executed: pass_executed,
                }),
            );
        });

        assert_eq!(executed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn render_frame_with_no_passes_skips_without_touching_rhi_passes() {
        let engine = Engine::new_inline(&EngineConfig::default());
        let mut rhi = NullRhi::new();
        let color = engine
            .render_targets
            .create(
                RenderTargetConfig {
                    name: "viewport.color".into(),
                    format: PixelFormat::SwapchainColor,
                    usage: RenderTargetUsage::Color,
                    sizing_policy: SizingPolicy::RelativeToViewport,
                    width: 1.0,
                    height: 1.0,
                },
                &mut rhi,
            )
            .unwrap();
        let depth = engine
            .render_targets
            .create(
                RenderTargetConfig {
                    name: "viewport.depth".into(),
                    format: PixelFormat::SwapchainDepth,
                    usage: RenderTargetUsage::DepthStencil,
                    sizing_policy: SizingPolicy::RelativeToViewport,
                    width: 1.0,
                    height: 1.0,
                },
                &mut rhi,
            )
            .unwrap();

        engine.render_frame(&mut rhi, 0.016, frame_data(), color, depth, |_builder| {});
    }
}
