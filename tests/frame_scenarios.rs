//! End-to-end scenarios against the public `Engine` API, one per concrete
//! case called out for the test suite: empty plan, a single standalone
//! pass, a two-pass first/last sequence, cycle rejection, an async mesh
//! load reaching `Loaded`, and a failed texture load falling back to the
//! error texture.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use render_graph_core::graph::pass::{PassRecorder, PassRenderer, RenderContext};
use render_graph_core::resources::mesh::MeshResolver;
use render_graph_core::resources::render_pass::RenderPassConfig;
use render_graph_core::resources::render_target::RenderTargetConfig;
use render_graph_core::resources::texture::{TextureDefinition, TextureResolver};
use render_graph_core::rhi::NullRhi;
use render_graph_core::types::{
    Matrix4, PixelFormat, RenderPassType, RenderTargetUsage, SizingPolicy, TextureUse, Vector2, Vector3, Vector4,
};
use render_graph_core::{Engine, EngineConfig};

fn frame_data() -> render_graph_core::types::FrameData {
    render_graph_core::types::FrameData {
        delta_time: 1.0 / 60.0,
        view: Matrix4::identity(),
        projection: Matrix4::identity(),
    }
}

fn viewport_targets(engine: &Engine, rhi: &mut NullRhi) -> (render_graph_core::ids::RenderTargetHandle, render_graph_core::ids::RenderTargetHandle) {
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
            rhi,
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
            rhi,
        )
        .unwrap();
    (color, depth)
}

struct ColorWritePass {
    name: &'static str,
    also_reads_color: bool,
    executed: Arc<AtomicUsize>,
}

impl PassRenderer for ColorWritePass {
    fn setup(&self, recorder: &mut PassRecorder) {
        if self.also_reads_color {
            recorder.reads_from_color_buffer();
        }
        recorder.writes_to_color_buffer();
    }

    fn execute(&self, _ctx: &mut RenderContext) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    fn render_pass_config(&self) -> RenderPassConfig {
        RenderPassConfig {
            name: self.name.to_string(),
            pass_type: RenderPassType::ForwardOpaque,
            attachments: vec![],
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

struct CyclicPass {
    name: &'static str,
    reads: &'static str,
    writes: &'static str,
}

impl PassRenderer for CyclicPass {
    fn setup(&self, recorder: &mut PassRecorder) {
        recorder.reads_from(self.reads);
        recorder.writes_to(self.writes);
    }

    fn execute(&self, _ctx: &mut RenderContext) {}

    fn render_pass_config(&self) -> RenderPassConfig {
        RenderPassConfig {
            name: self.name.to_string(),
            pass_type: RenderPassType::ForwardOpaque,
            attachments: vec![],
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[test]
fn empty_plan_runs_no_passes() {
    let engine = Engine::new_inline(&EngineConfig::default());
    let mut rhi = NullRhi::new();
    let (color, depth) = viewport_targets(&engine, &mut rhi);

    engine.render_frame(&mut rhi, 1.0 / 60.0, frame_data(), color, depth, |_builder| {});
}

#[test]
fn single_pass_implicit_color_write_is_standalone() {
    let engine = Engine::new_inline(&EngineConfig::default());
    let mut rhi = NullRhi::new();
    let (color, depth) = viewport_targets(&engine, &mut rhi);

    let executed = Arc::new(AtomicUsize::new(0));
    let pass_executed = executed.clone();
    engine.render_frame(&mut rhi, 1.0 / 60.0, frame_data(), color, depth, |builder| {
        builder.add_pass(
            "forward",
            Box::new(ColorWritePass {
                name: "forward",
                also_reads_color: false,
                executed: pass_executed,
            }),
        );
    });

    assert_eq!(executed.load(Ordering::Relaxed), 1);
}

#[test]
fn two_passes_color_then_ui_compile_as_first_then_last() {
    let engine = Engine::new_inline(&EngineConfig::default());
    let mut rhi = NullRhi::new();
    let (color, depth) = viewport_targets(&engine, &mut rhi);

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    struct RecordingPass {
        name: &'static str,
        also_reads_color: bool,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }
    impl PassRenderer for RecordingPass {
        fn setup(&self, recorder: &mut PassRecorder) {
            if self.also_reads_color {
                recorder.reads_from_color_buffer();
            }
            recorder.writes_to_color_buffer();
        }
        fn execute(&self, _ctx: &mut RenderContext) {
            self.order.lock().unwrap().push(self.name);
        }
        fn render_pass_config(&self) -> RenderPassConfig {
            RenderPassConfig {
                name: self.name.to_string(),
                pass_type: RenderPassType::ForwardOpaque,
                attachments: vec![],
            }
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    let order_for_a = order.clone();
    let order_for_b = order.clone();
    engine.render_frame(&mut rhi, 1.0 / 60.0, frame_data(), color, depth, |builder| {
        builder.add_pass(
            "a",
            Box::new(RecordingPass {
                name: "a",
                also_reads_color: false,
                order: order_for_a,
            }),
        );
        builder.add_pass(
            "b",
            Box::new(RecordingPass {
                name: "b",
                also_reads_color: true,
                order: order_for_b,
            }),
        );
    });

    assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn cyclic_passes_skip_the_frame_without_running_either() {
    let engine = Engine::new_inline(&EngineConfig::default());
    let mut rhi = NullRhi::new();
    let (color, depth) = viewport_targets(&engine, &mut rhi);

    engine.render_frame(&mut rhi, 1.0 / 60.0, frame_data(), color, depth, |builder| {
        builder.add_pass(
            "a",
            Box::new(CyclicPass {
                name: "a",
                reads: "ping",
                writes: "pong",
            }),
        );
        builder.add_pass(
            "b",
            Box::new(CyclicPass {
                name: "b",
                reads: "pong",
                writes: "ping",
            }),
        );
    });
}

struct HouseMeshResolver;
impl MeshResolver for HouseMeshResolver {
    fn resolve(&self, _name: &str) -> Result<(render_graph_core::resources::mesh::MeshData, Vec<render_graph_core::resources::mesh::SubMesh>), String> {
        let data = render_graph_core::resources::mesh::MeshData {
            vertices: vec![render_graph_core::resources::mesh::Vertex {
                position: Vector3::new(0.0, 0.0, 0.0),
                normal: Vector3::new(0.0, 1.0, 0.0),
                uv0: Vector2::new(0.0, 0.0),
                tangent: Vector4::new(1.0, 0.0, 0.0, 1.0),
            }; 4],
            indices: vec![0, 1, 2, 2, 3, 0],
            generation: 0,
        };
        Ok((data, Vec::new()))
    }
}

#[test]
fn async_mesh_load_reaches_loaded() {
    let engine = Engine::new_inline(&EngineConfig::default());
    let mut rhi = NullRhi::new();

    let handle = engine.meshes.get_handle_for("house", Arc::new(HouseMeshResolver));
    assert!(engine.meshes.get_pointer_for(handle).is_none());

    engine.run_main_thread_jobs(&mut rhi);

    assert!(engine.meshes.get_pointer_for(handle).is_some());
    assert!(engine.meshes.bind_mesh(handle, &mut rhi));
}

struct MissingTextureResolver;
impl TextureResolver for MissingTextureResolver {
    fn resolve(&self, _name: &str) -> Result<TextureDefinition, String> {
        Err("not found".to_string())
    }
}

#[test]
fn failed_texture_load_falls_back_to_error_texture() {
    let engine = Engine::new_inline(&EngineConfig::default());
    let mut rhi = NullRhi::new();

    let handle = engine
        .textures
        .get_handle_for("missing.png", TextureUse::Diffuse, Arc::new(MissingTextureResolver));
    assert_eq!(engine.textures.get_pointer_for(handle).unwrap().name, "__error_texture");

    engine.run_main_thread_jobs(&mut rhi);

    let texture = engine.textures.get_pointer_for(handle).expect("fallback texture");
    assert_eq!(texture.name, "__error_texture");
}
