use std::sync::Arc;
use anyhow::Context;
use glam::Vec2;
use instant::Instant;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::CameraUniform;
use crate::controller::{FrameOutput, PortfolioController};
use crate::models::{LineVertex, MeshVertex, NodeInstance, RectInstance, ScreenUniform, TransformInstance, Vertex2D};
use crate::options::PortfolioOptions;
use crate::overlay::{OverlayFrame, TextAnchor, TextBlock, TextFamily};
use crate::scene::geometry::{icosahedron_wireframe, star_field, uv_sphere};
use crate::scene::lighting::{self, LightingUniform, hex_linear};
use crate::scene::node::NODE_RADIUS;
use crate::scene::panel::TextSpan;
use crate::scene::resume::ResumeData;

const MESH_WGSL: &str = concat!(include_str!("./shaders/common.wgsl"), include_str!("./shaders/mesh.wgsl"));
const LINES_WGSL: &str = concat!(include_str!("./shaders/common.wgsl"), include_str!("./shaders/lines.wgsl"));
const OVERLAY_WGSL: &str = include_str!("./shaders/overlay.wgsl");

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_RECT_CAPACITY: usize = 32;

const CENTRAL_RADIUS: f32 = 4.0;
const CENTRAL_DETAIL: u32 = 1;
const CENTRAL_COLOR: u32 = 0x6366f1;
const CENTRAL_EMISSIVE: u32 = 0x1d4ed8;
const CENTRAL_EMISSIVE_INTENSITY: f32 = 0.3;
const STAR_COLOR: u32 = 0x94a3b8;
const STAR_OPACITY: f32 = 0.7;

// 一个 glyphon buffer 及其上次排版的参数，参数不变时跳过重新排版
#[derive(Debug, Clone, PartialEq)]
struct TextKey {
    text: String,
    font_size: f32,
    line_height: f32,
    width: f32,
    bold: bool,
    family: TextFamily,
    spans: Vec<TextSpan>,
    alpha: u8,
}

// 强调片段：半粗体 + indigo-300
const EMPHASIS_RGB: [u8; 3] = [0xa5, 0xb4, 0xfc];

struct TextSlot {
    buffer: glyphon::Buffer,
    key: Option<TextKey>,
    size: Vec2,
}

impl TextSlot {
    fn new(font_system: &mut glyphon::FontSystem) -> Self {
        Self {
            buffer: glyphon::Buffer::new(font_system, glyphon::Metrics::new(14.0, 20.0)),
            key: None,
            size: Vec2::ZERO,
        }
    }

    fn shape(&mut self, font_system: &mut glyphon::FontSystem, block: &TextBlock, label_family: Option<&str>) {
        let key = TextKey {
            text: block.text.clone(),
            font_size: block.font_size,
            line_height: block.line_height,
            width: block.width,
            bold: block.bold,
            family: block.family,
            spans: block.spans.clone(),
            alpha: block.color[3],
        };
        if self.key.as_ref() == Some(&key) {
            return;
        }

        let family = match (block.family, label_family) {
            (TextFamily::Label, Some(name)) => glyphon::Family::Name(name),
            _ => glyphon::Family::SansSerif,
        };
        let weight = if block.bold { glyphon::Weight::BOLD } else { glyphon::Weight::NORMAL };
        let attrs = glyphon::Attrs::new().family(family).weight(weight);

        self.buffer.set_metrics(font_system, glyphon::Metrics::new(block.font_size, block.line_height));
        self.buffer.set_size(font_system, Some(block.width.max(1.0)), None);
        if block.spans.is_empty() {
            self.buffer.set_text(font_system, &block.text, &attrs, glyphon::Shaping::Advanced, None);
        } else {
            let [r, g, b] = EMPHASIS_RGB;
            let emphasis = attrs
                .clone()
                .weight(glyphon::Weight::SEMIBOLD)
                .color(glyphon::Color::rgba(r, g, b, block.color[3]));
            let spans = block.spans.iter().map(|span| {
                let span_attrs = if span.emphasized { emphasis.clone() } else { attrs.clone() };
                (span.text.as_str(), span_attrs)
            });
            self.buffer.set_rich_text(font_system, spans, &attrs, glyphon::Shaping::Advanced, None);
        }
        self.buffer.shape_until_scroll(font_system, false);

        // 排版后的实际尺寸：最宽一行 × 最后一行底部
        let mut size = Vec2::ZERO;
        for run in self.buffer.layout_runs() {
            size.x = size.x.max(run.line_w);
            size.y = size.y.max(run.line_top + run.line_height);
        }
        self.size = size;
        self.key = Some(key);
    }

    fn text_area(&self, block: &TextBlock, viewport: Vec2) -> glyphon::TextArea<'_> {
        let (left, top) = match block.anchor {
            TextAnchor::TopLeft => (block.left, block.top),
            TextAnchor::Center => (block.left - self.size.x / 2.0, block.top - self.size.y / 2.0),
        };
        let bounds = match block.clip {
            Some(clip) => glyphon::TextBounds {
                left: clip.x.floor() as i32,
                top: clip.y.floor() as i32,
                right: clip.right().ceil() as i32,
                bottom: clip.bottom().ceil() as i32,
            },
            None => glyphon::TextBounds {
                left: 0,
                top: 0,
                right: viewport.x as i32,
                bottom: viewport.y as i32,
            },
        };
        let [r, g, b, a] = block.color;
        glyphon::TextArea {
            buffer: &self.buffer,
            left,
            top,
            scale: 1.0,
            bounds,
            default_color: glyphon::Color::rgba(r, g, b, a),
            custom_glyphs: &[],
        }
    }
}

fn shape_blocks(
    font_system: &mut glyphon::FontSystem,
    slots: &mut Vec<TextSlot>,
    blocks: &[TextBlock],
    label_family: Option<&str>,
) {
    while slots.len() < blocks.len() {
        slots.push(TextSlot::new(font_system));
    }
    for (slot, block) in slots.iter_mut().zip(blocks) {
        slot.shape(font_system, block, label_family);
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

struct PipelineSpec<'a> {
    label: &'a str,
    shader: &'a wgpu::ShaderModule,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    // None：不使用深度；Some(write)：深度测试，write 决定是否写入
    depth_write: Option<bool>,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    spec: PipelineSpec<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: spec.depth_write.map(|write| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,
    needs_srgb_output_conversion: bool,

    // Glyphon related fields
    pub glyphon_font_system: glyphon::FontSystem,
    pub glyphon_viewport: glyphon::Viewport,
    pub glyphon_swash_cache: glyphon::SwashCache,
    pub glyphon_atlas: glyphon::TextAtlas,
    label_renderer: glyphon::TextRenderer,
    ui_renderer: glyphon::TextRenderer,
    label_slots: Vec<TextSlot>,
    ui_slots: Vec<TextSlot>,
    pub label_family: Option<String>,

    pub controller: PortfolioController,
    overlay: OverlayFrame,

    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    screen_buffer: wgpu::Buffer,
    screen_bind_group: wgpu::BindGroup,

    mesh_render_pipeline: wgpu::RenderPipeline,
    line_render_pipeline: wgpu::RenderPipeline,
    point_render_pipeline: wgpu::RenderPipeline,
    overlay_render_pipeline: wgpu::RenderPipeline,

    sphere_vertex_buffer: wgpu::Buffer,
    sphere_index_buffer: wgpu::Buffer,
    sphere_index_count: u32,
    node_instance_buffer: wgpu::Buffer,

    wire_vertex_buffer: wgpu::Buffer,
    wire_vertex_count: u32,
    wire_transform_buffer: wgpu::Buffer,
    star_vertex_buffer: wgpu::Buffer,
    star_vertex_count: u32,
    star_transform_buffer: wgpu::Buffer,

    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    rect_instance_buffer: wgpu::Buffer,
}

impl State {
    // Takes Arc<Window> for setup, doesn't store it.
    pub async fn new(window_arc: Arc<Window>, options: &PortfolioOptions) -> anyhow::Result<State> {
        let size = window_arc.inner_size();

        let gpu = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        // Surface itself is !Send on WASM due to HtmlCanvasElement
        let surface = gpu.create_surface(window_arc).context("failed to create surface")?;

        let adapter = gpu
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to request device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let first_format = *surface_caps.formats.first().context("surface reports no formats")?;
        let texture_format = surface_caps.formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or_else(|| {
                log::warn!("No sRGB surface format found, falling back to {:?}", first_format);
                first_format
            });

        // 确定是否需要着色器进行 sRGB 输出转换
        let needs_srgb_output_conversion = !texture_format.is_srgb();

        log::info!(
            "Using {} ({:?}, Target Format: {:?}), Needs Shader sRGB Output Conversion: {}",
            adapter_info.name,
            adapter_info.backend,
            texture_format,
            needs_srgb_output_conversion
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // --- Glyphon Initialization ---
        // 界面文字使用系统字体；标签字体到达后再注册
        let glyphon_font_system = glyphon::FontSystem::new();
        let glyphon_swash_cache = glyphon::SwashCache::new();
        let glyphon_cache = glyphon::Cache::new(&device);
        let glyphon_viewport = glyphon::Viewport::new(&device, &glyphon_cache);
        let mut glyphon_atlas = glyphon::TextAtlas::new(&device, &queue, &glyphon_cache, texture_format);
        let label_renderer = glyphon::TextRenderer::new(&mut glyphon_atlas, &device, wgpu::MultisampleState::default(), None);
        let ui_renderer = glyphon::TextRenderer::new(&mut glyphon_atlas, &device, wgpu::MultisampleState::default(), None);

        let resume = ResumeData::embedded().context("embedded resume is invalid")?;
        let controller = PortfolioController::new(resume, options, config.width, config.height, Instant::now());

        let (depth_texture, depth_view) = create_depth_view(&device, config.width, config.height);

        // --- Uniforms ---
        let camera_uniform = CameraUniform {
            view_proj: controller.camera.build_view_projection_matrix().to_cols_array_2d(),
            eye_position: controller.eye().extend(1.0).to_array(),
            needs_srgb_output_conversion: needs_srgb_output_conversion as u32,
            _padding: [0; 3],
        };
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lighting_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Buffer"),
            contents: bytemuck::cast_slice(&[LightingUniform::portfolio()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let screen_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen Buffer"),
            contents: bytemuck::cast_slice(&[ScreenUniform {
                size: [config.width as f32, config.height as f32],
                needs_srgb_output_conversion: needs_srgb_output_conversion as u32,
                _padding: 0,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let scene_stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let scene_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, scene_stages), uniform_entry(1, scene_stages)],
            label: Some("Scene Bind Group Layout"),
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &scene_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
            ],
            label: Some("Scene Bind Group"),
        });

        let screen_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, scene_stages)],
            label: Some("Screen Bind Group Layout"),
        });
        let screen_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &screen_bind_group_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: screen_buffer.as_entire_binding() }],
            label: Some("Screen Bind Group"),
        });

        // --- 着色器模块 ---
        let mesh_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_WGSL.into()),
        });
        let lines_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines Shader"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });
        let overlay_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_WGSL.into()),
        });

        // --- 渲染管线布局 ---
        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            immediate_size: 0,
        });
        let overlay_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Pipeline Layout"),
            bind_group_layouts: &[&screen_bind_group_layout],
            immediate_size: 0,
        });

        let mesh_render_pipeline = create_pipeline(&device, &scene_pipeline_layout, texture_format, PipelineSpec {
            label: "Mesh Render Pipeline",
            shader: &mesh_shader_module,
            buffers: &[MeshVertex::layout(), NodeInstance::layout()],
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: Some(wgpu::Face::Back),
            depth_write: Some(true),
        });
        let line_render_pipeline = create_pipeline(&device, &scene_pipeline_layout, texture_format, PipelineSpec {
            label: "Line Render Pipeline",
            shader: &lines_shader_module,
            buffers: &[LineVertex::layout(), TransformInstance::layout()],
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
            depth_write: Some(true),
        });
        // 半透明星点：参与深度测试但不写入
        let point_render_pipeline = create_pipeline(&device, &scene_pipeline_layout, texture_format, PipelineSpec {
            label: "Point Render Pipeline",
            shader: &lines_shader_module,
            buffers: &[LineVertex::layout(), TransformInstance::layout()],
            topology: wgpu::PrimitiveTopology::PointList,
            cull_mode: None,
            depth_write: Some(false),
        });
        let overlay_render_pipeline = create_pipeline(&device, &overlay_pipeline_layout, texture_format, PipelineSpec {
            label: "Overlay Render Pipeline",
            shader: &overlay_shader_module,
            buffers: &[Vertex2D::layout(), RectInstance::layout()],
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            depth_write: None,
        });

        // --- 几何数据 ---
        let sphere = uv_sphere(NODE_RADIUS, 32, 32);
        let sphere_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Vertex Buffer"),
            contents: bytemuck::cast_slice(&sphere.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sphere_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Index Buffer"),
            contents: bytemuck::cast_slice(&sphere.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let node_instances: Vec<NodeInstance> = controller.nodes.iter().map(|n| n.to_instance()).collect();
        let node_instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Node Instance Buffer"),
            contents: bytemuck::cast_slice(&node_instances),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let wire_vertices = icosahedron_wireframe(CENTRAL_RADIUS, CENTRAL_DETAIL, hex_linear(CENTRAL_COLOR, 1.0));
        let wire_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wireframe Vertex Buffer"),
            contents: bytemuck::cast_slice(&wire_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let wire_transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Wireframe Transform Buffer"),
            contents: bytemuck::cast_slice(&[TransformInstance {
                model: controller.central_model().to_cols_array_2d(),
                emissive: hex_linear(CENTRAL_EMISSIVE, CENTRAL_EMISSIVE_INTENSITY),
            }]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let scene = &options.scene;
        let stars = star_field(scene.star_count, scene.star_spread, scene.star_seed, hex_linear(STAR_COLOR, STAR_OPACITY));
        let star_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Vertex Buffer"),
            contents: bytemuck::cast_slice(&stars),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let star_transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Star Transform Buffer"),
            contents: bytemuck::cast_slice(&[TransformInstance {
                model: controller.stars_model().to_cols_array_2d(),
                emissive: [0.0; 4],
            }]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(Vertex2D::QUAD_VERTICES.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(Vertex2D::QUAD_INDICES.as_slice()),
            usage: wgpu::BufferUsages::INDEX,
        });
        let rect_instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rect Instance Buffer"),
            size: (INITIAL_RECT_CAPACITY * std::mem::size_of::<RectInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "GPU resources ready: {} sphere indices, {} wireframe vertices, {} stars.",
            sphere.indices.len(),
            wire_vertices.len(),
            stars.len()
        );

        Ok(Self {
            surface, device, queue, config, is_surface_configured: false, needs_srgb_output_conversion,
            glyphon_font_system, glyphon_viewport, glyphon_swash_cache, glyphon_atlas,
            label_renderer, ui_renderer, label_slots: Vec::new(), ui_slots: Vec::new(), label_family: None,
            controller, overlay: OverlayFrame::default(),
            depth_texture, depth_view,
            camera_buffer, lighting_buffer, scene_bind_group, screen_buffer, screen_bind_group,
            mesh_render_pipeline, line_render_pipeline, point_render_pipeline, overlay_render_pipeline,
            sphere_vertex_buffer, sphere_index_buffer, sphere_index_count: sphere.indices.len() as u32, node_instance_buffer,
            wire_vertex_buffer, wire_vertex_count: wire_vertices.len() as u32, wire_transform_buffer,
            star_vertex_buffer, star_vertex_count: stars.len() as u32, star_transform_buffer,
            quad_vertex_buffer, quad_index_buffer, rect_instance_buffer,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            log::info!("Resize {}, {}", width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            self.depth_texture.destroy();
            let (depth_texture, depth_view) = create_depth_view(&self.device, width, height);
            self.depth_texture = depth_texture;
            self.depth_view = depth_view;

            self.queue.write_buffer(
                &self.screen_buffer,
                0,
                bytemuck::cast_slice(&[ScreenUniform {
                    size: [width as f32, height as f32],
                    needs_srgb_output_conversion: self.needs_srgb_output_conversion as u32,
                    _padding: 0,
                }]),
            );

            self.controller.resize(width, height);
            self.is_surface_configured = true;
            // No request_redraw here, it's App's responsibility
        }
    }

    /// 标签字体注册后，已排版的文字需要重新排版
    pub fn invalidate_text(&mut self) {
        for slot in self.label_slots.iter_mut().chain(self.ui_slots.iter_mut()) {
            slot.key = None;
        }
    }

    /// Advances the scene one frame and uploads everything the GPU reads.
    pub fn update(&mut self, now: Instant) -> FrameOutput {
        let output = self.controller.frame(now);

        let camera_uniform = CameraUniform {
            view_proj: self.controller.camera.build_view_projection_matrix().to_cols_array_2d(),
            eye_position: self.controller.eye().extend(1.0).to_array(),
            needs_srgb_output_conversion: self.needs_srgb_output_conversion as u32,
            _padding: [0; 3],
        };
        self.queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[camera_uniform]));

        let node_instances: Vec<NodeInstance> = self.controller.nodes.iter().map(|n| n.to_instance()).collect();
        self.queue.write_buffer(&self.node_instance_buffer, 0, bytemuck::cast_slice(&node_instances));

        self.queue.write_buffer(
            &self.wire_transform_buffer,
            0,
            bytemuck::cast_slice(&[TransformInstance {
                model: self.controller.central_model().to_cols_array_2d(),
                emissive: hex_linear(CENTRAL_EMISSIVE, CENTRAL_EMISSIVE_INTENSITY),
            }]),
        );
        self.queue.write_buffer(
            &self.star_transform_buffer,
            0,
            bytemuck::cast_slice(&[TransformInstance {
                model: self.controller.stars_model().to_cols_array_2d(),
                emissive: [0.0; 4],
            }]),
        );

        self.overlay = self.controller.build_overlay();
        self.update_rect_buffer();
        output
    }

    fn update_rect_buffer(&mut self) {
        let rect_data: &[u8] = bytemuck::cast_slice(&self.overlay.rects);
        if rect_data.is_empty() {
            return;
        }
        if self.rect_instance_buffer.size() < rect_data.len() as u64 {
            self.rect_instance_buffer.destroy();
            self.rect_instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Rect Instance Buffer (Resized)"),
                contents: rect_data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        } else {
            self.queue.write_buffer(&self.rect_instance_buffer, 0, rect_data);
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        // Update glyphon viewport
        let width = self.config.width;
        let height = self.config.height;
        let viewport = Vec2::new(width as f32, height as f32);
        self.glyphon_viewport.update(&self.queue, glyphon::Resolution { width, height });

        // --- Prepare Glyphon Text Areas ---
        let label_family = self.label_family.as_deref();
        shape_blocks(&mut self.glyphon_font_system, &mut self.label_slots, &self.overlay.labels, label_family);
        shape_blocks(&mut self.glyphon_font_system, &mut self.ui_slots, &self.overlay.texts, label_family);

        // 面板正文的实际高度决定可滚动范围
        if let Some(index) = self.overlay.panel_body_index {
            let content_height = self.ui_slots[index].size.y;
            let visible_height = self.controller.layout().panel_content.h;
            self.controller.shell.set_content_max_scroll(content_height - visible_height);
        }

        let label_areas: Vec<glyphon::TextArea> = self.label_slots
            .iter()
            .zip(self.overlay.labels.iter())
            .map(|(slot, block)| slot.text_area(block, viewport))
            .collect();
        let ui_areas: Vec<glyphon::TextArea> = self.ui_slots
            .iter()
            .zip(self.overlay.texts.iter())
            .map(|(slot, block)| slot.text_area(block, viewport))
            .collect();

        // Prepare glyphon text for rendering (uploads glyph textures)
        if let Err(e) = self.label_renderer.prepare(
            &self.device,
            &self.queue,
            &mut self.glyphon_font_system,
            &mut self.glyphon_atlas,
            &self.glyphon_viewport,
            label_areas,
            &mut self.glyphon_swash_cache,
        ) {
            log::error!("Failed to prepare label text: {:?}", e);
        }
        if let Err(e) = self.ui_renderer.prepare(
            &self.device,
            &self.queue,
            &mut self.glyphon_font_system,
            &mut self.glyphon_atlas,
            &self.glyphon_viewport,
            ui_areas,
            &mut self.glyphon_swash_cache,
        ) {
            log::error!("Failed to prepare interface text: {:?}", e);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // --- 3D 场景 ---
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(lighting::clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

            render_pass.set_pipeline(&self.point_render_pipeline);
            render_pass.set_vertex_buffer(0, self.star_vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.star_transform_buffer.slice(..));
            render_pass.draw(0..self.star_vertex_count, 0..1);

            render_pass.set_pipeline(&self.line_render_pipeline);
            render_pass.set_vertex_buffer(0, self.wire_vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.wire_transform_buffer.slice(..));
            render_pass.draw(0..self.wire_vertex_count, 0..1);

            render_pass.set_pipeline(&self.mesh_render_pipeline);
            render_pass.set_vertex_buffer(0, self.sphere_vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.node_instance_buffer.slice(..));
            render_pass.set_index_buffer(self.sphere_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..self.sphere_index_count, 0, 0..self.controller.nodes.len() as u32);
        }

        // --- 屏幕空间：标签 -> 界面矩形 -> 界面文字 ---
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Err(e) = self.label_renderer.render(&self.glyphon_atlas, &self.glyphon_viewport, &mut render_pass) {
                log::error!("Failed to render label text: {:?}", e);
            }

            if !self.overlay.rects.is_empty() {
                render_pass.set_pipeline(&self.overlay_render_pipeline);
                render_pass.set_bind_group(0, &self.screen_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, self.rect_instance_buffer.slice(..));
                render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(
                    0..Vertex2D::QUAD_INDICES.len() as u32,
                    0,
                    0..self.overlay.rects.len() as u32,
                );
            }

            if let Err(e) = self.ui_renderer.render(&self.glyphon_atlas, &self.glyphon_viewport, &mut render_pass) {
                log::error!("Failed to render interface text: {:?}", e);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.glyphon_atlas.trim();

        Ok(())
    }

    /// Releases GPU resources. The state is unusable afterwards.
    pub fn dispose(mut self) {
        self.controller.dispose();
        for buffer in [
            &self.camera_buffer,
            &self.lighting_buffer,
            &self.screen_buffer,
            &self.sphere_vertex_buffer,
            &self.sphere_index_buffer,
            &self.node_instance_buffer,
            &self.wire_vertex_buffer,
            &self.wire_transform_buffer,
            &self.star_vertex_buffer,
            &self.star_transform_buffer,
            &self.quad_vertex_buffer,
            &self.quad_index_buffer,
            &self.rect_instance_buffer,
        ] {
            buffer.destroy();
        }
        self.depth_texture.destroy();
        self.label_slots.clear();
        self.ui_slots.clear();
        log::info!("GPU state disposed.");
    }
}
