use crate::pack::{self, DrawUniforms, Globals, MeshVertex};
use crate::shaders;
use starfolio_assets::{ColorSpace, Texture, TextureFilter, TextureRegistry};
use starfolio_common::NodeId;
use starfolio_render::{FrameView, Renderer, SurfaceSize, collect_draws, collect_lights};
use starfolio_stars::Star;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// An acquired swapchain image with the scene already drawn into it.
/// Overlays may draw into `view` before [`FrameTarget::present`].
pub struct FrameTarget {
    pub texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl FrameTarget {
    pub fn present(self) {
        self.texture.present();
    }
}

struct GpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Geometry for one drawable node. Built on first sight; the geometry of a
/// node never changes once it is in the scene.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    /// The bound texture, once it has arrived.
    texture: Option<String>,
}

/// wgpu-based portfolio renderer: instanced star billboards and lit meshes.
pub struct WgpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    mesh_pipeline: wgpu::RenderPipeline,
    star_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    star_buffer: Option<(wgpu::Buffer, u32)>,
    meshes: HashMap<NodeId, GpuMesh>,
    textures: HashMap<String, GpuTexture>,
    white: GpuTexture,
    depth_texture: wgpu::TextureView,
}

impl WgpuRenderer {
    pub fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let (width, height) = pack::surface_extent(width, height, device.limits().max_texture_dimension_2d);
        let caps = surface.get_capabilities(adapter);
        let surface_format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals_buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &draw_layout],
            push_constant_ranges: &[],
        });
        let star_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("star_pipeline_layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });

        let mesh_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::mesh_shader().into()),
        });
        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&mesh_layout),
            vertex: wgpu::VertexState {
                module: &mesh_shader,
                entry_point: Some("vs_mesh"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MeshVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x3,
                        3 => Float32x2,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_shader,
                entry_point: Some("fs_mesh"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let star_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("star_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::star_shader().into()),
        });
        let star_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("star_pipeline"),
            layout: Some(&star_layout),
            vertex: wgpu::VertexState {
                module: &star_shader,
                entry_point: Some("vs_star"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Star>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &star_shader,
                entry_point: Some("fs_star"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent::OVER,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let white = upload_texture(
            &device,
            &queue,
            "white",
            &Texture::solid([255; 4], Default::default()),
        );
        let depth_texture = create_depth_texture(&device, config.width, config.height);

        tracing::info!(format = ?surface_format, width = config.width, height = config.height, "wgpu renderer ready");
        Ok(Self {
            surface,
            device,
            queue,
            config,
            mesh_pipeline,
            star_pipeline,
            globals_buffer,
            globals_bind_group,
            draw_layout,
            star_buffer: None,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            white,
            depth_texture,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Current swapchain size in physical pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = create_depth_texture(&self.device, self.config.width, self.config.height);
    }

    /// Upload textures that arrived since the last frame.
    fn sync_textures(&mut self, registry: &TextureRegistry) {
        for (key, texture) in registry.iter() {
            if !self.textures.contains_key(key) {
                let gpu = upload_texture(&self.device, &self.queue, key, texture);
                self.textures.insert(key.to_string(), gpu);
                tracing::debug!(key, width = texture.width, height = texture.height, "texture uploaded");
            }
        }
    }

    fn draw_bind_group(&self, uniforms: &wgpu::Buffer, texture: Option<&str>) -> wgpu::BindGroup {
        let gpu = texture.and_then(|k| self.textures.get(k)).unwrap_or(&self.white);
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_bind_group"),
            layout: &self.draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gpu.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                },
            ],
        })
    }

    fn ensure_mesh(&mut self, id: NodeId, drawable: &starfolio_scene::Drawable) {
        let wanted = drawable
            .material
            .texture
            .as_deref()
            .filter(|k| self.textures.contains_key(*k));
        if let Some(mesh) = self.meshes.get(&id) {
            if mesh.texture.as_deref() == wanted {
                return;
            }
            // The texture arrived after the mesh; rebind.
            let bind_group = self.draw_bind_group(&mesh.uniform_buffer, wanted);
            let wanted = wanted.map(str::to_string);
            if let Some(mesh) = self.meshes.get_mut(&id) {
                mesh.bind_group = bind_group;
                mesh.texture = wanted;
            }
            return;
        }

        let (vertices, indices) = pack::pack_mesh(drawable);
        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertex_buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_index_buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: std::mem::size_of::<DrawUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.draw_bind_group(&uniform_buffer, wanted);
        tracing::debug!(%id, vertices = vertices.len(), triangles = indices.len() / 3, "mesh uploaded");
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: indices.len() as u32,
                uniform_buffer,
                bind_group,
                texture: wanted.map(str::to_string),
            },
        );
    }
}

impl Renderer for WgpuRenderer {
    type Output = Result<FrameTarget, wgpu::SurfaceError>;

    /// The swapchain runs at the capped pixel ratio, so on denser displays
    /// it is smaller than the window and the compositor scales it up.
    fn resize(&mut self, size: SurfaceSize) {
        let max = self.device.limits().max_texture_dimension_2d;
        (self.config.width, self.config.height) = pack::surface_extent(size.physical_width, size.physical_height, max);
        self.reconfigure();
        tracing::debug!(width = self.config.width, height = self.config.height, "surface resized");
    }

    /// Draw the frame into a freshly acquired swapchain image. A lost or
    /// outdated surface is reconfigured and reported; the next frame retries.
    fn render(&mut self, frame: &FrameView<'_>) -> Self::Output {
        let texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.reconfigure();
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());

        if self.star_buffer.is_none() && !frame.stars.is_empty() {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("star_buffer"),
                contents: frame.stars.as_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
            self.star_buffer = Some((buffer, frame.stars.len() as u32));
        }
        self.sync_textures(frame.textures);

        let lights = collect_lights(frame.scene);
        let globals = Globals::new(frame.camera, &lights, frame.stars.size(), frame.elapsed);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let draws = collect_draws(frame.scene);
        for item in &draws {
            self.ensure_mesh(item.id, item.drawable);
            if let Some(mesh) = self.meshes.get(&item.id) {
                let uniforms = DrawUniforms::new(item.world, &item.drawable.material, mesh.texture.is_some());
                self.queue
                    .write_buffer(&mesh.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            }
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pack::clear_color(frame.scene.background)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.mesh_pipeline);
            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for item in &draws {
                let Some(mesh) = self.meshes.get(&item.id) else {
                    continue;
                };
                if mesh.index_count == 0 {
                    continue;
                }
                pass.set_bind_group(1, &mesh.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            // Stars last: they test against mesh depth but never write it.
            if let Some((buffer, count)) = &self.star_buffer {
                pass.set_pipeline(&self.star_pipeline);
                pass.set_bind_group(0, &self.globals_bind_group, &[]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..6, 0..*count);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        Ok(FrameTarget { texture, view })
    }
}

fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, key: &str, texture: &Texture) -> GpuTexture {
    let format = match texture.options.color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    };
    let size = wgpu::Extent3d {
        width: texture.width.max(1),
        height: texture.height.max(1),
        depth_or_array_layers: 1,
    };
    let gpu = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(key),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &texture.pixels,
    );
    let filter = match texture.options.filter {
        TextureFilter::Nearest => wgpu::FilterMode::Nearest,
        TextureFilter::Linear => wgpu::FilterMode::Linear,
    };
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(key),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    });
    GpuTexture {
        view: gpu.create_view(&Default::default()),
        sampler,
    }
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
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
    texture.create_view(&Default::default())
}
