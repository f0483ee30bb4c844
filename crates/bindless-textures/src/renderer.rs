use std::num::NonZeroU32;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use bindless_engine::device::WgpuBackend;
use bindless_engine::image::ImageStore;
use bindless_engine::render::{HandleArrayBinding, RenderCtx, RenderTarget};
use bindless_engine::residency::HandleSet;

use crate::geometry::{strip_to_list, tetrahedron_strip, Vertex};

/// Number of textures the shader's handle array holds.
pub const TEXTURE_COUNT: usize = 4;

const HANDLE_ARRAY_LEN: NonZeroU32 = match NonZeroU32::new(TEXTURE_COUNT as u32) {
    Some(len) => len,
    None => panic!("handle array must not be empty"),
};

const FOV_Y_DEGREES: f32 = 40.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 64.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_projection: [[f32; 4]; 4],
}

/// Draws the tetrahedron, sampling one handle-array entry per face.
///
/// The pipeline is rebuilt when the surface format changes; textures are
/// attached once through `bind_textures`.
pub struct TetrahedronRenderer {
    textures: HandleArrayBinding,
    texture_bind_group: Option<wgpu::BindGroup>,

    camera_layout: wgpu::BindGroupLayout,
    camera_ubo: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    vbo: wgpu::Buffer,
    vertex_count: u32,

    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
}

impl TetrahedronRenderer {
    pub fn new(device: &wgpu::Device) -> Self {
        let textures = HandleArrayBinding::new(device, "textures", HANDLE_ARRAY_LEN);

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bindless camera bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CameraUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let camera_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bindless camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bindless camera bind group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        let vertices = strip_to_list(&tetrahedron_strip());
        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tetrahedron vbo"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            textures,
            texture_bind_group: None,
            camera_layout,
            camera_ubo,
            camera_bind_group,
            vbo,
            vertex_count: vertices.len() as u32,
            pipeline_format: None,
            pipeline: None,
        }
    }

    /// Attaches the images behind `set` to the shader's handle array.
    pub fn bind_textures(
        &mut self,
        store: &ImageStore<WgpuBackend>,
        set: &HandleSet<TEXTURE_COUNT>,
    ) -> bindless_engine::Result<()> {
        self.texture_bind_group = Some(self.textures.bind(store, set)?);
        log::debug!("bound {} handles to `{}`", set.len(), self.textures.name());
        Ok(())
    }

    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, eye: Vec3) {
        self.ensure_pipeline(ctx);
        self.write_camera(ctx, eye);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(textures) = self.texture_bind_group.as_ref() else { return };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("bindless tetrahedron pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
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

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &self.camera_bind_group, &[]);
        rpass.set_bind_group(1, textures, &[]);
        rpass.set_vertex_buffer(0, self.vbo.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }

    fn write_camera(&self, ctx: &RenderCtx<'_>, eye: Vec3) {
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let projection =
            Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), ctx.aspect(), Z_NEAR, Z_FAR);
        let u = CameraUniform {
            view_projection: (projection * view).to_cols_array_2d(),
        };
        ctx.queue.write_buffer(&self.camera_ubo, 0, bytemuck::bytes_of(&u));
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bindless shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bindless.wgsl").into()),
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("bindless pipeline layout"),
                bind_group_layouts: &[&self.camera_layout, self.textures.layout()],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("bindless pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Closed convex mesh: back-face culling alone orders the faces.
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
    }
}
