//! Point cloud renderer.
//!
//! Each particle is one instance of a screen-aligned quad. The vertex stage
//! fetches the particle's position from the position texture at its baked
//! uv, projects it, and grows the quad to the point size in physical pixels.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use curlfield_engine::coords::Viewport;
use curlfield_engine::paint::color::srgb_to_linear;
use curlfield_engine::render::util::{
    QUAD_CORNERS, QUAD_INDICES, QuadCorner, additive_blend, load_color_attachment,
    premul_alpha_blend, triangle_list_no_cull, uniform_min_binding_size,
};

use crate::config::{ParticleConfig, RendererKind};
use crate::grid::ParticleGrid;
use crate::material::{self, MaterialTable};
use crate::target::OffscreenTarget;

/// Fixed shading parameters of one point cloud.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointStyle {
    pub kind: RendererKind,
    /// Additive base size, physical pixels.
    pub point_size: f32,
    pub edge_divisor: f32,
    pub min_point_size: f32,
    /// Additive color, straight sRGB.
    pub color: [f32; 3],
}

impl PointStyle {
    pub fn from_config(cfg: &ParticleConfig) -> Self {
        Self {
            kind: cfg.renderer,
            point_size: cfg.point_size,
            edge_divisor: cfg.edge_divisor,
            min_point_size: cfg.min_point_size,
            color: cfg.color,
        }
    }
}

/// Per-frame inputs of the point pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointFrame {
    pub model_view: Mat4,
    pub projection: Mat4,
    /// Physical pixels.
    pub viewport: Viewport,
    pub focus: f32,
    pub fov: f32,
    pub blur: f32,
}

pub struct PointCloudRenderer {
    style: PointStyle,
    grid: ParticleGrid,

    shader: wgpu::ShaderModule,
    pipeline_format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    pipeline_layout: wgpu::PipelineLayout,
    bind_group_layout: wgpu::BindGroupLayout,
    ubo: wgpu::Buffer,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    uv_vbo: wgpu::Buffer,
}

impl PointCloudRenderer {
    pub fn new(
        device: &wgpu::Device,
        materials: &MaterialTable,
        format: wgpu::TextureFormat,
        style: PointStyle,
        grid: ParticleGrid,
    ) -> Result<Self> {
        let shader = materials.create(device, material::POINTS)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("curlfield points bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(uniform_min_binding_size::<PointUniforms>()),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("curlfield points pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = build_pipeline(device, &shader, &pipeline_layout, format, style.kind);

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("curlfield points ubo"),
            size: std::mem::size_of::<PointUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("curlfield points quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("curlfield points quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uv_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("curlfield points uv vbo"),
            contents: bytemuck::cast_slice(&grid.uvs()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::debug!(
            "point renderer ready: {:?}, {} instances, {format:?}",
            style.kind,
            grid.count()
        );

        Ok(Self {
            style,
            grid,
            shader,
            pipeline_format: format,
            pipeline,
            pipeline_layout,
            bind_group_layout,
            ubo,
            quad_vbo,
            quad_ibo,
            uv_vbo,
        })
    }

    /// Rebuilds the pipeline if the color target format changed.
    pub fn ensure_format(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) {
        if self.pipeline_format == format {
            return;
        }
        log::debug!("rebuilding point pipeline for {format:?}");
        self.pipeline = build_pipeline(device, &self.shader, &self.pipeline_layout, format, self.style.kind);
        self.pipeline_format = format;
    }

    /// Bind group reading positions from `target`. Callers cache one per target.
    pub fn bind_positions(&self, device: &wgpu::Device, target: &OffscreenTarget) -> wgpu::BindGroup {
        debug_assert_eq!(target.size(), self.grid.size());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("curlfield points bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(target.view()),
                },
            ],
        })
    }

    pub fn write_params(&self, queue: &wgpu::Queue, frame: &PointFrame) {
        let uniforms = PointUniforms::new(&self.style, self.grid, frame);
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Records the point pass on top of the existing contents of `color_view`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        positions: &wgpu::BindGroup,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("curlfield points pass"),
            color_attachments: &[Some(load_color_attachment(color_view))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, positions, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, self.uv_vbo.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..self.grid.count());
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    kind: RendererKind,
) -> wgpu::RenderPipeline {
    let (vs, fs, blend) = match kind {
        RendererKind::DepthOfField => ("vs_dof", "fs_dof", premul_alpha_blend()),
        RendererKind::Additive => ("vs_additive", "fs_additive", additive_blend()),
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("curlfield points pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs),
            compilation_options: Default::default(),
            buffers: &[QuadCorner::layout(), PointInstance::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: triangle_list_no_cull(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Per-instance data: the particle's uv in the position texture (loc 1).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PointInstance {
    uv: [f32; 2],
}

impl PointInstance {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Uniform layout (192 bytes):
///
///  offset   0  model_view     mat4
///  offset  64  projection     mat4
///  offset 128  viewport       vec2
///  offset 136  focus, fov, blur, point_size, edge_divisor, min_point_size
///  offset 160  color          vec4 (linear)
///  offset 176  grid_size + pad
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PointUniforms {
    model_view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    viewport: [f32; 2],
    focus: f32,
    fov: f32,
    blur: f32,
    point_size: f32,
    edge_divisor: f32,
    min_point_size: f32,
    color: [f32; 4],
    grid_size: f32,
    _pad: [f32; 3],
}

impl PointUniforms {
    fn new(style: &PointStyle, grid: ParticleGrid, frame: &PointFrame) -> Self {
        let [r, g, b] = style.color;
        Self {
            model_view: frame.model_view.to_cols_array_2d(),
            projection: frame.projection.to_cols_array_2d(),
            viewport: [frame.viewport.width.max(1.0), frame.viewport.height.max(1.0)],
            focus: frame.focus,
            fov: frame.fov,
            blur: frame.blur,
            point_size: style.point_size,
            edge_divisor: style.edge_divisor,
            min_point_size: style.min_point_size,
            color: [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), 1.0],
            grid_size: grid.size() as f32,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> PointFrame {
        PointFrame {
            model_view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Viewport::new(0.0, 720.0),
            focus: 5.1,
            fov: 50.0,
            blur: 30.0,
        }
    }

    #[test]
    fn uniform_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<PointUniforms>(), 192);
        assert_eq!(std::mem::offset_of!(PointUniforms, viewport), 128);
        assert_eq!(std::mem::offset_of!(PointUniforms, focus), 136);
        assert_eq!(std::mem::offset_of!(PointUniforms, color), 160);
        assert_eq!(std::mem::offset_of!(PointUniforms, grid_size), 176);
    }

    #[test]
    fn uniforms_carry_style_and_frame() {
        let style = PointStyle::from_config(&ParticleConfig::default());
        let grid = ParticleGrid::new(64).unwrap();
        let u = PointUniforms::new(&style, grid, &frame());

        assert_eq!(u.grid_size, 64.0);
        assert_eq!(u.focus, 5.1);
        assert_eq!(u.min_point_size, 1.0);
        // Degenerate viewport dimensions are clamped to one pixel.
        assert_eq!(u.viewport, [1.0, 720.0]);
        // Color goes out linear: sRGB 0.34 is darker in linear light.
        assert!(u.color[0] < 0.34 && u.color[0] > 0.0);
        assert_eq!(u.color[3], 1.0);
    }

    const SIDE: u32 = 32;

    /// Renders a 2×2 grid whose particles sit at the centers of the four
    /// 16-pixel quadrants: column `u = 0` at pixel x 8, column `u = 0.5` at x 24.
    fn render_quadrants(style: PointStyle, fov: f32) -> Option<Vec<[u8; 4]>> {
        let gpu = crate::target::test_gpu()?;
        let (device, queue) = (gpu.device(), gpu.queue());
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let grid = ParticleGrid::new(2).ok()?;

        let positions = OffscreenTarget::new(device, 2, "test positions").ok()?;
        positions
            .upload(
                queue,
                &[
                    [-0.5, 0.5, 0.0, 1.0],
                    [0.5, 0.5, 0.0, 1.0],
                    [-0.5, -0.5, 0.0, 1.0],
                    [0.5, -0.5, 0.0, 1.0],
                ],
            )
            .ok()?;

        let renderer =
            PointCloudRenderer::new(device, &MaterialTable::with_builtins(), format, style, grid).ok()?;
        renderer.write_params(
            queue,
            &PointFrame {
                model_view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
                viewport: Viewport::new(SIDE as f32, SIDE as f32),
                // view_z is 0 everywhere: distance 0.5, alpha 0.29.
                focus: 0.5,
                fov,
                blur: 20.0,
            },
        );
        let bind_group = renderer.bind_positions(device, &positions);

        let extent = wgpu::Extent3d {
            width: SIDE,
            height: SIDE,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = color.create_view(&Default::default());

        let row = crate::target::padded_bytes_per_row(SIDE * 4);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("test color readback"),
            size: u64::from(row * SIDE),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&Default::default());
        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("test clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        renderer.encode(&mut encoder, &view, &bind_group);
        encoder.copy_texture_to_buffer(
            color.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(row),
                    rows_per_image: Some(SIDE),
                },
            },
            extent,
        );
        queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .unwrap();

        let data = slice.get_mapped_range();
        let pixels = data
            .chunks_exact(row as usize)
            .flat_map(|r| bytemuck::cast_slice::<u8, [u8; 4]>(&r[..(SIDE * 4) as usize]).to_vec())
            .collect();
        Some(pixels)
    }

    fn lit(pixels: &[[u8; 4]], x: u32, y: u32) -> bool {
        pixels[(y * SIDE + x) as usize][3] > 0
    }

    #[test]
    fn dof_edge_mask_splits_columns_and_discards_outside_circle() {
        let style = PointStyle {
            kind: RendererKind::DepthOfField,
            min_point_size: 4.0,
            ..PointStyle::from_config(&ParticleConfig::default())
        };
        // Mask edge at u = 0.375: the u = 0.5 column passes, u = 0 does not.
        let Some(px) = render_quadrants(style, 1.6) else {
            return;
        };

        for y in [8, 24] {
            // Full size: 10 px disc around x 24.
            assert!(lit(&px, 24, y));
            assert!(lit(&px, 27, y));
            // Masked: clamped to the 4 px minimum around x 8.
            assert!(lit(&px, 8, y));
            assert!(!lit(&px, 11, y));
        }
        // Inside the 10 px quad but outside its inscribed circle.
        assert!(!lit(&px, 28, 12));
        assert!(lit(&px, 26, 10));

        let alpha = px[(8 * SIDE + 24) as usize][3];
        assert!((70..=78).contains(&alpha), "alpha {alpha}");
    }

    #[test]
    fn dof_mask_above_every_column_leaves_minimum_points() {
        let style = PointStyle {
            kind: RendererKind::DepthOfField,
            min_point_size: 4.0,
            ..PointStyle::from_config(&ParticleConfig::default())
        };
        // Edge at u = 0.6: both columns are masked.
        let Some(px) = render_quadrants(style, 2.5) else {
            return;
        };
        assert!(lit(&px, 24, 8));
        assert!(!lit(&px, 27, 8));
    }

    #[test]
    fn additive_edge_mask_scales_point_size() {
        let style = PointStyle {
            kind: RendererKind::Additive,
            point_size: 8.0,
            edge_divisor: 1.6,
            min_point_size: 1.0,
            color: [1.0, 1.0, 1.0],
        };
        let Some(px) = render_quadrants(style, 50.0) else {
            return;
        };

        for y in [8, 24] {
            // 8 * 1.5 = 12 px square at x 24; 8 * 0.5 = 4 px square at x 8.
            assert!(lit(&px, 28, y));
            assert!(lit(&px, 9, y));
            assert!(!lit(&px, 12, y));
        }
        // Additive points are squares: the corner is drawn.
        assert!(lit(&px, 28, 12));
    }
}
