//! Offscreen simulation pass.
//!
//! Draws a full-target quad into a position target; the fragment stage
//! computes one particle per texel from the input texture bound at
//! [`SimulationPass::bind_input`].

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use curlfield_engine::render::util::{triangle_list_no_cull, uniform_min_binding_size};

use crate::kernel::StepParams;
use crate::material::{self, MaterialTable};
use crate::target::{OffscreenTarget, POSITION_FORMAT};

/// What the simulation pass computes per texel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SimProgram {
    /// Curl-noise position simulation.
    Curl,
    /// Every texel receives the given color. Used to verify targets.
    Constant([f32; 4]),
}

/// Per-frame inputs of the simulation pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SimFrame {
    pub step: StepParams,
    /// Advect the input (feedback) instead of evaluating the field at it (reseed).
    pub feedback: bool,
}

pub struct SimulationPass {
    program: SimProgram,
    size: u32,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
}

impl SimulationPass {
    pub fn new(
        device: &wgpu::Device,
        materials: &MaterialTable,
        program: SimProgram,
        size: u32,
    ) -> Result<Self> {
        let shader = match program {
            SimProgram::Curl => materials.create(device, material::SIMULATION)?,
            SimProgram::Constant(_) => materials.create(device, material::CONSTANT)?,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("curlfield simulation bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(uniform_min_binding_size::<SimUniforms>()),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
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
            label: Some("curlfield simulation pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("curlfield simulation pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[SimVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: POSITION_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list_no_cull(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("curlfield simulation ubo"),
            size: std::mem::size_of::<SimUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("curlfield simulation quad vbo"),
            contents: bytemuck::cast_slice(&SIM_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        log::debug!("simulation pass ready: {program:?}, {size}x{size}");

        Ok(Self {
            program,
            size,
            pipeline,
            bind_group_layout,
            ubo,
            quad_vbo,
        })
    }

    /// Bind group reading `input`. Callers cache one per input target.
    pub fn bind_input(&self, device: &wgpu::Device, input: &OffscreenTarget) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("curlfield simulation bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(input.view()),
                },
            ],
        })
    }

    pub fn write_params(&self, queue: &wgpu::Queue, frame: &SimFrame) {
        let color = match self.program {
            SimProgram::Constant(c) => c,
            SimProgram::Curl => [0.0; 4],
        };
        let uniforms = SimUniforms {
            time: frame.step.time,
            curl_freq: frame.step.curl_freq,
            advect_step: frame.step.advect_step,
            bound_radius: frame.step.bound_radius,
            size: self.size,
            feedback: u32::from(frame.feedback),
            _pad0: 0,
            _pad1: 0,
            color,
        };
        queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Records the pass: clear `output`, then draw the quad over it.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::BindGroup,
        output: &OffscreenTarget,
    ) {
        debug_assert_eq!(output.size(), self.size);

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("curlfield simulation pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output.view(),
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

        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, input, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.draw(0..SIM_QUAD.len() as u32, 0..1);
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

/// Uniform layout (48 bytes), matching `SimUniforms` in the shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SimUniforms {
    time: f32,
    curl_freq: f32,
    advect_step: f32,
    bound_radius: f32,
    size: u32,
    feedback: u32,
    _pad0: u32,
    _pad1: u32,
    color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SimVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

impl SimVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SimVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Two triangles covering clip space. `v` grows downward, like target rows.
const SIM_QUAD: [SimVertex; 6] = [
    SimVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
    SimVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
    SimVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
    SimVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
    SimVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
    SimVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
];
