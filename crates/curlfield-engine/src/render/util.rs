//! Shared GPU types and helpers used by renderers.

use bytemuck::{Pod, Zeroable};

// ── blend ─────────────────────────────────────────────────────────────────

/// Premultiplied-alpha "over" blending.
pub fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Additive blending: `dst + src * src_alpha`.
pub fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── uniform binding size ──────────────────────────────────────────────────

/// Returns the `wgpu` minimum binding size for a uniform of type `T`.
///
/// Panics for zero-sized `T`; every uniform struct in this workspace is at
/// least 16 bytes.
pub fn uniform_min_binding_size<T: Pod>() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<T>() as u64)
        .expect("uniform types are non-zero-sized")
}

// ── unit quad ─────────────────────────────────────────────────────────────

/// Corner of a unit quad, `[-1, 1]²`. Instanced renderers expand each
/// instance into a screen-aligned quad using these corners.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct QuadCorner {
    pub corner: [f32; 2],
}

impl QuadCorner {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadCorner>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub const QUAD_CORNERS: [QuadCorner; 4] = [
    QuadCorner { corner: [-1.0, -1.0] },
    QuadCorner { corner: [1.0, -1.0] },
    QuadCorner { corner: [1.0, 1.0] },
    QuadCorner { corner: [-1.0, 1.0] },
];

pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── passes ────────────────────────────────────────────────────────────────

/// Color attachment that keeps existing contents (draw on top of the clear pass).
pub fn load_color_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    }
}

/// Triangle list, no culling: quads are generated in clip space and may flip.
pub fn triangle_list_no_cull() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_indices_cover_two_triangles_of_the_corners() {
        let mut used = [false; 4];
        for i in QUAD_INDICES {
            used[i as usize] = true;
        }
        assert!(used.iter().all(|u| *u));
        assert_eq!(QUAD_INDICES.len(), 6);
    }

    #[test]
    fn quad_corners_span_unit_square() {
        for c in QUAD_CORNERS {
            assert_eq!(c.corner[0].abs(), 1.0);
            assert_eq!(c.corner[1].abs(), 1.0);
        }
    }
}
