//! CPU-side quad batching.
//!
//! Every visible sprite becomes four vertices and six indices in one shared
//! mesh. Consecutive quads that sample the same texture collapse into a single
//! draw call, so drawing a tile layer costs one `draw_indexed` no matter how
//! many tiles it has.

use std::sync::Arc;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

impl SpriteVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// A contiguous index range drawn with one texture binding.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub texture_key: Arc<str>,
    pub index_start: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct QuadSpec<'a> {
    pub texture_key: &'a str,
    pub center: [f32; 2],
    pub size: [f32; 2],
    pub rotation_deg: f32,
    /// Multiplied with the texture sample; alpha carries sprite opacity.
    pub color: [f32; 4],
}

#[derive(Debug, Default)]
pub struct SpriteBatch {
    vertices: Vec<SpriteVertex>,
    indices: Vec<u32>,
    draw_calls: Vec<DrawCall>,
}

impl SpriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.draw_calls.clear();
    }

    pub fn push_quad(&mut self, spec: QuadSpec<'_>) {
        let half_w = spec.size[0] * 0.5;
        let half_h = spec.size[1] * 0.5;
        let mut corners = [
            [-half_w, -half_h],
            [half_w, -half_h],
            [half_w, half_h],
            [-half_w, half_h],
        ];
        let radians = spec.rotation_deg.to_radians();
        if radians != 0.0 {
            let (sin_r, cos_r) = radians.sin_cos();
            for c in &mut corners {
                let (x, y) = (c[0], c[1]);
                c[0] = x * cos_r - y * sin_r;
                c[1] = x * sin_r + y * cos_r;
            }
        }

        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        let base_index = self.vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            self.vertices.push(SpriteVertex {
                position: [spec.center[0] + corner[0], spec.center[1] + corner[1]],
                tex_coords: uv,
                color: spec.color,
            });
        }

        let draw_start = self.indices.len() as u32;
        self.indices.extend_from_slice(&[
            base_index,
            base_index + 1,
            base_index + 2,
            base_index,
            base_index + 2,
            base_index + 3,
        ]);
        self.push_draw_call(spec.texture_key, draw_start, 6);
    }

    fn push_draw_call(&mut self, texture_key: &str, index_start: u32, index_count: u32) {
        if let Some(last) = self.draw_calls.last_mut() {
            let contiguous = last.index_start + last.index_count == index_start;
            if &*last.texture_key == texture_key && contiguous {
                last.index_count += index_count;
                return;
            }
        }
        self.draw_calls.push(DrawCall {
            texture_key: Arc::from(texture_key),
            index_start,
            index_count,
        });
    }

    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Number of texture rebinds the draw calls will need.
    pub fn texture_binds(&self) -> usize {
        let mut binds = 0usize;
        let mut current: Option<&str> = None;
        for draw in &self.draw_calls {
            let key: &str = &draw.texture_key;
            if current != Some(key) {
                current = Some(key);
                binds += 1;
            }
        }
        binds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(texture_key: &str, x: f32) -> QuadSpec<'_> {
        QuadSpec {
            texture_key,
            center: [x, 0.0],
            size: [32.0, 32.0],
            rotation_deg: 0.0,
            color: [1.0; 4],
        }
    }

    #[test]
    fn same_texture_quads_merge_into_one_draw() {
        let mut batch = SpriteBatch::new();
        for i in 0..5 {
            batch.push_quad(quad("tiles", i as f32 * 32.0));
        }
        assert_eq!(batch.quad_count(), 5);
        assert_eq!(batch.draw_calls().len(), 1);
        assert_eq!(batch.draw_calls()[0].index_count, 30);
    }

    #[test]
    fn texture_change_splits_draws() {
        let mut batch = SpriteBatch::new();
        batch.push_quad(quad("tiles", 0.0));
        batch.push_quad(quad("coin", 32.0));
        batch.push_quad(quad("tiles", 64.0));
        assert_eq!(batch.draw_calls().len(), 3);
        assert_eq!(batch.texture_binds(), 3);
        assert_eq!(batch.draw_calls()[2].index_start, 12);
    }

    #[test]
    fn rotation_keeps_quad_centered() {
        let mut batch = SpriteBatch::new();
        batch.push_quad(QuadSpec {
            rotation_deg: 90.0,
            ..quad("button", 100.0)
        });
        let cx: f32 = batch.vertices().iter().map(|v| v.position[0]).sum::<f32>() / 4.0;
        let cy: f32 = batch.vertices().iter().map(|v| v.position[1]).sum::<f32>() / 4.0;
        assert!((cx - 100.0).abs() < 0.001);
        assert!(cy.abs() < 0.001);
        // First corner (-16,-16) rotated by 90 degrees lands at (16,-16).
        let first = batch.vertices()[0].position;
        assert!((first[0] - 116.0).abs() < 0.001);
        assert!((first[1] + 16.0).abs() < 0.001);
    }

    #[test]
    fn clear_empties_everything() {
        let mut batch = SpriteBatch::new();
        batch.push_quad(quad("tiles", 0.0));
        batch.clear();
        assert!(batch.vertices().is_empty());
        assert!(batch.indices().is_empty());
        assert!(batch.draw_calls().is_empty());
    }
}
