//! Mesh data passed between the loaders, the partitioner and the renderer.

/// Tag used for vertices parsed before any `usemtl` or `o`/`g` line.
pub const DEFAULT_TAG: &str = "default";

/// Vertex color before material colors are baked in.
pub const DEFAULT_VERTEX_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

/// A flat vertex stream with parallel per-vertex attribute arrays.
///
/// Parser output carries one entry per face corner and the identity index
/// buffer `0..N-1`; procedural generators share vertices through a real index
/// buffer instead. Positions, normals and colors are always present and hold
/// three floats per vertex; texcoords hold two floats per vertex when present.
#[derive(Debug, Clone, Default)]
pub struct FlatMesh {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub colors: Vec<f32>,
    pub texcoords: Option<Vec<f32>>,
    pub material_tags: Option<Vec<String>>,
    pub object_tags: Option<Vec<String>>,
    pub indices: Vec<u32>,
}

/// Axis-aligned bounds of a mesh in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl FlatMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Bounds {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for vertex in self.positions.chunks_exact(3) {
            for axis in 0..3 {
                min[axis] = min[axis].min(vertex[axis]);
                max[axis] = max[axis].max(vertex[axis]);
            }
        }
        Bounds { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_parallel_arrays() {
        let mesh = FlatMesh {
            positions: vec![0.0; 9],
            normals: vec![0.0; 9],
            colors: vec![0.8; 9],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn bounds_cover_all_positions() {
        let mesh = FlatMesh {
            positions: vec![-1.0, 0.0, 2.0, 3.0, -5.0, 0.5],
            normals: vec![0.0; 6],
            colors: vec![0.8; 6],
            indices: vec![0, 1],
            ..Default::default()
        };
        let bounds = mesh.bounds();
        assert_eq!(bounds.min, [-1.0, -5.0, 0.5]);
        assert_eq!(bounds.max, [3.0, 0.0, 2.0]);
    }
}
