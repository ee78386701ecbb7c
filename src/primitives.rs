//! Procedural geometry: ground plane, tree parts and simple boxes.

use std::f32::consts::PI;

use crate::mesh::FlatMesh;

/// Subdivided ground plane on the XZ plane, centered at the origin.
///
/// Cells alternate between two grays for a checkerboard look until a texture
/// replaces the colors. Texcoords advance one unit per cell so a REPEAT
/// texture tiles once per cell.
pub fn plane(width: f32, depth: f32, subdivisions: u32) -> FlatMesh {
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut normals = Vec::new();
    let mut texcoords = Vec::new();
    let mut indices = Vec::new();

    let segment_width = width / subdivisions as f32;
    let segment_depth = depth / subdivisions as f32;

    for z in 0..=subdivisions {
        for x in 0..=subdivisions {
            let x_pos = x as f32 * segment_width - width / 2.0;
            let z_pos = z as f32 * segment_depth - depth / 2.0;

            positions.extend_from_slice(&[x_pos, 0.0, z_pos]);

            if (x + z) % 2 == 0 {
                colors.extend_from_slice(&[0.3, 0.3, 0.3]);
            } else {
                colors.extend_from_slice(&[0.5, 0.5, 0.5]);
            }

            normals.extend_from_slice(&[0.0, 1.0, 0.0]);
            texcoords.extend_from_slice(&[x as f32, z as f32]);
        }
    }

    for z in 0..subdivisions {
        for x in 0..subdivisions {
            let top_left = z * (subdivisions + 1) + x;
            let top_right = top_left + 1;
            let bottom_left = (z + 1) * (subdivisions + 1) + x;
            let bottom_right = bottom_left + 1;

            indices.extend_from_slice(&[top_left, bottom_left, top_right]);
            indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
        }
    }

    FlatMesh {
        positions,
        normals,
        colors,
        texcoords: Some(texcoords),
        material_tags: None,
        object_tags: None,
        indices,
    }
}

const TRUNK_COLOR: [f32; 3] = [0.4, 0.25, 0.1];
const FOLIAGE_COLOR: [f32; 3] = [0.1, 0.5, 0.1];

/// Tapered cylinder for a tree trunk, base at y = 0.
pub fn tree_trunk(radius_bottom: f32, radius_top: f32, height: f32, segments: u32) -> FlatMesh {
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * PI * 2.0;
        let cos = angle.cos();
        let sin = angle.sin();

        positions.extend_from_slice(&[radius_bottom * cos, 0.0, radius_bottom * sin]);
        normals.extend_from_slice(&[cos, 0.0, sin]);
        colors.extend_from_slice(&TRUNK_COLOR);

        positions.extend_from_slice(&[radius_top * cos, height, radius_top * sin]);
        normals.extend_from_slice(&[cos, 0.0, sin]);
        colors.extend_from_slice(&TRUNK_COLOR);
    }

    for i in 0..segments {
        let base = i * 2;
        indices.extend_from_slice(&[base, base + 1, base + 2]);
        indices.extend_from_slice(&[base + 1, base + 3, base + 2]);
    }

    let bottom_center = positions.len() as u32 / 3;
    positions.extend_from_slice(&[0.0, 0.0, 0.0]);
    normals.extend_from_slice(&[0.0, -1.0, 0.0]);
    colors.extend_from_slice(&TRUNK_COLOR);
    for i in 0..segments {
        indices.extend_from_slice(&[bottom_center, i * 2, (i + 1) * 2]);
    }

    let top_center = positions.len() as u32 / 3;
    positions.extend_from_slice(&[0.0, height, 0.0]);
    normals.extend_from_slice(&[0.0, 1.0, 0.0]);
    colors.extend_from_slice(&TRUNK_COLOR);
    for i in 0..segments {
        indices.extend_from_slice(&[top_center, (i + 1) * 2 + 1, i * 2 + 1]);
    }

    FlatMesh {
        positions,
        normals,
        colors,
        texcoords: None,
        material_tags: None,
        object_tags: None,
        indices,
    }
}

/// Cone for tree foliage, base at y = 0, apex at y = height.
pub fn tree_foliage(radius: f32, height: f32, segments: u32) -> FlatMesh {
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    let top = 0u32;
    positions.extend_from_slice(&[0.0, height, 0.0]);
    normals.extend_from_slice(&[0.0, 1.0, 0.0]);
    colors.extend_from_slice(&FOLIAGE_COLOR);

    for i in 0..=segments {
        let angle = i as f32 / segments as f32 * PI * 2.0;
        positions.extend_from_slice(&[radius * angle.cos(), 0.0, radius * angle.sin()]);
        // Outward-and-up; the shader normalizes
        normals.extend_from_slice(&[angle.cos(), 0.5, angle.sin()]);
        colors.extend_from_slice(&FOLIAGE_COLOR);
    }

    for i in 1..=segments {
        indices.extend_from_slice(&[top, i, i + 1]);
    }

    let center = positions.len() as u32 / 3;
    positions.extend_from_slice(&[0.0, 0.0, 0.0]);
    normals.extend_from_slice(&[0.0, -1.0, 0.0]);
    colors.extend_from_slice(&FOLIAGE_COLOR);
    for i in 1..=segments {
        indices.extend_from_slice(&[center, i + 1, i]);
    }

    FlatMesh {
        positions,
        normals,
        colors,
        texcoords: None,
        material_tags: None,
        object_tags: None,
        indices,
    }
}

/// Axis-aligned box centered at the origin with per-face normals and a
/// uniform color. 24 vertices, 36 indices.
pub fn cuboid(width: f32, height: f32, depth: f32, color: [f32; 3]) -> FlatMesh {
    let x = width / 2.0;
    let y = height / 2.0;
    let z = depth / 2.0;

    // (normal, four corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]],
        ),
    ];

    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for (face, (normal, corners)) in faces.iter().enumerate() {
        for corner in corners {
            positions.extend_from_slice(corner);
            normals.extend_from_slice(normal);
            colors.extend_from_slice(&color);
        }
        let base = face as u32 * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    FlatMesh {
        positions,
        normals,
        colors,
        texcoords: None,
        material_tags: None,
        object_tags: None,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_counts_follow_subdivisions() {
        let mesh = plane(10.0, 10.0, 4);
        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.triangle_count(), 32);
        assert_eq!(mesh.texcoords.as_ref().unwrap().len(), 50);
    }

    #[test]
    fn plane_spans_its_extents() {
        let mesh = plane(100.0, 40.0, 2);
        let bounds = mesh.bounds();
        assert_eq!(bounds.min, [-50.0, 0.0, -20.0]);
        assert_eq!(bounds.max, [50.0, 0.0, 20.0]);
    }

    #[test]
    fn plane_checkers_alternate() {
        let mesh = plane(2.0, 2.0, 1);
        assert_eq!(&mesh.colors[0..3], &[0.3, 0.3, 0.3]);
        assert_eq!(&mesh.colors[3..6], &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn trunk_counts() {
        let segments = 8;
        let mesh = tree_trunk(0.4, 0.3, 2.5, segments);
        // Ring pairs plus the two cap centers
        assert_eq!(mesh.vertex_count(), (segments as usize + 1) * 2 + 2);
        // Side quads + both caps
        assert_eq!(mesh.triangle_count(), segments as usize * 4);
    }

    #[test]
    fn foliage_counts() {
        let segments = 10;
        let mesh = tree_foliage(2.0, 4.0, segments);
        assert_eq!(mesh.vertex_count(), segments as usize + 3);
        assert_eq!(mesh.triangle_count(), segments as usize * 2);
    }

    #[test]
    fn foliage_apex_sits_at_height() {
        let mesh = tree_foliage(2.0, 4.0, 10);
        assert_eq!(&mesh.positions[0..3], &[0.0, 4.0, 0.0]);
    }

    #[test]
    fn cuboid_has_24_vertices_and_12_triangles() {
        let mesh = cuboid(2.0, 4.0, 6.0, [0.5, 0.5, 0.5]);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        let bounds = mesh.bounds();
        assert_eq!(bounds.min, [-1.0, -2.0, -3.0]);
        assert_eq!(bounds.max, [1.0, 2.0, 3.0]);
    }
}
