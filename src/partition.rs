//! Splits a flat mesh into independent sub-meshes by material or object tag,
//! and bakes material diffuse colors into the vertex stream beforehand.

use std::collections::HashMap;

use crate::material::MaterialTable;
use crate::mesh::{FlatMesh, DEFAULT_TAG};

/// Overwrites each vertex's color with its material's diffuse color.
///
/// Vertices whose tag is missing from the table keep their current color.
/// Runs before splitting so every sub-mesh carries baked colors. Calling it
/// twice with the same table is a no-op the second time.
pub fn apply_material_colors(mesh: &mut FlatMesh, materials: &MaterialTable) {
    let tags = match &mesh.material_tags {
        Some(tags) => tags,
        None => return,
    };
    for (vertex, tag) in tags.iter().enumerate() {
        if let Some(material) = materials.get(tag) {
            mesh.colors[vertex * 3..vertex * 3 + 3].copy_from_slice(&material.diffuse);
        }
    }
}

/// Splits by material tag. The bucket key carries the material name, so the
/// sub-meshes drop their tag arrays.
pub fn split_by_material(mesh: &FlatMesh) -> HashMap<String, FlatMesh> {
    split_by_tags(mesh, mesh.material_tags.as_deref(), false)
}

/// Splits by object tag. Material tags are threaded through into each
/// sub-mesh so materials can still be resolved after the split (doors cut out
/// of a larger model still need their textures).
pub fn split_by_object(mesh: &FlatMesh) -> HashMap<String, FlatMesh> {
    split_by_tags(mesh, mesh.object_tags.as_deref(), true)
}

fn split_by_tags(
    mesh: &FlatMesh,
    tags: Option<&[String]>,
    keep_material_tags: bool,
) -> HashMap<String, FlatMesh> {
    let mut buckets: HashMap<String, FlatMesh> = HashMap::new();
    let has_texcoords = mesh
        .texcoords
        .as_ref()
        .map(|texcoords| !texcoords.is_empty())
        .unwrap_or(false);

    for vertex in 0..mesh.vertex_count() {
        let tag = tags.map_or(DEFAULT_TAG, |tags| tags[vertex].as_str());
        let bucket = buckets.entry(tag.to_string()).or_default();

        bucket
            .positions
            .extend_from_slice(&mesh.positions[vertex * 3..vertex * 3 + 3]);
        bucket
            .normals
            .extend_from_slice(&mesh.normals[vertex * 3..vertex * 3 + 3]);
        bucket
            .colors
            .extend_from_slice(&mesh.colors[vertex * 3..vertex * 3 + 3]);
        if has_texcoords {
            let texcoords = mesh.texcoords.as_ref().unwrap();
            bucket
                .texcoords
                .get_or_insert_with(Vec::new)
                .extend_from_slice(&texcoords[vertex * 2..vertex * 2 + 2]);
        }
        if keep_material_tags {
            if let Some(material_tags) = &mesh.material_tags {
                bucket
                    .material_tags
                    .get_or_insert_with(Vec::new)
                    .push(material_tags[vertex].clone());
            }
        }
    }

    for bucket in buckets.values_mut() {
        bucket.indices = (0..bucket.vertex_count() as u32).collect();
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::obj;

    fn tagged_mesh() -> FlatMesh {
        // Two triangles with different materials and objects
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 2 0 0\n\
                    usemtl A\no body\nf 1 2 3\nusemtl B\no door\nf 2 4 3\n";
        obj::parse(text).unwrap().mesh
    }

    fn table() -> MaterialTable {
        let mut materials = MaterialTable::new();
        let mut a = Material::new("A");
        a.diffuse = [0.1, 0.2, 0.3];
        let mut b = Material::new("B");
        b.diffuse = [0.9, 0.9, 0.9];
        materials.insert("A".to_string(), a);
        materials.insert("B".to_string(), b);
        materials
    }

    #[test]
    fn colors_follow_material_diffuse() {
        let mut mesh = tagged_mesh();
        apply_material_colors(&mut mesh, &table());
        assert_eq!(&mesh.colors[0..3], &[0.1, 0.2, 0.3]);
        assert_eq!(&mesh.colors[9..12], &[0.9, 0.9, 0.9]);
    }

    #[test]
    fn per_vertex_tags_pick_their_own_materials() {
        let mut mesh = FlatMesh {
            positions: vec![0.0; 9],
            normals: vec![0.0; 9],
            colors: vec![0.8; 9],
            material_tags: Some(vec!["A".to_string(), "A".to_string(), "B".to_string()]),
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let materials =
            crate::material::parse("newmtl A\nKd 0.1 0.2 0.3\nnewmtl B\nKd 0.9 0.9 0.9\n");
        assert_eq!(materials.len(), 2);

        apply_material_colors(&mut mesh, &materials);
        assert_eq!(&mesh.colors[0..3], &[0.1, 0.2, 0.3]);
        assert_eq!(&mesh.colors[3..6], &[0.1, 0.2, 0.3]);
        assert_eq!(&mesh.colors[6..9], &[0.9, 0.9, 0.9]);
    }

    #[test]
    fn unknown_tags_keep_the_default_color() {
        let mut mesh = tagged_mesh();
        let mut materials = table();
        materials.remove("B");
        apply_material_colors(&mut mesh, &materials);
        assert_eq!(&mesh.colors[0..3], &[0.1, 0.2, 0.3]);
        assert_eq!(&mesh.colors[9..12], &[0.8, 0.8, 0.8]);
    }

    #[test]
    fn applying_colors_twice_is_idempotent() {
        let mut once = tagged_mesh();
        apply_material_colors(&mut once, &table());
        let mut twice = once.clone();
        apply_material_colors(&mut twice, &table());
        assert_eq!(once.colors, twice.colors);
    }

    #[test]
    fn material_split_conserves_every_vertex() {
        let mut mesh = tagged_mesh();
        apply_material_colors(&mut mesh, &table());
        let buckets = split_by_material(&mesh);
        assert_eq!(buckets.len(), 2);

        let total: usize = buckets.values().map(FlatMesh::vertex_count).sum();
        assert_eq!(total, mesh.vertex_count());

        // Concatenating the buckets reproduces the original vertex multiset
        let mut original: Vec<(String, String)> = Vec::new();
        for vertex in 0..mesh.vertex_count() {
            original.push(vertex_key(&mesh, vertex));
        }
        let mut recombined: Vec<(String, String)> = Vec::new();
        for bucket in buckets.values() {
            for vertex in 0..bucket.vertex_count() {
                recombined.push(vertex_key(bucket, vertex));
            }
        }
        original.sort();
        recombined.sort();
        assert_eq!(original, recombined);
    }

    fn vertex_key(mesh: &FlatMesh, vertex: usize) -> (String, String) {
        (
            format!("{:?}", &mesh.positions[vertex * 3..vertex * 3 + 3]),
            format!("{:?}", &mesh.colors[vertex * 3..vertex * 3 + 3]),
        )
    }

    #[test]
    fn buckets_are_reindexed_from_zero() {
        let buckets = split_by_material(&tagged_mesh());
        for bucket in buckets.values() {
            assert_eq!(bucket.indices, (0..bucket.vertex_count() as u32).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn object_split_threads_material_tags_through() {
        let buckets = split_by_object(&tagged_mesh());
        assert_eq!(buckets.len(), 2);
        let door = &buckets["door"];
        let tags = door.material_tags.as_ref().unwrap();
        assert_eq!(tags.len(), door.vertex_count());
        assert!(tags.iter().all(|tag| tag == "B"));
        // Object tags are spent as the bucket key
        assert!(door.object_tags.is_none());
    }

    #[test]
    fn material_split_drops_tag_arrays() {
        let buckets = split_by_material(&tagged_mesh());
        for bucket in buckets.values() {
            assert!(bucket.material_tags.is_none());
            assert!(bucket.object_tags.is_none());
        }
    }

    #[test]
    fn untagged_mesh_lands_in_a_single_default_bucket() {
        let mesh = FlatMesh {
            positions: vec![0.0; 9],
            normals: vec![0.0; 9],
            colors: vec![0.8; 9],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let buckets = split_by_material(&mesh);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[DEFAULT_TAG].vertex_count(), 3);
    }

    #[test]
    fn texcoords_travel_with_their_vertices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.25 0.75\n\
                    usemtl A\nf 1/1 2/1 3/1\n";
        let mesh = obj::parse(text).unwrap().mesh;
        let buckets = split_by_material(&mesh);
        let bucket = &buckets["A"];
        let texcoords = bucket.texcoords.as_ref().unwrap();
        assert_eq!(texcoords.len(), bucket.vertex_count() * 2);
        assert_eq!(&texcoords[0..2], &[0.25, 0.75]);
    }

    #[test]
    fn pipeline_from_text_to_buckets() {
        // The whole leaf pipeline: parse OBJ + MTL, bake colors, split
        let obj_text = "mtllib scene.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\n\
                        usemtl A\nf 1 2 3\nusemtl B\nf 3 2 1\n";
        let mtl_text = "newmtl A\nKd 0.1 0.2 0.3\nnewmtl B\nKd 0.9 0.9 0.9\n";

        let parsed = obj::parse(obj_text).unwrap();
        assert_eq!(parsed.mtllib.as_deref(), Some("scene.mtl"));
        let mut mesh = parsed.mesh;
        let materials = crate::material::parse(mtl_text);
        assert_eq!(materials.len(), 2);

        apply_material_colors(&mut mesh, &materials);
        let buckets = split_by_material(&mesh);
        assert_eq!(buckets.len(), 2);
        assert!(buckets["A"].colors.chunks_exact(3).all(|c| c == [0.1, 0.2, 0.3]));
        assert!(buckets["B"].colors.chunks_exact(3).all(|c| c == [0.9, 0.9, 0.9]));
    }
}
