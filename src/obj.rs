//! Wavefront OBJ parsing into a flat triangle soup.
//!
//! Handles the subset the scenes here use: `v`/`vn`/`vt`, `f` with 3 or more
//! corners, `o`/`g` object tags, `usemtl` material tags and `mtllib`.
//! Negative (relative) indices are not supported.

use crate::error::AssetError;
use crate::mesh::{FlatMesh, DEFAULT_TAG, DEFAULT_VERTEX_COLOR};

/// Result of parsing one OBJ file.
#[derive(Debug)]
pub struct ObjParse {
    pub mesh: FlatMesh,
    /// Material library named by the file's `mtllib` line, if any.
    pub mtllib: Option<String>,
}

/// Normals at or below this magnitude count as missing.
const NORMAL_EPSILON: f32 = 0.01;

/// Recognized OBJ keywords; anything else tokenizes to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Position,
    Normal,
    Texcoord,
    Face,
    Object,
    UseMtl,
    MtlLib,
    Unknown,
}

impl Keyword {
    fn tokenize(token: &str) -> Self {
        match token {
            "v" => Keyword::Position,
            "vn" => Keyword::Normal,
            "vt" => Keyword::Texcoord,
            "f" => Keyword::Face,
            "o" | "g" => Keyword::Object,
            "usemtl" => Keyword::UseMtl,
            "mtllib" => Keyword::MtlLib,
            _ => Keyword::Unknown,
        }
    }
}

struct Corner {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

/// Parses OBJ text into a fully expanded vertex stream.
///
/// Faces are fan-triangulated from their first corner (a quad becomes the
/// triangles 0-1-2 and 0-2-3), every corner becomes its own output vertex and
/// the index buffer is the identity. Each vertex carries the material and
/// object tags that were current when its face was read.
pub fn parse(text: &str) -> Result<ObjParse, AssetError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    let mut face_positions: Vec<f32> = Vec::new();
    let mut face_normals: Vec<f32> = Vec::new();
    let mut face_texcoords: Vec<f32> = Vec::new();
    let mut face_materials: Vec<String> = Vec::new();
    let mut face_objects: Vec<String> = Vec::new();

    let mut current_material = DEFAULT_TAG.to_string();
    let mut current_object = DEFAULT_TAG.to_string();
    let mut mtllib = None;

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let keyword = match tokens.next() {
            Some(token) => Keyword::tokenize(token),
            None => continue,
        };

        match keyword {
            Keyword::MtlLib => mtllib = tokens.next().map(str::to_string),
            Keyword::UseMtl => current_material = join_tag(tokens),
            Keyword::Object => current_object = join_tag(tokens),
            Keyword::Position => positions.push(parse_vec3(&mut tokens)),
            Keyword::Normal => normals.push(parse_vec3(&mut tokens)),
            Keyword::Texcoord => texcoords.push(parse_vec2(&mut tokens)),
            Keyword::Face => {
                let corners = parse_corners(
                    tokens,
                    line_number,
                    positions.len(),
                    texcoords.len(),
                    normals.len(),
                )?;
                let before = face_positions.len() / 3;
                emit_triangles(
                    &corners,
                    &positions,
                    &normals,
                    &texcoords,
                    &mut face_positions,
                    &mut face_normals,
                    &mut face_texcoords,
                );
                let emitted = face_positions.len() / 3 - before;
                for _ in 0..emitted {
                    face_materials.push(current_material.clone());
                    face_objects.push(current_object.clone());
                }
            }
            Keyword::Unknown => {}
        }
    }

    let vertex_count = face_positions.len() / 3;
    let mut colors = Vec::with_capacity(vertex_count * 3);
    for _ in 0..vertex_count {
        colors.extend_from_slice(&DEFAULT_VERTEX_COLOR);
    }
    let indices = (0..vertex_count as u32).collect();

    // All-or-nothing at the mesh level: one valid normal anywhere keeps every
    // supplied normal untouched.
    if !has_any_valid_normal(&face_normals) {
        compute_flat_normals(&face_positions, &mut face_normals);
    }
    // Corners that still have no normal (absent vn in a mixed mesh, or a
    // degenerate triangle the reconstruction skipped) fall back to straight up
    for normal in face_normals.chunks_exact_mut(3) {
        if magnitude(normal) <= NORMAL_EPSILON {
            normal.copy_from_slice(&[0.0, 1.0, 0.0]);
        }
    }

    Ok(ObjParse {
        mesh: FlatMesh {
            positions: face_positions,
            normals: face_normals,
            colors,
            texcoords: Some(face_texcoords),
            material_tags: Some(face_materials),
            object_tags: Some(face_objects),
            indices,
        },
        mtllib,
    })
}

/// Joins the tokens after `o`/`g`/`usemtl` with single spaces.
fn join_tag<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    let tag = tokens.collect::<Vec<_>>().join(" ");
    if tag.is_empty() {
        DEFAULT_TAG.to_string()
    } else {
        tag
    }
}

fn parse_component<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> f32 {
    tokens
        .next()
        .map_or(f32::NAN, |token| token.parse().unwrap_or(f32::NAN))
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> [f32; 3] {
    [
        parse_component(tokens),
        parse_component(tokens),
        parse_component(tokens),
    ]
}

fn parse_vec2<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> [f32; 2] {
    [parse_component(tokens), parse_component(tokens)]
}

fn parse_corners<'a>(
    tokens: impl Iterator<Item = &'a str>,
    line: usize,
    position_count: usize,
    texcoord_count: usize,
    normal_count: usize,
) -> Result<Vec<Corner>, AssetError> {
    let mut corners = Vec::new();
    for token in tokens {
        let mut fields = token.split('/');
        let position = resolve_index(fields.next().unwrap_or(""), line, position_count, "vertex")?;
        let texcoord = resolve_optional_index(fields.next(), line, texcoord_count, "texcoord")?;
        let normal = resolve_optional_index(fields.next(), line, normal_count, "normal")?;
        corners.push(Corner {
            position,
            texcoord,
            normal,
        });
    }
    Ok(corners)
}

/// Converts a 1-based OBJ index into a checked 0-based one. Index 0 is never
/// valid, so the conversion cannot underflow.
fn resolve_index(text: &str, line: usize, len: usize, kind: &str) -> Result<usize, AssetError> {
    let raw: i64 = text.parse().map_err(|_| AssetError::MalformedGeometry {
        line,
        message: format!("invalid {kind} index '{text}'"),
    })?;
    if raw < 1 || raw as usize > len {
        return Err(AssetError::MalformedGeometry {
            line,
            message: format!("{kind} index {raw} out of range (1..={len})"),
        });
    }
    Ok(raw as usize - 1)
}

fn resolve_optional_index(
    field: Option<&str>,
    line: usize,
    len: usize,
    kind: &str,
) -> Result<Option<usize>, AssetError> {
    match field {
        None | Some("") => Ok(None),
        Some(text) => resolve_index(text, line, len, kind).map(Some),
    }
}

fn emit_triangles(
    corners: &[Corner],
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    face_positions: &mut Vec<f32>,
    face_normals: &mut Vec<f32>,
    face_texcoords: &mut Vec<f32>,
) {
    if corners.len() < 3 {
        return;
    }
    for i in 1..corners.len() - 1 {
        for corner in [&corners[0], &corners[i], &corners[i + 1]] {
            face_positions.extend_from_slice(&positions[corner.position]);
            match corner.normal {
                Some(index) => face_normals.extend_from_slice(&normals[index]),
                // Absent marker; resolved by the post-pass
                None => face_normals.extend_from_slice(&[0.0, 0.0, 0.0]),
            }
            match corner.texcoord {
                Some(index) => face_texcoords.extend_from_slice(&texcoords[index]),
                None => face_texcoords.extend_from_slice(&[0.0, 0.0]),
            }
        }
    }
}

fn magnitude(normal: &[f32]) -> f32 {
    (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt()
}

fn has_any_valid_normal(normals: &[f32]) -> bool {
    normals
        .chunks_exact(3)
        .any(|normal| magnitude(normal) > NORMAL_EPSILON)
}

/// Flat-shading fallback: one face normal per triangle from the cross product
/// of its edge vectors, assigned to all three corners. Degenerate triangles
/// are left untouched.
fn compute_flat_normals(positions: &[f32], normals: &mut [f32]) {
    for (triangle, out) in positions.chunks_exact(9).zip(normals.chunks_exact_mut(9)) {
        let edge1 = [
            triangle[3] - triangle[0],
            triangle[4] - triangle[1],
            triangle[5] - triangle[2],
        ];
        let edge2 = [
            triangle[6] - triangle[0],
            triangle[7] - triangle[1],
            triangle[8] - triangle[2],
        ];
        let normal = [
            edge1[1] * edge2[2] - edge1[2] * edge2[1],
            edge1[2] * edge2[0] - edge1[0] * edge2[2],
            edge1[0] * edge2[1] - edge1[1] * edge2[0],
        ];
        let length = magnitude(&normal);
        if length > 0.0 {
            for corner in 0..3 {
                out[corner * 3] = normal[0] / length;
                out[corner * 3 + 1] = normal[1] / length;
                out[corner * 3 + 2] = normal[2] / length;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_triangle() {
        let parsed = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let mesh = parsed.mesh;
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.positions, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn quad_splits_on_the_fixed_diagonal() {
        let parsed = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3 4\n").unwrap();
        let mesh = parsed.mesh;
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        // Second triangle is corners 0, 2, 3 of the face: v1, v3, v4
        assert_eq!(&mesh.positions[9..12], &[0.0, 0.0, 0.0]);
        assert_eq!(&mesh.positions[12..15], &[0.0, 1.0, 0.0]);
        assert_eq!(&mesh.positions[15..18], &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn ngon_fans_from_the_first_corner() {
        let text = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 2 0\nv -1 1 0\nf 1 2 3 4 5 6\n";
        let mesh = parse(text).unwrap().mesh;
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.vertex_count(), 12);
        // Every fan triangle starts at face corner 0
        for triangle in 0..4 {
            assert_eq!(&mesh.positions[triangle * 9..triangle * 9 + 3], &[0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn corner_forms_resolve_texcoords_and_normals() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nvn 0 0 1\nf 1/1/1 2/1/1 3//1\n";
        let mesh = parse(text).unwrap().mesh;
        let texcoords = mesh.texcoords.unwrap();
        assert_eq!(&texcoords[0..2], &[0.5, 0.5]);
        // The v//vn corner falls back to (0, 0)
        assert_eq!(&texcoords[4..6], &[0.0, 0.0]);
        assert_eq!(&mesh.normals[0..3], &[0.0, 0.0, 1.0]);
        assert_eq!(&mesh.normals[6..9], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn missing_normals_reconstruct_flat_faces() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap().mesh;
        for corner in 0..3 {
            assert_eq!(&mesh.normals[corner * 3..corner * 3 + 3], &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn one_valid_normal_disables_reconstruction() {
        // Second face has no normals; the first face's vn keeps the
        // reconstruction pass off, so those corners get the fallback normal.
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nf 1//1 2//1 3//1\nf 1 2 3\n";
        let mesh = parse(text).unwrap().mesh;
        assert_eq!(&mesh.normals[0..3], &[1.0, 0.0, 0.0]);
        for corner in 3..6 {
            assert_eq!(&mesh.normals[corner * 3..corner * 3 + 3], &[0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn zero_length_supplied_normals_still_reconstruct() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 0\nf 1//1 2//1 3//1\n";
        let mesh = parse(text).unwrap().mesh;
        for corner in 0..3 {
            assert_eq!(&mesh.normals[corner * 3..corner * 3 + 3], &[0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn tags_default_and_follow_usemtl_and_object_lines() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nusemtl brick\no left door\nf 1 2 3\n";
        let mesh = parse(text).unwrap().mesh;
        let materials = mesh.material_tags.unwrap();
        let objects = mesh.object_tags.unwrap();
        assert!(materials[0..3].iter().all(|tag| tag == "default"));
        assert!(materials[3..6].iter().all(|tag| tag == "brick"));
        assert!(objects[0..3].iter().all(|tag| tag == "default"));
        // Multi-token names join with single spaces
        assert!(objects[3..6].iter().all(|tag| tag == "left door"));
    }

    #[test]
    fn mtllib_is_reported() {
        let parsed = parse("mtllib building.mtl\nv 0 0 0\n").unwrap();
        assert_eq!(parsed.mtllib.as_deref(), Some("building.mtl"));
    }

    #[test]
    fn default_color_is_light_gray() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap().mesh;
        assert_eq!(&mesh.colors[0..3], &[0.8, 0.8, 0.8]);
        assert_eq!(mesh.colors.len(), 9);
    }

    #[test]
    fn zero_index_is_rejected() {
        let err = parse("v 0 0 0\nf 0 1 1\n").unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 2, .. }));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 4\n").unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 4, .. }));
    }

    #[test]
    fn out_of_range_normal_index_is_rejected() {
        let err = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//2 2//1 3//1\n").unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 5, .. }));
    }

    #[test]
    fn negative_indices_are_unsupported() {
        assert!(parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf -1 -2 -3\n").is_err());
    }

    #[test]
    fn vertex_count_matches_triangulation_policy() {
        // 1 triangle + 1 quad + 1 hexagon: 1 + 2 + 4 triangles
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 2 0 0\nv 2 2 0\n\
                    f 1 2 3\nf 1 2 3 4\nf 1 2 3 4 5 6\n";
        let mesh = parse(text).unwrap().mesh;
        assert_eq!(mesh.triangle_count(), 7);
        assert_eq!(mesh.vertex_count(), 21);
        assert_eq!(mesh.indices, (0..21).collect::<Vec<u32>>());
    }

    #[test]
    fn comments_and_unknown_keywords_are_skipped() {
        let text = "# a comment\ns off\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        assert_eq!(parse(text).unwrap().mesh.triangle_count(), 1);
    }

    #[test]
    fn empty_input_parses_to_an_empty_mesh() {
        let mesh = parse("").unwrap().mesh;
        assert_eq!(mesh.vertex_count(), 0);
        assert!(mesh.indices.is_empty());
    }
}
