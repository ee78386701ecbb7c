//! Wavefront MTL parsing.
//!
//! Covers the Phong subset this viewer consumes: `newmtl`, `Ka`, `Kd`, `Ks`,
//! `Ke`, `Ns`, `d`/`Tr`, `illum` and the `map_Kd`/`map_Ks`/`map_Ka` texture
//! maps. Everything else is ignored.

use std::collections::HashMap;

/// One material record. Fields start at the documented defaults when a
/// `newmtl` line opens the record and are overwritten as property lines apply
/// in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    pub illum: i32,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub ambient_map: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.5, 0.5, 0.5],
            emissive: [0.0, 0.0, 0.0],
            shininess: 32.0,
            opacity: 1.0,
            illum: 2,
            diffuse_map: None,
            specular_map: None,
            ambient_map: None,
        }
    }
}

pub type MaterialTable = HashMap<String, Material>;

/// Recognized MTL keywords; anything else tokenizes to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    NewMtl,
    Ambient,
    Diffuse,
    Specular,
    Emissive,
    Shininess,
    Opacity,
    Illum,
    DiffuseMap,
    SpecularMap,
    AmbientMap,
    Unknown,
}

impl Keyword {
    fn tokenize(token: &str) -> Self {
        match token {
            "newmtl" => Keyword::NewMtl,
            "Ka" => Keyword::Ambient,
            "Kd" => Keyword::Diffuse,
            "Ks" => Keyword::Specular,
            "Ke" => Keyword::Emissive,
            "Ns" => Keyword::Shininess,
            // Both set opacity directly; no `1 - Tr` inversion happens here
            "d" | "Tr" => Keyword::Opacity,
            "illum" => Keyword::Illum,
            "map_Kd" => Keyword::DiffuseMap,
            "map_Ks" => Keyword::SpecularMap,
            "map_Ka" => Keyword::AmbientMap,
            _ => Keyword::Unknown,
        }
    }
}

/// Parses MTL text into a table keyed by material name.
///
/// Lenient by design: property lines before the first `newmtl` are ignored,
/// malformed floats become NaN, and unknown keywords are skipped. A file with
/// no `newmtl` lines yields an empty table, not an error.
pub fn parse(text: &str) -> MaterialTable {
    let mut materials = MaterialTable::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let keyword = match tokens.next() {
            Some(token) => Keyword::tokenize(token),
            None => continue,
        };

        if keyword == Keyword::NewMtl {
            let name = tokens.next().unwrap_or("").to_string();
            materials.insert(name.clone(), Material::new(name.clone()));
            current = Some(name);
            continue;
        }

        // Property lines with no open material are ignored, not an error
        let material = match current.as_ref().and_then(|name| materials.get_mut(name)) {
            Some(material) => material,
            None => continue,
        };

        match keyword {
            Keyword::Ambient => material.ambient = parse_color(&mut tokens),
            Keyword::Diffuse => material.diffuse = parse_color(&mut tokens),
            Keyword::Specular => material.specular = parse_color(&mut tokens),
            Keyword::Emissive => material.emissive = parse_color(&mut tokens),
            Keyword::Shininess => material.shininess = parse_scalar(&mut tokens),
            Keyword::Opacity => material.opacity = parse_scalar(&mut tokens),
            Keyword::Illum => {
                if let Some(value) = tokens.next().and_then(|token| token.parse().ok()) {
                    material.illum = value;
                }
            }
            Keyword::DiffuseMap => material.diffuse_map = rest_of_line(line),
            Keyword::SpecularMap => material.specular_map = rest_of_line(line),
            Keyword::AmbientMap => material.ambient_map = rest_of_line(line),
            Keyword::NewMtl | Keyword::Unknown => {}
        }
    }

    materials
}

fn parse_scalar<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> f32 {
    tokens
        .next()
        .map_or(f32::NAN, |token| token.parse().unwrap_or(f32::NAN))
}

fn parse_color<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> [f32; 3] {
    [
        parse_scalar(tokens),
        parse_scalar(tokens),
        parse_scalar(tokens),
    ]
}

/// Everything after the first whitespace run, so texture paths keep embedded
/// spaces. Map options such as `-o`/`-s` are not stripped and end up in the
/// stored path.
fn rest_of_line(line: &str) -> Option<String> {
    line.split_once(|c: char| c.is_whitespace())
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|path| !path.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_material_per_newmtl() {
        let text = "newmtl A\nKd 0.1 0.2 0.3\nnewmtl B\nKd 0.9 0.9 0.9\n";
        let materials = parse(text);
        assert_eq!(materials.len(), 2);
        assert_eq!(materials["A"].diffuse, [0.1, 0.2, 0.3]);
        assert_eq!(materials["B"].diffuse, [0.9, 0.9, 0.9]);
    }

    #[test]
    fn new_material_starts_at_defaults() {
        let materials = parse("newmtl plain\n");
        let material = &materials["plain"];
        assert_eq!(material.ambient, [0.2, 0.2, 0.2]);
        assert_eq!(material.diffuse, [0.8, 0.8, 0.8]);
        assert_eq!(material.specular, [0.5, 0.5, 0.5]);
        assert_eq!(material.emissive, [0.0, 0.0, 0.0]);
        assert_eq!(material.shininess, 32.0);
        assert_eq!(material.opacity, 1.0);
        assert_eq!(material.illum, 2);
        assert!(material.diffuse_map.is_none());
    }

    #[test]
    fn d_and_tr_both_set_opacity_directly() {
        let materials = parse("newmtl glass\nd 0.4\nTr 0.3\n");
        assert_eq!(materials["glass"].opacity, 0.3);
    }

    #[test]
    fn full_property_set_applies() {
        let text = "newmtl metal\nKa 1 1 1\nKs 0.9 0.9 0.9\nKe 0.2 0.6 1.0\nNs 250\nillum 3\n";
        let material = &parse(text)["metal"];
        assert_eq!(material.ambient, [1.0, 1.0, 1.0]);
        assert_eq!(material.specular, [0.9, 0.9, 0.9]);
        assert_eq!(material.emissive, [0.2, 0.6, 1.0]);
        assert_eq!(material.shininess, 250.0);
        assert_eq!(material.illum, 3);
    }

    #[test]
    fn texture_paths_keep_embedded_spaces() {
        let text = "newmtl tex\nmap_Kd textures/brick wall.png\nmap_Ks spec.png\nmap_Ka occ.png\n";
        let material = &parse(text)["tex"];
        assert_eq!(material.diffuse_map.as_deref(), Some("textures/brick wall.png"));
        assert_eq!(material.specular_map.as_deref(), Some("spec.png"));
        assert_eq!(material.ambient_map.as_deref(), Some("occ.png"));
    }

    #[test]
    fn properties_before_newmtl_are_ignored() {
        let materials = parse("Kd 1 0 0\nNs 5\nnewmtl late\n");
        assert_eq!(materials.len(), 1);
        assert_eq!(materials["late"].diffuse, [0.8, 0.8, 0.8]);
    }

    #[test]
    fn unknown_keywords_do_not_disturb_parsing() {
        let text = "newmtl a\nmap_Bump nope.png\nsharpness 60\nKd 0 1 0\n";
        let materials = parse(text);
        assert_eq!(materials.len(), 1);
        assert_eq!(materials["a"].diffuse, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn empty_input_yields_empty_table() {
        assert!(parse("").is_empty());
        assert!(parse("# just a comment\n\n").is_empty());
    }

    #[test]
    fn malformed_floats_become_nan() {
        let materials = parse("newmtl bad\nNs abc\nKd 0.5 oops 0.5\n");
        let material = &materials["bad"];
        assert!(material.shininess.is_nan());
        assert_eq!(material.diffuse[0], 0.5);
        assert!(material.diffuse[1].is_nan());
        assert_eq!(material.diffuse[2], 0.5);
    }

    #[test]
    fn redeclaring_a_name_resets_the_record() {
        let text = "newmtl a\nKd 1 0 0\nnewmtl a\nNs 7\n";
        let materials = parse(text);
        assert_eq!(materials.len(), 1);
        // The second declaration starts fresh, so the red diffuse is gone
        assert_eq!(materials["a"].diffuse, [0.8, 0.8, 0.8]);
        assert_eq!(materials["a"].shininess, 7.0);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# header\n\nnewmtl a\n# Kd 1 0 0\nKd 0 0 1\n";
        assert_eq!(parse(text)["a"].diffuse, [0.0, 0.0, 1.0]);
    }
}
