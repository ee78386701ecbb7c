//! Background asset loading.
//!
//! One worker thread reads and parses OBJ/MTL models and decodes textures;
//! the main loop polls for finished assets once per frame and registers them
//! with the renderer. A failed load is logged and skipped, never retried.

use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::AssetError;
use crate::material::{self, MaterialTable};
use crate::mesh::FlatMesh;
use crate::obj;

#[derive(Debug)]
pub struct LoadedTexture {
    pub name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, already flipped for GL's origin
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct LoadedModel {
    pub name: String,
    pub path: PathBuf,
    pub mesh: FlatMesh,
    /// Absent when the OBJ names no `mtllib` or the MTL file is unreadable;
    /// callers fall back to default vertex colors.
    pub materials: Option<MaterialTable>,
}

pub enum AssetRequest {
    LoadModel(PathBuf, String),
    LoadTexture(PathBuf, String),
}

pub enum Asset {
    Model(LoadedModel),
    Texture(LoadedTexture),
}

pub struct AssetLoader {
    request_tx: Sender<AssetRequest>,
    result_rx: Receiver<Asset>,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (request_tx, request_rx) = unbounded::<AssetRequest>();
        let (result_tx, result_rx) = unbounded::<Asset>();

        std::thread::spawn(move || {
            for request in request_rx {
                match request {
                    AssetRequest::LoadTexture(path, name) => {
                        log::info!("loading texture {:?}", path);
                        match load_texture(&path, name) {
                            Ok(texture) => {
                                if result_tx.send(Asset::Texture(texture)).is_err() {
                                    break;
                                }
                            }
                            Err(err) => log::warn!("failed to load texture {:?}: {}", path, err),
                        }
                    }
                    AssetRequest::LoadModel(path, name) => {
                        log::info!("loading model {:?}", path);
                        match load_model(&path, name) {
                            Ok(model) => {
                                if result_tx.send(Asset::Model(model)).is_err() {
                                    break;
                                }
                            }
                            Err(err) => log::warn!("failed to load model {:?}: {}", path, err),
                        }
                    }
                }
            }
        });

        Self {
            request_tx,
            result_rx,
        }
    }

    pub fn request_model(&self, path: impl AsRef<Path>, name: &str) {
        let request = AssetRequest::LoadModel(path.as_ref().to_path_buf(), name.to_string());
        if self.request_tx.send(request).is_err() {
            log::error!("asset loader thread is gone; dropping model request");
        }
    }

    pub fn request_texture(&self, path: impl AsRef<Path>, name: &str) {
        let request = AssetRequest::LoadTexture(path.as_ref().to_path_buf(), name.to_string());
        if self.request_tx.send(request).is_err() {
            log::error!("asset loader thread is gone; dropping texture request");
        }
    }

    /// Drains every asset finished since the last poll.
    pub fn poll_loaded(&self) -> Vec<Asset> {
        let mut loaded = Vec::new();
        while let Ok(asset) = self.result_rx.try_recv() {
            loaded.push(asset);
        }
        loaded
    }
}

/// Decodes an image into RGBA8 pixels, flipped for GL's bottom-left origin.
pub fn load_texture(path: &Path, name: String) -> Result<LoadedTexture, AssetError> {
    let image = image::open(path)?.flipv().to_rgba8();
    let (width, height) = image.dimensions();
    Ok(LoadedTexture {
        name,
        path: path.to_path_buf(),
        width,
        height,
        data: image.into_raw(),
    })
}

/// Reads and parses an OBJ file plus the material library it names. The MTL
/// file is looked up next to the OBJ; a missing or unreadable one downgrades
/// to "no materials" rather than failing the model.
pub fn load_model(path: &Path, name: String) -> Result<LoadedModel, AssetError> {
    let text = std::fs::read_to_string(path)?;
    let parsed = obj::parse(&text)?;

    let materials = parsed.mtllib.as_ref().and_then(|mtllib| {
        let mtl_path = path.parent().unwrap_or(Path::new("")).join(mtllib);
        match std::fs::read_to_string(&mtl_path) {
            Ok(mtl_text) => {
                let table = material::parse(&mtl_text);
                log::info!("loaded {} materials from {:?}", table.len(), mtl_path);
                if table.is_empty() {
                    log::warn!("MTL file parsed but no materials found: {:?}", mtl_path);
                }
                for material in table.values() {
                    log::debug!(
                        "material '{}': Kd {:?} Ks {:?} Ns {} d {} illum {}",
                        material.name,
                        material.diffuse,
                        material.specular,
                        material.shininess,
                        material.opacity,
                        material.illum,
                    );
                }
                Some(table)
            }
            Err(err) => {
                log::warn!("MTL file not found: {:?} ({})", mtl_path, err);
                None
            }
        }
    });

    Ok(LoadedModel {
        name,
        path: path.to_path_buf(),
        mesh: parsed.mesh,
        materials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(tag: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "obj_scene_viewer_test_{}_{}",
                tag,
                std::process::id()
            ));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn model_loads_with_its_material_library() {
        let dir = TempDir::new("with_mtl");
        fs::write(
            dir.0.join("box.obj"),
            "mtllib box.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl A\nf 1 2 3\n",
        )
        .unwrap();
        fs::write(dir.0.join("box.mtl"), "newmtl A\nKd 0.1 0.2 0.3\n").unwrap();

        let model = load_model(&dir.0.join("box.obj"), "box".to_string()).unwrap();
        assert_eq!(model.mesh.triangle_count(), 1);
        let materials = model.materials.unwrap();
        assert_eq!(materials["A"].diffuse, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn missing_mtl_downgrades_to_no_materials() {
        let dir = TempDir::new("no_mtl");
        fs::write(
            dir.0.join("box.obj"),
            "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n",
        )
        .unwrap();

        let model = load_model(&dir.0.join("box.obj"), "box".to_string()).unwrap();
        assert!(model.materials.is_none());
        assert_eq!(model.mesh.triangle_count(), 1);
    }

    #[test]
    fn missing_obj_is_an_error() {
        let dir = TempDir::new("missing_obj");
        assert!(load_model(&dir.0.join("nope.obj"), "nope".to_string()).is_err());
    }
}
