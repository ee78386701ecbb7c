//! Scene objects, lights and per-frame render options.

use cgmath::{Matrix4, Rad, Vector3};

use crate::opengl::RenderData;

/// Upper bound on active point lights, shared with `shaders/scene.frag`.
pub const MAX_LIGHTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub usize);

/// One renderable object: GPU buffers plus a world transform.
///
/// Only `position` and `rotation` change after registration (door animation);
/// buffers are uploaded once and never touched again.
pub struct SceneObject {
    pub name: String,
    pub render_data: RenderData,
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied Y then X then Z
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub texture: Option<glow::Texture>,
    pub receives_shadow: bool,
    pub emissive: f32,
}

impl SceneObject {
    pub fn model_matrix(&self) -> Matrix4<f32> {
        model_matrix(self.position, self.rotation, self.scale)
    }
}

/// Composition order matters and must stay fixed:
/// translate × rotateY × rotateX × rotateZ × scale.
pub fn model_matrix(
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    scale: Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::from_translation(position)
        * Matrix4::from_angle_y(Rad(rotation.y))
        * Matrix4::from_angle_x(Rad(rotation.x))
        * Matrix4::from_angle_z(Rad(rotation.z))
        * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
}

#[derive(Debug, Clone)]
pub struct Light {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
}

/// Frame-scoped render toggles. Built once per frame and passed into
/// `Renderer::render`; nothing mutates the renderer behind its back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub shadows: bool,
    pub skybox: bool,
    pub lights: bool,
    pub debug_shadows: bool,
    pub debug_texture: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            shadows: true,
            skybox: true,
            lights: true,
            debug_shadows: false,
            debug_texture: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{vec3, Vector4};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn model_matrix_applies_scale_then_rotation_then_translation() {
        // Unit X, scaled by 2, yawed 90° (X → -Z), then moved up by 1
        let matrix = model_matrix(
            vec3(0.0, 1.0, 0.0),
            vec3(0.0, FRAC_PI_2, 0.0),
            vec3(2.0, 2.0, 2.0),
        );
        let out = matrix * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(out.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(out.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(out.z, -2.0, epsilon = 1e-5);
    }

    #[test]
    fn rotation_order_is_y_then_x_then_z() {
        let rotation = vec3(0.3, 1.1, -0.7);
        let expected = Matrix4::from_angle_y(Rad(rotation.y))
            * Matrix4::from_angle_x(Rad(rotation.x))
            * Matrix4::from_angle_z(Rad(rotation.z));
        let composed = model_matrix(vec3(0.0, 0.0, 0.0), rotation, vec3(1.0, 1.0, 1.0));
        let expected: &[f32; 16] = expected.as_ref();
        let composed: &[f32; 16] = composed.as_ref();
        for (a, b) in expected.iter().zip(composed.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }
}
