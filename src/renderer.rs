//! Scene rendering: shadow depth pass, lit pass, skybox pass.
//!
//! The per-frame order is fixed and load-bearing: the depth pass writes the
//! shadow texture that the lit pass samples in the same frame, and the skybox
//! runs last so it only fills untouched background pixels.

use cgmath::{vec3, Vector3};
use glow::HasContext;

use crate::camera::Camera;
use crate::error::RenderError;
use crate::mesh::FlatMesh;
use crate::opengl::RenderData;
use crate::scene::{Light, ObjectHandle, RenderOptions, SceneObject, MAX_LIGHTS};
use crate::shaders;
use crate::shadow::{ShadowMap, SHADOW_MAP_SIZE};
use crate::skybox::Skybox;

const SHADOW_MAP_UNIT: u32 = 1;
const OBJECT_TEXTURE_UNIT: u32 = 2;

const LIGHT_POSITIONS: [[f32; 3]; MAX_LIGHTS] = [
    [22.0, 2.2, -3.7],
    [22.0, 2.2, -5.8],
    [22.0, 2.2, -7.8],
];

const BASE_LIGHT_COLORS: [[f32; 3]; MAX_LIGHTS] = [
    [1.0, 0.9, 0.8],
    [0.8, 0.9, 1.0],
    [0.9, 1.0, 0.9],
];

struct SceneUniforms {
    model: Option<glow::UniformLocation>,
    view: Option<glow::UniformLocation>,
    projection: Option<glow::UniformLocation>,
    light_space: Option<glow::UniformLocation>,
    shadow_map: Option<glow::UniformLocation>,
    use_shadows: Option<glow::UniformLocation>,
    debug_shadows: Option<glow::UniformLocation>,
    receives_shadow: Option<glow::UniformLocation>,
    num_lights: Option<glow::UniformLocation>,
    light_positions: [Option<glow::UniformLocation>; MAX_LIGHTS],
    light_colors: [Option<glow::UniformLocation>; MAX_LIGHTS],
    view_position: Option<glow::UniformLocation>,
    texture: Option<glow::UniformLocation>,
    use_texture: Option<glow::UniformLocation>,
    debug_texture: Option<glow::UniformLocation>,
    emissive: Option<glow::UniformLocation>,
}

impl SceneUniforms {
    fn query(gl: &glow::Context, program: glow::Program) -> Self {
        unsafe {
            Self {
                model: gl.get_uniform_location(program, "uModelMatrix"),
                view: gl.get_uniform_location(program, "uViewMatrix"),
                projection: gl.get_uniform_location(program, "uProjectionMatrix"),
                light_space: gl.get_uniform_location(program, "uLightSpaceMatrix"),
                shadow_map: gl.get_uniform_location(program, "uShadowMap"),
                use_shadows: gl.get_uniform_location(program, "uUseShadows"),
                debug_shadows: gl.get_uniform_location(program, "uDebugShadows"),
                receives_shadow: gl.get_uniform_location(program, "uReceivesShadow"),
                num_lights: gl.get_uniform_location(program, "uNumLights"),
                light_positions: std::array::from_fn(|i| {
                    gl.get_uniform_location(program, &format!("uLightPositions[{i}]"))
                }),
                light_colors: std::array::from_fn(|i| {
                    gl.get_uniform_location(program, &format!("uLightColors[{i}]"))
                }),
                view_position: gl.get_uniform_location(program, "uViewPosition"),
                texture: gl.get_uniform_location(program, "uTexture"),
                use_texture: gl.get_uniform_location(program, "uUseTexture"),
                debug_texture: gl.get_uniform_location(program, "uDebugTexture"),
                emissive: gl.get_uniform_location(program, "uEmissive"),
            }
        }
    }
}

pub struct Renderer {
    program: glow::Program,
    uniforms: SceneUniforms,
    objects: Vec<SceneObject>,
    pub lights: Vec<Light>,
    shadow_map: Option<ShadowMap>,
    skybox: Option<Skybox>,
}

impl Renderer {
    /// Compiles the scene program and sets initial GL state. A scene shader
    /// failure is fatal; a shadow or skybox setup failure only disables that
    /// pass.
    pub fn new(gl: &glow::Context) -> Result<Self, RenderError> {
        unsafe {
            gl.clear_color(0.1, 0.1, 0.15, 1.0);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.enable(glow::CULL_FACE);
            gl.cull_face(glow::BACK);
        }

        let program = shaders::compile_program(gl, "shaders/scene.vert", "shaders/scene.frag")?;
        let uniforms = SceneUniforms::query(gl, program);

        let shadow_map = match ShadowMap::new(gl, SHADOW_MAP_SIZE, SHADOW_MAP_SIZE) {
            Ok(map) => Some(map),
            Err(err) => {
                log::warn!("shadow mapping disabled: {err}");
                None
            }
        };

        let skybox = match Skybox::new(gl) {
            Ok(skybox) => Some(skybox),
            Err(err) => {
                log::warn!("skybox disabled: {err}");
                None
            }
        };

        let lights = LIGHT_POSITIONS
            .iter()
            .zip(BASE_LIGHT_COLORS.iter())
            .map(|(position, color)| Light {
                position: vec3(position[0], position[1], position[2]),
                color: vec3(color[0], color[1], color[2]),
            })
            .collect();

        Ok(Self {
            program,
            uniforms,
            objects: Vec::new(),
            lights,
            shadow_map,
            skybox,
        })
    }

    /// Uploads the mesh and registers it for rendering. Objects are never
    /// removed; animation only touches their transform fields.
    pub fn add_object(
        &mut self,
        gl: &glow::Context,
        name: impl Into<String>,
        mesh: &FlatMesh,
        position: Vector3<f32>,
        rotation: Vector3<f32>,
        scale: Vector3<f32>,
        texture: Option<glow::Texture>,
    ) -> ObjectHandle {
        let name = name.into();
        log::debug!("registering '{}': {} vertices", name, mesh.vertex_count());
        let render_data = RenderData::new(gl, mesh);
        self.objects.push(SceneObject {
            name,
            render_data,
            position,
            rotation,
            scale,
            texture,
            receives_shadow: true,
            emissive: 0.0,
        });
        ObjectHandle(self.objects.len() - 1)
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> &mut SceneObject {
        &mut self.objects[handle.0]
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Slight pulse on each light, phase-shifted per slot.
    pub fn update_lights(&mut self, time: f32) {
        for (index, light) in self.lights.iter_mut().enumerate() {
            let pulse = 0.1 * (time * 2.0 + index as f32 * std::f32::consts::PI * 0.6).sin();
            let intensity = 1.0 + pulse;
            let base = BASE_LIGHT_COLORS[index % MAX_LIGHTS];
            light.color = vec3(
                base[0] * intensity,
                base[1] * intensity,
                base[2] * intensity,
            );
        }
    }

    pub fn render(
        &mut self,
        gl: &glow::Context,
        camera: &Camera,
        options: &RenderOptions,
        canvas_size: (i32, i32),
    ) {
        unsafe {
            // The egui pass leaves blending and scissoring on
            gl.enable(glow::DEPTH_TEST);
            gl.enable(glow::CULL_FACE);
            gl.disable(glow::BLEND);
            gl.disable(glow::SCISSOR_TEST);
        }

        if options.shadows {
            self.render_shadow_pass(gl, canvas_size);
        }

        unsafe {
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        self.render_scene(gl, camera, options);

        if options.skybox {
            if let Some(skybox) = &self.skybox {
                skybox.render(gl, &camera.view, &camera.projection);
            }
        }
    }

    fn render_shadow_pass(&mut self, gl: &glow::Context, canvas_size: (i32, i32)) {
        let shadow_map = match self.shadow_map.as_mut() {
            Some(shadow_map) => shadow_map,
            None => return,
        };
        let light_position = match self.lights.first() {
            Some(light) => light.position,
            None => return,
        };

        shadow_map.update_light_matrices(light_position);
        shadow_map.bind(gl);

        unsafe {
            gl.use_program(Some(shadow_map.depth_program));
            let light_space = shadow_map.light_space_matrix();
            let light_space: &[f32; 16] = light_space.as_ref();
            gl.uniform_matrix_4_f32_slice(shadow_map.u_light_space.as_ref(), false, light_space);

            for object in &self.objects {
                let model = object.model_matrix();
                let model: &[f32; 16] = model.as_ref();
                gl.uniform_matrix_4_f32_slice(shadow_map.u_model.as_ref(), false, model);
                object.render_data.draw(gl);
            }
        }

        shadow_map.unbind(gl, canvas_size.0, canvas_size.1);
    }

    fn render_scene(&self, gl: &glow::Context, camera: &Camera, options: &RenderOptions) {
        let uniforms = &self.uniforms;
        unsafe {
            gl.use_program(Some(self.program));

            let view: &[f32; 16] = camera.view.as_ref();
            let projection: &[f32; 16] = camera.projection.as_ref();
            gl.uniform_matrix_4_f32_slice(uniforms.view.as_ref(), false, view);
            gl.uniform_matrix_4_f32_slice(uniforms.projection.as_ref(), false, projection);

            match (&self.shadow_map, options.shadows) {
                (Some(shadow_map), true) => {
                    let light_space = shadow_map.light_space_matrix();
                    let light_space: &[f32; 16] = light_space.as_ref();
                    gl.uniform_matrix_4_f32_slice(
                        uniforms.light_space.as_ref(),
                        false,
                        light_space,
                    );
                    shadow_map.bind_depth_texture(gl, SHADOW_MAP_UNIT);
                    gl.uniform_1_i32(uniforms.shadow_map.as_ref(), SHADOW_MAP_UNIT as i32);
                    gl.uniform_1_i32(uniforms.use_shadows.as_ref(), 1);
                    gl.uniform_1_i32(
                        uniforms.debug_shadows.as_ref(),
                        options.debug_shadows as i32,
                    );
                }
                _ => {
                    gl.uniform_1_i32(uniforms.use_shadows.as_ref(), 0);
                    gl.uniform_1_i32(uniforms.debug_shadows.as_ref(), 0);
                }
            }

            let active_lights = if options.lights {
                self.lights.len().min(MAX_LIGHTS)
            } else {
                0
            };
            gl.uniform_1_i32(uniforms.num_lights.as_ref(), active_lights as i32);

            for (index, light) in self.lights.iter().take(MAX_LIGHTS).enumerate() {
                gl.uniform_3_f32(
                    uniforms.light_positions[index].as_ref(),
                    light.position.x,
                    light.position.y,
                    light.position.z,
                );
                gl.uniform_3_f32(
                    uniforms.light_colors[index].as_ref(),
                    light.color.x,
                    light.color.y,
                    light.color.z,
                );
            }

            gl.uniform_3_f32(
                uniforms.view_position.as_ref(),
                camera.position.x,
                camera.position.y,
                camera.position.z,
            );

            for object in &self.objects {
                self.render_object(gl, object, options);
            }
        }
    }

    unsafe fn render_object(&self, gl: &glow::Context, object: &SceneObject, options: &RenderOptions) {
        let uniforms = &self.uniforms;

        let model = object.model_matrix();
        let model: &[f32; 16] = model.as_ref();
        gl.uniform_matrix_4_f32_slice(uniforms.model.as_ref(), false, model);

        gl.uniform_1_i32(
            uniforms.receives_shadow.as_ref(),
            object.receives_shadow as i32,
        );
        gl.uniform_1_f32(uniforms.emissive.as_ref(), object.emissive);

        match object.texture {
            Some(texture) if object.render_data.has_texcoords() => {
                gl.active_texture(glow::TEXTURE0 + OBJECT_TEXTURE_UNIT);
                gl.bind_texture(glow::TEXTURE_2D, Some(texture));
                gl.uniform_1_i32(uniforms.texture.as_ref(), OBJECT_TEXTURE_UNIT as i32);
                gl.uniform_1_i32(uniforms.use_texture.as_ref(), 1);
                gl.uniform_1_i32(
                    uniforms.debug_texture.as_ref(),
                    options.debug_texture as i32,
                );
            }
            _ => {
                gl.uniform_1_i32(uniforms.use_texture.as_ref(), 0);
                gl.uniform_1_i32(uniforms.debug_texture.as_ref(), 0);
            }
        }

        object.render_data.draw(gl);
    }
}
