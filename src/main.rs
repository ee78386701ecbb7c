use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Arg, ArgAction, Command};
use egui_glow::Painter;
use egui_winit::State as EguiState;
use glutin::config::ConfigTemplate;
use glutin::context::{ContextApi, ContextAttributesBuilder, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::{CursorGrabMode, Window, WindowId};

mod camera;
mod door;
mod error;
mod gui;
mod input;
mod loader;
mod material;
mod mesh;
mod obj;
mod opengl;
mod partition;
mod primitives;
mod renderer;
mod scene;
mod shaders;
mod shadow;
mod skybox;
mod textures;

use camera::Camera;
use cgmath::vec3;
use door::{Door, SlideAxis};
use gui::{GameState, Gui, MenuAction};
use input::InputState;
use loader::{Asset, AssetLoader, LoadedModel, LoadedTexture};
use material::MaterialTable;
use renderer::Renderer;
use scene::{ObjectHandle, RenderOptions};
use textures::Texture;

struct ViewerConfig {
    model: PathBuf,
    assets_dir: PathBuf,
    width: u32,
    height: u32,
    options: RenderOptions,
}

fn parse_args() -> ViewerConfig {
    let matches = Command::new("obj_scene_viewer")
        .about("OBJ/MTL scene viewer with Phong lighting and shadow mapping")
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("PATH")
                .default_value("assets/models/building.obj")
                .help("OBJ model to load into the scene"),
        )
        .arg(
            Arg::new("assets-dir")
                .long("assets-dir")
                .value_name("DIR")
                .default_value("assets")
                .help("Directory textures are resolved against"),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_name("PIXELS")
                .default_value("1280")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("height")
                .long("height")
                .value_name("PIXELS")
                .default_value("720")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("no-shadows")
                .long("no-shadows")
                .action(ArgAction::SetTrue)
                .help("Start with shadow mapping off"),
        )
        .arg(
            Arg::new("no-skybox")
                .long("no-skybox")
                .action(ArgAction::SetTrue)
                .help("Start with the skybox off"),
        )
        .get_matches();

    let options = RenderOptions {
        shadows: !matches.get_flag("no-shadows"),
        skybox: !matches.get_flag("no-skybox"),
        ..Default::default()
    };

    ViewerConfig {
        model: PathBuf::from(matches.get_one::<String>("model").unwrap()),
        assets_dir: PathBuf::from(matches.get_one::<String>("assets-dir").unwrap()),
        width: *matches.get_one::<u32>("width").unwrap(),
        height: *matches.get_one::<u32>("height").unwrap(),
        options,
    }
}

struct Timer {
    last_frame: Instant,
    delta_time: f32,
}

impl Timer {
    fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
        }
    }

    fn update(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.delta_time
    }
}

struct App {
    config: ViewerConfig,
    start_time: Instant,
    timer: Timer,

    window: Option<Window>,
    current_context: Option<PossiblyCurrentContext>,
    surface: Option<Surface<WindowSurface>>,
    gl: Option<Arc<glow::Context>>,
    size: (i32, i32),

    game_state: GameState,
    options: RenderOptions,
    camera: Option<Camera>,
    input: InputState,
    gui: Option<Gui>,

    renderer: Option<Renderer>,
    asset_loader: Option<AssetLoader>,
    textures: Vec<Texture>,
    doors: Vec<Door>,
    /// Texture request name -> objects waiting for that texture
    pending_textures: HashMap<String, Vec<ObjectHandle>>,
    requested_textures: HashSet<String>,

    egui_context: Option<egui::Context>,
    egui_painter: Option<Painter>,
    egui_state: Option<EguiState>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let options = config.options;
        let size = (config.width as i32, config.height as i32);
        Self {
            config,
            start_time: Instant::now(),
            timer: Timer::new(),
            window: None,
            current_context: None,
            surface: None,
            gl: None,
            size,
            game_state: GameState::Menu,
            options,
            camera: None,
            input: InputState::new(),
            gui: None,
            renderer: None,
            asset_loader: None,
            textures: Vec::new(),
            doors: Vec::new(),
            pending_textures: HashMap::new(),
            requested_textures: HashSet::new(),
            egui_context: None,
            egui_painter: None,
            egui_state: None,
        }
    }

    fn start_game(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() {
            let gl = self.gl.as_ref().unwrap().clone();
            match Renderer::new(&gl) {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(err) => {
                    log::error!("renderer initialization failed: {err}");
                    event_loop.exit();
                    return;
                }
            }
            self.setup_scene();
        }
        self.game_state = GameState::Playing;
        self.set_cursor_captured(true);
    }

    fn set_cursor_captured(&self, captured: bool) {
        let window = match self.window.as_ref() {
            Some(window) => window,
            None => return,
        };
        if captured {
            if window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked))
                .is_err()
            {
                log::warn!("cursor grab not available on this platform");
            }
            window.set_cursor_visible(false);
        } else {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
            window.set_cursor_visible(true);
        }
    }

    /// Ground plane, road, trees and monitor boxes are placed immediately;
    /// the building model and the grass texture stream in through the loader.
    fn setup_scene(&mut self) {
        let gl = self.gl.as_ref().unwrap().clone();
        let loader = self.asset_loader.as_ref().unwrap();
        let renderer = self.renderer.as_mut().unwrap();

        let ground = renderer.add_object(
            &gl,
            "ground",
            &primitives::plane(100.0, 100.0, 20),
            vec3(0.0, 0.0, 0.0),
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 1.0, 1.0),
            None,
        );
        self.pending_textures
            .entry("grass".to_string())
            .or_default()
            .push(ground);
        loader.request_texture(self.config.assets_dir.join("textures/grass.jpg"), "grass");

        let mut road_mesh = primitives::plane(100.0, 10.0, 1);
        for color in road_mesh.colors.chunks_exact_mut(3) {
            color.copy_from_slice(&[0.2, 0.2, 0.2]);
        }
        renderer.add_object(
            &gl,
            "road",
            &road_mesh,
            vec3(0.0, 0.1, 30.0),
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 1.0, 1.0),
            None,
        );

        let tree_positions = [
            vec3(-30.0, 0.0, 15.0),
            vec3(30.0, 0.0, 15.0),
            vec3(30.0, 0.0, 20.0),
        ];
        for (index, position) in tree_positions.iter().enumerate() {
            renderer.add_object(
                &gl,
                format!("trunk{index}"),
                &primitives::tree_trunk(0.4, 0.3, 2.5, 8),
                *position,
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 1.0, 1.0),
                None,
            );
            renderer.add_object(
                &gl,
                format!("foliage{index}"),
                &primitives::tree_foliage(2.0, 4.0, 10),
                position + vec3(0.0, 2.5, 0.0),
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 1.0, 1.0),
                None,
            );
        }

        // A glowing monitor box under each light
        let monitor_mesh = primitives::cuboid(0.2, 0.5, 0.9, [0.85, 0.9, 1.0]);
        let light_positions: Vec<_> = renderer.lights.iter().map(|l| l.position).collect();
        for (index, position) in light_positions.iter().enumerate() {
            let handle = renderer.add_object(
                &gl,
                format!("monitor{index}"),
                &monitor_mesh,
                position - vec3(0.0, 0.5, 0.0),
                vec3(0.0, 0.0, 0.0),
                vec3(1.0, 1.0, 1.0),
                None,
            );
            let monitor = renderer.object_mut(handle);
            monitor.emissive = 0.8;
            monitor.receives_shadow = false;
        }

        loader.request_model(&self.config.model, "building");
        log::info!("scene set up with {} static objects", renderer.object_count());
    }

    fn poll_assets(&mut self) {
        if self.renderer.is_none() {
            return;
        }
        let loaded = match self.asset_loader.as_ref() {
            Some(loader) => loader.poll_loaded(),
            None => return,
        };
        for asset in loaded {
            match asset {
                Asset::Model(model) => self.register_model(model),
                Asset::Texture(texture) => self.register_texture(texture),
            }
        }
    }

    /// Bakes material colors, carves the model up by object (doors become
    /// animated objects) and then by material (so each part can bind its own
    /// texture).
    fn register_model(&mut self, model: LoadedModel) {
        let gl = self.gl.as_ref().unwrap().clone();
        let LoadedModel {
            name: model_name,
            mesh: mut mesh,
            materials,
            ..
        } = model;

        let bounds = mesh.bounds();
        log::info!(
            "model '{}': {} vertices, {} triangles, bounds {:?}..{:?}",
            model_name,
            mesh.vertex_count(),
            mesh.triangle_count(),
            bounds.min,
            bounds.max,
        );

        if let Some(materials) = &materials {
            partition::apply_material_colors(&mut mesh, materials);
        }

        let by_object = partition::split_by_object(&mesh);
        let mut object_names: Vec<_> = by_object.keys().cloned().collect();
        object_names.sort();

        let mut door_count = 0;
        for object_name in object_names {
            let sub_mesh = &by_object[&object_name];

            if object_name.to_lowercase().contains("door") {
                let renderer = self.renderer.as_mut().unwrap();
                let handle = renderer.add_object(
                    &gl,
                    format!("{}:{}", model_name, object_name),
                    sub_mesh,
                    vec3(0.0, 0.0, 0.0),
                    vec3(0.0, 0.0, 0.0),
                    vec3(1.0, 1.0, 1.0),
                    None,
                );
                let is_left = door_count % 2 == 0;
                self.doors.push(Door::new(
                    handle,
                    vec3(0.0, 0.0, 0.0),
                    is_left,
                    SlideAxis::Z,
                    1.5,
                ));
                door_count += 1;
                continue;
            }

            let by_material = partition::split_by_material(sub_mesh);
            let mut material_names: Vec<_> = by_material.keys().cloned().collect();
            material_names.sort();

            for material_name in material_names {
                let part = &by_material[&material_name];
                let renderer = self.renderer.as_mut().unwrap();
                let handle = renderer.add_object(
                    &gl,
                    format!("{}:{}:{}", model_name, object_name, material_name),
                    part,
                    vec3(0.0, 0.0, 0.0),
                    vec3(0.0, 0.0, 0.0),
                    vec3(1.0, 1.0, 1.0),
                    None,
                );
                // Ke in the material becomes the part's emissive strength
                if let Some(material) = materials
                    .as_ref()
                    .and_then(|materials| materials.get(&material_name))
                {
                    let strength = material.emissive.iter().copied().fold(0.0, f32::max);
                    if strength > 0.0 {
                        renderer.object_mut(handle).emissive = strength;
                    }
                }
                self.request_material_texture(&materials, &material_name, handle);
            }
        }

        if door_count > 0 {
            log::info!("model '{}' contributed {} doors", model_name, door_count);
        }
    }

    fn request_material_texture(
        &mut self,
        materials: &Option<MaterialTable>,
        material_name: &str,
        handle: ObjectHandle,
    ) {
        let diffuse_map = materials
            .as_ref()
            .and_then(|materials| materials.get(material_name))
            .and_then(|material| material.diffuse_map.clone());
        let diffuse_map = match diffuse_map {
            Some(map) => map,
            None => return,
        };

        // Textures are resolved by file name under the assets directory,
        // whatever path style the MTL used
        let normalized = diffuse_map.replace('\\', "/");
        let file_name = match Path::new(&normalized).file_name() {
            Some(file_name) => file_name.to_owned(),
            None => return,
        };

        let request_name = format!("material:{material_name}");
        self.pending_textures
            .entry(request_name.clone())
            .or_default()
            .push(handle);
        if self.requested_textures.insert(request_name.clone()) {
            let path = self.config.assets_dir.join("textures").join(file_name);
            self.asset_loader
                .as_ref()
                .unwrap()
                .request_texture(path, &request_name);
        }
    }

    fn register_texture(&mut self, loaded: LoadedTexture) {
        let gl = self.gl.as_ref().unwrap().clone();
        let texture = Texture::from_loaded_data(&gl, &loaded);
        log::info!(
            "texture '{}' ready ({}x{})",
            texture.name,
            texture.width,
            texture.height
        );

        if let Some(handles) = self.pending_textures.remove(&loaded.name) {
            let renderer = self.renderer.as_mut().unwrap();
            for handle in handles {
                renderer.object_mut(handle).texture = Some(texture.texture);
            }
        }
        self.textures.push(texture);
    }

    fn handle_key_toggles(&mut self) {
        if self.input.just_pressed(KeyCode::KeyK) {
            self.options.skybox = !self.options.skybox;
            log::info!("skybox: {}", if self.options.skybox { "on" } else { "off" });
        }
        if self.input.just_pressed(KeyCode::KeyL) {
            self.options.shadows = !self.options.shadows;
            log::info!("shadows: {}", if self.options.shadows { "on" } else { "off" });
        }
        if self.input.just_pressed(KeyCode::KeyM) {
            self.options.debug_shadows = !self.options.debug_shadows;
        }
        if self.input.just_pressed(KeyCode::KeyN) {
            self.options.debug_texture = !self.options.debug_texture;
        }
        if self.input.just_pressed(KeyCode::KeyP) {
            self.options.lights = !self.options.lights;
        }
        if self.input.just_pressed(KeyCode::KeyE) {
            for door in &mut self.doors {
                door.toggle();
            }
        }
    }

    fn paint_egui(&mut self, full_output: egui::FullOutput) {
        let window = self.window.as_ref().unwrap();
        self.egui_state
            .as_mut()
            .unwrap()
            .handle_platform_output(window, full_output.platform_output);

        let clipped_primitives = self
            .egui_context
            .as_ref()
            .unwrap()
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let physical_size = window.inner_size();
        self.egui_painter.as_mut().unwrap().paint_and_update_textures(
            [physical_size.width, physical_size.height],
            full_output.pixels_per_point,
            &clipped_primitives,
            &full_output.textures_delta,
        );
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let delta_time = self.timer.update();
        self.poll_assets();

        let raw_input = {
            let window = self.window.as_ref().unwrap();
            self.egui_state.as_mut().unwrap().take_egui_input(window)
        };

        match self.game_state {
            GameState::Playing => {
                self.handle_key_toggles();
                if self.input.just_pressed(KeyCode::Escape) {
                    self.game_state = GameState::Menu;
                    self.set_cursor_captured(false);
                }

                if let Some(camera) = self.camera.as_mut() {
                    camera.update(delta_time, &self.input);
                }

                let elapsed = self.start_time.elapsed().as_secs_f32();
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.update_lights(elapsed);
                }
                for door in &mut self.doors {
                    let object = self.renderer.as_mut().unwrap().object_mut(door.object);
                    door.update(delta_time, object);
                }

                let egui_context = self.egui_context.as_ref().unwrap().clone();
                let (full_output, _) = self.gui.as_mut().unwrap().update(
                    raw_input,
                    &egui_context,
                    self.game_state,
                    &mut self.options,
                );
                if self.gui.as_mut().unwrap().door_toggle_requested {
                    self.gui.as_mut().unwrap().door_toggle_requested = false;
                    for door in &mut self.doors {
                        door.toggle();
                    }
                }

                let gl = self.gl.as_ref().unwrap().clone();
                if let (Some(renderer), Some(camera)) =
                    (self.renderer.as_mut(), self.camera.as_ref())
                {
                    renderer.render(&gl, camera, &self.options, self.size);
                }

                self.paint_egui(full_output);
            }
            GameState::Menu | GameState::Controls => {
                let egui_context = self.egui_context.as_ref().unwrap().clone();
                let (full_output, action) = self.gui.as_mut().unwrap().update(
                    raw_input,
                    &egui_context,
                    self.game_state,
                    &mut self.options,
                );

                match action {
                    MenuAction::Start => self.start_game(event_loop),
                    MenuAction::ShowControls => self.game_state = GameState::Controls,
                    MenuAction::Back => self.game_state = GameState::Menu,
                    MenuAction::Quit => {
                        event_loop.exit();
                        return;
                    }
                    MenuAction::None => {}
                }

                let gl = self.gl.as_ref().unwrap();
                unsafe {
                    use glow::HasContext;
                    gl.disable(glow::SCISSOR_TEST);
                    gl.clear_color(0.05, 0.05, 0.08, 1.0);
                    gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
                }
                self.paint_egui(full_output);
            }
        }

        self.input.end_frame();

        if let (Some(surface), Some(context)) =
            (self.surface.as_ref(), self.current_context.as_ref())
        {
            if let Err(err) = surface.swap_buffers(context) {
                log::error!("swap_buffers failed: {err}");
            }
        }

        self.window.as_ref().unwrap().request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title("Scene Viewer")
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        self.window = Some(
            event_loop
                .create_window(attributes)
                .expect("Failed to create window"),
        );
        let window = self.window.as_ref().unwrap();

        let display_handle = window.display_handle().unwrap();
        let window_handle = window.window_handle().unwrap();

        #[cfg(target_os = "windows")]
        let preference = DisplayApiPreference::Wgl(Some(window_handle.into()));
        #[cfg(target_os = "macos")]
        let preference = DisplayApiPreference::Cgl;
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let preference = DisplayApiPreference::Egl;

        let display = unsafe {
            Display::new(display_handle.into(), preference).expect("Failed to create GL display")
        };

        let config_template = ConfigTemplate::default();
        let config = unsafe {
            display
                .find_configs(config_template)
                .expect("Failed to enumerate GL configs")
                .next()
                .expect("No matching GL config")
        };

        let physical_size = window.inner_size();
        let width = NonZeroU32::new(physical_size.width.max(1)).unwrap();
        let height = NonZeroU32::new(physical_size.height.max(1)).unwrap();
        self.size = (physical_size.width as i32, physical_size.height as i32);

        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            window_handle.into(),
            width,
            height,
        );
        let surface = unsafe {
            display
                .create_window_surface(&config, &surface_attributes)
                .expect("Failed to create window surface")
        };

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(window_handle.into()));
        let non_current_context = unsafe {
            display
                .create_context(&config, &context_attributes)
                .expect("Failed to create GL context")
        };
        let current_context = non_current_context
            .make_current(&surface)
            .expect("Failed to make GL context current");

        let gl = unsafe {
            Arc::new(glow::Context::from_loader_function(|symbol| {
                let c_str = CString::new(symbol).unwrap();
                display.get_proc_address(&c_str) as *const _
            }))
        };

        self.surface = Some(surface);
        self.current_context = Some(current_context);
        self.gl = Some(gl);

        let aspect = physical_size.width as f32 / physical_size.height.max(1) as f32;
        self.camera = Some(Camera::new(45.0, aspect, 0.1, 200.0));
        self.gui = Some(Gui::new());
        self.asset_loader = Some(AssetLoader::new());

        self.egui_context = Some(egui::Context::default());
        self.egui_painter = Some(
            Painter::new(self.gl.as_ref().unwrap().clone(), "", None, false)
                .expect("Failed to create egui_glow painter"),
        );
        self.egui_state = Some(EguiState::new(
            self.egui_context.as_ref().unwrap().clone(),
            self.egui_context.as_ref().unwrap().viewport_id(),
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        ));

        self.timer = Timer::new();
        log::info!("application initialized");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(state), Some(window)) = (self.egui_state.as_mut(), self.window.as_ref()) {
            let _ = state.on_window_event(window, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("close requested; stopping");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if physical_size.width > 0 && physical_size.height > 0 {
                    if let (Some(surface), Some(context)) =
                        (self.surface.as_ref(), self.current_context.as_ref())
                    {
                        surface.resize(
                            context,
                            NonZeroU32::new(physical_size.width).unwrap(),
                            NonZeroU32::new(physical_size.height).unwrap(),
                        );
                    }
                    self.size = (physical_size.width as i32, physical_size.height as i32);
                    if let Some(gl) = self.gl.as_ref() {
                        unsafe {
                            use glow::HasContext;
                            gl.viewport(0, 0, self.size.0, self.size.1);
                        }
                    }
                    if let Some(camera) = self.camera.as_mut() {
                        camera.set_aspect(physical_size.width as f32 / physical_size.height as f32);
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.input.handle_key(code, event.state);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.gl.is_some() {
                    self.frame(event_loop);
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.game_state == GameState::Playing {
                self.input
                    .accumulate_mouse_delta(delta.0 as f32, delta.1 as f32);
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(painter) = self.egui_painter.as_mut() {
            painter.destroy();
        }
    }
}

fn main() {
    env_logger::init();

    let config = parse_args();
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {err}");
    }
}
