//! egui overlay: main menu, controls screen and the in-game render panel.

use std::time::{Duration, Instant};

use crate::scene::RenderOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Menu,
    Controls,
    Playing,
}

/// What the user picked on this frame's overlay, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    None,
    Start,
    ShowControls,
    Back,
    Quit,
}

pub struct Gui {
    frame_count: u32,
    accumulator: Duration,
    last_frame_time: Instant,
    fps: u32,
    pub door_toggle_requested: bool,
}

impl Gui {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            accumulator: Duration::ZERO,
            last_frame_time: Instant::now(),
            fps: 0,
            door_toggle_requested: false,
        }
    }

    pub fn update(
        &mut self,
        raw_input: egui::RawInput,
        ctx: &egui::Context,
        state: GameState,
        options: &mut RenderOptions,
    ) -> (egui::FullOutput, MenuAction) {
        let now = Instant::now();
        self.accumulator += now - self.last_frame_time;
        self.last_frame_time = now;
        self.frame_count += 1;
        if self.accumulator >= Duration::from_secs_f32(0.1) {
            self.fps = (self.frame_count as f32 / self.accumulator.as_secs_f32()) as u32;
            self.accumulator = Duration::ZERO;
            self.frame_count = 0;
        }

        let mut action = MenuAction::None;

        let full_output = ctx.run(raw_input, |ctx| match state {
            GameState::Menu => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(140.0);
                        ui.heading("Scene Viewer");
                        ui.add_space(40.0);
                        if ui.button("Start").clicked() {
                            action = MenuAction::Start;
                        }
                        ui.add_space(8.0);
                        if ui.button("Controls").clicked() {
                            action = MenuAction::ShowControls;
                        }
                        ui.add_space(8.0);
                        if ui.button("Quit").clicked() {
                            action = MenuAction::Quit;
                        }
                    });
                });
            }
            GameState::Controls => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(100.0);
                        ui.heading("Controls");
                        ui.add_space(20.0);
                        ui.label("WASD - move, mouse - look");
                        ui.label("Space / Left Shift - up / down");
                        ui.label("E - toggle doors");
                        ui.label("K - skybox, L - shadows, P - lights");
                        ui.label("M - shadow map debug, N - texcoord debug");
                        ui.label("Escape - back to menu");
                        ui.add_space(20.0);
                        if ui.button("Back").clicked() {
                            action = MenuAction::Back;
                        }
                    });
                });
            }
            GameState::Playing => {
                egui::Window::new("Render")
                    .default_pos((12.0, 12.0))
                    .resizable(false)
                    .show(ctx, |ui| {
                        ui.label(format!("FPS: {}", self.fps));
                        ui.separator();
                        ui.checkbox(&mut options.skybox, "Skybox (K)");
                        ui.checkbox(&mut options.shadows, "Shadows (L)");
                        ui.checkbox(&mut options.lights, "Lights (P)");
                        ui.checkbox(&mut options.debug_shadows, "Shadow debug (M)");
                        ui.checkbox(&mut options.debug_texture, "Texture debug (N)");
                        ui.separator();
                        if ui.button("Toggle doors (E)").clicked() {
                            self.door_toggle_requested = true;
                        }
                    });
            }
        });

        (full_output, action)
    }
}
