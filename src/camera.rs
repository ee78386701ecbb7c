//! First-person perspective camera with noclip movement.

use cgmath::{
    perspective, Deg, InnerSpace, Matrix4, Point3, Quaternion, Rotation3, SquareMatrix, Vector3,
};
use winit::keyboard::KeyCode;

use crate::input::InputState;

pub struct Camera {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,

    pub position: Point3<f32>,
    pub orientation: Vector3<f32>,
    pub up: Vector3<f32>,

    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub speed: f32,
    /// Degrees of rotation per pixel of mouse travel
    pub sensitivity: f32,
}

impl Camera {
    pub fn new(fov: f32, aspect_ratio: f32, near_plane: f32, far_plane: f32) -> Self {
        let mut camera = Self {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            position: Point3::new(0.0, 2.0, 12.0),
            orientation: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::unit_y(),
            fov,
            aspect_ratio,
            near_plane,
            far_plane,
            speed: 8.0,
            sensitivity: 0.1,
        };
        camera.update_matrices();
        camera
    }

    pub fn set_aspect(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn update_matrices(&mut self) {
        self.view = Matrix4::look_at_rh(self.position, self.position + self.orientation, self.up);
        self.projection = perspective(
            Deg(self.fov),
            self.aspect_ratio,
            self.near_plane,
            self.far_plane,
        );
    }

    /// Yaw around the world up axis, pitch around the camera's right axis.
    /// Pitch stops short of the poles so the view never flips.
    pub fn apply_mouse_delta(&mut self, dx: f32, dy: f32) {
        let rot_x = dy * self.sensitivity;
        let rot_y = dx * self.sensitivity;

        let right = self.orientation.cross(self.up).normalize();
        let pitch = Quaternion::from_axis_angle(right, Deg(-rot_x));
        let pitched = pitch * self.orientation;
        if pitched.dot(self.up).abs() < 0.99 {
            self.orientation = pitched;
        }

        let yaw = Quaternion::from_axis_angle(self.up, Deg(-rot_y));
        self.orientation = yaw * self.orientation;
    }

    /// Noclip movement along the view direction and world up.
    pub fn update(&mut self, delta_time: f32, input: &InputState) {
        let forward = self.orientation.normalize();
        let right = forward.cross(self.up).normalize();

        let mut movement = Vector3::new(0.0, 0.0, 0.0);
        if input.key_down(KeyCode::KeyW) {
            movement += forward;
        }
        if input.key_down(KeyCode::KeyS) {
            movement -= forward;
        }
        if input.key_down(KeyCode::KeyD) {
            movement += right;
        }
        if input.key_down(KeyCode::KeyA) {
            movement -= right;
        }
        if input.key_down(KeyCode::Space) {
            movement += self.up;
        }
        if input.key_down(KeyCode::ShiftLeft) {
            movement -= self.up;
        }
        if movement.magnitude2() > 0.0 {
            self.position += movement.normalize() * self.speed * delta_time;
        }

        let (dx, dy) = input.mouse_delta();
        if dx != 0.0 || dy != 0.0 {
            self.apply_mouse_delta(dx, dy);
        }

        self.update_matrices();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector4;

    #[test]
    fn view_matrix_moves_the_world_opposite_to_the_camera() {
        let mut camera = Camera::new(45.0, 16.0 / 9.0, 0.1, 200.0);
        camera.position = Point3::new(0.0, 0.0, 5.0);
        camera.orientation = Vector3::new(0.0, 0.0, -1.0);
        camera.update_matrices();

        let origin = camera.view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(origin.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn yaw_keeps_the_orientation_level() {
        let mut camera = Camera::new(45.0, 1.0, 0.1, 100.0);
        camera.apply_mouse_delta(500.0, 0.0);
        assert_relative_eq!(camera.orientation.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(camera.orientation.magnitude(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn pitch_never_reaches_the_poles() {
        let mut camera = Camera::new(45.0, 1.0, 0.1, 100.0);
        for _ in 0..100 {
            camera.apply_mouse_delta(0.0, -200.0);
        }
        assert!(camera.orientation.dot(camera.up).abs() < 0.999);
    }

    #[test]
    fn aspect_change_reaches_the_projection() {
        let mut camera = Camera::new(45.0, 1.0, 0.1, 100.0);
        let before = camera.projection;
        camera.set_aspect(2.0);
        camera.update_matrices();
        assert_ne!(before, camera.projection);
    }
}
