//! Sliding door animation.
//!
//! A door wraps a scene object cut out of a larger model and slides it along
//! one axis between its closed and open positions.

use cgmath::Vector3;

use crate::scene::{ObjectHandle, SceneObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideAxis {
    X,
    Z,
}

pub struct Door {
    pub object: ObjectHandle,
    pub is_left_door: bool,
    pub base_rotation: f32,
    pub slide_axis: SlideAxis,
    pub slide_distance: f32,
    pub slide_direction: f32,
    pub is_open: bool,
    pub is_animating: bool,
    initial_position: Vector3<f32>,
    slide_speed: f32,
    current_offset: f32,
    target_offset: f32,
}

impl Door {
    pub fn new(
        object: ObjectHandle,
        initial_position: Vector3<f32>,
        is_left_door: bool,
        slide_axis: SlideAxis,
        slide_distance: f32,
    ) -> Self {
        Self {
            object,
            is_left_door,
            base_rotation: 0.0,
            slide_axis,
            slide_distance,
            slide_direction: if is_left_door { -1.0 } else { 1.0 },
            is_open: false,
            is_animating: false,
            initial_position,
            slide_speed: 2.5,
            current_offset: 0.0,
            target_offset: 0.0,
        }
    }

    /// Ignored while an animation is in flight.
    pub fn toggle(&mut self) {
        if !self.is_animating {
            self.is_open = !self.is_open;
            self.target_offset = if self.is_open {
                self.slide_distance
            } else {
                0.0
            };
            self.is_animating = true;
        }
    }

    pub fn open(&mut self) {
        if !self.is_open {
            self.toggle();
        }
    }

    pub fn close(&mut self) {
        if self.is_open {
            self.toggle();
        }
    }

    /// Advances the slide animation and returns this frame's world position.
    pub fn advance(&mut self, delta_time: f32) -> Vector3<f32> {
        if self.is_animating {
            let direction = if self.target_offset > self.current_offset {
                1.0
            } else {
                -1.0
            };
            self.current_offset += self.slide_speed * delta_time * direction;

            if direction > 0.0 {
                if self.current_offset >= self.target_offset {
                    self.current_offset = self.target_offset;
                    self.is_animating = false;
                }
            } else if self.current_offset <= self.target_offset {
                self.current_offset = self.target_offset;
                self.is_animating = false;
            }
        }

        let offset = self.current_offset * self.slide_direction;
        let mut position = self.initial_position;
        match self.slide_axis {
            SlideAxis::X => position.x += offset,
            SlideAxis::Z => position.z += offset,
        }
        position
    }

    pub fn update(&mut self, delta_time: f32, object: &mut SceneObject) {
        let position = self.advance(delta_time);
        object.rotation.y = self.base_rotation;
        object.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::vec3;

    fn door(axis: SlideAxis, is_left: bool) -> Door {
        Door::new(ObjectHandle(0), vec3(1.0, 0.0, 2.0), is_left, axis, 1.5)
    }

    #[test]
    fn opening_converges_on_the_slide_distance() {
        let mut door = door(SlideAxis::X, false);
        door.toggle();
        assert!(door.is_animating);

        for _ in 0..100 {
            door.advance(0.1);
        }
        let position = door.advance(0.0);
        assert!(!door.is_animating);
        assert!(door.is_open);
        assert_relative_eq!(position.x, 1.0 + 1.5, epsilon = 1e-5);
        assert_relative_eq!(position.z, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn left_doors_slide_the_other_way() {
        let mut door = door(SlideAxis::Z, true);
        door.open();
        for _ in 0..100 {
            door.advance(0.1);
        }
        let position = door.advance(0.0);
        assert_relative_eq!(position.z, 2.0 - 1.5, epsilon = 1e-5);
        assert_relative_eq!(position.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn closing_returns_to_the_initial_position() {
        let mut door = door(SlideAxis::X, false);
        door.open();
        for _ in 0..100 {
            door.advance(0.1);
        }
        door.close();
        for _ in 0..100 {
            door.advance(0.1);
        }
        let position = door.advance(0.0);
        assert!(!door.is_open);
        assert_relative_eq!(position.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn toggling_mid_animation_is_ignored() {
        let mut door = door(SlideAxis::X, false);
        door.toggle();
        door.advance(0.01);
        door.toggle();
        assert!(door.is_open, "toggle during animation must not flip state");
    }

    #[test]
    fn animation_does_not_overshoot() {
        let mut door = door(SlideAxis::X, false);
        door.toggle();
        // One huge step lands exactly on the target
        let position = door.advance(100.0);
        assert_relative_eq!(position.x, 2.5, epsilon = 1e-5);
        assert!(!door.is_animating);
    }
}
