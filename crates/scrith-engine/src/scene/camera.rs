use glam::{Mat4, Vec3};

use crate::input::{InputFrame, InputState, Key};

pub const FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 1000.0;

/// Movement intent for one frame, each axis in [-1, 1].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CameraInput {
    pub forward: f32,
    pub strafe: f32,
    pub rise: f32,
    pub turn: f32,
    /// Flip the drift on or off.
    pub toggle_drift: bool,
}

impl CameraInput {
    /// WASD / arrow keys move and turn, Q/E lower and raise, a Space press
    /// toggles the drift.
    pub fn from_keys(input: &InputState, frame: &InputFrame) -> Self {
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        Self {
            forward: axis(input.key_down(Key::W), input.key_down(Key::S)),
            strafe: axis(input.key_down(Key::D), input.key_down(Key::A)),
            rise: axis(input.key_down(Key::E), input.key_down(Key::Q)),
            turn: axis(input.key_down(Key::ArrowRight), input.key_down(Key::ArrowLeft)),
            toggle_drift: frame.pressed(Key::Space),
        }
    }
}

/// Free-flying camera over the tile floor.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading around +y, radians; 0 looks down +z.
    pub yaw: f32,
    /// Radians below the horizon.
    pub pitch: f32,

    pub acceleration: f32,
    pub turn_rate: f32,
    /// Constant forward speed applied without input, so the floor keeps recycling.
    pub drift: f32,
    pub drifting: bool,
    /// Fraction of velocity kept per second.
    pub damping: f32,
    pub min_height: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 12.0, -20.0),
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.45,
            acceleration: 40.0,
            turn_rate: 1.5,
            drift: 2.0,
            drifting: true,
            damping: 0.05,
            min_height: 2.0,
        }
    }
}

impl FlyCamera {
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, -sp, cy * cp)
    }

    /// Heading projected on the floor.
    pub fn heading(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        Vec3::new(sy, 0.0, cy)
    }

    pub fn update(&mut self, dt: f32, input: CameraInput) {
        if input.toggle_drift {
            self.drifting = !self.drifting;
            log::debug!("camera drift {}", if self.drifting { "on" } else { "off" });
        }
        self.yaw += input.turn * self.turn_rate * dt;

        let heading = self.heading();
        let right = Vec3::Y.cross(heading);
        let accel = heading * input.forward + right * input.strafe + Vec3::Y * input.rise;

        self.velocity += accel * self.acceleration * dt;
        self.velocity *= self.damping.powf(dt);

        self.position += (self.velocity + self.drift_velocity()) * dt;
        if self.position.y < self.min_height {
            self.position.y = self.min_height;
            self.velocity.y = self.velocity.y.max(0.0);
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_lh(self.position, self.forward(), Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_lh(FOV_Y, aspect.max(1e-3), Z_NEAR, Z_FAR)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    pub fn drift_velocity(&self) -> Vec3 {
        if self.drifting {
            self.heading() * self.drift
        } else {
            Vec3::ZERO
        }
    }

    /// Velocity including the drift, as reported in the scene constants.
    pub fn effective_velocity(&self) -> Vec3 {
        self.velocity + self.drift_velocity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_moves_along_heading_without_input() {
        let mut cam = FlyCamera::default();
        let start = cam.position;
        cam.update(1.0, CameraInput::default());
        let moved = cam.position - start;
        assert!(moved.z > 0.0);
        assert!(moved.x.abs() < 1e-5);
    }

    #[test]
    fn toggle_stops_and_restarts_drift() {
        let mut cam = FlyCamera::default();
        let toggle = CameraInput { toggle_drift: true, ..Default::default() };

        cam.update(0.0, toggle);
        let start = cam.position;
        cam.update(1.0, CameraInput::default());
        assert_eq!(cam.position, start);
        assert_eq!(cam.effective_velocity(), Vec3::ZERO);

        cam.update(1.0, toggle);
        assert!(cam.position.z > start.z);
    }

    #[test]
    fn height_is_clamped_above_floor() {
        let mut cam = FlyCamera::default();
        for _ in 0..100 {
            cam.update(0.1, CameraInput { rise: -1.0, ..Default::default() });
        }
        assert!(cam.position.y >= cam.min_height);
    }

    #[test]
    fn center_of_view_projects_to_screen_center() {
        let cam = FlyCamera::default();
        let target = cam.position + cam.forward() * 10.0;
        let clip = cam.view_projection(16.0 / 9.0) * target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn keys_map_to_axes() {
        let mut input = InputState::default();
        input.keys_down.insert(Key::W);
        input.keys_down.insert(Key::A);
        let mut frame = InputFrame::default();
        frame.keys_pressed.insert(Key::Space);
        let ci = CameraInput::from_keys(&input, &frame);
        assert_eq!(ci.forward, 1.0);
        assert_eq!(ci.strafe, -1.0);
        assert_eq!(ci.rise, 0.0);
        assert!(ci.toggle_drift);
    }
}
