//! Euler-angle fly camera and its input controller.
//!
//! [`Camera`] turns yaw/pitch into a front/right/up basis and a view matrix.
//! [`CameraController`] is the input context the window loop feeds key, cursor
//! and scroll events into; it owns the camera and all state between events.

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::{event::ElementState, keyboard::KeyCode};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const PITCH_LIMIT: f32 = 89.0;
const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 45.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl CameraMovement {
    pub const ALL: [CameraMovement; 6] = [
        CameraMovement::Forward,
        CameraMovement::Backward,
        CameraMovement::Left,
        CameraMovement::Right,
        CameraMovement::Up,
        CameraMovement::Down,
    ];

    /// W/S/A/D move in the view plane, space and left shift move along up.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => Some(CameraMovement::Forward),
            KeyCode::KeyS | KeyCode::ArrowDown => Some(CameraMovement::Backward),
            KeyCode::KeyA | KeyCode::ArrowLeft => Some(CameraMovement::Left),
            KeyCode::KeyD | KeyCode::ArrowRight => Some(CameraMovement::Right),
            KeyCode::Space => Some(CameraMovement::Up),
            KeyCode::ShiftLeft => Some(CameraMovement::Down),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Starting values for a [`Camera`].
#[derive(Copy, Clone, Debug)]
pub struct CameraSettings {
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    /// Units per second.
    pub speed: f32,
    /// Degrees per pixel of cursor travel.
    pub sensitivity: f32,
    /// Vertical field of view.
    pub zoom: Deg<f32>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            yaw: Deg(-90.0),
            pitch: Deg(0.0),
            speed: 2.5,
            sensitivity: 0.1,
            zoom: Deg(45.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub world_up: Vector3<f32>,
    pub yaw: Deg<f32>,
    pub pitch: Deg<f32>,
    pub speed: f32,
    pub sensitivity: f32,
    pub zoom: Deg<f32>,
    front: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, V: Into<Vector3<f32>>>(
        position: P,
        world_up: V,
        settings: CameraSettings,
    ) -> Self {
        let mut camera = Self {
            position: position.into(),
            world_up: world_up.into(),
            yaw: settings.yaw,
            pitch: settings.pitch,
            speed: settings.speed,
            sensitivity: settings.sensitivity,
            zoom: settings.zoom,
            front: -Vector3::unit_z(),
            right: Vector3::unit_x(),
            up: Vector3::unit_y(),
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection using the current zoom as field of view, in WGPU clip space.
    pub fn projection_matrix(&self, aspect: f32, znear: f32, zfar: f32) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.zoom, aspect, znear, zfar)
    }

    pub fn process_keyboard(&mut self, movement: CameraMovement, dt: f32) {
        let velocity = self.speed * dt;
        let offset = match movement {
            CameraMovement::Forward => self.front * velocity,
            CameraMovement::Backward => -self.front * velocity,
            CameraMovement::Left => -self.right * velocity,
            CameraMovement::Right => self.right * velocity,
            CameraMovement::Up => self.up * velocity,
            CameraMovement::Down => -self.up * velocity,
        };
        self.position += offset;
    }

    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32, constrain_pitch: bool) {
        self.yaw += Deg(dx * self.sensitivity);
        self.pitch += Deg(dy * self.sensitivity);

        if constrain_pitch {
            self.pitch = Deg(self.pitch.0.clamp(-PITCH_LIMIT, PITCH_LIMIT));
        }

        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, dy: f32) {
        self.zoom = Deg((self.zoom.0 - dy).clamp(MIN_ZOOM, MAX_ZOOM));
    }

    fn update_vectors(&mut self) {
        let Rad(yaw) = Rad::from(self.yaw);
        let Rad(pitch) = Rad::from(self.pitch);
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

/// Wall-clock delta between frames.
#[derive(Debug)]
pub struct FrameTimer {
    last: instant::Instant,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last: instant::Instant::now(),
        }
    }

    /// Seconds since the previous call (or since construction).
    pub fn tick(&mut self) -> f32 {
        let now = instant::Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Input context owning the camera and everything remembered between events.
#[derive(Debug)]
pub struct CameraController {
    pub camera: Camera,
    held: [bool; 6],
    first_mouse: bool,
    last_x: f64,
    last_y: f64,
    timer: FrameTimer,
}

impl CameraController {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            held: [false; 6],
            first_mouse: true,
            last_x: 0.0,
            last_y: 0.0,
            timer: FrameTimer::new(),
        }
    }

    /// Returns whether the key drives the camera.
    pub fn process_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        match CameraMovement::from_key(key) {
            Some(movement) => {
                self.held[movement.slot()] = state == ElementState::Pressed;
                true
            }
            None => false,
        }
    }

    pub fn is_held(&self, movement: CameraMovement) -> bool {
        self.held[movement.slot()]
    }

    /// Cursor position in window pixels. The first event only records the position.
    pub fn process_cursor(&mut self, x: f64, y: f64) {
        if self.first_mouse {
            self.last_x = x;
            self.last_y = y;
            self.first_mouse = false;
        }
        // window y grows downwards
        let dx = (x - self.last_x) as f32;
        let dy = (self.last_y - y) as f32;
        self.last_x = x;
        self.last_y = y;
        self.camera.process_mouse_movement(dx, dy, true);
    }

    /// Forget the last cursor position, e.g. after the cursor was re-captured.
    pub fn reset_cursor(&mut self) {
        self.first_mouse = true;
    }

    pub fn process_scroll(&mut self, dy: f32) {
        self.camera.process_mouse_scroll(dy);
    }

    /// Move the camera for every held key over `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for movement in CameraMovement::ALL {
            if self.is_held(movement) {
                self.camera.process_keyboard(movement, dt);
            }
        }
    }

    /// [`update`](Self::update) with the time elapsed since the previous frame.
    pub fn update_frame(&mut self) -> f32 {
        let dt = self.timer.tick();
        self.update(dt);
        dt
    }
}
