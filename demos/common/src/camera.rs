//! Free-look (“FPS-style”) camera.
//!
//! The camera is described by a position, a unit front vector and an up vector. The front vector is derived from two
//! Euler angles, yaw and pitch, which are updated from cursor motion. Pitch is kept strictly below the verticals so
//! that the look-at basis never degenerates.

use cgmath::{perspective, Deg, EuclideanSpace as _, InnerSpace as _, Matrix4, Point3, Vector3};

/// Distance travelled per second while a movement key is held.
pub const CAMERA_SPEED: f32 = 2.5;

/// Degrees of rotation per pixel of cursor motion.
pub const MOUSE_SENSITIVITY: f32 = 0.1;

/// Pitch is clamped to [-PITCH_LIMIT, PITCH_LIMIT] degrees.
pub const PITCH_LIMIT: f32 = 89.;

/// Narrowest field of view, in degrees.
pub const FOV_MIN: f32 = 1.;

/// Widest (and default) field of view, in degrees.
pub const FOV_MAX: f32 = 45.;

/// Direction of a keyboard-driven camera move.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Movement {
  Forward,
  Backward,
  Left,
  Right,
  Up,
  Down,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
  position: Vector3<f32>,
  front: Vector3<f32>,
  up: Vector3<f32>,
  yaw: f32,
  pitch: f32,
  fov: f32,
  last_cursor: [f32; 2],
  first_mouse: bool,
}

impl Camera {
  /// Create a camera at `position`, looking along `front`.
  ///
  /// Yaw and pitch are recovered from `front`, so the first mouse-look update continues from the initial direction
  /// instead of snapping to a fixed heading. `viewport` seeds the last cursor position at the viewport centre.
  pub fn new(
    position: Vector3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    viewport: [u32; 2],
  ) -> Self {
    let front = if front.magnitude2() > 0. {
      front.normalize()
    } else {
      -Vector3::unit_z()
    };

    let yaw = front.z.atan2(front.x).to_degrees();
    let pitch = clamp_pitch(front.y.max(-1.).min(1.).asin().to_degrees());

    Camera {
      position,
      front: look_direction(yaw, pitch),
      up,
      yaw,
      pitch,
      fov: FOV_MAX,
      last_cursor: [viewport[0] as f32 * 0.5, viewport[1] as f32 * 0.5],
      first_mouse: true,
    }
  }

  pub fn position(&self) -> Vector3<f32> {
    self.position
  }

  pub fn front(&self) -> Vector3<f32> {
    self.front
  }

  pub fn up(&self) -> Vector3<f32> {
    self.up
  }

  pub fn yaw(&self) -> f32 {
    self.yaw
  }

  pub fn pitch(&self) -> f32 {
    self.pitch
  }

  /// Vertical field of view, in degrees.
  pub fn fov(&self) -> f32 {
    self.fov
  }

  /// Translate the camera. The distance is `CAMERA_SPEED * delta`; a negative delta is treated as zero.
  pub fn process_keyboard(&mut self, direction: Movement, delta: f32) {
    let velocity = CAMERA_SPEED * delta.max(0.);

    match direction {
      Movement::Forward => self.position += self.front * velocity,
      Movement::Backward => self.position -= self.front * velocity,
      Movement::Left => self.position -= self.right() * velocity,
      Movement::Right => self.position += self.right() * velocity,
      Movement::Up => self.position += self.up * velocity,
      Movement::Down => self.position -= self.up * velocity,
    }
  }

  /// Rotate the camera from an absolute cursor position.
  ///
  /// The first sample after construction (or after [`Camera::reset_mouse`]) only records the position.
  pub fn process_mouse_look(&mut self, x: f32, y: f32) {
    if self.first_mouse {
      self.last_cursor = [x, y];
      self.first_mouse = false;
      return;
    }

    let [last_x, last_y] = self.last_cursor;
    self.last_cursor = [x, y];

    // window y grows downwards, pitch grows upwards
    let x_offset = (x - last_x) * MOUSE_SENSITIVITY;
    let y_offset = (last_y - y) * MOUSE_SENSITIVITY;

    if x_offset == 0. && y_offset == 0. {
      return;
    }

    self.yaw += x_offset;
    self.pitch = clamp_pitch(self.pitch + y_offset);
    self.front = look_direction(self.yaw, self.pitch);
  }

  /// Zoom by changing the field of view; positive amounts zoom in.
  pub fn process_scroll(&mut self, y_offset: f32) {
    self.fov = (self.fov - y_offset).max(FOV_MIN).min(FOV_MAX);
  }

  /// Forget the last cursor sample; the next mouse-look update will only seed it.
  pub fn reset_mouse(&mut self) {
    self.first_mouse = true;
  }

  /// World-to-view transform.
  pub fn view_matrix(&self) -> Matrix4<f32> {
    let eye = Point3::from_vec(self.position);
    Matrix4::look_at_rh(eye, eye + self.front, self.up)
  }

  /// Perspective projection using the current field of view.
  pub fn projection(&self, aspect_ratio: f32, z_near: f32, z_far: f32) -> Matrix4<f32> {
    perspective(Deg(self.fov), aspect_ratio, z_near, z_far)
  }

  fn right(&self) -> Vector3<f32> {
    self.front.cross(self.up).normalize()
  }
}

fn clamp_pitch(pitch: f32) -> f32 {
  pitch.max(-PITCH_LIMIT).min(PITCH_LIMIT)
}

fn look_direction(yaw: f32, pitch: f32) -> Vector3<f32> {
  let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());

  Vector3::new(
    yaw.cos() * pitch.cos(),
    pitch.sin(),
    yaw.sin() * pitch.cos(),
  )
  .normalize()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
  }

  #[test]
  fn initial_angles_follow_front() {
    let cam = Camera::new(
      Vector3::new(0., 0., 3.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    assert!(approx(cam.yaw(), -90.));
    assert!(approx(cam.pitch(), 0.));
    assert!(approx(cam.fov(), FOV_MAX));
  }

  #[test]
  fn tilted_front_is_normalized() {
    let cam = Camera::new(
      Vector3::new(0., 3., 4.),
      Vector3::new(0., -0.5, -1.),
      Vector3::unit_y(),
      [1280, 720],
    );

    assert!(approx(cam.front().magnitude(), 1.));
    assert!(cam.pitch() < 0.);
    assert!(approx(cam.front().y, -0.5 / 1.25f32.sqrt()));
  }

  #[test]
  fn vertical_front_gets_clamped() {
    let cam = Camera::new(
      Vector3::new(0., 10., 0.),
      Vector3::new(0., -1., 0.),
      Vector3::unit_z(),
      [1280, 720],
    );

    assert!(approx(cam.pitch(), -PITCH_LIMIT));
    assert!(cam.front().y > -1.);
  }

  #[test]
  fn zero_front_falls_back_to_negative_z() {
    let cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., 0.),
      Vector3::unit_y(),
      [1280, 720],
    );

    assert!(approx(cam.front().z, -1.));
  }

  #[test]
  fn strafe_is_perpendicular_to_front() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_keyboard(Movement::Right, 1.);
    let p = cam.position();

    assert!(approx(p.x, CAMERA_SPEED));
    assert!(approx(p.y, 0.));
    assert!(approx(p.z, 0.));

    cam.process_keyboard(Movement::Left, 1.);
    assert!(approx(cam.position().magnitude(), 0.));
  }

  #[test]
  fn vertical_moves_follow_up() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(1., 0., 0.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_keyboard(Movement::Up, 0.5);
    assert!(approx(cam.position().y, CAMERA_SPEED * 0.5));

    cam.process_keyboard(Movement::Down, 1.);
    assert!(approx(cam.position().y, -CAMERA_SPEED * 0.5));
  }

  #[test]
  fn negative_delta_does_not_move() {
    let mut cam = Camera::new(
      Vector3::new(1., 2., 3.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_keyboard(Movement::Forward, -1.);
    assert_eq!(cam.position(), Vector3::new(1., 2., 3.));
  }

  #[test]
  fn zero_mouse_offset_is_a_no_op() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0.3, 0.2, -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_mouse_look(100., 100.);
    let before = cam.clone();
    cam.process_mouse_look(100., 100.);

    assert_eq!(cam, before);
  }

  #[test]
  fn reset_mouse_reseeds() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_mouse_look(0., 0.);
    cam.reset_mouse();
    cam.process_mouse_look(5000., -5000.);

    assert!(approx(cam.yaw(), -90.));
    assert!(approx(cam.pitch(), 0.));
  }

  #[test]
  fn mouse_up_raises_pitch() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_mouse_look(400., 300.);
    cam.process_mouse_look(410., 280.);

    assert!(approx(cam.yaw(), -89.));
    assert!(approx(cam.pitch(), 2.));
    assert!(cam.front().y > 0.);
  }

  #[test]
  fn scroll_zooms_in_and_clamps() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    cam.process_scroll(4.);
    assert!(approx(cam.fov(), 41.));

    cam.process_scroll(100.);
    assert!(approx(cam.fov(), FOV_MIN));

    cam.process_scroll(-100.);
    assert!(approx(cam.fov(), FOV_MAX));

    cam.process_scroll(0.);
    assert!(approx(cam.fov(), FOV_MAX));
  }

  #[test]
  fn projection_depends_on_fov() {
    let mut cam = Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    );

    let wide = cam.projection(4. / 3., 0.1, 100.);
    cam.process_scroll(20.);
    let narrow = cam.projection(4. / 3., 0.1, 100.);

    // a narrower field of view scales up the y axis
    assert!(narrow.y.y > wide.y.y);
  }
}
