//! Forwarding of platform-neutral input actions to the camera.

use crate::{camera::Camera, InputAction};

/// Apply `action` to `camera`, scaling movements by `delta` seconds.
///
/// Returns `true` if the action was consumed by the camera. Actions the camera does not care about (quitting,
/// toggles, resizes) are left to the caller.
pub fn drive_camera(camera: &mut Camera, action: &InputAction, delta: f32) -> bool {
  match *action {
    InputAction::Move(direction) => camera.process_keyboard(direction, delta),
    InputAction::CursorMoved { x, y } => camera.process_mouse_look(x, y),
    InputAction::VScroll { amount } => camera.process_scroll(amount),
    InputAction::CursorReset => camera.reset_mouse(),
    _ => return false,
  }

  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::camera::{Movement, CAMERA_SPEED};
  use cgmath::Vector3;

  fn camera() -> Camera {
    Camera::new(
      Vector3::new(0., 0., 0.),
      Vector3::new(0., 0., -1.),
      Vector3::unit_y(),
      [800, 600],
    )
  }

  #[test]
  fn move_uses_delta() {
    let mut cam = camera();

    assert!(drive_camera(
      &mut cam,
      &InputAction::Move(Movement::Forward),
      0.5
    ));
    assert!((cam.position().z + CAMERA_SPEED * 0.5).abs() < 1e-5);
  }

  #[test]
  fn scroll_zooms() {
    let mut cam = camera();

    assert!(drive_camera(
      &mut cam,
      &InputAction::VScroll { amount: 5. },
      0.
    ));
    assert_eq!(cam.fov(), 40.);
  }

  #[test]
  fn other_actions_are_not_consumed() {
    let mut cam = camera();
    let before = cam.clone();

    assert!(!drive_camera(&mut cam, &InputAction::Quit, 1.));
    assert!(!drive_camera(&mut cam, &InputAction::MainToggle, 1.));
    assert!(!drive_camera(
      &mut cam,
      &InputAction::Resized {
        width: 10,
        height: 10
      },
      1.
    ));
    assert_eq!(cam, before);
  }
}
