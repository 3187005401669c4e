use cgmath::{InnerSpace as _, Vector3};
use freelook_demos::{
  camera::{Camera, Movement, CAMERA_SPEED, FOV_MAX, FOV_MIN, MOUSE_SENSITIVITY, PITCH_LIMIT},
  input::drive_camera,
  InputAction,
};
use rand::{rngs::StdRng, Rng as _, SeedableRng as _};

const EPSILON: f32 = 1e-4;

fn camera() -> Camera {
  Camera::new(
    Vector3::new(1., 2., 3.),
    Vector3::new(0.3, -0.2, -1.),
    Vector3::unit_y(),
    [800, 600],
  )
}

#[test]
fn forward_moves_are_linear_along_front() {
  let mut rng = StdRng::seed_from_u64(1);

  for _ in 0..100 {
    let mut cam = camera();
    let front = cam.front();
    let delta = rng.gen_range(0f32..0.5);
    let steps = rng.gen_range(1..20);

    for step in 1..=steps {
      let before = cam.position();
      cam.process_keyboard(Movement::Forward, delta);
      let moved = cam.position() - before;

      assert!((moved - front * CAMERA_SPEED * delta).magnitude() < EPSILON);
      let expected = camera().position() + front * CAMERA_SPEED * delta * step as f32;
      assert!((cam.position() - expected).magnitude() < EPSILON * step as f32);
    }

    // moving does not turn
    assert_eq!(cam.front(), front);
  }
}

#[test]
fn zero_delta_does_not_move() {
  let mut cam = camera();

  for direction in [
    Movement::Forward,
    Movement::Backward,
    Movement::Left,
    Movement::Right,
    Movement::Up,
    Movement::Down,
  ] {
    cam.process_keyboard(direction, 0.);
  }

  assert_eq!(cam.position(), camera().position());
}

#[test]
fn pitch_stays_clamped_and_front_stays_unit() {
  let mut rng = StdRng::seed_from_u64(2);
  let mut cam = camera();

  for _ in 0..10_000 {
    let x = rng.gen_range(-5000f32..5000.);
    let y = rng.gen_range(-5000f32..5000.);
    cam.process_mouse_look(x, y);

    assert!(cam.pitch() >= -PITCH_LIMIT && cam.pitch() <= PITCH_LIMIT, "{}", cam.pitch());
    assert!((cam.front().magnitude() - 1.).abs() < EPSILON);
  }
}

#[test]
fn looking_far_up_stops_at_the_limit() {
  let mut cam = camera();

  cam.process_mouse_look(0., 0.);
  cam.process_mouse_look(0., -1e6);

  assert_eq!(cam.pitch(), PITCH_LIMIT);
  assert!(cam.front().y > 0.99);
}

#[test]
fn fov_stays_clamped() {
  let mut rng = StdRng::seed_from_u64(3);
  let mut cam = camera();

  assert_eq!(cam.fov(), FOV_MAX);

  for _ in 0..10_000 {
    cam.process_scroll(rng.gen_range(-20f32..20.));
    assert!(cam.fov() >= FOV_MIN && cam.fov() <= FOV_MAX, "{}", cam.fov());
  }

  cam.process_scroll(1000.);
  assert_eq!(cam.fov(), FOV_MIN);

  cam.process_scroll(-1000.);
  assert_eq!(cam.fov(), FOV_MAX);
}

#[test]
fn first_mouse_look_only_seeds() {
  let mut rng = StdRng::seed_from_u64(4);

  for _ in 0..100 {
    let mut cam = camera();
    let (yaw, pitch, front) = (cam.yaw(), cam.pitch(), cam.front());
    let x = rng.gen_range(-1000f32..1000.);
    let y = rng.gen_range(-1000f32..1000.);

    cam.process_mouse_look(x, y);

    assert_eq!(cam.yaw(), yaw);
    assert_eq!(cam.pitch(), pitch);
    assert_eq!(cam.front(), front);

    // the second sample is relative to the first one, not to the viewport centre
    cam.process_mouse_look(x + 10., y);

    assert!((cam.yaw() - (yaw + 10. * MOUSE_SENSITIVITY)).abs() < EPSILON);
    assert!((cam.pitch() - pitch).abs() < EPSILON);
  }
}

#[test]
fn view_matrix_is_pure() {
  let mut cam = camera();
  cam.process_mouse_look(10., 10.);
  cam.process_mouse_look(40., -25.);
  cam.process_keyboard(Movement::Right, 0.3);

  let before = cam.clone();
  let a = cam.view_matrix();
  let b = cam.view_matrix();

  assert_eq!(a, b);
  assert_eq!(cam, before);
}

#[test]
fn actions_drive_the_camera() {
  let mut cam = camera();
  let delta = 0.1;

  assert!(drive_camera(&mut cam, &InputAction::Move(Movement::Up), delta));
  let expected = camera().position() + Vector3::unit_y() * CAMERA_SPEED * delta;
  assert!((cam.position() - expected).magnitude() < EPSILON);

  assert!(drive_camera(&mut cam, &InputAction::VScroll { amount: 5. }, delta));
  assert_eq!(cam.fov(), FOV_MAX - 5.);

  assert!(!drive_camera(&mut cam, &InputAction::Quit, delta));
  assert!(!drive_camera(
    &mut cam,
    &InputAction::Resized {
      width: 10,
      height: 10
    },
    delta
  ));
}
