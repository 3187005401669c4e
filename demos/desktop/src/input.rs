//! Translation of GLFW input into demo actions.
//!
//! Movement keys are polled once per frame, so that holding a key moves the camera smoothly at the frame rate
//! instead of the keyboard repeat rate. Everything else comes from window events.

use freelook_demos::{camera::Movement, InputAction};
use glfw::{Action, Key, WindowEvent};

/// Keys moving the camera while held.
pub const MOVEMENT_KEYS: [(Key, Movement); 6] = [
  (Key::W, Movement::Forward),
  (Key::S, Movement::Backward),
  (Key::A, Movement::Left),
  (Key::D, Movement::Right),
  (Key::Space, Movement::Up),
  (Key::LeftShift, Movement::Down),
];

/// Key bound to [`InputAction::MainToggle`].
pub const TOGGLE_KEY: Key = Key::Enter;

/// Movement actions for the keys currently held, as reported by `is_held`.
pub fn held_movements(is_held: impl Fn(Key) -> bool) -> Vec<InputAction> {
  MOVEMENT_KEYS
    .iter()
    .filter(|(key, _)| is_held(*key))
    .map(|&(_, movement)| InputAction::Move(movement))
    .collect()
}

/// Actions triggered by a window event.
pub fn adapt_event(event: WindowEvent) -> Vec<InputAction> {
  match event {
    WindowEvent::Close | WindowEvent::Key(Key::Escape, _, Action::Press, _) => {
      vec![InputAction::Quit]
    }

    WindowEvent::Key(TOGGLE_KEY, _, Action::Release, _) => vec![InputAction::MainToggle],

    WindowEvent::CursorPos(x, y) => vec![InputAction::CursorMoved {
      x: x as _,
      y: y as _,
    }],

    WindowEvent::Scroll(_, amount) => vec![InputAction::VScroll {
      amount: amount as f32,
    }],

    // the cursor position is relative to the window, which may have moved while being resized
    WindowEvent::FramebufferSize(width, height) => vec![
      InputAction::Resized {
        width: width.max(0) as _,
        height: height.max(0) as _,
      },
      InputAction::CursorReset,
    ],

    // the cursor jumps while the window is not focused
    WindowEvent::Focus(true) => vec![InputAction::CursorReset],

    _ => Vec::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use glfw::{Modifiers, Scancode};

  const SCANCODE: Scancode = 0;

  #[test]
  fn only_held_keys_move() {
    let actions = held_movements(|key| key == Key::W || key == Key::LeftShift);

    assert_eq!(
      actions,
      vec![
        InputAction::Move(Movement::Forward),
        InputAction::Move(Movement::Down)
      ]
    );
    assert!(held_movements(|_| false).is_empty());
  }

  #[test]
  fn escape_and_close_quit() {
    assert_eq!(adapt_event(WindowEvent::Close), vec![InputAction::Quit]);
    assert_eq!(
      adapt_event(WindowEvent::Key(
        Key::Escape,
        SCANCODE,
        Action::Press,
        Modifiers::empty()
      )),
      vec![InputAction::Quit]
    );
  }

  #[test]
  fn movement_keys_are_not_events() {
    for (key, _) in MOVEMENT_KEYS {
      let event = WindowEvent::Key(key, SCANCODE, Action::Press, Modifiers::empty());
      assert!(adapt_event(event).is_empty());
    }
  }

  #[test]
  fn toggle_fires_on_release() {
    let toggle = |action| {
      adapt_event(WindowEvent::Key(TOGGLE_KEY, SCANCODE, action, Modifiers::empty()))
    };

    assert!(toggle(Action::Press).is_empty());
    assert_eq!(toggle(Action::Release), vec![InputAction::MainToggle]);
  }

  #[test]
  fn cursor_and_scroll() {
    assert_eq!(
      adapt_event(WindowEvent::CursorPos(12.5, 7.)),
      vec![InputAction::CursorMoved { x: 12.5, y: 7. }]
    );
    assert_eq!(
      adapt_event(WindowEvent::Scroll(0., -2.)),
      vec![InputAction::VScroll { amount: -2. }]
    );
  }

  #[test]
  fn resize_and_refocus_reset_the_cursor() {
    assert_eq!(
      adapt_event(WindowEvent::FramebufferSize(1920, 1080)),
      vec![
        InputAction::Resized {
          width: 1920,
          height: 1080
        },
        InputAction::CursorReset
      ]
    );
    assert_eq!(
      adapt_event(WindowEvent::FramebufferSize(-1, 0)),
      vec![
        InputAction::Resized {
          width: 0,
          height: 0
        },
        InputAction::CursorReset
      ]
    );
    assert_eq!(adapt_event(WindowEvent::Focus(true)), vec![InputAction::CursorReset]);
    assert!(adapt_event(WindowEvent::Focus(false)).is_empty());
  }
}
