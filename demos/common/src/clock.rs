//! Frame timing.

/// Tracks the time of the current and previous frames.
///
/// [`FrameClock::tick`] must be called exactly once per loop iteration, before any input is processed, so that every
/// movement of that iteration scales with the same delta.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClock {
  current: f32,
  previous: f32,
  delta: f32,
}

impl FrameClock {
  /// Start a clock at `now` seconds. The first delta is computed against it.
  pub fn new(now: f32) -> Self {
    FrameClock {
      current: now,
      previous: now,
      delta: 0.,
    }
  }

  /// Advance to `now` and return the elapsed seconds since the previous tick.
  ///
  /// A clock going backwards yields a zero delta.
  pub fn tick(&mut self, now: f32) -> f32 {
    self.previous = self.current;
    self.current = now;
    self.delta = (self.current - self.previous).max(0.);
    self.delta
  }

  pub fn delta(&self) -> f32 {
    self.delta
  }

  pub fn now(&self) -> f32 {
    self.current
  }
}
