use embedded_graphics::prelude::Point;

use crate::RawSample;

/// State of the single touch being tracked. Outside a touch the fields keep
/// their last values and `active` gates their meaning.
#[derive(Debug, Clone, Copy)]
pub struct TouchSession {
    pub start_millis: u32,
    pub first_position: Point,
    pub last_position: Point,
    pub actual_position: Point,
    pub actual_raw: RawSample,
    pub pressure: u16,
    pub active: bool,
    /// Set on press, cleared by the first `consume_touch_started`.
    pub(crate) started: bool,
    pub(crate) long_touch_fired: bool,
    pub(crate) end_touch_fired: bool,
}

impl Default for TouchSession {
    fn default() -> Self {
        Self {
            start_millis: 0,
            first_position: Point::zero(),
            last_position: Point::zero(),
            actual_position: Point::zero(),
            actual_raw: RawSample::default(),
            pressure: 0,
            active: false,
            started: false,
            // Nothing to report before the first press.
            long_touch_fired: true,
            end_touch_fired: true,
        }
    }
}

impl TouchSession {
    /// Begins a new touch at `now` from the current sample.
    pub(crate) fn begin(&mut self, now: u32) {
        self.active = true;
        self.started = true;
        self.start_millis = now;
        self.first_position = self.actual_position;
        self.last_position = self.actual_position;
        self.long_touch_fired = false;
        self.end_touch_fired = false;
    }

    pub(crate) fn take_started(&mut self) -> bool {
        core::mem::take(&mut self.started)
    }

    /// True exactly once per session.
    pub(crate) fn claim_long_touch(&mut self) -> bool {
        !core::mem::replace(&mut self.long_touch_fired, true)
    }

    /// True exactly once per session.
    pub(crate) fn claim_end_touch(&mut self) -> bool {
        !core::mem::replace(&mut self.end_touch_fired, true)
    }

    pub fn elapsed_ms(&self, now: u32) -> u32 {
        now.wrapping_sub(self.start_millis)
    }

    pub fn displacement(&self) -> Point {
        self.first_position - self.last_position
    }

    /// Euclidean distance between the first and last tracked position.
    pub fn swipe_amount(&self) -> f32 {
        let delta = self.displacement();
        let (dx, dy) = (delta.x as f32, delta.y as f32);
        libm::sqrtf(dx * dx + dy * dy)
    }
}
