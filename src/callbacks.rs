use embedded_graphics::prelude::Point;

/// Whether a press ended before or after the long touch timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

/// Reported once when a touch ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndTouch {
    pub duration_ms: u32,
    /// First position minus last tracked position.
    pub delta: Point,
}

pub type LongTouchFn = fn(first: Point, kind: PressKind);
pub type PeriodicFn = fn(position: Point);
pub type EndTouchFn = fn(end: EndTouch);

/// User callbacks and their timing. Absent callbacks are no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackRegistry {
    pub(crate) long_touch: Option<(LongTouchFn, u32)>,
    pub(crate) periodic: Option<(PeriodicFn, u32)>,
    pub(crate) end_touch: Option<EndTouchFn>,
}

impl CallbackRegistry {
    pub fn long_touch_timeout_ms(&self) -> Option<u32> {
        self.long_touch.map(|(_, timeout)| timeout)
    }

    pub fn periodic_period_ms(&self) -> Option<u32> {
        self.periodic.map(|(_, period)| period)
    }

    pub fn has_end_touch(&self) -> bool {
        self.end_touch.is_some()
    }

    /// Swipe distance is only tracked when nobody else consumes the periodic ticks.
    pub fn tracks_swipe(&self) -> bool {
        self.periodic.is_none()
    }

    /// Period of the re-sampling schedule armed on press, if any is needed.
    pub(crate) fn sampling_period_ms(&self, swipe_resolution_ms: u32) -> Option<u32> {
        match (self.periodic, self.end_touch) {
            (Some((_, period)), _) => Some(period),
            (None, Some(_)) => Some(swipe_resolution_ms),
            (None, None) => None,
        }
    }
}
