#![cfg_attr(not(test), no_std)]

//! Driver for the ADS7846 resistive touch screen controller.
//!
//! The driver turns the noisy, interrupt driven digitizer signal into
//! calibrated screen coordinates and a small set of touch lifecycle callbacks
//! (long touch, periodic/drag updates, end of touch with swipe distance).
//!
//! The platform owns the bus, the pen interrupt line, a one-shot timer service
//! and a small persistent store, and hands them to the driver through the
//! traits in [`hal`]. It forwards pen interrupt edges to [`Ads7846::on_edge`]
//! and elapsed timers to [`Ads7846::on_timer`].

mod ads7846;
mod bus;
mod callbacks;
pub mod calibration;
mod config;
mod errors;
pub mod hal;
mod session;
mod shared;

use embedded_graphics::prelude::Point;
use serde_derive::{Deserialize, Serialize};

pub use ads7846::{Ads7846, Channel, InputMode, Resolution};
pub use calibration::{
    wizard::{CalibrationWizard, WizardStep},
    Calibration, CalibrationError, CalibrationMatrix, CalibrationPointPair,
};
pub use callbacks::{CallbackRegistry, EndTouch, EndTouchFn, LongTouchFn, PeriodicFn, PressKind};
pub use config::TouchConfig;
pub use errors::{Error, Result};
pub use hal::{
    CalibrationStore, NoDebugPin, PenIrq, PolledPenIrq, Scheduler, TimerTask, TouchBus,
    DISABLE_TIMER_DELAY,
};
pub use session::TouchSession;
pub use shared::SharedTouch;

// Lineage:
// https://github.com/watterott/mSD-Shield (ADS7846 driver)
// and the XPT2046 driver this crate grew out of.

/// Unconverted ADC reading in controller units, before calibration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    pub x: u16,
    pub y: u16,
    pub pressure: u16,
}

impl RawSample {
    pub fn point(&self) -> Point {
        Point::new(self.x as i32, self.y as i32)
    }
}

/// Calibrated position in display pixels, clamped to the display size.
pub type TouchPosition = Point;
