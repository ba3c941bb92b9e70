//! What the driver needs from the platform.

use core::{convert::Infallible, fmt::Debug};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Delay value understood by timer services that encode "cancel" as a delay.
pub const DISABLE_TIMER_DELAY: u32 = u32::MAX;

/// Byte-exchange bus wired to the touch controller.
pub trait TouchBus {
    type Error: Debug;

    /// One request/response exchange.
    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error>;
    fn select(&mut self) -> Result<(), Self::Error>;
    fn deselect(&mut self) -> Result<(), Self::Error>;
    /// Clock rate in Hz.
    fn speed(&self) -> u32;
    fn set_speed(&mut self, hz: u32);
}

/// The PENIRQ line. Asserted (low) while the panel is pressed.
pub trait PenIrq {
    fn is_pressed(&mut self) -> bool;
    /// Masks the edge interrupt. Bus exchanges retrigger the line.
    fn disable(&mut self);
    fn clear_and_enable(&mut self);
}

/// Adapts a plain input pin for boards that poll the line instead of taking
/// the edge interrupt. Masking is a no-op.
#[derive(Debug)]
pub struct PolledPenIrq<P>(pub P);

impl<P: InputPin> PenIrq for PolledPenIrq<P> {
    fn is_pressed(&mut self) -> bool {
        match self.0.is_low() {
            Ok(low) => low,
            Err(e) => {
                log::warn!("Failed to read pen interrupt line: {e:?}");
                false
            }
        }
    }

    fn disable(&mut self) {}

    fn clear_and_enable(&mut self) {}
}

/// Deferred work the driver asks the platform timer to run later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// Unmask the pen interrupt once the line settled after a read.
    EnablePenIrq,
    /// Re-sample while the panel is held.
    PeriodicSample,
    LongTouchTimeout,
}

/// One-shot timer service and millisecond clock.
///
/// When a task elapses the platform calls [`crate::Ads7846::on_timer`] with it.
pub trait Scheduler {
    /// Arms `task` after `delay_ms`, replacing a pending schedule of the same task.
    fn schedule_once(&mut self, task: TimerTask, delay_ms: u32);
    fn cancel(&mut self, task: TimerTask);
    fn now_millis(&self) -> u32;
}

/// Eight 32-bit slots that survive power loss, e.g. RTC backup registers.
pub trait CalibrationStore {
    fn read(&self, slot: usize) -> u32;
    fn write(&mut self, slot: usize, value: u32);
    /// Opens the write-access bracket.
    fn unlock(&mut self) {}
    fn lock(&mut self) {}
}

impl CalibrationStore for [u32; 8] {
    fn read(&self, slot: usize) -> u32 {
        self[slot]
    }

    fn write(&mut self, slot: usize, value: u32) {
        self[slot] = value;
    }
}

/// Stand-in for the optional diagnostic pin.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDebugPin;

impl ErrorType for NoDebugPin {
    type Error = Infallible;
}

impl OutputPin for NoDebugPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}
