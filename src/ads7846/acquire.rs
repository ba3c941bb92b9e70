use embedded_hal::digital::OutputPin;
use log::{debug, trace, warn};

use super::Ads7846;
use crate::{
    config::TouchConfig,
    errors::{Error, Result},
    hal::{PenIrq, Scheduler, TimerTask, TouchBus},
    RawSample,
};

// Control byte: S A2 A1 A0 MODE SER/DFR PD1 PD0
const CMD_START: u8 = 0x80;
const CMD_8BIT: u8 = 0x08;
const CMD_12BIT: u8 = 0x00;
const CMD_SINGLE: u8 = 0x04;
const CMD_DIFF: u8 = 0x00;
const CHANNEL_MASK: u8 = 0x70;

/// Largest reading of the Z2 channel in 8 bit mode.
const Z2_MAX: u8 = 127;

/// ADS7846 input multiplexer channels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::VariantArray,
)]
pub enum Channel {
    #[strum(to_string = "Z Pos 1")]
    Z1,
    #[strum(to_string = "Z Pos 2")]
    Z2,
    #[strum(to_string = "X Pos")]
    X,
    #[strum(to_string = "Y Pos")]
    Y,
    #[strum(to_string = "Temp. 0")]
    Temp0,
    #[strum(to_string = "Temp. 1")]
    Temp1,
    #[strum(to_string = "VCC")]
    Vcc,
    #[strum(to_string = "Aux In")]
    Aux,
}

impl Channel {
    /// A2..A0 address.
    pub fn address(self) -> u8 {
        match self {
            Channel::Temp0 => 0,
            Channel::X => 1,
            Channel::Vcc => 2,
            Channel::Z1 => 3,
            Channel::Z2 => 4,
            Channel::Y => 5,
            Channel::Aux => 6,
            Channel::Temp1 => 7,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Channel::Z1 => 'z',
            Channel::Z2 => 'Z',
            Channel::X => 'X',
            Channel::Y => 'Y',
            Channel::Temp0 => 't',
            Channel::Temp1 => 'T',
            Channel::Vcc => 'V',
            Channel::Aux => 'A',
        }
    }

    pub fn command(self, resolution: Resolution, mode: InputMode) -> u8 {
        let resolution = match resolution {
            Resolution::Bits8 => CMD_8BIT,
            Resolution::Bits12 => CMD_12BIT,
        };
        let mode = match mode {
            InputMode::SingleEnded => CMD_SINGLE,
            InputMode::Differential => CMD_DIFF,
        };
        CMD_START | resolution | mode | ((self.address() << 4) & CHANNEL_MASK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Bits8,
    Bits12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    SingleEnded,
    Differential,
}

/// Holds chip select and the slow ADC clock for its lifetime, restores the
/// previous clock rate on every exit path.
struct BusGuard<'a, B: TouchBus> {
    bus: &'a mut B,
    saved_speed: u32,
}

impl<'a, B: TouchBus> BusGuard<'a, B> {
    fn open(bus: &'a mut B, speed_hz: u32) -> ::core::result::Result<Self, B::Error> {
        let saved_speed = bus.speed();
        bus.set_speed(speed_hz);
        let mut guard = Self { bus, saved_speed };
        guard.bus.select()?;
        Ok(guard)
    }

    fn read8(&mut self, command: u8) -> ::core::result::Result<u8, B::Error> {
        self.bus.exchange(command)?;
        self.bus.exchange(0)
    }

    fn read12(&mut self, command: u8) -> ::core::result::Result<u16, B::Error> {
        self.bus.exchange(command)?;
        let high = self.bus.exchange(0)?;
        let low = self.bus.exchange(0)?;
        Ok((u16::from(high) << 5) | (u16::from(low) >> 3))
    }

    /// `Z1 + (127 - Z2)`, grows with contact pressure.
    fn read_pressure(&mut self) -> ::core::result::Result<u16, B::Error> {
        let z1 = self.read8(Channel::Z1.command(Resolution::Bits8, InputMode::Differential))?;
        let z2 = self.read8(Channel::Z2.command(Resolution::Bits8, InputMode::Differential))?;
        Ok(u16::from(z1) + u16::from(Z2_MAX.saturating_sub(z2)))
    }

    /// Averages `count` X/Y pairs. `None` as soon as one reading looks like
    /// an open circuit, the pairs gathered so far are dropped.
    fn integrate_position(
        &mut self,
        config: &TouchConfig,
        count: u8,
    ) -> ::core::result::Result<Option<(u16, u16)>, B::Error> {
        let x_command = Channel::X.command(Resolution::Bits12, InputMode::Differential);
        let y_command = Channel::Y.command(Resolution::Bits12, InputMode::Differential);
        let (mut sum_x, mut sum_y) = (0u32, 0u32);

        for _ in 0..count {
            let x = self.read12(x_command)?;
            if x >= config.max_raw_x {
                trace!("Implausible X reading {x}");
                return Ok(None);
            }
            let y = self.read12(y_command)?;
            if y <= config.min_raw_y {
                trace!("Implausible Y reading {y}");
                return Ok(None);
            }
            sum_x += u32::from(config.x_inversion_base.saturating_sub(x));
            sum_y += u32::from(y);
        }

        // Halved to 11 bits, the calibration matrix is fitted on that range.
        let divisor = 2 * u32::from(count);
        Ok(Some(((sum_x / divisor) as u16, (sum_y / divisor) as u16)))
    }
}

impl<B: TouchBus> Drop for BusGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.bus.deselect() {
            warn!("Failed to deselect touch controller: {e:?}");
        }
        self.bus.set_speed(self.saved_speed);
    }
}

impl<BUS, IRQ, DBG> Ads7846<BUS, IRQ, DBG>
where
    BUS: TouchBus,
    IRQ: PenIrq,
    DBG: OutputPin,
{
    /// Masks the pen interrupt and has the timer unmask it after `ms`.
    fn mask_pen_irq<S: Scheduler>(&mut self, scheduler: &mut S, ms: u32) {
        scheduler.schedule_once(TimerTask::EnablePenIrq, ms);
        self.irq.disable();
    }

    /// Reads any channel, averaged over `oversampling` conversions.
    pub fn read_channel<S: Scheduler>(
        &mut self,
        channel: Channel,
        resolution: Resolution,
        mode: InputMode,
        oversampling: u8,
        scheduler: &mut S,
    ) -> Result<u16, BUS::Error> {
        let count = oversampling.max(1);
        self.mask_pen_irq(scheduler, self.config.irq_settle_ms);

        let command = channel.command(resolution, mode);
        let mut bus = BusGuard::open(&mut self.bus, self.config.bus_speed_hz).map_err(Error::Bus)?;
        let mut sum = 0u32;
        for _ in 0..count {
            sum += match resolution {
                Resolution::Bits12 => bus.read12(command),
                Resolution::Bits8 => bus.read8(command).map(u16::from),
            }
            .map_err(Error::Bus)? as u32;
        }
        Ok((sum / u32::from(count)) as u16)
    }

    /// One oversampled touch acquisition, `None` when nothing plausible touches
    /// the panel.
    ///
    /// The pressure is read before and after the X/Y readings. A touch that
    /// lifted in between loses pressure and is rejected.
    pub fn acquire_touch_sample<S: Scheduler>(
        &mut self,
        oversampling: u8,
        scheduler: &mut S,
    ) -> Result<Option<RawSample>, BUS::Error> {
        let count = oversampling.max(1);
        self.mask_pen_irq(scheduler, self.config.irq_mask_ms(count));

        _ = self.debug_pin.set_high();
        let sample = self.acquire_on_bus(count);
        _ = self.debug_pin.set_low();

        sample.map_err(Error::Bus)
    }

    fn acquire_on_bus(&mut self, count: u8) -> ::core::result::Result<Option<RawSample>, BUS::Error> {
        let config = &self.config;
        let mut bus = BusGuard::open(&mut self.bus, config.bus_speed_hz)?;

        let pressure = bus.read_pressure()?;
        if pressure < config.min_pressure {
            trace!("Pressure {pressure} below {}", config.min_pressure);
            return Ok(None);
        }

        let Some((x, y)) = bus.integrate_position(config, count)? else {
            return Ok(None);
        };

        let retained = bus.read_pressure()?;
        if retained < config.retained_pressure(pressure) {
            debug!("Touch lifted during acquisition ({pressure} -> {retained})");
            return Ok(None);
        }
        if x < config.noise_floor || y < config.noise_floor {
            trace!("Sample ({x}, {y}) below noise floor");
            return Ok(None);
        }

        Ok(Some(RawSample { x, y, pressure }))
    }

    /// Acquires into the session. Bus faults count as no touch.
    pub(super) fn sample<S: Scheduler>(&mut self, oversampling: u8, scheduler: &mut S) -> bool {
        self.session.pressure = 0;
        self.session.active = false;

        match self.acquire_touch_sample(oversampling, scheduler) {
            Ok(Some(raw)) => {
                self.session.actual_raw = raw;
                self.session.actual_position = self.calibration.apply(&raw, self.config.size());
                self.session.pressure = raw.pressure;
                self.session.active = true;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Touch acquisition failed: {e}");
                false
            }
        }
    }
}
