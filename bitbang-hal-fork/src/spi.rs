//! Serial Peripheral Interface
//!
//! This implementation consumes the following hardware resources:
//! - Output GPIO pin for clock signal (SCLK)
//! - Output GPIO pin for data transmission (Master Output Slave Input - MOSI)
//! - Input GPIO pin for data reception (Master Input Slave Output - MISO)
//! - Output GPIO pin for chip select (CS), active low
//! - A `DelayNs` provider to pace the clock
//!
//! Every byte is a full-duplex exchange: a bit is put on MOSI and the reply bit
//! is sampled from MISO within the same clock cycle. Chip select is not
//! toggled per byte, the caller brackets a command sequence with
//! [`Spi::select`] and [`Spi::deselect`].
//!
//! The clock rate is adjustable at run time, so slow peripherals (ADCs) can
//! share the pins with faster ones.
//!
//! MSB-first and LSB-first bit orders are supported.
//!

use core::fmt::{self, Debug, Display};

pub use embedded_hal::spi::{MODE_0, MODE_1, MODE_2, MODE_3};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::{Mode, Phase, Polarity};

/// Error type
#[derive(Debug)]
pub enum Error<E: Debug + Display> {
    /// Communication error
    Bus(E),
    /// Attempted read without input data
    NoData,
}

impl<E: Debug + Display> core::error::Error for Error<E> {}

impl<E: Debug + Display> Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "Bus error: {}", e),
            Error::NoData => write!(f, "NoData error"),
        }
    }
}

/// Transmission bit order
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Most significant bit first
    #[default]
    MSBFirst,
    /// Least significant bit first
    LSBFirst,
}

/// Half a clock period is one delay, so this is the nanoseconds in half a second.
const HALF_PERIOD_NS_PER_HZ: u32 = 500_000_000;

/// A Full-Duplex SPI master, takes 4 pins and a delay provider.
pub struct Spi<Miso, Mosi, Sck, Cs, Delay>
where
    Miso: InputPin,
    Mosi: OutputPin,
    Sck: OutputPin,
    Cs: OutputPin,
    Delay: DelayNs,
{
    mode: Mode,
    miso: Miso,
    mosi: Mosi,
    sck: Sck,
    cs: Cs,
    delay: Delay,
    delay_ns: u32,
    read_val: Option<u8>,
    bit_order: BitOrder,
}

impl<Miso, Mosi, Sck, Cs, Delay, E> Spi<Miso, Mosi, Sck, Cs, Delay>
where
    Miso: InputPin<Error = E>,
    Mosi: OutputPin<Error = E>,
    Sck: OutputPin<Error = E>,
    Cs: OutputPin<Error = E>,
    E: Debug + Display,
    Delay: DelayNs,
{
    /// Create instance, parks the clock at its idle level and deselects the device.
    pub fn build(
        mode: Mode,
        miso: Miso,
        mosi: Mosi,
        sck: Sck,
        cs: Cs,
        delay: Delay,
    ) -> Result<Self, Error<E>> {
        let mut spi = Spi {
            mode,
            miso,
            mosi,
            sck,
            cs,
            delay,
            delay_ns: 0,
            read_val: None,
            bit_order: BitOrder::default(),
        };

        match mode.polarity {
            Polarity::IdleLow => spi.sck.set_low().map_err(Error::Bus)?,
            Polarity::IdleHigh => spi.sck.set_high().map_err(Error::Bus)?,
        }
        spi.cs.set_high().map_err(Error::Bus)?;

        Ok(spi)
    }

    /// `build`s with a pre-set `delay_ns`
    pub fn with_delay_ns(mut self, delay: u32) -> Self {
        self.delay_ns = delay;
        self
    }

    /// Set transmission bit order
    pub fn set_bit_order(&mut self, order: BitOrder) {
        self.bit_order = order;
    }

    /// Change the delay used by `wait_for_timer`
    pub fn set_delay_ns(&mut self, delay: u32) {
        self.delay_ns = delay;
    }

    pub fn delay_ns(&self) -> u32 {
        self.delay_ns
    }

    /// Effective clock rate in Hz. An unpaced clock reports `u32::MAX`.
    pub fn clock_hz(&self) -> u32 {
        if self.delay_ns == 0 {
            u32::MAX
        } else {
            HALF_PERIOD_NS_PER_HZ / self.delay_ns
        }
    }

    /// Paces the clock for roughly `hz`, rounding towards the slower side.
    pub fn set_clock_hz(&mut self, hz: u32) {
        self.delay_ns = if hz == u32::MAX {
            0
        } else {
            HALF_PERIOD_NS_PER_HZ.div_ceil(hz.max(1))
        };
    }

    /// Pulls chip select low and waits half a clock period.
    pub fn select(&mut self) -> Result<(), Error<E>> {
        self.cs.set_low().map_err(Error::Bus)?;
        self.wait_for_timer();
        Ok(())
    }

    /// Waits half a clock period and releases chip select.
    pub fn deselect(&mut self) -> Result<(), Error<E>> {
        self.wait_for_timer();
        self.cs.set_high().map_err(Error::Bus)
    }

    /// Shifts `byte` out while shifting the reply in.
    pub fn exchange(&mut self, byte: u8) -> Result<u8, Error<E>> {
        self.read_val = Some(0);

        for bit_offset in 0..8 {
            let out_bit = match self.bit_order {
                BitOrder::MSBFirst => (byte >> (7 - bit_offset)) & 0b1,
                BitOrder::LSBFirst => (byte >> bit_offset) & 0b1,
            };

            if out_bit == 1 {
                self.mosi.set_high().map_err(Error::Bus)?;
            } else {
                self.mosi.set_low().map_err(Error::Bus)?;
            }

            self.churn()?;
        }

        let reply = self.read_val.take().ok_or(Error::NoData)?;
        Ok(match self.bit_order {
            BitOrder::MSBFirst => reply,
            BitOrder::LSBFirst => reply.reverse_bits(),
        })
    }

    fn read_bit(&mut self) -> Result<(), Error<E>> {
        let is_miso_high = self.miso.is_high().map_err(Error::Bus)?;
        let shifted_value = self.read_val.unwrap_or(0) << 1;
        if is_miso_high {
            self.read_val = Some(shifted_value | 1);
        } else {
            self.read_val = Some(shifted_value);
        }
        Ok(())
    }

    fn churn(&mut self) -> Result<(), Error<E>> {
        match (self.mode.polarity, self.mode.phase) {
            (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => {
                self.wait_for_timer();
                self.set_clk_high()?;
                self.read_bit()?;
                self.wait_for_timer();
                self.set_clk_low()?;
            }
            (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => {
                self.set_clk_high()?;
                self.wait_for_timer();
                self.read_bit()?;
                self.set_clk_low()?;
                self.wait_for_timer();
            }
            (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => {
                self.wait_for_timer();
                self.set_clk_low()?;
                self.read_bit()?;
                self.wait_for_timer();
                self.set_clk_high()?;
            }
            (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => {
                self.set_clk_low()?;
                self.wait_for_timer();
                self.read_bit()?;
                self.set_clk_high()?;
                self.wait_for_timer();
            }
        }
        Ok(())
    }

    #[inline]
    fn set_clk_high(&mut self) -> Result<(), Error<E>> {
        self.sck.set_high().map_err(Error::Bus)
    }

    #[inline]
    fn set_clk_low(&mut self) -> Result<(), Error<E>> {
        self.sck.set_low().map_err(Error::Bus)
    }

    #[inline]
    fn wait_for_timer(&mut self) {
        self.delay.delay_ns(self.delay_ns);
    }
}
