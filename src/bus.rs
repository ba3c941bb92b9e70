use core::fmt::{Debug, Display};

use bitbang_hal::spi::{Error, Spi};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::hal::TouchBus;

impl<Miso, Mosi, Sck, Cs, Delay, E> TouchBus for Spi<Miso, Mosi, Sck, Cs, Delay>
where
    Miso: InputPin<Error = E>,
    Mosi: OutputPin<Error = E>,
    Sck: OutputPin<Error = E>,
    Cs: OutputPin<Error = E>,
    E: Debug + Display,
    Delay: DelayNs,
{
    type Error = Error<E>;

    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error> {
        Spi::exchange(self, byte)
    }

    fn select(&mut self) -> Result<(), Self::Error> {
        Spi::select(self)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        Spi::deselect(self)
    }

    fn speed(&self) -> u32 {
        self.clock_hz()
    }

    fn set_speed(&mut self, hz: u32) {
        self.set_clock_hz(hz);
    }
}
