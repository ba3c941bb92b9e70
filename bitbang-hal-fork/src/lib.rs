//! Bit-banged bus masters on top of `embedded-hal` 1.0 pins.
#![cfg_attr(not(test), no_std)]

pub mod spi;
