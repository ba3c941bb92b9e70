use embedded_graphics::prelude::{Point, Size};
use serde_derive::{Deserialize, Serialize};

/// Reference points shown by the calibration wizard, in display space.
pub const CALIBRATION_TARGETS: [Point; 3] =
    [Point::new(20, 20), Point::new(300, 120), Point::new(160, 220)];

/// Chip and panel constants. The defaults match the HY32D 320x240 panel with
/// an ADS7846 digitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub width: u16,
    pub height: u16,
    /// Readings averaged per acquired sample.
    pub oversampling: u8,
    /// Pressure proxy below this is no touch at all.
    pub min_pressure: u16,
    /// An X reading at or above this is an open circuit.
    pub max_raw_x: u16,
    /// A Y reading at or below this is an open circuit.
    pub min_raw_y: u16,
    /// X runs right to left on the panel, samples are taken as `base - x`.
    pub x_inversion_base: u16,
    /// Averaged X and Y must both reach this.
    pub noise_floor: u16,
    /// Second pressure reading must keep `numerator / denominator` of the first.
    pub pressure_retention: (u8, u8),
    /// Clock rate used while talking to the ADC.
    pub bus_speed_hz: u32,
    pub debounce_ms: u32,
    /// Pen interrupt stays masked this long after a read.
    pub irq_settle_ms: u32,
    /// Re-sampling period used for swipe tracking.
    pub swipe_resolution_ms: u32,
    pub calibration_targets: [(i32, i32); 3],
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            oversampling: 4,
            min_pressure: 9,
            max_raw_x: 4000,
            min_raw_y: 100,
            x_inversion_base: 4048,
            noise_floor: 10,
            pressure_retention: (7, 8),
            bus_speed_hz: 125_000,
            debounce_ms: 10,
            irq_settle_ms: 5,
            swipe_resolution_ms: 20,
            calibration_targets: CALIBRATION_TARGETS.map(|p| (p.x, p.y)),
        }
    }
}

impl TouchConfig {
    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_oversampling(mut self, oversampling: u8) -> Self {
        self.oversampling = oversampling.max(1);
        self
    }

    pub fn with_min_pressure(mut self, min_pressure: u16) -> Self {
        self.min_pressure = min_pressure;
        self
    }

    pub fn with_calibration_targets(mut self, targets: [Point; 3]) -> Self {
        self.calibration_targets = targets.map(|p| (p.x, p.y));
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width.into(), self.height.into())
    }

    pub fn targets(&self) -> [Point; 3] {
        self.calibration_targets.map(|(x, y)| Point::new(x, y))
    }

    /// How long the pen interrupt stays masked after an acquisition. Every bus
    /// exchange can retrigger the line, so the window grows with oversampling.
    pub fn irq_mask_ms(&self, oversampling: u8) -> u32 {
        (u32::from(oversampling) / 16 + 1) * self.irq_settle_ms
    }

    /// Lowest second pressure reading that still counts as the same touch.
    pub fn retained_pressure(&self, first: u16) -> u16 {
        let (numerator, denominator) = self.pressure_retention;
        let denominator = u32::from(denominator.max(1));
        let lost = denominator.saturating_sub(u32::from(numerator));
        first - (u32::from(first) * lost / denominator) as u16
    }
}
