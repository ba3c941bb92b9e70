//! Three point calibration on the display.
//!
//! The wizard only does the drawing and bookkeeping. Whoever owns the driver
//! feeds it raw samples taken on fresh presses, see
//! [`crate::Ads7846::run_calibration_wizard`] for the blocking variant.

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Circle, PrimitiveStyle},
    text::{Alignment, Text},
};

use super::{CalibrationError, CalibrationMatrix};

const PROMPT: &str = "Touch the red circle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    /// Point `n` was recorded, the next one is due.
    Captured(usize),
    /// The points did not fit, collection starts over from the first target.
    Restart(CalibrationError),
    Done(CalibrationMatrix),
}

#[derive(Debug, Clone)]
pub struct CalibrationWizard {
    targets: [Point; 3],
    raws: [Point; 3],
    index: usize,
}

impl CalibrationWizard {
    pub fn new(targets: [Point; 3]) -> Self {
        Self {
            targets,
            raws: [Point::zero(); 3],
            index: 0,
        }
    }

    /// Target currently waiting for a press, `None` once all three are in.
    pub fn current_target(&self) -> Option<Point> {
        self.targets.get(self.index).copied()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn restart(&mut self) {
        self.index = 0;
    }

    /// Clears the screen and draws the prompt and the current target.
    pub fn draw_prompt<DT>(&self, dt: &mut DT)
    where
        DT: DrawTarget<Color = Rgb565>,
    {
        _ = dt.clear(Rgb565::WHITE);

        let center = dt.bounding_box().center();
        let style = MonoTextStyle::new(&FONT_6X10, Rgb565::BLACK);
        _ = Text::with_alignment(PROMPT, center, style, Alignment::Center).draw(dt);

        if let Some(target) = self.current_target() {
            draw_ring(dt, target, 2, Rgb565::BLACK);
            draw_ring(dt, target, 5, Rgb565::BLACK);
            draw_ring(dt, target, 10, Rgb565::RED);
        }
    }

    /// Marks the current target as pressed.
    pub fn draw_captured<DT>(&self, dt: &mut DT)
    where
        DT: DrawTarget<Color = Rgb565>,
    {
        if let Some(target) = self.current_target() {
            _ = Circle::with_center(target, diameter(2))
                .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
                .draw(dt);
        }
    }

    /// Records the raw reading for the current target.
    pub fn capture(&mut self, raw: Point) -> WizardStep {
        let Some(slot) = self.raws.get_mut(self.index) else {
            self.index = 0;
            return WizardStep::Restart(CalibrationError::InvalidGeometry);
        };
        *slot = raw;
        self.index += 1;

        if self.index < self.targets.len() {
            return WizardStep::Captured(self.index - 1);
        }

        match CalibrationMatrix::derive(&self.targets, &self.raws) {
            Ok(matrix) => WizardStep::Done(matrix),
            Err(e) => {
                log::warn!("Calibration points rejected ({e}), starting over");
                self.index = 0;
                WizardStep::Restart(e)
            }
        }
    }
}

fn diameter(radius: u32) -> u32 {
    radius * 2 + 1
}

fn draw_ring<DT>(dt: &mut DT, center: Point, radius: u32, color: Rgb565)
where
    DT: DrawTarget<Color = Rgb565>,
{
    _ = Circle::with_center(center, diameter(radius))
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(dt);
}
