use core::fmt::Write as _;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyleBuilder},
    pixelcolor::Rgb565,
    prelude::*,
    text::{Baseline, Text},
};
use embedded_hal::{delay::DelayNs, digital::OutputPin};
use log::{info, warn};

use crate::{
    calibration::{
        wizard::{CalibrationWizard, WizardStep},
        Calibration, CalibrationError, CalibrationMatrix,
    },
    callbacks::{CallbackRegistry, EndTouchFn, LongTouchFn, PeriodicFn},
    config::TouchConfig,
    hal::{CalibrationStore, NoDebugPin, PenIrq, Scheduler, TimerTask, TouchBus},
    session::TouchSession,
    RawSample,
};

mod acquire;
mod lifecycle;

pub use acquire::{Channel, InputMode, Resolution};

/// Wait between the press edge and the calibration reading.
const CALIBRATION_SETTLE_MS: u32 = 10;
/// Calibration readings use this many times the configured oversampling.
const CALIBRATION_OVERSAMPLING_FACTOR: u8 = 4;
const RELEASE_POLL_MS: u32 = 5;

pub struct Ads7846<BUS, IRQ, DBG = NoDebugPin> {
    bus: BUS,
    irq: IRQ,
    debug_pin: DBG,
    config: TouchConfig,
    calibration: Calibration,
    session: TouchSession,
    callbacks: CallbackRegistry,
    periodic_period_ms: u32,
    /// Line level seen by the last edge, for [`Ads7846::poll_pen`].
    pen_down: bool,
}

impl<BUS, IRQ> Ads7846<BUS, IRQ>
where
    BUS: TouchBus,
    IRQ: PenIrq,
{
    /// Starts with the factory calibration, see [`Ads7846::init_calibration`].
    pub fn new(bus: BUS, irq: IRQ, config: TouchConfig) -> Self {
        Self {
            bus,
            irq,
            debug_pin: NoDebugPin,
            periodic_period_ms: config.swipe_resolution_ms,
            config,
            calibration: Calibration::default(),
            session: TouchSession::default(),
            callbacks: CallbackRegistry::default(),
            pen_down: false,
        }
    }
}

impl<BUS, IRQ, DBG> Ads7846<BUS, IRQ, DBG>
where
    BUS: TouchBus,
    IRQ: PenIrq,
    DBG: OutputPin,
{
    /// Drives `pin` high for the duration of every touch acquisition.
    pub fn with_debug_pin<P: OutputPin>(self, mut pin: P) -> Ads7846<BUS, IRQ, P> {
        _ = pin.set_low();
        Ads7846 {
            bus: self.bus,
            irq: self.irq,
            debug_pin: pin,
            config: self.config,
            calibration: self.calibration,
            session: self.session,
            callbacks: self.callbacks,
            periodic_period_ms: self.periodic_period_ms,
            pen_down: self.pen_down,
        }
    }

    pub fn release(self) -> (BUS, IRQ, DBG) {
        (self.bus, self.irq, self.debug_pin)
    }

    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    pub fn irq_mut(&mut self) -> &mut IRQ {
        &mut self.irq
    }

    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    pub fn session(&self) -> &TouchSession {
        &self.session
    }

    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Restores the persisted calibration, writing the factory matrix to a
    /// blank store.
    pub fn init_calibration<S: CalibrationStore>(&mut self, store: &mut S) {
        self.calibration = Calibration::restore(store);
    }

    pub fn calibration(&self) -> &CalibrationMatrix {
        self.calibration.matrix()
    }

    /// Derives a matrix from three target/raw pairs and installs it. On error
    /// the installed matrix stays untouched. Persisting is up to the caller.
    pub fn set_calibration(
        &mut self,
        targets: &[Point; 3],
        raws: &[Point; 3],
    ) -> Result<CalibrationMatrix, CalibrationError> {
        let matrix = CalibrationMatrix::derive(targets, raws)?;
        self.calibration.install(matrix);
        Ok(matrix)
    }

    /// Installs a ready matrix, refused when its divisor is zero.
    pub fn install_calibration(&mut self, matrix: CalibrationMatrix) -> bool {
        self.calibration.install(matrix)
    }

    /// Writes the installed matrix to `store`.
    pub fn persist_calibration<S: CalibrationStore>(&self, store: &mut S) -> crate::Result<(), BUS::Error> {
        self.calibration.matrix().persist(store)?;
        Ok(())
    }

    pub fn x_raw(&self) -> u16 {
        self.session.actual_raw.x
    }

    pub fn y_raw(&self) -> u16 {
        self.session.actual_raw.y
    }

    pub fn raw_sample(&self) -> RawSample {
        self.session.actual_raw
    }

    pub fn x_actual(&self) -> i32 {
        self.session.actual_position.x
    }

    pub fn y_actual(&self) -> i32 {
        self.session.actual_position.y
    }

    pub fn actual_position(&self) -> Point {
        self.session.actual_position
    }

    pub fn first_position(&self) -> Point {
        self.session.first_position
    }

    pub fn last_position(&self) -> Point {
        self.session.last_position
    }

    /// Pressure of the last sample, 0 when it found no touch.
    pub fn pressure(&self) -> u16 {
        self.session.pressure
    }

    pub fn is_touched(&self) -> bool {
        self.session.active
    }

    /// Distance between the first and last tracked position of the current or
    /// last touch. Only tracked while no periodic callback is registered.
    pub fn swipe_amount(&self) -> f32 {
        self.session.swipe_amount()
    }

    /// True once per press, for callers polling for new touches.
    pub fn consume_touch_started(&mut self) -> bool {
        self.session.take_started()
    }

    /// Registers, or clears with `None`, the long touch callback. A pending
    /// timeout is cancelled either way.
    pub fn register_long_touch<S: Scheduler>(
        &mut self,
        callback: Option<LongTouchFn>,
        timeout_ms: u32,
        scheduler: &mut S,
    ) {
        scheduler.cancel(TimerTask::LongTouchTimeout);
        self.callbacks.long_touch = callback.map(|cb| (cb, timeout_ms));
    }

    /// Registers, or clears with `None`, the periodic callback. During a touch
    /// the new period takes effect right away.
    pub fn register_periodic<S: Scheduler>(
        &mut self,
        callback: Option<PeriodicFn>,
        period_ms: u32,
        scheduler: &mut S,
    ) {
        self.callbacks.periodic = callback.map(|cb| (cb, period_ms));
        if let Some(period) = self
            .callbacks
            .sampling_period_ms(self.config.swipe_resolution_ms)
        {
            self.periodic_period_ms = period;
            if self.session.active {
                scheduler.schedule_once(TimerTask::PeriodicSample, period);
            }
        } else if self.session.active {
            scheduler.cancel(TimerTask::PeriodicSample);
        }
    }

    pub fn register_end_touch(&mut self, callback: Option<EndTouchFn>) {
        self.callbacks.end_touch = callback;
    }

    /// Changes the re-sampling period, applied when the timer is next armed.
    pub fn set_periodic_period(&mut self, period_ms: u32) {
        self.periodic_period_ms = period_ms;
        if let Some((_, period)) = self.callbacks.periodic.as_mut() {
            *period = period_ms;
        }
    }

    /// Writes `X:<x>|<raw x> Y:<y>|<raw y> P:<pressure>` at `origin`.
    pub fn draw_touch_data<DT>(&self, dt: &mut DT, origin: Point, color: Rgb565, background: Rgb565)
    where
        DT: DrawTarget<Color = Rgb565>,
    {
        let session = &self.session;
        let mut text: heapless::String<48> = heapless::String::new();
        _ = write!(
            text,
            "X:{:03}|{:04} Y:{:03}|{:04} P:{:03}",
            session.actual_position.x,
            session.actual_raw.x,
            session.actual_position.y,
            session.actual_raw.y,
            session.pressure
        );

        let style = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(color)
            .background_color(background)
            .build();
        _ = Text::with_baseline(&text, origin, style, Baseline::Top).draw(dt);
    }

    /// Walks the user through the three calibration targets, installs and
    /// persists the result. Blocks until a usable set of points was collected.
    pub fn run_calibration_wizard<DT, S, D, ST>(
        &mut self,
        dt: &mut DT,
        scheduler: &mut S,
        delay: &mut D,
        store: &mut ST,
    ) -> CalibrationMatrix
    where
        DT: DrawTarget<Color = Rgb565>,
        S: Scheduler,
        D: DelayNs,
        ST: CalibrationStore,
    {
        let mut wizard = CalibrationWizard::new(self.config.targets());
        loop {
            wizard.draw_prompt(dt);
            let raw = self.wait_for_calibration_press(scheduler, delay);
            wizard.draw_captured(dt);

            if let WizardStep::Done(matrix) = wizard.capture(raw.point()) {
                self.calibration.install(matrix);
                if let Err(e) = matrix.persist(store) {
                    warn!("Failed to persist calibration: {e}");
                }
                info!("Touch calibrated: {matrix:?}");
                _ = dt.clear(Rgb565::WHITE);
                return matrix;
            }
            self.wait_for_release(scheduler, delay);
        }
    }

    fn wait_for_calibration_press<S: Scheduler, D: DelayNs>(
        &mut self,
        scheduler: &mut S,
        delay: &mut D,
    ) -> RawSample {
        let oversampling = self
            .config
            .oversampling
            .saturating_mul(CALIBRATION_OVERSAMPLING_FACTOR);
        loop {
            self.poll_pen(scheduler, delay);
            if self.consume_touch_started() {
                delay.delay_ms(CALIBRATION_SETTLE_MS);
                if self.sample(oversampling, scheduler) {
                    return self.session.actual_raw;
                }
            }
            delay.delay_ms(RELEASE_POLL_MS);
        }
    }

    fn wait_for_release<S: Scheduler, D: DelayNs>(&mut self, scheduler: &mut S, delay: &mut D) {
        while self.irq.is_pressed() {
            delay.delay_ms(RELEASE_POLL_MS);
        }
        self.poll_pen(scheduler, delay);
    }
}
