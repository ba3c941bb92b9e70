//! Touch lifecycle: press, tracking ticks, long touch timeout and release.
//!
//! Everything runs from the two entry points the platform forwards to,
//! [`Ads7846::on_edge`] for pen interrupt edges and [`Ads7846::on_timer`] for
//! elapsed timers. Long touch and end touch callbacks fire at most once per
//! touch, whichever path ends it first.

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use log::{debug, trace};

use super::Ads7846;
use crate::{
    callbacks::{EndTouch, PressKind},
    hal::{PenIrq, Scheduler, TimerTask, TouchBus},
};

impl<BUS, IRQ, DBG> Ads7846<BUS, IRQ, DBG>
where
    BUS: TouchBus,
    IRQ: PenIrq,
    DBG: OutputPin,
{
    /// Handles a pen interrupt edge. Waits out the contact bounce, then
    /// starts or ends a touch depending on the settled line level.
    pub fn on_edge<S: Scheduler, D: DelayNs>(&mut self, scheduler: &mut S, delay: &mut D) {
        delay.delay_ms(self.config.debounce_ms);
        self.pen_down = self.irq.is_pressed();

        if self.pen_down {
            self.press(scheduler);
        } else {
            trace!("Pen released");
            self.finish_touch(scheduler);
        }
    }

    /// Dispatches an elapsed timer.
    pub fn on_timer<S: Scheduler>(&mut self, task: TimerTask, scheduler: &mut S) {
        match task {
            TimerTask::EnablePenIrq => self.irq.clear_and_enable(),
            TimerTask::PeriodicSample => self.on_tick(scheduler),
            TimerTask::LongTouchTimeout => self.on_long_touch_timeout(),
        }
    }

    /// Edge detection for platforms without a pen interrupt. Call regularly,
    /// returns whether a touch is active.
    pub fn poll_pen<S: Scheduler, D: DelayNs>(&mut self, scheduler: &mut S, delay: &mut D) -> bool {
        if self.irq.is_pressed() != self.pen_down {
            self.on_edge(scheduler, delay);
        }
        self.session.active
    }

    fn press<S: Scheduler>(&mut self, scheduler: &mut S) {
        if !self.sample(self.config.oversampling, scheduler) {
            trace!("Press edge without a usable sample");
            return;
        }

        self.session.begin(scheduler.now_millis());
        debug!("Touch started at {:?}", self.session.first_position);

        if let Some(period) = self
            .callbacks
            .sampling_period_ms(self.config.swipe_resolution_ms)
        {
            self.periodic_period_ms = period;
            scheduler.schedule_once(TimerTask::PeriodicSample, period);
        }
        if let Some(timeout) = self.callbacks.long_touch_timeout_ms() {
            scheduler.schedule_once(TimerTask::LongTouchTimeout, timeout);
        }
    }

    /// Periodic re-sample. Feeds the periodic callback or the swipe tracking
    /// while the panel is held, ends the touch once it is not.
    pub fn on_tick<S: Scheduler>(&mut self, scheduler: &mut S) {
        if !self.sample(self.config.oversampling, scheduler) {
            self.finish_touch(scheduler);
            return;
        }

        let position = self.session.actual_position;
        match self.callbacks.periodic {
            Some((callback, _)) => callback(position),
            None => self.session.last_position = position,
        }
        scheduler.schedule_once(TimerTask::PeriodicSample, self.periodic_period_ms);
    }

    pub fn on_long_touch_timeout(&mut self) {
        if let Some((callback, _)) = self.callbacks.long_touch {
            if self.session.claim_long_touch() {
                debug!("Long touch at {:?}", self.session.first_position);
                callback(self.session.first_position, PressKind::Long);
            }
        }
    }

    fn finish_touch<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.session.active = false;
        scheduler.cancel(TimerTask::PeriodicSample);
        scheduler.cancel(TimerTask::LongTouchTimeout);

        if let Some((callback, _)) = self.callbacks.long_touch {
            if self.session.claim_long_touch() {
                callback(self.session.first_position, PressKind::Short);
            }
        }

        if let Some(callback) = self.callbacks.end_touch {
            if self.session.claim_end_touch() {
                let end = EndTouch {
                    duration_ms: self.session.elapsed_ms(scheduler.now_millis()),
                    delta: self.session.displacement(),
                };
                debug!("Touch ended after {} ms", end.duration_ms);
                callback(end);
            }
        }
    }
}
