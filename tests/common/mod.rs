#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    convert::Infallible,
    rc::Rc,
};

use ads7846::{
    Ads7846, CalibrationMatrix, EndTouch, PenIrq, PressKind, Scheduler, TimerTask, TouchBus,
    TouchConfig,
};
use embedded_graphics::prelude::Point;
use embedded_hal::{delay::DelayNs, digital::OutputPin};

pub const IDLE_SPEED_HZ: u32 = 8_000_000;

/// Raw readings for an on-screen position under [`SHIFT_MATRIX`].
pub fn raw12(position: Point) -> (u16, u16) {
    let raw_x = position.x + 1000;
    let raw_y = position.y + 1000;
    ((4048 - 2 * raw_x) as u16, (2 * raw_y) as u16)
}

/// `x = raw_x - 1000`, `y = raw_y - 1000`.
pub const SHIFT_MATRIX: CalibrationMatrix = CalibrationMatrix {
    a: 1,
    b: 0,
    c: -1000,
    d: 0,
    e: 1,
    f: -1000,
    div: 1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

/// What the panel and the ADC behind it currently report.
#[derive(Debug)]
pub struct PanelState {
    pub touching: bool,
    pub z1: u8,
    pub z2: u8,
    /// 12 bit readings, before inversion and scaling.
    pub x: u16,
    pub y: u16,
    pub temp: u16,
    /// Z1 reported by every reading after the first within one transfer.
    pub lifted_z1: Option<u8>,
    pub fail: bool,
    pub selected: bool,
    pub speed: u32,
    pub transfer_speed: u32,
    z1_reads: u32,
    pending: VecDeque<u8>,
    /// Scripted presses: each touch is held for `hold_reads` reads of the pen
    /// line, followed by as many released reads.
    pub touches: VecDeque<Point>,
    pub hold_reads: u32,
    irq_reads: u32,
    pub irq_enabled: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            touching: false,
            z1: 60,
            z2: 40,
            x: 2048,
            y: 2048,
            temp: 0,
            lifted_z1: None,
            fail: false,
            selected: false,
            speed: IDLE_SPEED_HZ,
            transfer_speed: 0,
            z1_reads: 0,
            pending: VecDeque::new(),
            touches: VecDeque::new(),
            hold_reads: 0,
            irq_reads: 0,
            irq_enabled: true,
        }
    }
}

impl PanelState {
    pub fn touch_at(&mut self, position: Point) {
        let (x, y) = raw12(position);
        self.touching = true;
        self.x = x;
        self.y = y;
    }

    fn respond(&mut self, command: u8) {
        let eight_bit = command & 0x08 != 0;
        let value = match (command >> 4) & 0x07 {
            0 => self.temp,
            1 => self.x,
            3 => {
                self.z1_reads += 1;
                let z1 = match self.lifted_z1 {
                    Some(lifted) if self.z1_reads > 1 => lifted,
                    _ => self.z1,
                };
                if self.touching {
                    u16::from(z1)
                } else {
                    0
                }
            }
            4 => {
                if self.touching {
                    u16::from(self.z2)
                } else {
                    127
                }
            }
            5 => self.y,
            _ => 0,
        };

        self.pending.clear();
        if eight_bit {
            self.pending.push_back(value as u8);
        } else {
            self.pending.push_back((value >> 5) as u8);
            self.pending.push_back(((value << 3) & 0xFF) as u8);
        }
    }

    fn read_pen_line(&mut self) -> bool {
        if self.hold_reads == 0 {
            return self.touching;
        }
        let was_pressed = self.touching;
        let pressed = !self.touches.is_empty() && (self.irq_reads / self.hold_reads) % 2 == 0;
        self.irq_reads += 1;

        if was_pressed && !pressed {
            self.touches.pop_front();
        }
        match self.touches.front().copied() {
            Some(position) if pressed => self.touch_at(position),
            _ => self.touching = false,
        }
        self.touching
    }
}

pub type Panel = Rc<RefCell<PanelState>>;

pub struct FakeChip(pub Panel);

impl TouchBus for FakeChip {
    type Error = BusFault;

    fn exchange(&mut self, byte: u8) -> Result<u8, BusFault> {
        let mut panel = self.0.borrow_mut();
        if panel.fail {
            return Err(BusFault);
        }
        assert!(panel.selected, "exchange without chip select");
        panel.transfer_speed = panel.speed;
        if byte & 0x80 != 0 {
            panel.respond(byte);
            return Ok(0);
        }
        Ok(panel.pending.pop_front().unwrap_or(0))
    }

    fn select(&mut self) -> Result<(), BusFault> {
        let mut panel = self.0.borrow_mut();
        if panel.fail {
            return Err(BusFault);
        }
        panel.selected = true;
        panel.z1_reads = 0;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), BusFault> {
        self.0.borrow_mut().selected = false;
        Ok(())
    }

    fn speed(&self) -> u32 {
        self.0.borrow().speed
    }

    fn set_speed(&mut self, hz: u32) {
        self.0.borrow_mut().speed = hz;
    }
}

pub struct FakeIrq(pub Panel);

impl PenIrq for FakeIrq {
    fn is_pressed(&mut self) -> bool {
        self.0.borrow_mut().read_pen_line()
    }

    fn disable(&mut self) {
        self.0.borrow_mut().irq_enabled = false;
    }

    fn clear_and_enable(&mut self) {
        self.0.borrow_mut().irq_enabled = true;
    }
}

#[derive(Debug, Default)]
pub struct FakeScheduler {
    pub now: u32,
    pub pending: Vec<(TimerTask, u32)>,
    pub cancelled: Vec<TimerTask>,
}

impl FakeScheduler {
    pub fn delay_of(&self, task: TimerTask) -> Option<u32> {
        self.pending
            .iter()
            .find(|(pending, _)| *pending == task)
            .map(|(_, delay)| *delay)
    }

    pub fn is_pending(&self, task: TimerTask) -> bool {
        self.delay_of(task).is_some()
    }
}

impl Scheduler for FakeScheduler {
    fn schedule_once(&mut self, task: TimerTask, delay_ms: u32) {
        self.pending.retain(|(pending, _)| *pending != task);
        self.pending.push((task, delay_ms));
    }

    fn cancel(&mut self, task: TimerTask) {
        self.pending.retain(|(pending, _)| *pending != task);
        self.cancelled.push(task);
    }

    fn now_millis(&self) -> u32 {
        self.now
    }
}

#[derive(Debug, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Counts rising edges.
#[derive(Debug, Default, Clone)]
pub struct CountingPin(pub Rc<Cell<u32>>, pub Rc<Cell<bool>>);

impl embedded_hal::digital::ErrorType for CountingPin {
    type Error = Infallible;
}

impl OutputPin for CountingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.1.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(self.0.get() + 1);
        self.1.set(true);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    LongTouch(Point, PressKind),
    Periodic(Point),
    End(EndTouch),
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

pub fn record_long_touch(first: Point, kind: PressKind) {
    EVENTS.with(|events| events.borrow_mut().push(Event::LongTouch(first, kind)));
}

pub fn record_periodic(position: Point) {
    EVENTS.with(|events| events.borrow_mut().push(Event::Periodic(position)));
}

pub fn record_end_touch(end: EndTouch) {
    EVENTS.with(|events| events.borrow_mut().push(Event::End(end)));
}

pub fn take_events() -> Vec<Event> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

pub type Touch = Ads7846<FakeChip, FakeIrq>;

/// Driver on a fresh panel with [`SHIFT_MATRIX`] installed.
pub fn setup() -> (Touch, Panel, FakeScheduler) {
    take_events();
    let panel = Panel::default();
    let mut touch = Ads7846::new(
        FakeChip(panel.clone()),
        FakeIrq(panel.clone()),
        TouchConfig::default(),
    );
    assert!(touch.install_calibration(SHIFT_MATRIX));
    (touch, panel, FakeScheduler::default())
}
