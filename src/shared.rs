use core::cell::RefCell;

use critical_section::Mutex;

/// Global slot for a driver that is fed from interrupt and timer handlers.
///
/// ```ignore
/// static TOUCH: SharedTouch<Touch> = SharedTouch::new();
///
/// fn pen_irq_handler() {
///     TOUCH.with(|touch| touch.on_edge(&mut scheduler(), &mut delay()));
/// }
/// ```
pub struct SharedTouch<T>(Mutex<RefCell<Option<T>>>);

impl<T> SharedTouch<T> {
    pub const fn new() -> Self {
        Self(Mutex::new(RefCell::new(None)))
    }

    /// Moves `touch` in, handing back whatever was installed before.
    pub fn install(&self, touch: T) -> Option<T> {
        critical_section::with(|cs| self.0.borrow(cs).replace(Some(touch)))
    }

    pub fn take(&self) -> Option<T> {
        critical_section::with(|cs| self.0.borrow(cs).take())
    }

    /// Runs `f` inside a critical section, `None` while nothing is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.0.borrow(cs).borrow_mut().as_mut().map(f))
    }
}

impl<T> Default for SharedTouch<T> {
    fn default() -> Self {
        Self::new()
    }
}
