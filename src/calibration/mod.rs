use embedded_graphics::prelude::{Point, Size};
use serde_derive::{Deserialize, Serialize};

use crate::{hal::CalibrationStore, RawSample};

pub mod wizard;

// Three point affine fit as used by the mSD-Shield ADS7846 driver, see also
// https://github.com/ardnew/XPT2046_Calibrated/blob/8d3f8b518b617b6fbc870ef3229b27aa83028c56/src/XPT2046_Calibrated.cpp

/// Tag in slot 0 marking the remaining slots as a valid matrix.
pub const CALIBRATION_MAGIC: u32 = 0x5A5A5A5A;
pub const CALIBRATION_SLOTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationError {
    #[error("calibration points are collinear or repeated")]
    InvalidGeometry,
    #[error("calibration coefficients do not fit 32 bits")]
    CoefficientOverflow,
    #[error("matrix has a zero divisor")]
    InvalidMatrix,
}

/// A reference point on the display and the raw reading taken while it was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationPointPair {
    pub target: Point,
    pub raw: Point,
}

/// `x = (a*rx + b*ry + c) / div`, `y = (d*rx + e*ry + f) / div`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationMatrix {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
    pub e: i32,
    pub f: i32,
    pub div: i32,
}

impl Default for CalibrationMatrix {
    fn default() -> Self {
        Self::FACTORY
    }
}

impl CalibrationMatrix {
    /// Used until the panel has been calibrated, e.g. when the backup battery is empty.
    pub const FACTORY: Self = Self {
        a: 320300,
        b: -1400,
        c: -52443300,
        d: -3500,
        e: 237700,
        f: -21783300,
        div: 1857905,
    };

    pub fn is_valid(&self) -> bool {
        self.div != 0
    }

    /// Fits the matrix mapping each raw point onto its target.
    pub fn derive(targets: &[Point; 3], raws: &[Point; 3]) -> Result<Self, CalibrationError> {
        let [t0, t1, t2] = targets.map(|p| (i64::from(p.x), i64::from(p.y)));
        let [r0, r1, r2] = raws.map(|p| (i64::from(p.x), i64::from(p.y)));

        let div = (r0.0 - r2.0) * (r1.1 - r2.1) - (r1.0 - r2.0) * (r0.1 - r2.1);
        if div == 0 {
            return Err(CalibrationError::InvalidGeometry);
        }

        let a = (t0.0 - t2.0) * (r1.1 - r2.1) - (t1.0 - t2.0) * (r0.1 - r2.1);
        let b = (r0.0 - r2.0) * (t1.0 - t2.0) - (t0.0 - t2.0) * (r1.0 - r2.0);
        let c = (r2.0 * t1.0 - r1.0 * t2.0) * r0.1
            + (r0.0 * t2.0 - r2.0 * t0.0) * r1.1
            + (r1.0 * t0.0 - r0.0 * t1.0) * r2.1;

        let d = (t0.1 - t2.1) * (r1.1 - r2.1) - (t1.1 - t2.1) * (r0.1 - r2.1);
        let e = (r0.0 - r2.0) * (t1.1 - t2.1) - (t0.1 - t2.1) * (r1.0 - r2.0);
        let f = (r2.0 * t1.1 - r1.0 * t2.1) * r0.1
            + (r0.0 * t2.1 - r2.0 * t0.1) * r1.1
            + (r1.0 * t0.1 - r0.0 * t1.1) * r2.1;

        // The store keeps 32 bit slots, trade precision for range.
        let mut coefficients = [a, b, c, d, e, f, div];
        while coefficients.iter().any(|v| i32::try_from(*v).is_err()) {
            coefficients.iter_mut().for_each(|v| *v /= 2);
        }
        let [a, b, c, d, e, f, div] = coefficients.map(|v| v as i32);
        if div == 0 {
            return Err(CalibrationError::CoefficientOverflow);
        }

        Ok(Self { a, b, c, d, e, f, div })
    }

    pub fn from_pairs(pairs: &[CalibrationPointPair; 3]) -> Result<Self, CalibrationError> {
        Self::derive(&pairs.map(|p| p.target), &pairs.map(|p| p.raw))
    }

    fn x(&self, raw: Point) -> i64 {
        (i64::from(self.a) * i64::from(raw.x) + i64::from(self.b) * i64::from(raw.y) + i64::from(self.c))
            / i64::from(self.div)
    }

    fn y(&self, raw: Point) -> i64 {
        (i64::from(self.d) * i64::from(raw.x) + i64::from(self.e) * i64::from(raw.y) + i64::from(self.f))
            / i64::from(self.div)
    }

    /// Unclamped display coordinates, `None` for a matrix with a zero divisor.
    pub fn transform(&self, raw: Point) -> Option<Point> {
        if !self.is_valid() {
            return None;
        }
        Some(Point::new(
            clamp_i32(self.x(raw)),
            clamp_i32(self.y(raw)),
        ))
    }

    /// Writes the matrix, tag last, so an interrupted write reads back as absent.
    pub fn persist<S: CalibrationStore>(&self, store: &mut S) -> Result<(), CalibrationError> {
        if !self.is_valid() {
            return Err(CalibrationError::InvalidMatrix);
        }
        store.unlock();
        store.write(0, 0);
        for (slot, value) in self.slots().into_iter().enumerate() {
            store.write(slot + 1, value as u32);
        }
        store.write(0, CALIBRATION_MAGIC);
        store.lock();
        Ok(())
    }

    /// `None` unless the tag matches and the stored divisor is usable.
    pub fn load<S: CalibrationStore>(store: &S) -> Option<Self> {
        if store.read(0) != CALIBRATION_MAGIC {
            return None;
        }
        let slot = |i: usize| store.read(i) as i32;
        let matrix = Self {
            a: slot(1),
            b: slot(2),
            c: slot(3),
            d: slot(4),
            e: slot(5),
            f: slot(6),
            div: slot(7),
        };
        matrix.is_valid().then_some(matrix)
    }

    fn slots(&self) -> [i32; CALIBRATION_SLOTS - 1] {
        [self.a, self.b, self.c, self.d, self.e, self.f, self.div]
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn clamp_axis(v: i64, len: u32) -> i32 {
    v.clamp(0, i64::from(len.max(1)) - 1) as i32
}

/// Installed matrix plus a per axis memo of the last conversion.
#[derive(Debug, Clone)]
pub struct Calibration {
    matrix: CalibrationMatrix,
    last_raw_x: Option<u16>,
    last_raw_y: Option<u16>,
    position: Point,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(CalibrationMatrix::FACTORY)
    }
}

impl Calibration {
    /// Falls back to the factory matrix for a matrix with a zero divisor.
    pub fn new(matrix: CalibrationMatrix) -> Self {
        let mut calibration = Self {
            matrix: CalibrationMatrix::FACTORY,
            last_raw_x: None,
            last_raw_y: None,
            position: Point::zero(),
        };
        calibration.install(matrix);
        calibration
    }

    /// Restores the persisted matrix, or installs and persists the factory one.
    pub fn restore<S: CalibrationStore>(store: &mut S) -> Self {
        match CalibrationMatrix::load(store) {
            Some(matrix) => {
                log::info!("Restored touch calibration {matrix:?}");
                Self::new(matrix)
            }
            None => {
                log::info!("No touch calibration stored, using factory matrix");
                let matrix = CalibrationMatrix::FACTORY;
                if let Err(e) = matrix.persist(store) {
                    log::warn!("Failed to persist factory calibration: {e}");
                }
                Self::new(matrix)
            }
        }
    }

    pub fn matrix(&self) -> &CalibrationMatrix {
        &self.matrix
    }

    /// Replaces the matrix and drops the memo. Refuses a zero divisor.
    pub fn install(&mut self, matrix: CalibrationMatrix) -> bool {
        if !matrix.is_valid() {
            log::warn!("Refusing calibration matrix with zero divisor");
            return false;
        }
        self.matrix = matrix;
        self.last_raw_x = None;
        self.last_raw_y = None;
        true
    }

    /// Converts `raw` into display coordinates clamped to `size`. An axis is
    /// only recomputed when its raw reading changed since the last call.
    pub fn apply(&mut self, raw: &RawSample, size: Size) -> Point {
        let raw_point = raw.point();
        if self.last_raw_x != Some(raw.x) {
            self.last_raw_x = Some(raw.x);
            self.position.x = clamp_axis(self.matrix.x(raw_point), size.width);
        }
        if self.last_raw_y != Some(raw.y) {
            self.last_raw_y = Some(raw.y);
            self.position.y = clamp_axis(self.matrix.y(raw_point), size.height);
        }
        self.position
    }

    pub fn position(&self) -> Point {
        self.position
    }
}
