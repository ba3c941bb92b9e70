use crate::calibration::CalibrationError;

pub type Result<T, E> = ::core::result::Result<T, Error<E>>;

#[derive(Debug, thiserror::Error)]
pub enum Error<E: core::fmt::Debug> {
    #[error("touch controller bus error: {0:?}")]
    Bus(E),
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
