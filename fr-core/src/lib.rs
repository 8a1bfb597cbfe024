//! Library code for Fractal Refinery.
//!
//! Escape-time fractals over interchangeable numeric backends: IEEE floats,
//! fixed-scale decimals, and exact symbolic rationals.

pub mod algorithm;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod exact;
pub mod history;
pub mod image;
pub mod mapper;
pub mod number;
pub mod numeric;
pub mod settings;

pub use algorithm::PixelResult;
pub use numeric::Complex;
pub use settings::{RenderSettings, SettingsDiff};

/// A pair of integer (width, height) dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// The area, or `None` if it doesn't fit in a `usize`.
    pub fn checked_area(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }
}

/// Errors that can occur during configuration or evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An operation was called before the state it needs was set up.
    InvalidState(String),
    /// Settings that can't be rendered: unknown tags, out-of-range values.
    Config(String),
    /// Division by an exact zero.
    DivideByZero,
    /// A value that can't be represented in the target backend.
    Numeric(String),
    InvalidArgument(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidState(s) => write!(f, "invalid state: {}", s),
            Error::Config(s) => write!(f, "configuration error: {}", s),
            Error::DivideByZero => write!(f, "division by zero"),
            Error::Numeric(s) => write!(f, "numeric error: {}", s),
            Error::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
        }
    }
}

impl std::error::Error for Error {}
