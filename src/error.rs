use std::fmt;
use std::io;

/// Errors reported by model construction, training and evaluation.
#[derive(Debug)]
pub enum Error {
    /// Two inputs that must agree in length (or row/column count) don't.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// The actual value at this row is zero, so its percent error is undefined.
    ZeroActual { index: usize },
    /// A prediction or actual value at this row is NaN or infinite.
    NonFinite { index: usize },
    /// Statistics were requested over an empty set of values.
    EmptyInput,
    /// The model has no dense kernel to report weights from.
    MissingWeights,
    InvalidConfig(String),
    Render(String),
    Io(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(f, "shape mismatch in {what}: expected {expected}, found {found}"),
            Error::ZeroActual { index } => {
                write!(f, "actual value at row {index} is zero; percent error is undefined")
            }
            Error::NonFinite { index } => write!(f, "non-finite value at row {index}"),
            Error::EmptyInput => write!(f, "input is empty"),
            Error::MissingWeights => write!(f, "model has no dense kernel"),
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Render(msg) => write!(f, "rendering failed: {msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Check that two lengths agree, naming the thing being compared.
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            expected,
            found,
        })
    }
}
