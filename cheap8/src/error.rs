//! Result and errors.
//!
//! Only load-time failures are fatal: without a loaded program image
//! there is no valid machine state to run. Every runtime fault is
//! reported through the sticky diagnostic flags instead of an `Err`.
use std::fmt::{self, Display, Formatter};
use std::io;

pub type Cheap8Result<T> = std::result::Result<T, Cheap8Error>;

#[derive(Debug)]
pub enum Cheap8Error {
    /// The ROM file could not be read.
    Io(io::Error),
    Fmt(fmt::Error),
}

impl Display for Cheap8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read program: {}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Cheap8Error {}

impl From<io::Error> for Cheap8Error {
    fn from(err: io::Error) -> Self {
        Cheap8Error::Io(err)
    }
}

impl From<fmt::Error> for Cheap8Error {
    fn from(err: fmt::Error) -> Self {
        Cheap8Error::Fmt(err)
    }
}
