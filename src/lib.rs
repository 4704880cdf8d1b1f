mod sys;
mod device;
mod frame;
mod palette;
mod raster;

#[derive(Debug)]
pub enum Error {
    /// A readiness wait expired before the scope sent anything.
    Timeout { received: usize },
    /// The scope sent more data than fits in a frame; the byte stream is
    /// desynchronized and should be purged before the next request.
    Overflow { received: usize },
    SerialIo(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Timeout { received } =>
                write!(f, "request timed out after {} of {} bytes", received, frame::FRAME_SIZE),
            Self::Overflow { received } =>
                write!(f, "received {} bytes, more than the {} byte frame", received, frame::FRAME_SIZE),
            Self::SerialIo(io_error) =>
                write!(f, "serial I/O error: {}", io_error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            &Self::SerialIo(ref io_error) => Some(io_error),
            _ => None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::SerialIo(error)
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use frame::{
    RawFrame,
    Image,
    FRAME_SIZE,
    STRIP_PITCH,
    STRIP_VISIBLE,
    IMAGE_WIDTH,
    IMAGE_HEIGHT,
};

pub use palette::{
    Color,
    Theme,
    Palette,
    THEMES,
};

pub use raster::unpack;

pub type Device =
    device::Device<crate::sys::imp::SerialPortImpl>;
