use std::time::Duration;

use crate::Result;

pub trait Transport {
    /// Writes all of `data` to the device.
    fn send(&mut self, data: &[u8]) -> Result<()>;
    /// Waits up to `timeout` for the device to become readable, then reads
    /// at most `data.len()` bytes. Returns `Ok(0)` if the wait expired with
    /// nothing to read.
    fn recv(&mut self, data: &mut [u8], timeout: Duration) -> Result<usize>;
    /// Discards any bytes sitting in the receive path.
    fn purge(&mut self) -> Result<()>;
}

#[cfg(unix)]
#[path = "unix.rs"]
pub mod imp;

#[cfg(not(unix))]
#[path = "stub.rs"]
pub mod imp;
