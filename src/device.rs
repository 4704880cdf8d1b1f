use std::time::Duration;

use crate::{Error, Result};
use crate::frame::{RawFrame, FRAME_SIZE};
use crate::sys::Transport;

/// Command that makes the scope dump its LCD contents.
const REQUEST_SCREEN_DUMP: [u8; 4] = [0x57, 0x00, 0x00, 0x0A];

/// Longest the scope is allowed to stay silent mid-transfer.
const RECV_TIMEOUT: Duration = Duration::from_micros(200_000);

/// Largest read issued against the port at once.
const RECV_CHUNK: usize = 64;

#[derive(Debug)]
pub struct Device<T: Transport> {
    transport: T,
}

impl Device<crate::sys::imp::SerialPortImpl> {
    pub fn open(device_path: &str) -> Result<Device<crate::sys::imp::SerialPortImpl>> {
        let transport = crate::sys::imp::SerialPortImpl::open(device_path)?;
        Ok(Device { transport })
    }
}

impl<T: Transport> Device<T> {
    pub fn from_transport(transport: T) -> Device<T> {
        Device { transport }
    }

    /// Performs one complete screen dump transaction: sends the request and
    /// drains the response into `frame`. One call is one atomic attempt;
    /// there are no retries, and on failure `frame` holds no usable data.
    ///
    /// The response carries no framing at all. Completion is recognized
    /// purely by the byte count reaching the frame size, and any extra bytes
    /// mean the stream is desynchronized; call [`Device::purge`] to recover
    /// before the next attempt.
    pub fn acquire_into(&mut self, frame: &mut RawFrame) -> Result<()> {
        self.transport.send(&REQUEST_SCREEN_DUMP)?;
        let mut received = 0;
        while received < FRAME_SIZE {
            // Always read at full chunk width, even when fewer bytes remain.
            // If the scope sends more than a frame, the excess lands in the
            // chunk and is reported as an overflow instead of lingering in
            // the OS queue to corrupt the next transfer.
            let mut chunk = [0; RECV_CHUNK];
            let count = self.transport.recv(&mut chunk, RECV_TIMEOUT)?;
            if count == 0 {
                log::debug!("timed out after {}/{} bytes", received, FRAME_SIZE);
                return Err(Error::Timeout { received });
            }
            if received + count > FRAME_SIZE {
                log::debug!("overflow: last read {} bytes, {} total",
                    count, received + count);
                return Err(Error::Overflow { received: received + count });
            }
            frame.as_bytes_mut()[received..received + count]
                .copy_from_slice(&chunk[..count]);
            received += count;
            log::trace!("received {} bytes ({} total)", count, received);
        }
        log::debug!("acquired complete {} byte frame", FRAME_SIZE);
        Ok(())
    }

    /// Acquires into a freshly allocated frame.
    pub fn acquire(&mut self) -> Result<RawFrame> {
        let mut frame = RawFrame::new();
        self.acquire_into(&mut frame)?;
        Ok(frame)
    }

    /// Discards stale bytes queued on the receive side.
    pub fn purge(&mut self) -> Result<()> {
        self.transport.purge()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Transport that replays a canned byte stream in caller-chosen chunk
    // sizes, then reports a timeout (or an I/O error) once it runs dry.
    struct ScriptedPort {
        sent: Vec<u8>,
        replies: Vec<Vec<u8>>,
        fail_when_dry: bool,
    }

    impl ScriptedPort {
        fn new(replies: Vec<Vec<u8>>) -> ScriptedPort {
            ScriptedPort { sent: Vec::new(), replies, fail_when_dry: false }
        }

        fn whole_frame(fill: u8) -> ScriptedPort {
            ScriptedPort::new(vec![vec![fill; FRAME_SIZE]])
        }
    }

    impl Transport for ScriptedPort {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }

        fn recv(&mut self, data: &mut [u8], _timeout: Duration) -> Result<usize> {
            let Some(reply) = self.replies.first_mut() else {
                if self.fail_when_dry {
                    return Err(Error::SerialIo(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe, "port gone")));
                }
                return Ok(0) // timeout
            };
            let count = reply.len().min(data.len());
            data[..count].copy_from_slice(&reply[..count]);
            reply.drain(..count);
            if self.replies[0].is_empty() {
                self.replies.remove(0);
            }
            Ok(count)
        }

        fn purge(&mut self) -> Result<()> {
            self.replies.clear();
            Ok(())
        }
    }

    #[test]
    fn test_request_command_sent_verbatim() {
        let mut device = Device::from_transport(ScriptedPort::whole_frame(0));
        device.acquire().unwrap();
        assert_eq!(device.transport.sent, [0x57, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn test_acquire_exact_frame() {
        let mut device = Device::from_transport(ScriptedPort::whole_frame(0xA5));
        let frame = device.acquire().unwrap();
        assert!(frame.as_bytes().iter().all(|&byte| byte == 0xA5));
    }

    #[test]
    fn test_acquire_uneven_chunking() {
        // the FTDI bridge is free to return any chunk sizes it likes
        let mut replies = vec![vec![0x11; 1], vec![0x22; 63], vec![0x33; 17]];
        let mut remaining = FRAME_SIZE - 81;
        while remaining > 0 {
            let count = remaining.min(64);
            replies.push(vec![0x44; count]);
            remaining -= count;
        }
        let mut device = Device::from_transport(ScriptedPort::new(replies));
        let frame = device.acquire().unwrap();
        assert_eq!(frame.as_bytes()[0], 0x11);
        assert_eq!(frame.as_bytes()[1], 0x22);
        assert_eq!(frame.as_bytes()[64], 0x33);
        assert_eq!(frame.as_bytes()[81], 0x44);
        assert_eq!(frame.as_bytes()[FRAME_SIZE - 1], 0x44);
    }

    #[test]
    fn test_short_stream_times_out() {
        // a short response must never come back as a (partial) frame
        let mut device = Device::from_transport(
            ScriptedPort::new(vec![vec![0xA5; FRAME_SIZE - 100]]));
        match device.acquire() {
            Err(Error::Timeout { received }) => assert_eq!(received, FRAME_SIZE - 100),
            result => panic!("expected timeout, got {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn test_immediate_silence_times_out() {
        let mut device = Device::from_transport(ScriptedPort::new(vec![]));
        match device.acquire() {
            Err(Error::Timeout { received }) => assert_eq!(received, 0),
            result => panic!("expected timeout, got {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn test_excess_bytes_overflow() {
        // 24 bytes of stale data ahead of a full frame; the transaction must
        // fail rather than silently truncate
        let mut device = Device::from_transport(
            ScriptedPort::new(vec![vec![0x00; FRAME_SIZE + 24]]));
        match device.acquire() {
            Err(Error::Overflow { received }) => assert!(received > FRAME_SIZE),
            result => panic!("expected overflow, got {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn test_io_failure_propagates() {
        let mut port = ScriptedPort::new(vec![vec![0xA5; 64]]);
        port.fail_when_dry = true;
        let mut device = Device::from_transport(port);
        assert!(matches!(device.acquire(), Err(Error::SerialIo(_))));
    }

    #[test]
    fn test_acquire_then_unpack() {
        use crate::frame::Image;
        use crate::palette::DEVICE;

        let mut device = Device::from_transport(ScriptedPort::whole_frame(0x24));
        let frame = device.acquire().unwrap();
        let mut image = Image::new();
        crate::raster::unpack(&frame, &DEVICE, &mut image);
        // 0x24: high nibble 2 on even rows, low nibble 4 on odd rows
        assert_eq!(image.pixels()[0], DEVICE.color(2));
        assert_eq!(image.pixels()[320], DEVICE.color(4));
    }
}
