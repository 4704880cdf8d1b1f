use std::ffi::{CStr, CString};
use std::io;
use std::ptr;
use std::time::Duration;
use libc::{c_int, c_void};
use crate::Result;

// The scope's serial bridge runs at a fixed rate; it is not negotiated.
const BAUD_RATE: libc::speed_t = libc::B1200;

#[derive(Debug)]
struct Fd(c_int);

impl Fd {
    fn open(path: &CStr) -> io::Result<Fd> {
        unsafe {
            let fd = libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NOCTTY);
            if fd == -1 {
                Err(io::Error::last_os_error())
            } else {
                Ok(Fd(fd))
            }
        }
    }

    // Raw non-canonical 8N1 with no flow control; VMIN/VTIME are left zero
    // so that a read returns whatever is buffered without blocking.
    fn configure_raw_8n1(&self, baud: libc::speed_t) -> io::Result<()> {
        unsafe {
            let mut tio: libc::termios = std::mem::zeroed();
            tio.c_cflag = libc::CS8 | libc::CREAD | libc::CLOCAL;
            if libc::cfsetispeed(&mut tio, baud) == -1 ||
                    libc::cfsetospeed(&mut tio, baud) == -1 {
                return Err(io::Error::last_os_error());
            }
            if libc::tcsetattr(self.0, libc::TCSANOW, &tio) == -1 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut timeval = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        unsafe {
            let mut set: libc::fd_set = std::mem::zeroed();
            libc::FD_ZERO(&mut set);
            libc::FD_SET(self.0, &mut set);
            match libc::select(self.0 + 1, &mut set, ptr::null_mut(), ptr::null_mut(),
                               &mut timeval) {
                -1 => Err(io::Error::last_os_error()),
                0 => Ok(false),
                _ => Ok(true),
            }
        }
    }

    fn read(&self, data: &mut [u8]) -> io::Result<usize> {
        unsafe {
            let count = libc::read(self.0, data.as_mut_ptr() as *mut c_void, data.len());
            if count == -1 {
                Err(io::Error::last_os_error())
            } else {
                Ok(count as usize)
            }
        }
    }

    fn write_all(&self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            unsafe {
                let count = libc::write(self.0, data.as_ptr() as *const c_void, data.len());
                match count {
                    -1 => return Err(io::Error::last_os_error()),
                    0 => return Err(io::Error::new(io::ErrorKind::WriteZero,
                        "device accepted no data")),
                    _ => data = &data[count as usize..],
                }
            }
        }
        Ok(())
    }

    fn flush(&self, queue_selector: c_int) -> io::Result<()> {
        unsafe {
            if libc::tcflush(self.0, queue_selector) == -1 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }
    }
}

impl Drop for Fd {
    fn drop(&mut self) {
        unsafe {
            if libc::close(self.0) == -1 {
                panic!("error closing fd: {}", io::Error::last_os_error())
            }
        }
    }
}

#[derive(Debug)]
pub struct SerialPortImpl {
    fd: Fd,
}

impl SerialPortImpl {
    pub fn open(device_path: &str) -> Result<SerialPortImpl> {
        let path = CString::new(device_path.to_owned()).unwrap();
        let fd = Fd::open(path.as_ref())?;
        fd.configure_raw_8n1(BAUD_RATE)?;
        // drop anything left over from an interrupted transfer
        fd.flush(libc::TCIOFLUSH)?;
        log::debug!("opened serial device {}", device_path);
        Ok(SerialPortImpl { fd })
    }
}

impl super::Transport for SerialPortImpl {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        Ok(self.fd.write_all(data)?)
    }

    fn recv(&mut self, data: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.fd.wait_readable(timeout)? {
            return Ok(0);
        }
        Ok(self.fd.read(data)?)
    }

    fn purge(&mut self) -> Result<()> {
        Ok(self.fd.flush(libc::TCIFLUSH)?)
    }
}
