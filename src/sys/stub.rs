use std::time::Duration;

use crate::Result;

#[derive(Debug)]
pub struct SerialPortImpl;

impl SerialPortImpl {
    pub fn open(_device_path: &str) -> Result<SerialPortImpl> {
        unimplemented!()
    }
}

impl super::Transport for SerialPortImpl {
    fn send(&mut self, _data: &[u8]) -> Result<()> {
        unimplemented!()
    }

    fn recv(&mut self, _data: &mut [u8], _timeout: Duration) -> Result<usize> {
        unimplemented!()
    }

    fn purge(&mut self) -> Result<()> {
        unimplemented!()
    }
}
