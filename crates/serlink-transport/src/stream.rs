use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// An open serial line — implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations. The
/// reader and writer halves of a link session are two clones of the same
/// stream; the OS handle is shared, so writes from either clone land on the
/// same wire.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Serial(Box<dyn serialport::SerialPort>),
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.flush(),
        }
    }
}

impl LinkStream {
    pub(crate) fn from_serial(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: LinkStreamInner::Serial(port),
        }
    }

    /// Try to clone this stream (creates a new handle to the same port).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            LinkStreamInner::Serial(port) => {
                let cloned = port.try_clone().map_err(TransportError::CloneHandle)?;
                Ok(Self::from_serial(cloned))
            }
        }
    }

    /// Set the read/write timeout on the underlying port.
    ///
    /// Reads that see no data within the timeout return `TimedOut`; the
    /// protocol reader loop treats that as "no bytes yet" and retries.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port
                .set_timeout(timeout)
                .map_err(TransportError::Configure),
        }
    }

    /// The OS-level name of the underlying port, if known.
    pub fn port_name(&self) -> Option<String> {
        match &self.inner {
            LinkStreamInner::Serial(port) => port.name(),
        }
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            LinkStreamInner::Serial(port) => f
                .debug_struct("LinkStream")
                .field("type", &"serial")
                .field("port", &port.name())
                .finish(),
        }
    }
}
