use std::io::{ErrorKind, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::error::{LinkError, Result};

/// Serialized, cloneable handle to the transport's write path.
///
/// The retry thread's retransmissions and the byte-delivery thread's control
/// responses share one wire; every write funnels through this handle's lock
/// so a control byte can never land inside a frame mid-transmission.
pub struct SharedWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SharedWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> SharedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Write the full payload and flush (blocking).
    pub fn send(&self, payload: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let mut offset = 0usize;
        while offset < payload.len() {
            match inner.write(&payload[offset..]) {
                Ok(0) => return Err(LinkError::Closed),
                Ok(written) => offset += written,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }

        loop {
            match inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(LinkError::Io(err)),
            }
        }
    }

    /// Write a single control code.
    pub fn send_code(&self, code: u8) -> Result<()> {
        self.send(&[code])
    }

    /// Best-effort write: a failure is logged and the attempt dropped. The
    /// higher-level retry cycle is the recovery mechanism, not the write.
    pub(crate) fn send_or_log(&self, payload: &[u8], what: &str) {
        if let Err(err) = self.send(payload) {
            warn!(%err, what, "write failed, dropping this attempt");
        }
    }
}
