use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use bytes::Bytes;
use tracing::{debug, error};

use serlink_frame::Frame;
use serlink_transport::LinkStream;

use crate::controller::LinkController;
use crate::sender::{LinkConfig, Sender};
use crate::writer::SharedWriter;

const READ_CHUNK_SIZE: usize = 1024;

/// A running link session over one transport.
///
/// Owns the byte-delivery thread (reads available bytes, feeds the
/// controller) and exposes the protocol's caller-facing surface. Validated
/// inbound frames reach the consumer through the `on_message` callback, one
/// call per frame, from the delivery thread.
pub struct Link<W: Write + Send + 'static> {
    sender: Sender<W>,
    controller: Arc<Mutex<LinkController<W>>>,
    stop: Arc<AtomicBool>,
    reader: Option<thread::JoinHandle<()>>,
}

impl<W: Write + Send + 'static> Link<W> {
    /// Start a session from a transport's reader and writer halves.
    pub fn spawn<R, F>(reader: R, writer: W, config: LinkConfig, on_message: F) -> Self
    where
        R: Read + Send + 'static,
        F: FnMut(Frame) + Send + 'static,
    {
        let sender = Sender::new(SharedWriter::new(writer), config);
        let controller = Arc::new(Mutex::new(LinkController::new(sender.clone(), on_message)));
        let stop = Arc::new(AtomicBool::new(false));

        let loop_controller = Arc::clone(&controller);
        let loop_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || read_loop(reader, loop_controller, loop_stop));

        Self {
            sender,
            controller,
            stop,
            reader: Some(handle),
        }
    }

    /// Queue a message for transfer. See [`Sender::send_message`].
    pub fn send_message(&self, payload: impl Into<Bytes>) -> bool {
        self.sender.send_message(payload)
    }

    /// True iff a transfer could be accepted right now.
    pub fn can_send(&self) -> bool {
        self.sender.can_send()
    }

    /// True iff a transfer is in flight.
    pub fn is_sending(&self) -> bool {
        self.sender.is_sending()
    }

    /// Force-abort both directions of the link.
    pub fn interrupt(&self) {
        let mut controller = self
            .controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        controller.interrupt();
    }

    /// Handle to the outgoing half, for callers that hold it separately.
    pub fn sender(&self) -> &Sender<W> {
        &self.sender
    }

    /// End the session: stop retrying, signal the delivery thread and wait
    /// for it to notice (at EOF, or at its next read timeout on transports
    /// that have one).
    pub fn shutdown(mut self) {
        self.sender.stop();
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

impl Link<LinkStream> {
    /// Start a session over a serial stream, cloning the handle for the
    /// reader half.
    pub fn over_stream<F>(
        stream: LinkStream,
        config: LinkConfig,
        on_message: F,
    ) -> serlink_transport::Result<Self>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        let reader = stream.try_clone()?;
        Ok(Self::spawn(reader, stream, config, on_message))
    }
}

impl<W: Write + Send + 'static> Drop for Link<W> {
    fn drop(&mut self) {
        self.sender.stop();
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn read_loop<R, W>(mut reader: R, controller: Arc<Mutex<LinkController<W>>>, stop: Arc<AtomicBool>)
where
    R: Read,
    W: Write + Send + 'static,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        if stop.load(Ordering::Relaxed) {
            debug!("session stopped, delivery loop ending");
            return;
        }

        match reader.read(&mut chunk) {
            Ok(0) => {
                debug!("transport closed, delivery loop ending");
                return;
            }
            Ok(read) => {
                let mut controller = controller.lock().unwrap_or_else(PoisonError::into_inner);
                controller.handle_bytes(&chunk[..read]);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(err) => {
                error!(%err, "transport read failed, delivery loop ending");
                return;
            }
        }
    }
}
