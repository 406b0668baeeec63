use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use serlink_frame::EOT;

use crate::sender::{lock_shared, SendState, SenderShared};
use crate::writer::SharedWriter;

/// Handle to one timer-driven retransmission cycle.
///
/// The cycle transmits its payload immediately, then once per interval while
/// the shared attempt counter stays under the bound. Exhausting the bound
/// aborts the transfer: EOT goes on the wire and the engine returns to idle.
/// Stopping is an idempotent channel signal; dropping the handle stops the
/// cycle at its next wakeup.
pub(crate) struct RetryCycle {
    stop_tx: mpsc::Sender<()>,
}

impl RetryCycle {
    pub(crate) fn spawn<W: Write + Send + 'static>(
        writer: SharedWriter<W>,
        shared: Arc<Mutex<SenderShared>>,
        payload: Bytes,
        max_attempts: u32,
        interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        thread::spawn(move || run(writer, shared, payload, max_attempts, interval, stop_rx));
        Self { stop_tx }
    }

    pub(crate) fn stop(self) {
        let _ = self.stop_tx.send(());
    }
}

fn run<W: Write + Send + 'static>(
    writer: SharedWriter<W>,
    shared: Arc<Mutex<SenderShared>>,
    payload: Bytes,
    max_attempts: u32,
    interval: Duration,
    stop_rx: mpsc::Receiver<()>,
) {
    loop {
        let exhausted = {
            let mut shared = lock_shared(&shared);
            if shared.attempts >= max_attempts {
                true
            } else {
                shared.attempts += 1;
                false
            }
        };

        if exhausted {
            debug!(max_attempts, "attempts exhausted, aborting transfer");
            writer.send_or_log(&[EOT], "abort end-of-transmission");
            let mut shared = lock_shared(&shared);
            shared.state = SendState::Idle;
            shared.message = None;
            shared.attempts = 0;
            return;
        }

        writer.send_or_log(&payload, "pending payload");

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("retry cycle stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[derive(Clone, Default)]
    struct CaptureWriter {
        data: Arc<Mutex<Vec<u8>>>,
    }

    impl Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn shared_record() -> Arc<Mutex<SenderShared>> {
        Arc::new(Mutex::new(SenderShared {
            state: SendState::AwaitingSelectAck,
            message: Some(Bytes::from_static(b"pending")),
            receiving: false,
            attempts: 0,
        }))
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn transmits_up_to_bound_then_aborts() {
        let capture = CaptureWriter::default();
        let data = Arc::clone(&capture.data);
        let writer = SharedWriter::new(capture);
        let shared = shared_record();

        let _cycle = RetryCycle::spawn(
            writer,
            Arc::clone(&shared),
            Bytes::from_static(b"ping"),
            2,
            Duration::from_millis(5),
        );

        wait_until(|| data.lock().unwrap().ends_with(&[EOT]));

        assert_eq!(data.lock().unwrap().as_slice(), b"pingping\x04");
        let shared = shared.lock().unwrap();
        assert_eq!(shared.state, SendState::Idle);
        assert!(shared.message.is_none());
        assert_eq!(shared.attempts, 0);
    }

    #[test]
    fn stop_ends_the_cycle_before_the_bound() {
        let capture = CaptureWriter::default();
        let data = Arc::clone(&capture.data);
        let writer = SharedWriter::new(capture);
        let shared = shared_record();

        let cycle = RetryCycle::spawn(
            writer,
            Arc::clone(&shared),
            Bytes::from_static(b"ping"),
            1000,
            Duration::from_millis(5),
        );

        wait_until(|| !data.lock().unwrap().is_empty());
        cycle.stop();
        thread::sleep(Duration::from_millis(40));

        // Ticks in flight when the stop lands may still go out; after the
        // sleep the cycle is gone and nothing more appears, abort EOT
        // included.
        let len_after_stop = data.lock().unwrap().len();
        thread::sleep(Duration::from_millis(40));
        let written = data.lock().unwrap().clone();
        assert_eq!(written.len(), len_after_stop);
        assert!(!written.ends_with(&[EOT]));
        assert_eq!(shared.lock().unwrap().state, SendState::AwaitingSelectAck);
    }

    #[test]
    fn dropping_the_handle_stops_the_cycle() {
        let capture = CaptureWriter::default();
        let data = Arc::clone(&capture.data);
        let writer = SharedWriter::new(capture);
        let shared = shared_record();

        let cycle = RetryCycle::spawn(
            writer,
            Arc::clone(&shared),
            Bytes::from_static(b"x"),
            1000,
            Duration::from_millis(5),
        );
        wait_until(|| !data.lock().unwrap().is_empty());
        drop(cycle);
        thread::sleep(Duration::from_millis(40));

        let len_after_drop = data.lock().unwrap().len();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(data.lock().unwrap().len(), len_after_drop);
    }
}
