use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};

use serlink_frame::{EOT, SELECTING_SEQUENCE};

use crate::retry::RetryCycle;
use crate::writer::SharedWriter;

/// Timing and retry bounds for a link session.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Period between retransmissions of the pending payload. Default: 1 s.
    pub retry_interval: Duration,
    /// Transmission budget for the selecting sequence. Default: 16.
    pub max_select_attempts: u32,
    /// Transmission budget for the message payload. Default: 32.
    pub max_message_attempts: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(1000),
            max_select_attempts: 16,
            max_message_attempts: 32,
        }
    }
}

/// Where the outgoing half of the link currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendState {
    /// No transfer in flight.
    Idle,
    /// Selecting sequence on the wire; waiting for the peer to accept.
    AwaitingSelectAck,
    /// Message payload on the wire; waiting for the delivery acknowledgement.
    AwaitingMessageAck,
}

/// State record shared between the public operations, the byte-delivery
/// thread's reactions, and the retry thread. One lock guards all of it.
pub(crate) struct SenderShared {
    pub(crate) state: SendState,
    pub(crate) message: Option<Bytes>,
    pub(crate) receiving: bool,
    pub(crate) attempts: u32,
}

pub(crate) fn lock_shared(shared: &Mutex<SenderShared>) -> MutexGuard<'_, SenderShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The outgoing half of the link.
///
/// Accepts at most one message at a time and walks it through the protocol's
/// selection handshake: transmit the selecting sequence until the peer ACKs,
/// transmit the payload until the peer ACKs again, close with EOT. Each stage
/// retransmits on a timer with its own attempt budget; exhausting a budget
/// aborts the transfer and returns the link to idle.
///
/// Cloning yields another handle to the same engine.
pub struct Sender<W: Write + Send + 'static> {
    inner: Arc<SenderInner<W>>,
}

struct SenderInner<W: Write + Send + 'static> {
    writer: SharedWriter<W>,
    shared: Arc<Mutex<SenderShared>>,
    cycle: Mutex<Option<RetryCycle>>,
    config: LinkConfig,
}

impl<W: Write + Send + 'static> Clone for Sender<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write + Send + 'static> Sender<W> {
    pub fn new(writer: SharedWriter<W>, config: LinkConfig) -> Self {
        Self {
            inner: Arc::new(SenderInner {
                writer,
                shared: Arc::new(Mutex::new(SenderShared {
                    state: SendState::Idle,
                    message: None,
                    receiving: false,
                    attempts: 0,
                })),
                cycle: Mutex::new(None),
                config,
            }),
        }
    }

    /// Queue a message for transfer.
    ///
    /// Accepted only when the link is idle in both directions: no message in
    /// flight and no peer transmission being honored. Returns false (with no
    /// state change) otherwise. On acceptance the selecting sequence goes on
    /// the wire and its retry cycle starts.
    pub fn send_message(&self, payload: impl Into<Bytes>) -> bool {
        let mut cycle = self.lock_cycle();
        let mut shared = lock_shared(&self.inner.shared);

        if shared.receiving || shared.state != SendState::Idle {
            debug!(
                state = ?shared.state,
                receiving = shared.receiving,
                "send rejected, link busy"
            );
            return false;
        }

        shared.message = Some(payload.into());
        shared.state = SendState::AwaitingSelectAck;
        debug!("transfer accepted, writing selecting sequence");
        self.start_cycle(
            &mut cycle,
            &mut shared,
            Bytes::from_static(&SELECTING_SEQUENCE),
            self.inner.config.max_select_attempts,
        );
        true
    }

    /// React to a positive acknowledgement from the peer.
    pub fn ack_received(&self) {
        let mut cycle = self.lock_cycle();
        let mut shared = lock_shared(&self.inner.shared);

        match shared.state {
            SendState::AwaitingSelectAck => {
                debug!("selection acknowledged, transmitting message");
                Self::stop_cycle(&mut cycle, &mut shared);
                match shared.message.clone() {
                    Some(message) => {
                        shared.state = SendState::AwaitingMessageAck;
                        self.start_cycle(
                            &mut cycle,
                            &mut shared,
                            message,
                            self.inner.config.max_message_attempts,
                        );
                    }
                    None => {
                        warn!("selection acknowledged but no message queued");
                        shared.state = SendState::Idle;
                    }
                }
            }
            SendState::AwaitingMessageAck => {
                debug!("message acknowledged, closing transfer");
                Self::stop_cycle(&mut cycle, &mut shared);
                self.inner.writer.send_or_log(&[EOT], "end-of-transmission");
                shared.message = None;
                shared.state = SendState::Idle;
            }
            SendState::Idle => {
                warn!("unexpected ACK while idle");
            }
        }
    }

    /// React to a negative acknowledgement from the peer.
    ///
    /// Reserved extension point: the protocol defines no recovery for an
    /// inbound NAK yet, so this records the event and relies on the retry
    /// cycle to keep the transfer alive.
    pub fn nak_received(&self) {
        debug!("NAK received, no recovery defined");
    }

    /// Mark whether a peer transmission is currently being honored.
    pub fn set_receiving(&self, receiving: bool) {
        let mut shared = lock_shared(&self.inner.shared);
        shared.receiving = receiving;
    }

    /// True iff a transfer could be accepted right now.
    pub fn can_send(&self) -> bool {
        let shared = lock_shared(&self.inner.shared);
        !shared.receiving && shared.state == SendState::Idle
    }

    /// True iff a transfer is in flight (either handshake stage).
    pub fn is_sending(&self) -> bool {
        lock_shared(&self.inner.shared).state != SendState::Idle
    }

    /// Force-abort both directions of the link.
    ///
    /// Writes EOT and clears the receiving flag, the send state and the
    /// pending message. A running retry cycle is deliberately left alone; it
    /// ends through its own attempt budget or the next explicit stop.
    pub fn interrupt(&self) {
        debug!("interrupting link");
        self.inner.writer.send_or_log(&[EOT], "end-of-transmission");
        let mut shared = lock_shared(&self.inner.shared);
        shared.receiving = false;
        shared.state = SendState::Idle;
        shared.message = None;
    }

    /// Stop any running retry cycle. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut cycle = self.lock_cycle();
        let mut shared = lock_shared(&self.inner.shared);
        Self::stop_cycle(&mut cycle, &mut shared);
    }

    pub(crate) fn writer(&self) -> SharedWriter<W> {
        self.inner.writer.clone()
    }

    fn lock_cycle(&self) -> MutexGuard<'_, Option<RetryCycle>> {
        self.inner
            .cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn start_cycle(
        &self,
        slot: &mut Option<RetryCycle>,
        shared: &mut SenderShared,
        payload: Bytes,
        max_attempts: u32,
    ) {
        if let Some(previous) = slot.take() {
            previous.stop();
        }
        shared.attempts = 0;
        *slot = Some(RetryCycle::spawn(
            self.inner.writer.clone(),
            Arc::clone(&self.inner.shared),
            payload,
            max_attempts,
            self.inner.config.retry_interval,
        ));
    }

    fn stop_cycle(slot: &mut Option<RetryCycle>, shared: &mut SenderShared) {
        if let Some(cycle) = slot.take() {
            cycle.stop();
        }
        shared.attempts = 0;
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

    fn capture_sender(config: LinkConfig) -> (Sender<CaptureWriter>, Arc<Mutex<Vec<u8>>>) {
        let capture = CaptureWriter::default();
        let data = Arc::clone(&capture.data);
        (Sender::new(SharedWriter::new(capture), config), data)
    }

    // Interval long enough that only cycle-start transmissions appear.
    fn one_shot_config() -> LinkConfig {
        LinkConfig {
            retry_interval: Duration::from_secs(600),
            ..LinkConfig::default()
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn defaults_match_the_protocol_constants() {
        let config = LinkConfig::default();
        assert_eq!(config.retry_interval, Duration::from_millis(1000));
        assert_eq!(config.max_select_attempts, 16);
        assert_eq!(config.max_message_attempts, 32);
    }

    #[test]
    fn send_message_accepted_when_idle() {
        let (sender, data) = capture_sender(one_shot_config());

        assert!(sender.can_send());
        assert!(sender.send_message(&b"\x02payload"[..]));
        assert!(sender.is_sending());
        assert!(!sender.can_send());

        wait_until(|| data.lock().unwrap().as_slice() == SELECTING_SEQUENCE);
    }

    #[test]
    fn send_message_rejected_while_receiving() {
        let (sender, data) = capture_sender(one_shot_config());

        sender.set_receiving(true);
        assert!(!sender.can_send());
        assert!(!sender.send_message(&b"payload"[..]));
        assert!(!sender.is_sending());

        std::thread::sleep(Duration::from_millis(20));
        assert!(data.lock().unwrap().is_empty());

        sender.set_receiving(false);
        assert!(sender.can_send());
    }

    #[test]
    fn send_message_rejected_while_already_sending() {
        let (sender, _data) = capture_sender(one_shot_config());

        assert!(sender.send_message(&b"first"[..]));
        assert!(!sender.send_message(&b"second"[..]));
    }

    #[test]
    fn full_ack_sequence_completes_transfer() {
        let (sender, data) = capture_sender(one_shot_config());
        let payload = b"\x02ROOM42";

        assert!(sender.send_message(&payload[..]));
        wait_until(|| data.lock().unwrap().len() >= SELECTING_SEQUENCE.len());

        sender.ack_received();
        wait_until(|| data.lock().unwrap().len() >= SELECTING_SEQUENCE.len() + payload.len());
        assert!(sender.is_sending());

        sender.ack_received();
        assert!(!sender.is_sending());
        assert!(sender.can_send());

        let mut expected = SELECTING_SEQUENCE.to_vec();
        expected.extend_from_slice(payload);
        expected.push(EOT);
        assert_eq!(data.lock().unwrap().as_slice(), expected);
    }

    #[test]
    fn select_retries_until_bound_then_aborts() {
        let config = LinkConfig {
            retry_interval: Duration::from_millis(5),
            max_select_attempts: 3,
            ..LinkConfig::default()
        };
        let (sender, data) = capture_sender(config);

        assert!(sender.send_message(&b"unacked"[..]));
        wait_until(|| !sender.is_sending());

        let mut expected = Vec::new();
        for _ in 0..3 {
            expected.extend_from_slice(&SELECTING_SEQUENCE);
        }
        expected.push(EOT);
        wait_until(|| data.lock().unwrap().len() >= expected.len());
        assert_eq!(data.lock().unwrap().as_slice(), expected);
        assert!(sender.can_send());
    }

    #[test]
    fn message_retries_until_bound_then_aborts() {
        let config = LinkConfig {
            retry_interval: Duration::from_millis(5),
            max_select_attempts: 100,
            max_message_attempts: 2,
        };
        let (sender, data) = capture_sender(config);
        let payload = b"PAYLOAD";

        assert!(sender.send_message(&payload[..]));
        wait_until(|| data.lock().unwrap().len() >= SELECTING_SEQUENCE.len());
        sender.ack_received();

        wait_until(|| !sender.is_sending());
        wait_until(|| data.lock().unwrap().last() == Some(&EOT));

        let written = data.lock().unwrap().clone();
        let payload_copies = written
            .windows(payload.len())
            .filter(|window| *window == payload)
            .count();
        assert_eq!(payload_copies, 2);
        assert_eq!(written.last(), Some(&EOT));
    }

    #[test]
    fn unexpected_ack_while_idle_is_ignored() {
        let (sender, data) = capture_sender(one_shot_config());

        sender.ack_received();

        assert!(!sender.is_sending());
        assert!(sender.can_send());
        assert!(data.lock().unwrap().is_empty());
    }

    #[test]
    fn nak_received_changes_nothing() {
        let (sender, data) = capture_sender(one_shot_config());

        assert!(sender.send_message(&b"msg"[..]));
        wait_until(|| !data.lock().unwrap().is_empty());

        sender.nak_received();

        assert!(sender.is_sending());
        assert_eq!(data.lock().unwrap().as_slice(), SELECTING_SEQUENCE);
    }

    #[test]
    fn interrupt_clears_state_and_writes_eot() {
        let (sender, data) = capture_sender(one_shot_config());

        assert!(sender.send_message(&b"msg"[..]));
        wait_until(|| !data.lock().unwrap().is_empty());

        sender.interrupt();

        assert!(!sender.is_sending());
        assert!(sender.can_send());
        let written = data.lock().unwrap().clone();
        assert_eq!(written.last(), Some(&EOT));
    }

    #[test]
    fn interrupt_also_clears_receiving() {
        let (sender, _data) = capture_sender(one_shot_config());

        sender.set_receiving(true);
        assert!(!sender.can_send());

        sender.interrupt();
        assert!(sender.can_send());
    }

    #[test]
    fn send_accepted_iff_can_send() {
        // Exercise every reachable (receiving, state) combination.
        for receiving in [false, true] {
            for mid_transfer in [false, true] {
                let (sender, _data) = capture_sender(one_shot_config());
                if mid_transfer {
                    assert!(sender.send_message(&b"occupied"[..]));
                }
                sender.set_receiving(receiving);

                let expectation = sender.can_send();
                assert_eq!(
                    sender.send_message(&b"probe"[..]),
                    expectation,
                    "receiving={receiving} mid_transfer={mid_transfer}"
                );
                sender.stop();
            }
        }
    }

    #[test]
    fn stop_is_idempotent() {
        let (sender, _data) = capture_sender(one_shot_config());

        assert!(sender.send_message(&b"msg"[..]));
        sender.stop();
        sender.stop();
    }
}
