//! Bounded queue between the MIDI input callback and the event loop
//!
//! The midir input callback runs on a foreign thread. It pushes decoded
//! messages through a bounded channel that the surface run loop drains in
//! strict arrival order. The producer never blocks the driver thread: when
//! the consumer falls 256 messages behind, new input is dropped with a
//! warning.

use crate::midi::MidiMessage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Queue depth before input is dropped
pub const QUEUE_CAPACITY: usize = 256;

/// Create a connected producer/consumer pair.
pub fn channel() -> (MidiSender, MidiQueue) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    (MidiSender { tx }, MidiQueue { rx })
}

/// Producer half, safe to invoke from the MIDI driver thread.
#[derive(Clone)]
pub struct MidiSender {
    tx: mpsc::Sender<MidiMessage>,
}

impl MidiSender {
    /// Enqueue a message without blocking the caller.
    pub fn push(&self, msg: MidiMessage) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                warn!("MIDI input queue full, dropping {}", msg);
            }
            Err(TrySendError::Closed(msg)) => {
                debug!("MIDI input queue closed, dropping {}", msg);
            }
        }
    }
}

/// Consumer half: an infinite, non-replayable sequence of messages.
pub struct MidiQueue {
    rx: mpsc::Receiver<MidiMessage>,
}

impl MidiQueue {
    /// Wait for the next message. Returns `None` once every producer handle
    /// is gone.
    pub async fn next(&mut self) -> Option<MidiMessage> {
        self.rx.recv().await
    }

    /// Consume the queue as a stream for the surface run loop.
    pub fn into_stream(self) -> ReceiverStream<MidiMessage> {
        ReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc(value: u8) -> MidiMessage {
        MidiMessage::ControlChange {
            channel: 10,
            controller: 1,
            value,
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn preserves_arrival_order() {
        let (tx, mut queue) = channel();
        for v in 0..5 {
            tx.push(cc(v));
        }

        for v in 0..5 {
            assert_eq!(queue.next().await, Some(cc(v)));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn overflow_drops_newest_without_blocking() {
        let (tx, mut queue) = channel();
        for v in 0..(QUEUE_CAPACITY as u32 + 10) {
            tx.push(cc((v % 128) as u8));
        }
        drop(tx);

        // Exactly the first QUEUE_CAPACITY messages survived.
        let mut received = 0;
        while queue.next().await.is_some() {
            received += 1;
        }
        assert_eq!(received, QUEUE_CAPACITY);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn producer_works_from_a_foreign_thread() {
        let (tx, mut queue) = channel();
        std::thread::spawn(move || {
            for v in 0..3 {
                tx.push(cc(v));
            }
        })
        .join()
        .unwrap();

        for v in 0..3 {
            assert_eq!(queue.next().await, Some(cc(v)));
        }
    }
}
