//! Shared helpers for unit tests: recording transports and scheduler
//! settling for the cooperative loop.

use crate::midi::MidiMessage;
use crate::osc::OscOut;
use crate::surface::MidiPort;
use anyhow::Result;
use rosc::{OscMessage, OscType};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Let every spawned task run to its next suspension point.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused test clock and settle the loop afterwards.
///
/// Settle first so any task armed since the last settle reaches its
/// `sleep` and registers its deadline against the current clock before we
/// advance past it; then settle again to run whatever the advance fired.
pub async fn advance_ms(ms: u64) {
    settle().await;
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

/// Recording MIDI port. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct TestPort {
    sent: Rc<RefCell<Vec<MidiMessage>>>,
}

impl TestPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MidiMessage> {
        self.sent.borrow().clone()
    }

    pub fn take(&self) -> Vec<MidiMessage> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl MidiPort for TestPort {
    fn send(&mut self, msg: &MidiMessage) -> Result<()> {
        self.sent.borrow_mut().push(msg.clone());
        Ok(())
    }
}

/// Recording OSC output. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct TestOsc {
    sent: Rc<RefCell<Vec<OscMessage>>>,
}

impl TestOsc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, Vec<OscType>)> {
        self.sent
            .borrow()
            .iter()
            .map(|m| (m.addr.clone(), m.args.clone()))
            .collect()
    }

    pub fn take(&self) -> Vec<(String, Vec<OscType>)> {
        std::mem::take(&mut *self.sent.borrow_mut())
            .into_iter()
            .map(|m| (m.addr, m.args))
            .collect()
    }
}

impl OscOut for TestOsc {
    fn send(&mut self, msg: OscMessage) -> Result<()> {
        self.sent.borrow_mut().push(msg);
        Ok(())
    }
}
