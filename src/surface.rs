//! Hardware event dispatcher for the X-Touch Mini
//!
//! [`Surface`] owns the outbound port and a per-(channel, key) registry of
//! subscribers. The run loop drains the input queue strictly in arrival
//! order; each decoded event is handed to its subscribers as independent
//! spawned tasks so no subscriber can stall another or the receive path.
//! Events with no subscriber are dropped.

use crate::midi::MidiMessage;
use crate::queue::MidiQueue;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tokio_stream::StreamExt;
use tracing::{trace, warn};

/// (channel, note-or-controller) pair identifying one physical control
pub type HardwareKey = (u8, u8);

/// Outbound MIDI transport seam.
///
/// The production implementation wraps a midir output connection; tests
/// substitute a recording port.
pub trait MidiPort {
    fn send(&mut self, msg: &MidiMessage) -> Result<()>;
}

/// Subscriber for button events: (is_press, velocity)
pub type NoteCallback = Rc<dyn Fn(bool, u8)>;
/// Subscriber for encoder/fader events: value 0..127
pub type CcCallback = Rc<dyn Fn(u8)>;

struct SurfaceInner {
    port: RefCell<Box<dyn MidiPort>>,
    note_subscribers: RefCell<HashMap<HardwareKey, Vec<NoteCallback>>>,
    cc_subscribers: RefCell<HashMap<HardwareKey, Vec<CcCallback>>>,
}

/// Handle to the control surface, shared by every hardware primitive.
#[derive(Clone)]
pub struct Surface {
    inner: Rc<SurfaceInner>,
}

impl Surface {
    pub fn new(port: Box<dyn MidiPort>) -> Self {
        Self {
            inner: Rc::new(SurfaceInner {
                port: RefCell::new(port),
                note_subscribers: RefCell::new(HashMap::new()),
                cc_subscribers: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to press/release events for one button.
    pub fn on_note(&self, channel: u8, note: u8, callback: impl Fn(bool, u8) + 'static) {
        self.inner
            .note_subscribers
            .borrow_mut()
            .entry((channel, note))
            .or_default()
            .push(Rc::new(callback));
    }

    /// Subscribe to value events for one encoder or fader.
    pub fn on_cc(&self, channel: u8, controller: u8, callback: impl Fn(u8) + 'static) {
        self.inner
            .cc_subscribers
            .borrow_mut()
            .entry((channel, controller))
            .or_default()
            .push(Rc::new(callback));
    }

    /// Forward a message to the device, synchronously. Send failures are
    /// logged and swallowed: nothing downstream retries.
    pub fn send(&self, msg: &MidiMessage) {
        if let Err(e) = self.inner.port.borrow_mut().send(msg) {
            warn!("MIDI send failed ({}): {:#}", msg, e);
        }
    }

    /// Route one decoded event to its subscribers, one spawned task each.
    pub fn dispatch(&self, msg: &MidiMessage) {
        match *msg {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => self.deploy_note((channel, note), true, velocity),
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => self.deploy_note((channel, note), false, velocity),
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => self.deploy_cc((channel, controller), value),
        }
    }

    fn deploy_note(&self, key: HardwareKey, is_press: bool, velocity: u8) {
        let subscribers = match self.inner.note_subscribers.borrow().get(&key) {
            Some(list) => list.clone(),
            None => {
                trace!("no subscriber for note {:?}", key);
                return;
            }
        };
        for callback in subscribers {
            tokio::task::spawn_local(async move { callback(is_press, velocity) });
        }
    }

    fn deploy_cc(&self, key: HardwareKey, value: u8) {
        let subscribers = match self.inner.cc_subscribers.borrow().get(&key) {
            Some(list) => list.clone(),
            None => {
                trace!("no subscriber for cc {:?}", key);
                return;
            }
        };
        for callback in subscribers {
            tokio::task::spawn_local(async move { callback(value) });
        }
    }

    /// Drain the input queue until every producer handle is dropped.
    pub async fn run(&self, queue: MidiQueue) {
        let mut stream = queue.into_stream();
        while let Some(msg) = stream.next().await {
            trace!("{}", msg);
            self.dispatch(&msg);
        }
    }
}
