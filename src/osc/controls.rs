//! OSC-side control primitives
//!
//! Each primitive caches the remote state behind one OSC path. Instances
//! sharing a path are disambiguated by a fixed tuple of leading arguments
//! (e.g. the strip id); an inbound message is accepted only when its leading
//! arguments equal that tuple exactly, and the trailing argument is the
//! payload.

use super::reply::ReplyWindow;
use super::OscEndpoint;
use crate::notify::{ChangeSet, Field, Listeners, Transaction};
use rosc::{OscMessage, OscType};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Split an inbound message into (payload, ok) against a fixed argument
/// tuple. `None` means the message is for another instance.
fn match_payload<'a>(fixed: &[OscType], msg: &'a OscMessage) -> Option<&'a OscType> {
    let (payload, leading) = msg.args.split_last()?;
    if leading.len() != fixed.len() {
        return None;
    }
    if leading.iter().zip(fixed).any(|(got, want)| got != want) {
        return None;
    }
    Some(payload)
}

/// Interpret any OSC payload as a boolean.
pub fn truthy(arg: &OscType) -> bool {
    match arg {
        OscType::Float(f) => *f != 0.0,
        OscType::Double(d) => *d != 0.0,
        OscType::Int(i) => *i != 0,
        OscType::Long(l) => *l != 0,
        OscType::Bool(b) => *b,
        OscType::String(s) => !s.is_empty(),
        OscType::Nil => false,
        _ => true,
    }
}

/// Interpret a numeric OSC payload as f32.
fn as_float(arg: &OscType) -> Option<f32> {
    match arg {
        OscType::Float(f) => Some(*f),
        OscType::Double(d) => Some(*d as f32),
        OscType::Int(i) => Some(*i as f32),
        OscType::Long(l) => Some(*l as f32),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// OscToggle / OscToggleSetOnly
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleField {
    On(bool),
}

impl Field for ToggleField {
    fn name(&self) -> &'static str {
        "on"
    }
}

struct ToggleCore {
    endpoint: OscEndpoint,
    path: String,
    fixed: Vec<OscType>,
    on: RefCell<bool>,
    listeners: Listeners<ToggleField>,
}

impl ToggleCore {
    fn subscribe(endpoint: &OscEndpoint, path: &str, fixed: Vec<OscType>) -> Rc<Self> {
        let core = Rc::new(ToggleCore {
            endpoint: endpoint.clone(),
            path: path.to_string(),
            fixed,
            on: RefCell::new(false),
            listeners: Listeners::new(),
        });
        {
            let core = core.clone();
            endpoint.add_handler(path, move |msg| core.on_message(msg));
        }
        core
    }

    /// Inbound feedback always applies.
    fn on_message(&self, msg: &OscMessage) {
        let Some(payload) = match_payload(&self.fixed, msg) else {
            return;
        };
        let mut tx = Transaction::begin();
        tx.assign(&mut *self.on.borrow_mut(), truthy(payload), ToggleField::On);
        self.listeners.notify(&tx.commit());
    }

    fn write_remote(&self) {
        let value = if *self.on.borrow() { 1.0 } else { 0.0 };
        let mut args = self.fixed.clone();
        args.push(OscType::Float(value));
        self.endpoint.send(&self.path, args);
    }

    fn set(&self, on: bool) {
        let changed = *self.on.borrow() != on;
        if !changed {
            return;
        }
        let mut tx = Transaction::begin();
        tx.assign(&mut *self.on.borrow_mut(), on, ToggleField::On);
        self.listeners.notify(&tx.commit());
        self.write_remote();
    }
}

/// Boolean remote state; outbound send fires only on real change.
#[derive(Clone)]
pub struct OscToggle {
    core: Rc<ToggleCore>,
}

impl OscToggle {
    pub fn new(endpoint: &OscEndpoint, path: &str, fixed: Vec<OscType>) -> Self {
        Self {
            core: ToggleCore::subscribe(endpoint, path, fixed),
        }
    }

    pub fn on(&self) -> bool {
        *self.core.on.borrow()
    }

    pub fn set_on(&self, on: bool) {
        self.core.set(on);
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<ToggleField>) + 'static) {
        self.core.listeners.register(listener);
    }
}

/// Boolean the surface may only assert, never clear. Cleared exclusively by
/// remote feedback; a `false` request is logged and ignored.
#[derive(Clone)]
pub struct OscToggleSetOnly {
    core: Rc<ToggleCore>,
}

impl OscToggleSetOnly {
    pub fn new(endpoint: &OscEndpoint, path: &str, fixed: Vec<OscType>) -> Self {
        Self {
            core: ToggleCore::subscribe(endpoint, path, fixed),
        }
    }

    pub fn on(&self) -> bool {
        *self.core.on.borrow()
    }

    pub fn set_on(&self, on: bool) {
        if !on {
            warn!("tried to clear set-only switch {}", self.core.path);
            return;
        }
        self.core.set(on);
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<ToggleField>) + 'static) {
        self.core.listeners.register(listener);
    }
}

// ---------------------------------------------------------------------------
// OscFader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OscFaderField {
    Value(f32),
}

impl Field for OscFaderField {
    fn name(&self) -> &'static str {
        "value"
    }
}

struct OscFaderState {
    value: f32,
    replies: ReplyWindow,
}

struct OscFaderInner {
    endpoint: OscEndpoint,
    path: String,
    fixed: Vec<OscType>,
    state: RefCell<OscFaderState>,
    listeners: Listeners<OscFaderField>,
}

/// Float remote state with echo bookkeeping.
#[derive(Clone)]
pub struct OscFader {
    inner: Rc<OscFaderInner>,
}

impl OscFader {
    pub fn new(endpoint: &OscEndpoint, path: &str, fixed: Vec<OscType>) -> Self {
        let inner = Rc::new(OscFaderInner {
            endpoint: endpoint.clone(),
            path: path.to_string(),
            fixed,
            state: RefCell::new(OscFaderState {
                value: 0.0,
                replies: ReplyWindow::new(),
            }),
            listeners: Listeners::new(),
        });
        {
            let inner = inner.clone();
            endpoint.add_handler(path, move |msg| OscFaderInner::on_message(&inner, msg));
        }
        Self { inner }
    }

    pub fn value(&self) -> f32 {
        self.inner.state.borrow().value
    }

    /// Write the remote value. No-op when unchanged.
    pub fn set_value(&self, value: f32) {
        let mut tx = Transaction::begin();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.value == value {
                return;
            }
            tx.assign(&mut st.value, value, OscFaderField::Value);
        }
        self.inner.listeners.notify(&tx.commit());
        self.inner.write_remote(value);
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<OscFaderField>) + 'static) {
        self.inner.listeners.register(listener);
    }
}

impl OscFaderInner {
    fn on_message(inner: &Rc<Self>, msg: &OscMessage) {
        let Some(payload) = match_payload(&inner.fixed, msg) else {
            return;
        };
        let Some(value) = as_float(payload) else {
            debug!("non-numeric payload on {}: {:?}", inner.path, payload);
            return;
        };

        let mut tx = Transaction::begin();
        {
            let mut st = inner.state.borrow_mut();
            // Echo hits are consumed from the window but do not gate the
            // update: the incoming value applies either way.
            let _ = st.replies.consume(value);
            tx.assign(&mut st.value, value, OscFaderField::Value);
        }
        inner.listeners.notify(&tx.commit());
    }

    fn write_remote(&self, value: f32) {
        self.state.borrow_mut().replies.record(value);
        let mut args = self.fixed.clone();
        args.push(OscType::Float(value));
        self.endpoint.send(&self.path, args);
    }
}

// ---------------------------------------------------------------------------
// OscValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum OscValueField {
    Value(Option<OscType>),
}

impl Field for OscValueField {
    fn name(&self) -> &'static str {
        "value"
    }
}

struct OscValueInner {
    value: RefCell<Option<OscType>>,
    listeners: Listeners<OscValueField>,
}

/// Arbitrary host-pushed payload cache (membership, transport flags).
/// Read-only from the bridge side apart from an optional initial value.
#[derive(Clone)]
pub struct OscValue {
    inner: Rc<OscValueInner>,
}

impl OscValue {
    pub fn new(endpoint: &OscEndpoint, path: &str, fixed: Vec<OscType>) -> Self {
        Self::with_initial(endpoint, path, fixed, None)
    }

    pub fn with_initial(
        endpoint: &OscEndpoint,
        path: &str,
        fixed: Vec<OscType>,
        initial: Option<OscType>,
    ) -> Self {
        let inner = Rc::new(OscValueInner {
            value: RefCell::new(initial),
            listeners: Listeners::new(),
        });
        {
            let inner = inner.clone();
            endpoint.add_handler(path, move |msg| {
                let Some(payload) = match_payload(&fixed, msg) else {
                    return;
                };
                let mut tx = Transaction::begin();
                tx.assign(
                    &mut *inner.value.borrow_mut(),
                    Some(payload.clone()),
                    OscValueField::Value,
                );
                inner.listeners.notify(&tx.commit());
            });
        }
        Self { inner }
    }

    pub fn value(&self) -> Option<OscType> {
        self.inner.value.borrow().clone()
    }

    /// Whether the cached payload reads as true.
    pub fn is_truthy(&self) -> bool {
        self.inner.value.borrow().as_ref().is_some_and(truthy)
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<OscValueField>) + 'static) {
        self.inner.listeners.register(listener);
    }
}

// ---------------------------------------------------------------------------
// OscAction
// ---------------------------------------------------------------------------

/// Stateless remote action: fires `path + fixed + extra`, never observable.
#[derive(Clone)]
pub struct OscAction {
    endpoint: OscEndpoint,
    path: String,
    fixed: Vec<OscType>,
}

impl OscAction {
    pub fn new(endpoint: &OscEndpoint, path: &str, fixed: Vec<OscType>) -> Self {
        Self {
            endpoint: endpoint.clone(),
            path: path.to_string(),
            fixed,
        }
    }

    pub fn fire(&self, extra: &[OscType]) {
        let mut args = self.fixed.clone();
        args.extend_from_slice(extra);
        self.endpoint.send(&self.path, args);
    }
}
