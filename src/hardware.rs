//! Hardware-side control primitives
//!
//! Each primitive caches the last state seen from (or written to) the
//! X-Touch Mini, updates it inside a change transaction on dispatch, and
//! writes LED/ring feedback back out. Strip controls report on MIDI channel
//! 10; LED and ring-display registers are written on channel 0.

use crate::midi::MidiMessage;
use crate::notify::{ChangeSet, Field, Listeners, Transaction};
use crate::surface::Surface;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// Channel the Mini reports strip controls on
pub const STRIP_CHANNEL: u8 = 10;
/// Channel for LED and ring-display register writes
pub const GLOBAL_CHANNEL: u8 = 0;

/// Ring pattern registers live 8 CCs above the mode registers
const RING_PATTERN_OFFSET: u8 = 8;

/// Button LED state, encoded as note velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    Off,
    On,
    Blinking,
}

impl LedState {
    fn code(self) -> u8 {
        match self {
            LedState::Off => 0,
            LedState::On => 1,
            LedState::Blinking => 2,
        }
    }
}

/// Display mode of a 16-segment encoder ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingMode {
    Pan,
    Fan,
    Spread,
    Trim,
}

impl RingMode {
    fn code(self) -> u8 {
        match self {
            RingMode::Pan => 1,
            RingMode::Fan => 2,
            RingMode::Spread => 3,
            RingMode::Trim => 4,
        }
    }
}

/// Override state of an encoder ring's LEDs.
///
/// `Fader` is passthrough: the ring renders its live value. The fixed
/// patterns write a dedicated code to the pattern register; passthrough has
/// no code of its own and is restored by rewriting the mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingLed {
    Off,
    On,
    Blinking,
    Fader,
}

impl RingLed {
    fn fixed_code(self) -> Option<u8> {
        match self {
            RingLed::Off => Some(0),
            RingLed::On => Some(27),
            RingLed::Blinking => Some(28),
            RingLed::Fader => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ButtonField {
    Pressed(bool),
}

impl Field for ButtonField {
    fn name(&self) -> &'static str {
        "pressed"
    }
}

struct ButtonInner {
    pressed: RefCell<bool>,
    listeners: Listeners<ButtonField>,
}

/// Plain button: caches the pressed state, nothing to write back.
#[derive(Clone)]
pub struct Button {
    inner: Rc<ButtonInner>,
}

impl Button {
    pub fn new(surface: &Surface, note: u8) -> Self {
        let inner = Rc::new(ButtonInner {
            pressed: RefCell::new(false),
            listeners: Listeners::new(),
        });
        {
            let inner = inner.clone();
            surface.on_note(STRIP_CHANNEL, note, move |pressed, _velocity| {
                let mut tx = Transaction::begin();
                tx.assign(
                    &mut *inner.pressed.borrow_mut(),
                    pressed,
                    ButtonField::Pressed,
                );
                inner.listeners.notify(&tx.commit());
            });
        }
        Self { inner }
    }

    pub fn pressed(&self) -> bool {
        *self.inner.pressed.borrow()
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<ButtonField>) + 'static) {
        self.inner.listeners.register(listener);
    }
}

// ---------------------------------------------------------------------------
// Fader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum FaderField {
    Value(u8),
}

impl Field for FaderField {
    fn name(&self) -> &'static str {
        "value"
    }
}

struct FaderInner {
    value: RefCell<u8>,
    listeners: Listeners<FaderField>,
}

/// The analog fader: read-only toward the hardware.
#[derive(Clone)]
pub struct Fader {
    inner: Rc<FaderInner>,
}

impl Fader {
    pub fn new(surface: &Surface, controller: u8) -> Self {
        let inner = Rc::new(FaderInner {
            value: RefCell::new(0),
            listeners: Listeners::new(),
        });
        {
            let inner = inner.clone();
            surface.on_cc(STRIP_CHANNEL, controller, move |value| {
                let mut tx = Transaction::begin();
                tx.assign(&mut *inner.value.borrow_mut(), value, FaderField::Value);
                inner.listeners.notify(&tx.commit());
            });
        }
        Self { inner }
    }

    pub fn value(&self) -> u8 {
        *self.inner.value.borrow()
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<FaderField>) + 'static) {
        self.inner.listeners.register(listener);
    }
}

// ---------------------------------------------------------------------------
// LedButton
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum LedButtonField {
    Pressed(bool),
    Led(LedState),
}

impl Field for LedButtonField {
    fn name(&self) -> &'static str {
        match self {
            LedButtonField::Pressed(_) => "pressed",
            LedButtonField::Led(_) => "led",
        }
    }
}

struct LedButtonState {
    pressed: bool,
    led: LedState,
}

struct LedButtonInner {
    surface: Surface,
    led_note: u8,
    state: RefCell<LedButtonState>,
    listeners: Listeners<LedButtonField>,
}

/// Button with a writable LED.
///
/// The device forces the LED to mirror the press state on every press and
/// release; that overwrite lands in the cache before any business-logic
/// write is applied on top.
#[derive(Clone)]
pub struct LedButton {
    inner: Rc<LedButtonInner>,
}

impl LedButton {
    pub fn new(surface: &Surface, note: u8, led_note: u8) -> Self {
        let inner = Rc::new(LedButtonInner {
            surface: surface.clone(),
            led_note,
            state: RefCell::new(LedButtonState {
                pressed: false,
                led: LedState::Off,
            }),
            listeners: Listeners::new(),
        });
        {
            let inner = inner.clone();
            surface.on_note(STRIP_CHANNEL, note, move |pressed, _velocity| {
                LedButtonInner::on_hardware(&inner, pressed);
            });
        }
        inner.write_led();
        Self { inner }
    }

    pub fn pressed(&self) -> bool {
        self.inner.state.borrow().pressed
    }

    pub fn led(&self) -> LedState {
        self.inner.state.borrow().led
    }

    /// Write the LED. No-op (no send, no notify) when unchanged.
    pub fn set_led(&self, led: LedState) {
        let mut tx = Transaction::begin();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.led == led {
                return;
            }
            tx.assign(&mut st.led, led, LedButtonField::Led);
        }
        self.inner.write_led();
        self.inner.listeners.notify(&tx.commit());
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<LedButtonField>) + 'static) {
        self.inner.listeners.register(listener);
    }
}

impl LedButtonInner {
    fn on_hardware(inner: &Rc<Self>, pressed: bool) {
        let mut tx = Transaction::begin();
        {
            let mut st = inner.state.borrow_mut();
            tx.assign(&mut st.pressed, pressed, LedButtonField::Pressed);

            // The device has already forced the LED to track the press.
            let led = if pressed { LedState::On } else { LedState::Off };
            tx.assign(&mut st.led, led, LedButtonField::Led);
        }
        inner.listeners.notify(&tx.commit());
    }

    fn write_led(&self) {
        let led = self.state.borrow().led;
        self.surface.send(&MidiMessage::NoteOn {
            channel: GLOBAL_CHANNEL,
            note: self.led_note,
            velocity: led.code(),
        });
    }
}

// ---------------------------------------------------------------------------
// LedRing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RingField {
    Value(u8),
    Mode(RingMode),
    Led(RingLed),
}

impl Field for RingField {
    fn name(&self) -> &'static str {
        match self {
            RingField::Value(_) => "value",
            RingField::Mode(_) => "mode",
            RingField::Led(_) => "led",
        }
    }
}

struct RingState {
    value: u8,
    mode: RingMode,
    led: RingLed,
}

struct LedRingInner {
    surface: Surface,
    controller: u8,
    global_controller: u8,
    state: RefCell<RingState>,
    listeners: Listeners<RingField>,
}

/// Rotary encoder with a 16-segment LED ring.
///
/// `value`, `mode`, and `led` are independently settable. The ring shares
/// one display register between mode and fixed patterns, so restoring
/// passthrough rewrites the mode register instead of the pattern register.
#[derive(Clone)]
pub struct LedRing {
    inner: Rc<LedRingInner>,
}

impl LedRing {
    pub fn new(surface: &Surface, controller: u8, global_controller: u8) -> Self {
        let inner = Rc::new(LedRingInner {
            surface: surface.clone(),
            controller,
            global_controller,
            state: RefCell::new(RingState {
                value: 0,
                mode: RingMode::Pan,
                led: RingLed::Fader,
            }),
            listeners: Listeners::new(),
        });
        {
            let inner = inner.clone();
            surface.on_cc(STRIP_CHANNEL, controller, move |value| {
                LedRingInner::on_hardware(&inner, value);
            });
        }
        inner.write_mode();
        inner.write_value();
        Self { inner }
    }

    pub fn value(&self) -> u8 {
        self.inner.state.borrow().value
    }

    pub fn mode(&self) -> RingMode {
        self.inner.state.borrow().mode
    }

    pub fn led(&self) -> RingLed {
        self.inner.state.borrow().led
    }

    /// Move the ring to `value`.
    ///
    /// Out-of-range input is logged and ignored. An unchanged value sends
    /// nothing. A real write resets the LED override to passthrough; the
    /// write itself is not reported as a `value` change, so bridge listeners
    /// only ever see hardware-initiated movement.
    pub fn set_value(&self, value: i32) {
        if !(0..=127).contains(&value) {
            warn!(
                "ring value {} not in range [0, 127], ignoring (cc {})",
                value, self.inner.controller
            );
            return;
        }
        let value = value as u8;

        let mut tx = Transaction::begin();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.value == value {
                return;
            }
            st.value = value;
            tx.assign(&mut st.led, RingLed::Fader, RingField::Led);
        }
        self.inner.write_value();
        self.inner.listeners.notify(&tx.commit());
    }

    /// Switch the display mode. No-op when unchanged; a real change resets
    /// the LED override to passthrough and writes the mode register once.
    pub fn set_mode(&self, mode: RingMode) {
        let mut tx = Transaction::begin();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.mode == mode {
                return;
            }
            tx.assign(&mut st.mode, mode, RingField::Mode);
            tx.assign(&mut st.led, RingLed::Fader, RingField::Led);
        }
        self.inner.write_mode();
        self.inner.listeners.notify(&tx.commit());
    }

    /// Override the ring LEDs. No-op when unchanged. Fixed patterns write
    /// the pattern register; `RingLed::Fader` rewrites the mode register to
    /// resume live-value rendering.
    pub fn set_led(&self, led: RingLed) {
        let mut tx = Transaction::begin();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.led == led {
                return;
            }
            tx.assign(&mut st.led, led, RingField::Led);
        }
        match led.fixed_code() {
            Some(code) => self.inner.write_pattern(code),
            None => self.inner.write_mode(),
        }
        self.inner.listeners.notify(&tx.commit());
    }

    pub fn register(&self, listener: impl Fn(&ChangeSet<RingField>) + 'static) {
        self.inner.listeners.register(listener);
    }
}

impl LedRingInner {
    fn on_hardware(inner: &Rc<Self>, value: u8) {
        let mut tx = Transaction::begin();
        {
            let mut st = inner.state.borrow_mut();
            tx.assign(&mut st.value, value, RingField::Value);

            // Turning the encoder puts the ring back to showing its value.
            tx.assign(&mut st.led, RingLed::Fader, RingField::Led);
        }
        inner.listeners.notify(&tx.commit());
    }

    fn write_value(&self) {
        let value = self.state.borrow().value;
        self.surface.send(&MidiMessage::ControlChange {
            channel: STRIP_CHANNEL,
            controller: self.controller,
            value,
        });
    }

    fn write_mode(&self) {
        let mode = self.state.borrow().mode;
        self.surface.send(&MidiMessage::ControlChange {
            channel: GLOBAL_CHANNEL,
            controller: self.global_controller,
            value: mode.code(),
        });
    }

    fn write_pattern(&self, code: u8) {
        self.surface.send(&MidiMessage::ControlChange {
            channel: GLOBAL_CHANNEL,
            controller: self.global_controller + RING_PATTERN_OFFSET,
            value: code,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{settle, TestPort};
    use tokio::task::LocalSet;

    fn press(surface: &Surface, note: u8) {
        surface.dispatch(&MidiMessage::NoteOn {
            channel: STRIP_CHANNEL,
            note,
            velocity: 127,
        });
    }

    fn release(surface: &Surface, note: u8) {
        surface.dispatch(&MidiMessage::NoteOff {
            channel: STRIP_CHANNEL,
            note,
            velocity: 0,
        });
    }

    fn turn(surface: &Surface, controller: u8, value: u8) {
        surface.dispatch(&MidiMessage::ControlChange {
            channel: STRIP_CHANNEL,
            controller,
            value,
        });
    }

    #[tokio::test(flavor = "current_thread")]
    async fn led_button_press_mirrors_led_without_outbound_write() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let button = LedButton::new(&surface, 8, 0);
                port.take(); // initial LED write

                press(&surface, 8);
                settle().await;

                assert!(button.pressed());
                assert_eq!(button.led(), LedState::On);
                // The device did the mirroring itself; nothing goes out.
                assert!(port.sent().is_empty());

                release(&surface, 8);
                settle().await;
                assert_eq!(button.led(), LedState::Off);
                assert!(port.sent().is_empty());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn led_button_setter_is_noop_when_unchanged() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let button = LedButton::new(&surface, 8, 0);
                port.take();

                let notified = Rc::new(RefCell::new(0));
                {
                    let notified = notified.clone();
                    button.register(move |_| *notified.borrow_mut() += 1);
                }

                button.set_led(LedState::Off); // already off
                assert!(port.sent().is_empty());
                assert_eq!(*notified.borrow(), 0);

                button.set_led(LedState::Blinking);
                assert_eq!(
                    port.take(),
                    vec![MidiMessage::NoteOn {
                        channel: GLOBAL_CHANNEL,
                        note: 0,
                        velocity: 2,
                    }]
                );
                assert_eq!(*notified.borrow(), 1);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ring_rejects_out_of_range_values() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let ring = LedRing::new(&surface, 1, 1);
                port.take(); // initial mode + value writes

                ring.set_value(128);
                ring.set_value(-1);
                assert!(port.sent().is_empty());
                assert_eq!(ring.value(), 0);

                ring.set_value(127);
                assert_eq!(ring.value(), 127);
                assert_eq!(
                    port.take(),
                    vec![MidiMessage::ControlChange {
                        channel: STRIP_CHANNEL,
                        controller: 1,
                        value: 127,
                    }]
                );
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ring_explicit_value_write_does_not_notify_value() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let ring = LedRing::new(&surface, 1, 1);

                let values = Rc::new(RefCell::new(Vec::new()));
                {
                    let values = values.clone();
                    ring.register(move |set| {
                        if let Some(RingField::Value(v)) = set.field("value") {
                            values.borrow_mut().push(*v);
                        }
                    });
                }

                ring.set_value(40);
                assert!(values.borrow().is_empty());

                // Hardware movement does notify.
                turn(&surface, 1, 90);
                settle().await;
                assert_eq!(*values.borrow(), vec![90]);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ring_mode_change_sends_one_message_and_resets_override() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let ring = LedRing::new(&surface, 3, 3);
                port.take();

                ring.set_led(RingLed::Blinking);
                assert_eq!(
                    port.take(),
                    vec![MidiMessage::ControlChange {
                        channel: GLOBAL_CHANNEL,
                        controller: 3 + RING_PATTERN_OFFSET,
                        value: 28,
                    }]
                );

                ring.set_mode(RingMode::Trim);
                assert_eq!(ring.led(), RingLed::Fader);
                assert_eq!(
                    port.take(),
                    vec![MidiMessage::ControlChange {
                        channel: GLOBAL_CHANNEL,
                        controller: 3,
                        value: 4,
                    }]
                );

                ring.set_mode(RingMode::Trim); // unchanged: nothing
                assert!(port.sent().is_empty());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ring_passthrough_restores_via_mode_register() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let ring = LedRing::new(&surface, 2, 2);
                ring.set_mode(RingMode::Fan);
                port.take();

                ring.set_led(RingLed::On);
                port.take();

                ring.set_led(RingLed::Fader);
                // Passthrough is restored by rewriting the mode register.
                assert_eq!(
                    port.take(),
                    vec![MidiMessage::ControlChange {
                        channel: GLOBAL_CHANNEL,
                        controller: 2,
                        value: RingMode::Fan.code(),
                    }]
                );
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ring_hardware_movement_resets_override_to_passthrough() {
        LocalSet::new()
            .run_until(async {
                let port = TestPort::new();
                let surface = Surface::new(Box::new(port.clone()));
                let ring = LedRing::new(&surface, 5, 5);
                ring.set_led(RingLed::Blinking);

                turn(&surface, 5, 33);
                settle().await;

                assert_eq!(ring.value(), 33);
                assert_eq!(ring.led(), RingLed::Fader);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fader_and_button_cache_hardware_state() {
        LocalSet::new()
            .run_until(async {
                let surface = Surface::new(Box::new(TestPort::new()));
                let fader = Fader::new(&surface, 9);
                let button = Button::new(&surface, 19);

                turn(&surface, 9, 101);
                press(&surface, 19);
                settle().await;

                assert_eq!(fader.value(), 101);
                assert!(button.pressed());

                release(&surface, 19);
                settle().await;
                assert!(!button.pressed());
            })
            .await;
    }
}
