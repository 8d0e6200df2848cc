//! Per-strip encoder bridge: gain / stereo position / trim on one ring
//!
//! One encoder edits three remote properties, cycled by a short press on
//! the strip's select button. The ring's display mode tracks the active
//! property, and a record-enabled strip blinks its ring, re-asserting the
//! blink after encoder activity settles.

use crate::hardware::{Button, ButtonField, LedRing, RingField, RingLed, RingMode};
use crate::osc::controls::{OscFader, OscFaderField, OscToggle, ToggleField};
use crate::osc::OscEndpoint;
use crate::surface::Surface;
use crate::timer::Timer;
use rosc::OscType;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Hold duration that turns a select press into a long-press
const LONGPRESS_TIME: Duration = Duration::from_millis(500);
/// Quiet time after encoder activity before the blink is re-asserted
const RESHOW_TIME: Duration = Duration::from_secs(1);

/// The remote property currently edited and shown on the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StripProperty {
    Fader,
    StereoPos,
    Trim,
}

impl StripProperty {
    fn next(self) -> Self {
        match self {
            StripProperty::Fader => StripProperty::StereoPos,
            StripProperty::StereoPos => StripProperty::Trim,
            StripProperty::Trim => StripProperty::Fader,
        }
    }

    fn ring_mode(self) -> RingMode {
        match self {
            StripProperty::Fader => RingMode::Fan,
            StripProperty::StereoPos => RingMode::Pan,
            StripProperty::Trim => RingMode::Trim,
        }
    }

    /// Hardware 0..127 to the property's remote range.
    fn to_remote(self, value: u8) -> f32 {
        let v = f32::from(value);
        match self {
            StripProperty::Fader => v / 127.0,
            StripProperty::StereoPos => 1.0 - v / 127.0,
            StripProperty::Trim => v * 40.0 / 127.0 - 20.0,
        }
    }

    /// Remote value back to hardware 0..127 (truncating).
    fn to_hardware(self, remote: f32) -> i32 {
        let unit = match self {
            StripProperty::Fader => remote,
            StripProperty::StereoPos => 1.0 - remote,
            StripProperty::Trim => (remote + 20.0) / 40.0,
        };
        (127.9 * unit) as i32
    }
}

struct StripInner {
    ring: LedRing,
    select: Button,
    gain: OscFader,
    trim: OscFader,
    stereo_pos: OscFader,
    rec_enable: OscToggle,
    active: Cell<StripProperty>,
    longpress: Timer,
    reshow: Timer,
}

/// One mixer strip's encoder, select button, and record-enable blink.
pub struct StripFaderControl {
    inner: Rc<StripInner>,
}

impl StripFaderControl {
    pub fn new(
        ring: LedRing,
        select: Button,
        gain: OscFader,
        trim: OscFader,
        stereo_pos: OscFader,
        rec_enable: OscToggle,
    ) -> Self {
        let inner = Rc::new(StripInner {
            ring,
            select,
            gain,
            trim,
            stereo_pos,
            rec_enable,
            active: Cell::new(StripProperty::Fader),
            longpress: Timer::new(),
            reshow: Timer::new(),
        });
        inner.ring.set_mode(RingMode::Fan);

        {
            let inner = inner.clone();
            inner.ring.clone().register(move |set| {
                if let Some(RingField::Value(v)) = set.field("value") {
                    StripInner::on_ring_moved(&inner, *v);
                }
            });
        }
        {
            let inner = inner.clone();
            inner.select.clone().register(move |set| {
                if let Some(ButtonField::Pressed(pressed)) = set.field("pressed") {
                    StripInner::on_select(&inner, *pressed);
                }
            });
        }
        for property in [
            StripProperty::Fader,
            StripProperty::StereoPos,
            StripProperty::Trim,
        ] {
            let remote = match property {
                StripProperty::Fader => inner.gain.clone(),
                StripProperty::StereoPos => inner.stereo_pos.clone(),
                StripProperty::Trim => inner.trim.clone(),
            };
            let inner = inner.clone();
            remote.register(move |set| {
                if let Some(OscFaderField::Value(v)) = set.field("value") {
                    StripInner::on_remote_moved(&inner, property, *v);
                }
            });
        }
        {
            let inner = inner.clone();
            inner.rec_enable.clone().register(move |set| {
                if let Some(ToggleField::On(on)) = set.field("on") {
                    StripInner::on_rec_enable(&inner, *on);
                }
            });
        }
        Self { inner }
    }

    /// Wire up one strip: encoder/select on the hardware side, Ardour's
    /// per-strip addresses on the OSC side.
    pub fn build(
        surface: &Surface,
        endpoint: &OscEndpoint,
        hw_strip: u8,
        osc_strip: i32,
    ) -> Self {
        let ring = LedRing::new(surface, hw_strip, hw_strip);
        let select = Button::new(surface, hw_strip - 1);
        let strip_arg = vec![OscType::Int(osc_strip)];
        let gain = OscFader::new(endpoint, "/strip/fader", strip_arg.clone());
        let trim = OscFader::new(endpoint, "/strip/trimdB", strip_arg.clone());
        let stereo_pos = OscFader::new(endpoint, "/strip/pan_stereo_position", strip_arg.clone());
        let rec_enable = OscToggle::new(endpoint, "/strip/recenable", strip_arg);
        Self::new(ring, select, gain, trim, stereo_pos, rec_enable)
    }
}

impl StripInner {
    /// Encoder turned: write the active remote property.
    fn on_ring_moved(inner: &Rc<Self>, value: u8) {
        let property = inner.active.get();
        let remote = property.to_remote(value);
        match property {
            StripProperty::Fader => inner.gain.set_value(remote),
            StripProperty::StereoPos => inner.stereo_pos.set_value(remote),
            StripProperty::Trim => inner.trim.set_value(remote),
        }
        Self::arm_reshow(inner);
    }

    fn on_select(inner: &Rc<Self>, pressed: bool) {
        if pressed {
            // A long hold is consumed with no action of its own; the release
            // after the threshold must not cycle the property.
            inner.longpress.arm(LONGPRESS_TIME, || {});
            return;
        }
        if !inner.longpress.cancel() {
            // Already fired: this release belongs to the long-press.
            return;
        }

        let next = inner.active.get().next();
        inner.ring.set_mode(next.ring_mode());
        inner.ring.set_value(next.to_hardware(Self::remote_value(inner, next)));
        inner.active.set(next);
        Self::arm_reshow(inner);
    }

    /// Remote feedback for `property`: show it when it is the active one.
    fn on_remote_moved(inner: &Rc<Self>, property: StripProperty, value: f32) {
        if inner.active.get() != property {
            return;
        }
        inner.ring.set_value(property.to_hardware(value));
        Self::arm_reshow(inner);
    }

    fn on_rec_enable(inner: &Rc<Self>, on: bool) {
        if on {
            inner.ring.set_led(RingLed::Blinking);
        } else {
            inner.ring.set_led(RingLed::Fader);
        }
    }

    fn remote_value(inner: &Rc<Self>, property: StripProperty) -> f32 {
        match property {
            StripProperty::Fader => inner.gain.value(),
            StripProperty::StereoPos => inner.stereo_pos.value(),
            StripProperty::Trim => inner.trim.value(),
        }
    }

    /// While record-enabled, any ring activity shows the live value for a
    /// moment; re-assert the blink once the activity settles.
    fn arm_reshow(inner: &Rc<Self>) {
        if !inner.rec_enable.on() {
            return;
        }
        let strip = inner.clone();
        inner.reshow.arm(RESHOW_TIME, move || {
            if strip.rec_enable.on() {
                strip.ring.set_led(RingLed::Blinking);
            }
        });
    }
}
