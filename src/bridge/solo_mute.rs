//! Per-strip solo/mute button
//!
//! One LED summarizes four remote booleans, and one button carries both the
//! mute toggle (short press) and the solo gestures (long press). Priority
//! for the LED, highest first: inactive strip, strong mute, own solo,
//! muted-by-other-solo, playing.

use crate::hardware::{LedButton, LedButtonField, LedState};
use crate::osc::controls::{OscToggle, OscValue};
use crate::osc::OscEndpoint;
use crate::surface::Surface;
use crate::timer::Timer;
use rosc::OscType;
use std::rc::Rc;
use std::time::Duration;

/// Hold duration that turns a press into the solo gesture
const LONGPRESS_TIME: Duration = Duration::from_millis(300);

struct SoloMuteInner {
    button: LedButton,
    mute: OscToggle,
    solo: OscToggle,
    other_solo: OscToggle,
    group: OscValue,
    longpress: Timer,
}

/// One strip's solo/mute button and status LED.
pub struct SoloMuteControl {
    inner: Rc<SoloMuteInner>,
}

impl SoloMuteControl {
    pub fn new(
        button: LedButton,
        mute: OscToggle,
        solo: OscToggle,
        other_solo: OscToggle,
        group: OscValue,
    ) -> Self {
        let inner = Rc::new(SoloMuteInner {
            button,
            mute,
            solo,
            other_solo,
            group,
            longpress: Timer::new(),
        });
        inner.button.set_led(LedState::Off);

        {
            let inner = inner.clone();
            inner.button.clone().register(move |set| {
                if let Some(LedButtonField::Pressed(pressed)) = set.field("pressed") {
                    SoloMuteInner::on_button(&inner, *pressed);
                }
                // The device overwrote the LED with the press state; put the
                // computed state back regardless of what changed.
                inner.recalculate();
            });
        }
        for remote in [&inner.mute, &inner.solo, &inner.other_solo] {
            let inner = inner.clone();
            remote.register(move |_| inner.recalculate());
        }
        {
            let inner = inner.clone();
            inner.group.clone().register(move |_| inner.recalculate());
        }
        Self { inner }
    }

    /// Wire up one strip: button + LED on the hardware side, the strip's
    /// mute/solo plus the global solo indication on the OSC side.
    pub fn build(
        surface: &Surface,
        endpoint: &OscEndpoint,
        hw_strip: u8,
        osc_strip: i32,
    ) -> Self {
        let button = LedButton::new(surface, 7 + hw_strip, hw_strip - 1);
        let strip_arg = vec![OscType::Int(osc_strip)];
        let mute = OscToggle::new(endpoint, "/strip/mute", strip_arg.clone());
        let solo = OscToggle::new(endpoint, "/strip/solo", strip_arg.clone());
        let other_solo = OscToggle::new(endpoint, "/cancel_all_solos", vec![]);
        let group = OscValue::new(endpoint, "/strip/group", strip_arg);
        Self::new(button, mute, solo, other_solo, group)
    }
}

impl SoloMuteInner {
    fn on_button(inner: &Rc<Self>, pressed: bool) {
        if pressed {
            let gesture = inner.clone();
            inner
                .longpress
                .arm(LONGPRESS_TIME, move || gesture.on_longpress());
            return;
        }
        if !inner.longpress.cancel() {
            // Long-press already fired; the release carries no action.
            return;
        }

        // Short press: soloing strips drop the solo, others toggle mute.
        if inner.solo.on() {
            inner.solo.set_on(false);
        } else {
            inner.mute.set_on(!inner.mute.on());
        }
    }

    fn on_longpress(&self) {
        if self.mute.on() && !self.solo.on() {
            self.solo.set_on(true);
            self.mute.set_on(false);
        } else if self.mute.on() && self.solo.on() {
            self.mute.set_on(false);
        } else {
            self.solo.set_on(!self.solo.on());
        }
    }

    fn recalculate(&self) {
        let inactive = matches!(
            self.group.value(),
            Some(OscType::String(ref s)) if s == "none"
        );

        let led = if inactive {
            // No track under this strip.
            LedState::Off
        } else if self.mute.on() {
            LedState::Off
        } else if self.solo.on() {
            // May be muted by another solo, but audible through its own.
            LedState::Blinking
        } else if self.other_solo.on() {
            LedState::Off
        } else {
            LedState::On
        };
        self.button.set_led(led);
    }
}
