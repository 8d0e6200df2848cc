//! Transport-section bridges: record arm, loop, and jog keys

use crate::hardware::{Button, ButtonField, LedButton, LedButtonField, LedState};
use crate::osc::controls::{OscAction, OscToggle, OscValue};
use crate::osc::OscEndpoint;
use crate::surface::Surface;
use crate::timer::Timer;
use rosc::OscType;
use std::rc::Rc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// RecordButtonControl
// ---------------------------------------------------------------------------

struct RecordInner {
    button: LedButton,
    rec_enable: OscToggle,
    rec_tally: OscValue,
    play: OscValue,
}

/// Master record arm.
///
/// A press re-triggers the remote enable with a false-then-true edge: the
/// host ignores a redundant lone `true`, so the edge is never coalesced.
/// LED: armed and rolling with tally, solid; armed only, blinking.
pub struct RecordButtonControl {
    inner: Rc<RecordInner>,
}

impl RecordButtonControl {
    pub fn new(
        button: LedButton,
        rec_enable: OscToggle,
        rec_tally: OscValue,
        play: OscValue,
    ) -> Self {
        let inner = Rc::new(RecordInner {
            button,
            rec_enable,
            rec_tally,
            play,
        });
        {
            let inner = inner.clone();
            inner.button.clone().register(move |set| {
                if set.field("pressed") == Some(&LedButtonField::Pressed(true)) {
                    inner.rec_enable.set_on(false);
                    inner.rec_enable.set_on(true);
                }
                inner.recalculate();
            });
        }
        for watch in [&inner.rec_tally, &inner.play] {
            let inner = inner.clone();
            watch.register(move |_| inner.recalculate());
        }
        {
            let inner = inner.clone();
            inner.rec_enable.clone().register(move |_| inner.recalculate());
        }
        Self { inner }
    }

    pub fn build(surface: &Surface, endpoint: &OscEndpoint) -> Self {
        let button = LedButton::new(surface, 23, 15);
        let rec_enable = OscToggle::new(endpoint, "/rec_enable_toggle", vec![]);
        let rec_tally = OscValue::new(endpoint, "/record_tally", vec![]);
        let play = OscValue::new(endpoint, "/transport_play", vec![]);
        Self::new(button, rec_enable, rec_tally, play)
    }
}

impl RecordInner {
    fn recalculate(&self) {
        let armed = self.rec_enable.on();
        let rolling = self.play.is_truthy();
        let tally = self.rec_tally.is_truthy();

        let led = if armed && rolling && tally {
            LedState::On
        } else if armed {
            LedState::Blinking
        } else {
            LedState::Off
        };
        self.button.set_led(led);
    }
}

// ---------------------------------------------------------------------------
// LoopToggleControl
// ---------------------------------------------------------------------------

struct LoopInner {
    button: LedButton,
    remote: OscToggle,
}

/// Loop key: same false-then-true re-trigger, LED mirrors the remote state.
pub struct LoopToggleControl {
    inner: Rc<LoopInner>,
}

impl LoopToggleControl {
    pub fn new(button: LedButton, remote: OscToggle) -> Self {
        let inner = Rc::new(LoopInner { button, remote });
        {
            let inner = inner.clone();
            inner.button.clone().register(move |set| {
                if set.field("pressed") == Some(&LedButtonField::Pressed(true)) {
                    inner.remote.set_on(false);
                    inner.remote.set_on(true);
                }
                inner.sync_led();
            });
        }
        {
            let inner = inner.clone();
            inner.remote.clone().register(move |_| inner.sync_led());
        }
        Self { inner }
    }

    pub fn build(surface: &Surface, endpoint: &OscEndpoint) -> Self {
        let button = LedButton::new(surface, 20, 12);
        let remote = OscToggle::new(endpoint, "/loop_toggle", vec![]);
        Self::new(button, remote)
    }
}

impl LoopInner {
    fn sync_led(&self) {
        self.button.set_led(if self.remote.on() {
            LedState::On
        } else {
            LedState::Off
        });
    }
}

// ---------------------------------------------------------------------------
// JogControl
// ---------------------------------------------------------------------------

/// First jog step on press
const INITIAL_STEP: f32 = 5.0;
/// Step magnitude while auto-repeating
const REPEAT_STEP: f32 = 4.0;
/// Hold duration before the auto-repeat starts
const INITIAL_WAIT: Duration = Duration::from_millis(400);
/// Auto-repeat period
const REPEAT_WAIT: Duration = Duration::from_millis(100);

struct JogInner {
    button: Button,
    jog: OscAction,
    direction: f32,
    repeat: Timer,
}

/// Jog key: an immediate nudge, then auto-repeat after a hold.
pub struct JogControl {
    inner: Rc<JogInner>,
}

impl JogControl {
    pub fn new(button: Button, jog: OscAction, forward: bool) -> Self {
        let inner = Rc::new(JogInner {
            button,
            jog,
            direction: if forward { 1.0 } else { -1.0 },
            repeat: Timer::new(),
        });
        {
            let inner = inner.clone();
            inner.button.clone().register(move |set| {
                if let Some(ButtonField::Pressed(pressed)) = set.field("pressed") {
                    JogInner::on_button(&inner, *pressed);
                }
            });
        }
        Self { inner }
    }

    pub fn build(surface: &Surface, endpoint: &OscEndpoint, note: u8, forward: bool) -> Self {
        let button = Button::new(surface, note);
        let jog = OscAction::new(endpoint, "/jog", vec![]);
        Self::new(button, jog, forward)
    }
}

impl JogInner {
    fn on_button(inner: &Rc<Self>, pressed: bool) {
        if pressed {
            inner.repeat.cancel();
            inner.jog.fire(&[OscType::Float(INITIAL_STEP * inner.direction)]);
            let jog = inner.clone();
            inner
                .repeat
                .arm(INITIAL_WAIT, move || JogInner::tick(&jog));
        } else {
            inner.repeat.cancel();
        }
    }

    fn tick(inner: &Rc<Self>) {
        inner.jog.fire(&[OscType::Float(REPEAT_STEP * inner.direction)]);
        let jog = inner.clone();
        inner.repeat.arm(REPEAT_WAIT, move || JogInner::tick(&jog));
    }
}
