//! One-to-one bridges: set-only transport keys and the master fader

use crate::hardware::{Fader, LedButton, LedState};
use crate::osc::controls::{OscFader, OscToggleSetOnly, ToggleField};
use std::rc::Rc;

struct ToggleSetOnlyInner {
    button: LedButton,
    remote: OscToggleSetOnly,
}

/// Press asserts the remote boolean; the LED mirrors the remote state from
/// either direction of feedback.
pub struct ToggleSetOnlyBridge {
    inner: Rc<ToggleSetOnlyInner>,
}

impl ToggleSetOnlyBridge {
    pub fn new(button: LedButton, remote: OscToggleSetOnly) -> Self {
        let inner = Rc::new(ToggleSetOnlyInner { button, remote });
        {
            let inner = inner.clone();
            inner.button.clone().register(move |set| {
                if set.field("pressed")
                    == Some(&crate::hardware::LedButtonField::Pressed(true))
                {
                    inner.remote.set_on(true);
                }
                inner.sync_led();
            });
        }
        {
            let inner = inner.clone();
            inner.remote.clone().register(move |set| {
                if let Some(ToggleField::On(on)) = set.field("on") {
                    inner
                        .button
                        .set_led(if *on { LedState::On } else { LedState::Off });
                }
            });
        }
        Self { inner }
    }
}

impl ToggleSetOnlyInner {
    fn sync_led(&self) {
        self.button.set_led(if self.remote.on() {
            LedState::On
        } else {
            LedState::Off
        });
    }
}

struct MainFaderInner {
    fader: Fader,
    remote: OscFader,
}

/// Physical master fader writes the remote level, scaled 0..127 to 0.0..1.0.
///
/// One-directional: the fader is not motorized, so there is nothing to
/// write back to.
pub struct MainFaderBridge {
    _inner: Rc<MainFaderInner>,
}

impl MainFaderBridge {
    pub fn new(fader: Fader, remote: OscFader) -> Self {
        let inner = Rc::new(MainFaderInner { fader, remote });
        {
            let inner = inner.clone();
            inner.fader.clone().register(move |_set| {
                inner.remote.set_value(f32::from(inner.fader.value()) / 127.0);
            });
        }
        Self { _inner: inner }
    }
}
