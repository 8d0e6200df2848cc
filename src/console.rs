//! Wiring of the whole surface
//!
//! Instantiates every bridge with the X-Touch Mini's note/CC layout and
//! Ardour's OSC addresses: eight strips across the encoder row, transport
//! keys on the lower right, jog on the two spare buttons, and the master
//! fader. The returned value owns the bridges for the life of the process.

use crate::bridge::{
    ConnectionGuard, JogControl, LoopToggleControl, MainFaderBridge, RecordButtonControl,
    SoloMuteControl, StripFaderControl, ToggleSetOnlyBridge,
};
use crate::config::AppConfig;
use crate::hardware::{Fader, LedButton};
use crate::osc::controls::{OscFader, OscToggleSetOnly};
use crate::osc::OscEndpoint;
use crate::surface::Surface;

/// Master fader CC
const MASTER_FADER_CC: u8 = 9;
/// Rewind / forward jog buttons
const JOG_REW_NOTE: u8 = 18;
const JOG_FWD_NOTE: u8 = 19;
/// Transport keys: (note, LED note)
const STOP_KEY: (u8, u8) = (21, 13);
const PLAY_KEY: (u8, u8) = (22, 14);

/// All live bridges. Dropping this tears nothing down — the primitives stay
/// registered on the surface and endpoint — but holding it keeps ownership
/// in one obvious place.
pub struct Console {
    _strips: Vec<StripFaderControl>,
    _solos: Vec<SoloMuteControl>,
    _play: ToggleSetOnlyBridge,
    _stop: ToggleSetOnlyBridge,
    _record: RecordButtonControl,
    _loop_toggle: LoopToggleControl,
    _jog_forward: JogControl,
    _jog_rewind: JogControl,
    _master: MainFaderBridge,
    _guard: ConnectionGuard,
}

impl Console {
    /// Build every bridge against the given transports.
    pub fn build(surface: &Surface, endpoint: &OscEndpoint, config: &AppConfig) -> Self {
        let strips = (1..=config.strips)
            .map(|i| StripFaderControl::build(surface, endpoint, i, i32::from(i)))
            .collect();
        let solos = (1..=config.strips)
            .map(|i| SoloMuteControl::build(surface, endpoint, i, i32::from(i)))
            .collect();

        let play = ToggleSetOnlyBridge::new(
            LedButton::new(surface, PLAY_KEY.0, PLAY_KEY.1),
            OscToggleSetOnly::new(endpoint, "/transport_play", vec![]),
        );
        let stop = ToggleSetOnlyBridge::new(
            LedButton::new(surface, STOP_KEY.0, STOP_KEY.1),
            OscToggleSetOnly::new(endpoint, "/transport_stop", vec![]),
        );

        let master = MainFaderBridge::new(
            Fader::new(surface, MASTER_FADER_CC),
            OscFader::new(endpoint, "/master/fader", vec![]),
        );

        Self {
            _strips: strips,
            _solos: solos,
            _play: play,
            _stop: stop,
            _record: RecordButtonControl::build(surface, endpoint),
            _loop_toggle: LoopToggleControl::build(surface, endpoint),
            _jog_forward: JogControl::build(surface, endpoint, JOG_FWD_NOTE, true),
            _jog_rewind: JogControl::build(surface, endpoint, JOG_REW_NOTE, false),
            _master: master,
            _guard: ConnectionGuard::build(endpoint, config.osc.feedback_port),
        }
    }
}
