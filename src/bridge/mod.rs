//! Bridge state machines
//!
//! Each bridge composes hardware and OSC primitives into one gesture/mode
//! state machine: presses, long-presses, and encoder turns become protocol
//! writes, and remote feedback becomes LED state. Bridges keep no transport
//! of their own; everything flows through the primitives they hold.

mod guard;
mod simple;
mod solo_mute;
mod strip_fader;
mod transport;

pub use guard::ConnectionGuard;
pub use simple::{MainFaderBridge, ToggleSetOnlyBridge};
pub use solo_mute::SoloMuteControl;
pub use strip_fader::StripFaderControl;
pub use transport::{JogControl, LoopToggleControl, RecordButtonControl};
