//! Surface registration keep-alive
//!
//! Ardour forgets a control surface that stops talking to it. The guard
//! registers the surface on construction, re-registers on every heartbeat,
//! and — should the heartbeat stop — re-registers on its own every three
//! seconds until feedback returns.

use crate::osc::controls::{OscAction, OscValue};
use crate::osc::OscEndpoint;
use crate::timer::Timer;
use rosc::OscType;
use std::rc::Rc;
use std::time::Duration;

/// Re-registration period when no heartbeat arrives
const REGISTER_INTERVAL: Duration = Duration::from_secs(3);

/// Ardour `/set_surface` argument tuple: bank size, strip types, feedback
/// mask, fader mode, send page size, plugin page size, reply port.
pub fn set_surface_args(feedback_port: u16) -> Vec<OscType> {
    vec![
        OscType::Int(8),
        OscType::Int(31),
        OscType::Int(27),
        OscType::Int(1),
        OscType::Int(0),
        OscType::Int(0),
        OscType::Int(i32::from(feedback_port)),
    ]
}

struct GuardInner {
    register: OscAction,
    _heartbeat: OscValue,
    timer: Timer,
}

/// Self-healing periodic surface registration.
pub struct ConnectionGuard {
    _inner: Rc<GuardInner>,
}

impl ConnectionGuard {
    pub fn new(register: OscAction, heartbeat: OscValue) -> Self {
        let inner = Rc::new(GuardInner {
            register,
            _heartbeat: heartbeat.clone(),
            timer: Timer::new(),
        });
        {
            let inner = inner.clone();
            heartbeat.register(move |_| GuardInner::announce(&inner));
        }
        GuardInner::announce(&inner);
        Self { _inner: inner }
    }

    pub fn build(endpoint: &OscEndpoint, feedback_port: u16) -> Self {
        let register = OscAction::new(endpoint, "/set_surface", set_surface_args(feedback_port));
        let heartbeat = OscValue::new(endpoint, "/heartbeat", vec![]);
        Self::new(register, heartbeat)
    }
}

impl GuardInner {
    /// Send the registration and schedule the next one.
    fn announce(inner: &Rc<Self>) {
        inner.register.fire(&[]);
        let guard = inner.clone();
        inner
            .timer
            .arm(REGISTER_INTERVAL, move || GuardInner::announce(&guard));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{advance_ms, TestOsc};
    use rosc::OscMessage;
    use tokio::task::LocalSet;

    fn registration_count(out: &TestOsc) -> usize {
        out.sent()
            .iter()
            .filter(|(path, _)| path == "/set_surface")
            .count()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn registers_on_construction_and_periodically_when_silent() {
        LocalSet::new()
            .run_until(async {
                let out = TestOsc::new();
                let endpoint = OscEndpoint::new(Box::new(out.clone()));
                let _guard = ConnectionGuard::build(&endpoint, 9000);

                assert_eq!(registration_count(&out), 1);
                assert_eq!(out.sent()[0].1, set_surface_args(9000));

                // No heartbeat: the guard re-registers every 3 s by itself.
                advance_ms(3001).await;
                assert_eq!(registration_count(&out), 2);
                advance_ms(3000).await;
                assert_eq!(registration_count(&out), 3);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn heartbeat_resends_and_rearms() {
        LocalSet::new()
            .run_until(async {
                let out = TestOsc::new();
                let endpoint = OscEndpoint::new(Box::new(out.clone()));
                let _guard = ConnectionGuard::build(&endpoint, 9000);
                assert_eq!(registration_count(&out), 1);

                // A heartbeat right before the deadline re-registers and
                // pushes the deadline out.
                advance_ms(2900).await;
                endpoint.dispatch(&OscMessage {
                    addr: "/heartbeat".to_string(),
                    args: vec![OscType::Float(1.0)],
                });
                assert_eq!(registration_count(&out), 2);

                advance_ms(2900).await;
                assert_eq!(registration_count(&out), 2); // old deadline gone

                advance_ms(200).await;
                assert_eq!(registration_count(&out), 3);
            })
            .await;
    }
}
