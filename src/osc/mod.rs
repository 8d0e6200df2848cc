//! OSC endpoint: handler registry and UDP transport
//!
//! The endpoint exposes the two operations the control primitives need:
//! fire-and-forget `send(path, args)` and `add_handler(pattern, callback)`
//! with trailing-wildcard path matching. The UDP run loop decodes packets
//! with `rosc`, flattens bundles, and dispatches messages to every matching
//! handler in registration order.

pub mod controls;
pub mod reply;

use anyhow::{Context, Result};
use rosc::{OscMessage, OscPacket, OscType};
use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

/// Outbound OSC transport seam.
///
/// The production implementation encodes onto a UDP socket; tests
/// substitute a recording output.
pub trait OscOut {
    fn send(&mut self, msg: OscMessage) -> Result<()>;
}

struct Handler {
    pattern: String,
    callback: Rc<dyn Fn(&OscMessage)>,
}

struct EndpointInner {
    out: RefCell<Box<dyn OscOut>>,
    handlers: RefCell<Vec<Handler>>,
}

/// Handle to the OSC peer, shared by every OSC primitive.
#[derive(Clone)]
pub struct OscEndpoint {
    inner: Rc<EndpointInner>,
}

impl OscEndpoint {
    pub fn new(out: Box<dyn OscOut>) -> Self {
        Self {
            inner: Rc::new(EndpointInner {
                out: RefCell::new(out),
                handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a callback for paths matching `pattern` (exact, or a
    /// trailing `/*` wildcard).
    pub fn add_handler(&self, pattern: &str, callback: impl Fn(&OscMessage) + 'static) {
        self.inner.handlers.borrow_mut().push(Handler {
            pattern: pattern.to_string(),
            callback: Rc::new(callback),
        });
    }

    /// Send one message, fire-and-forget. Failures are logged; nothing
    /// retries.
    pub fn send(&self, path: &str, args: Vec<OscType>) {
        let msg = OscMessage {
            addr: path.to_string(),
            args,
        };
        if let Err(e) = self.inner.out.borrow_mut().send(msg) {
            warn!("OSC send to {} failed: {:#}", path, e);
        }
    }

    /// Deliver one inbound message to every matching handler.
    pub fn dispatch(&self, msg: &OscMessage) {
        let matching: Vec<Rc<dyn Fn(&OscMessage)>> = self
            .inner
            .handlers
            .borrow()
            .iter()
            .filter(|h| path_matches(&h.pattern, &msg.addr))
            .map(|h| h.callback.clone())
            .collect();

        if matching.is_empty() {
            trace!("no handler for {}", msg.addr);
            return;
        }
        for callback in matching {
            callback(msg);
        }
    }

    /// Deliver a decoded packet, flattening bundles recursively.
    pub fn dispatch_packet(&self, packet: &OscPacket) {
        match packet {
            OscPacket::Message(msg) => self.dispatch(msg),
            OscPacket::Bundle(bundle) => {
                for inner in &bundle.content {
                    self.dispatch_packet(inner);
                }
            }
        }
    }
}

/// Exact match, or a trailing `/*` wildcard matching any suffix.
fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some(prefix) => path.starts_with(prefix) && path.len() > prefix.len(),
        None => pattern == path,
    }
}

/// UDP-backed outbound transport.
pub struct UdpOscOut {
    socket: Rc<UdpSocket>,
    remote: SocketAddr,
}

impl UdpOscOut {
    pub fn new(socket: Rc<UdpSocket>, remote: SocketAddr) -> Self {
        Self { socket, remote }
    }
}

impl OscOut for UdpOscOut {
    fn send(&mut self, msg: OscMessage) -> Result<()> {
        trace!("OSC out {} {:?}", msg.addr, msg.args);
        let bytes = rosc::encoder::encode(&OscPacket::Message(msg))
            .context("failed to encode OSC packet")?;
        self.socket
            .try_send_to(&bytes, self.remote)
            .context("UDP send failed")?;
        Ok(())
    }
}

/// Receive loop: decode datagrams and dispatch them on the endpoint.
pub async fn run(endpoint: OscEndpoint, socket: Rc<UdpSocket>) {
    let mut buf = vec![0u8; rosc::decoder::MTU];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("OSC receive failed: {}", e);
                continue;
            }
        };
        match rosc::decoder::decode_udp(&buf[..len]) {
            Ok((_, packet)) => endpoint.dispatch_packet(&packet),
            Err(e) => debug!("undecodable OSC packet from {}: {:?}", peer, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestOsc;
    use rosc::OscBundle;
    use std::cell::RefCell;

    fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn path_matching_rules() {
        assert!(path_matches("/strip/fader", "/strip/fader"));
        assert!(!path_matches("/strip/fader", "/strip/mute"));
        assert!(path_matches("/strip/*", "/strip/fader"));
        assert!(path_matches("/strip/*", "/strip/fader/extra"));
        assert!(!path_matches("/strip/*", "/strip"));
        assert!(path_matches("/*", "/anything"));
    }

    #[test]
    fn dispatch_runs_matching_handlers_in_registration_order() {
        let endpoint = OscEndpoint::new(Box::new(TestOsc::new()));
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["exact", "wildcard"] {
            let order = order.clone();
            let pattern = if tag == "exact" { "/strip/fader" } else { "/strip/*" };
            endpoint.add_handler(pattern, move |_| order.borrow_mut().push(tag));
        }
        {
            let order = order.clone();
            endpoint.add_handler("/loop_toggle", move |_| order.borrow_mut().push("loop"));
        }

        endpoint.dispatch(&msg("/strip/fader", vec![OscType::Int(1)]));
        assert_eq!(*order.borrow(), vec!["exact", "wildcard"]);
    }

    #[test]
    fn bundles_are_flattened() {
        let endpoint = OscEndpoint::new(Box::new(TestOsc::new()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            endpoint.add_handler("/*", move |m| seen.borrow_mut().push(m.addr.clone()));
        }

        let bundle = OscPacket::Bundle(OscBundle {
            timetag: rosc::OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                OscPacket::Message(msg("/heartbeat", vec![OscType::Float(1.0)])),
                OscPacket::Bundle(OscBundle {
                    timetag: rosc::OscTime {
                        seconds: 0,
                        fractional: 1,
                    },
                    content: vec![OscPacket::Message(msg("/strip/solo", vec![]))],
                }),
            ],
        });

        endpoint.dispatch_packet(&bundle);
        assert_eq!(*seen.borrow(), vec!["/heartbeat", "/strip/solo"]);
    }

    #[test]
    fn send_goes_to_the_output() {
        let out = TestOsc::new();
        let endpoint = OscEndpoint::new(Box::new(out.clone()));
        endpoint.send("/jog", vec![OscType::Float(5.0)]);

        assert_eq!(out.sent(), vec![("/jog".to_string(), vec![OscType::Float(5.0)])]);
    }
}
