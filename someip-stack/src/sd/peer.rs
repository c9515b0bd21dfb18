//! Per peer session counters and reboot detection

use std::collections::HashMap;
use std::net::SocketAddr;

/// The two independent counter channels every SD peer maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdChannel {
    /// Messages addressed at one peer
    Unicast,
    /// Messages addressed at the SD multicast group
    Multicast,
}

/// Session counter of one sending channel
///
/// Counts 1 through 0xFFFF and wraps back to 1, never emitting 0. The send
/// at which the counter wraps carries the reboot flag; the following send
/// clears it again.
#[derive(Debug, Clone)]
pub struct SdSessionCounter {
    session: u16,
    reboot: bool,
}

impl Default for SdSessionCounter {
    fn default() -> Self {
        Self {
            session: 1,
            reboot: false,
        }
    }
}

impl SdSessionCounter {
    /// A counter about to emit its first session id
    pub fn new() -> Self {
        Self::default()
    }

    /// The session id and reboot flag for the next send
    pub fn next(&mut self) -> (u16, bool) {
        let session = self.session;
        let reboot = self.reboot;
        self.reboot = false;
        self.session = if session == 0xFFFF {
            self.reboot = true;
            1
        } else {
            session + 1
        };
        (session, reboot)
    }
}

/// Observer of the (reboot flag, session id) sequences of remote peers
///
/// A reboot is detected when the sequence from a peer is not a strict
/// monotonic continuation: either the flag rises, or it stays set while the
/// counter fails to advance.
#[derive(Debug, Default)]
pub struct PeerTracker {
    observed: HashMap<(SocketAddr, SdChannel), (bool, u16)>,
}

impl PeerTracker {
    /// A tracker that has not seen any peer yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one received message, reporting whether the peer rebooted
    pub fn observe(
        &mut self,
        peer: SocketAddr,
        channel: SdChannel,
        reboot: bool,
        session_id: u16,
    ) -> bool {
        let rebooted = match self.observed.get(&(peer, channel)) {
            None => false,
            Some((old_reboot, old_session)) => {
                (!old_reboot && reboot) || (*old_reboot && reboot && session_id <= *old_session)
            }
        };
        self.observed.insert((peer, channel), (reboot, session_id));
        rebooted
    }

    /// Drop the recorded sequence of a peer, e.g. after a detected reboot
    pub fn forget(&mut self, peer: SocketAddr) {
        self.observed
            .retain(|(observed_peer, _), _| *observed_peer != peer);
    }
}
