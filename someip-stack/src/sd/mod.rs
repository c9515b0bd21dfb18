//! The service discovery control plane
//!
//! Servers announce their services with a delayed, repeated and finally
//! cyclic offer; clients look for services with the mirrored find cycle and
//! subscribe to eventgroups once an offer is seen. The state machines in
//! [server] and [client] are pure and timer driven; [engine] binds them to
//! a transport and the SD wire codec.

pub mod client;
pub mod engine;
pub mod peer;
pub mod server;

pub use client::{FindPhase, FindState, FireOutcome, SubscribeVerdict};
pub use engine::{SdCommand, SdEngine, SdEvent, SdIncoming, SdOutgoing};
pub use peer::{PeerTracker, SdChannel, SdSessionCounter};
pub use server::{OfferPhase, OfferState, OfferedService};

/// Identity of a service instance within the discovery plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    /// Identifier of the service
    pub service_id: u16,
    /// Identifier of the instance
    pub instance_id: u16,
}

impl ServiceKey {
    /// Key of a concrete service instance
    pub fn new(service_id: u16, instance_id: u16) -> Self {
        Self {
            service_id,
            instance_id,
        }
    }

    /// Whether an entry addressed at `other` matches this instance,
    /// honouring the 0xFFFF "any instance" wildcard
    pub fn matches(&self, service_id: u16, instance_id: u16) -> bool {
        self.service_id == service_id
            && (instance_id == 0xFFFF || self.instance_id == instance_id)
    }
}
