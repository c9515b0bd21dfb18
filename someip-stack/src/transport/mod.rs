//! Transports carrying SOME/IP frames and the contract they expose
//!
//! The stack core does not own socket plumbing beyond what is needed to
//! demonstrate the contract: bytes arrive as datagrams tagged with their
//! sender, leave as datagrams with a destination, and everything the stack
//! observes is reported through [TransportCallbacks].

use std::io;
use std::net::SocketAddr;

use someip::definitions::Message;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::StackError;
use crate::tp::ReassemblyKey;

mod recv;
mod udp;

pub use udp::UdpTransport;

/// Errors that may occur while driving a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the local socket failed
    #[error("Could not bind: {0}")]
    CouldNotBind(io::Error),
    /// Receiving from the socket failed
    #[error("Could not recv: {0}")]
    Receive(io::Error),
    /// Sending on the socket failed
    #[error("Could not send: {0}")]
    Send(io::Error),
    /// The message could not be encoded into a frame
    #[error("Could not encode: {0}")]
    Encode(#[from] someip::generator::GeneratorError),
    /// The transport configuration cannot express the requested operation
    #[error("Invalid transport configuration")]
    InvalidConfig,
}

/// What a transport reports to its collaborator
///
/// Implementations must be cheap and non-blocking; they are called from the
/// receive loop.
pub trait TransportCallbacks: Send + Sync {
    /// A complete message arrived, TP reassembly already applied
    fn on_message_received(&self, message: Message, sender: SocketAddr);

    /// A receive-side error that did not kill the transport
    fn on_error(&self, error: StackError);

    /// A reassembly was abandoned, either by deadline or by shutdown
    fn on_reassembly_timeout(&self, key: &ReassemblyKey) {
        let _ = key;
        self.on_error(StackError::Timeout);
    }

    /// A stream transport established a connection
    fn on_connection_established(&self, peer: SocketAddr) {
        let _ = peer;
    }

    /// A peer became unreachable or the transport gave up on it
    fn on_connection_lost(&self, peer: SocketAddr) {
        let _ = peer;
    }
}

/// The callback events as plain values, for channel based collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete message arrived
    MessageReceived {
        /// The reassembled message
        message: Message,
        /// Endpoint it arrived from
        sender: SocketAddr,
    },
    /// A non-fatal receive error
    Error(StackError),
    /// A reassembly was abandoned
    ReassemblyTimeout(ReassemblyKey),
    /// A connection came up
    ConnectionEstablished(SocketAddr),
    /// A connection went away
    ConnectionLost(SocketAddr),
}

/// Adapter forwarding every callback into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelCallbacks {
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelCallbacks {
    /// Forward callbacks into `events`
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events }
    }

    fn push(&self, event: TransportEvent) {
        // a closed receiver just means nobody cares anymore
        let _ = self.events.send(event);
    }
}

impl TransportCallbacks for ChannelCallbacks {
    fn on_message_received(&self, message: Message, sender: SocketAddr) {
        self.push(TransportEvent::MessageReceived { message, sender });
    }

    fn on_error(&self, error: StackError) {
        self.push(TransportEvent::Error(error));
    }

    fn on_reassembly_timeout(&self, key: &ReassemblyKey) {
        self.push(TransportEvent::ReassemblyTimeout(*key));
    }

    fn on_connection_established(&self, peer: SocketAddr) {
        self.push(TransportEvent::ConnectionEstablished(peer));
    }

    fn on_connection_lost(&self, peer: SocketAddr) {
        self.push(TransportEvent::ConnectionLost(peer));
    }
}
