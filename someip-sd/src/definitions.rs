//! The high level definitions of service discovery messages

use std::net::{Ipv4Addr, Ipv6Addr};

/// High level representation of a service discovery payload
///
/// Entries own their resolved options; the shared options array of the wire
/// format with its index references only exists while encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdMessage {
    /// Whether the sender's session counter wrapped since the last message
    pub reboot: bool,
    /// Whether the sender accepts unicast SD messages
    pub unicast: bool,
    /// The entries in wire order
    pub entries: Vec<Entry>,
}

/// Discriminator of a service discovery entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A client looking for instances of a service
    FindService,
    /// A server announcing an instance of a service; ttl 0 revokes the
    /// announcement (StopOfferService)
    OfferService,
    /// A client (un)subscribing to an eventgroup; ttl 0 unsubscribes
    SubscribeEventgroup,
    /// A server confirming a subscription; ttl 0 rejects it (Nack)
    SubscribeEventgroupAck,
    /// A value not assigned by the specification
    Other(u8),
}

impl EntryKind {
    /// Decode the wire value, never failing
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => EntryKind::FindService,
            0x01 => EntryKind::OfferService,
            0x06 => EntryKind::SubscribeEventgroup,
            0x07 => EntryKind::SubscribeEventgroupAck,
            other => EntryKind::Other(other),
        }
    }

    /// Encode into the wire value
    pub fn as_u8(self) -> u8 {
        match self {
            EntryKind::FindService => 0x00,
            EntryKind::OfferService => 0x01,
            EntryKind::SubscribeEventgroup => 0x06,
            EntryKind::SubscribeEventgroupAck => 0x07,
            EntryKind::Other(other) => other,
        }
    }

    /// Whether the final entry word carries an eventgroup id instead of the
    /// minor version
    pub fn is_eventgroup_entry(self) -> bool {
        matches!(
            self,
            EntryKind::SubscribeEventgroup | EntryKind::SubscribeEventgroupAck
        )
    }
}

/// High level representation of one service discovery entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Kind of the entry
    pub kind: EntryKind,
    /// Identifier of the service
    pub service_id: u16,
    /// Identifier of the instance, 0xFFFF addressing all instances
    pub instance_id: u16,
    /// Major version of the service interface
    pub major_version: u8,
    /// Lifetime of the entry in seconds, at most 24 bit; 0 revokes
    pub ttl: u32,
    /// Minor version for service entries, 0 for eventgroup entries
    pub minor_version: u32,
    /// Eventgroup id for eventgroup entries, 0 for service entries
    pub eventgroup_id: u16,
    /// Options of the first run
    pub options1: Vec<SdOption>,
    /// Options of the second run
    pub options2: Vec<SdOption>,
}

impl Entry {
    /// A FindService entry without options
    pub fn find(service_id: u16, instance_id: u16, major_version: u8, ttl: u32) -> Self {
        Self {
            kind: EntryKind::FindService,
            service_id,
            instance_id,
            major_version,
            ttl,
            minor_version: 0xFFFF_FFFF,
            eventgroup_id: 0,
            options1: vec![],
            options2: vec![],
        }
    }

    /// An OfferService entry carrying the given endpoint options
    pub fn offer(
        service_id: u16,
        instance_id: u16,
        major_version: u8,
        minor_version: u32,
        ttl: u32,
        options: Vec<SdOption>,
    ) -> Self {
        Self {
            kind: EntryKind::OfferService,
            service_id,
            instance_id,
            major_version,
            ttl,
            minor_version,
            eventgroup_id: 0,
            options1: options,
            options2: vec![],
        }
    }

    /// A SubscribeEventgroup entry carrying the given endpoint options
    pub fn subscribe(
        service_id: u16,
        instance_id: u16,
        major_version: u8,
        eventgroup_id: u16,
        ttl: u32,
        options: Vec<SdOption>,
    ) -> Self {
        Self {
            kind: EntryKind::SubscribeEventgroup,
            service_id,
            instance_id,
            major_version,
            ttl,
            minor_version: 0,
            eventgroup_id,
            options1: options,
            options2: vec![],
        }
    }

    /// A SubscribeEventgroupAck mirroring a subscribe entry
    pub fn subscribe_ack(subscribe: &Entry, ttl: u32) -> Self {
        Self {
            kind: EntryKind::SubscribeEventgroupAck,
            service_id: subscribe.service_id,
            instance_id: subscribe.instance_id,
            major_version: subscribe.major_version,
            ttl,
            minor_version: 0,
            eventgroup_id: subscribe.eventgroup_id,
            options1: vec![],
            options2: vec![],
        }
    }

    /// Whether this is an OfferService revocation
    pub fn is_stop_offer(&self) -> bool {
        self.kind == EntryKind::OfferService && self.ttl == 0
    }

    /// Whether this is an unsubscribe
    pub fn is_stop_subscribe(&self) -> bool {
        self.kind == EntryKind::SubscribeEventgroup && self.ttl == 0
    }

    /// Whether this is a subscription rejection
    pub fn is_subscribe_nack(&self) -> bool {
        self.kind == EntryKind::SubscribeEventgroupAck && self.ttl == 0
    }

    /// All options of both runs in wire order
    pub fn all_options(&self) -> impl Iterator<Item = &SdOption> {
        self.options1.iter().chain(self.options2.iter())
    }
}

/// Transport protocol referenced by an endpoint option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum L4Protocol {
    /// Transmission control protocol
    Tcp,
    /// User datagram protocol
    Udp,
    /// A value not assigned by the specification
    Other(u8),
}

impl L4Protocol {
    /// Decode the wire value, never failing
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x06 => L4Protocol::Tcp,
            0x11 => L4Protocol::Udp,
            other => L4Protocol::Other(other),
        }
    }

    /// Encode into the wire value
    pub fn as_u8(self) -> u8 {
        match self {
            L4Protocol::Tcp => 0x06,
            L4Protocol::Udp => 0x11,
            L4Protocol::Other(other) => other,
        }
    }
}

/// High level representation of a service discovery option
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SdOption {
    /// A unicast IPv4 endpoint (type 0x04)
    Ipv4Endpoint {
        /// Address of the endpoint
        address: Ipv4Addr,
        /// Transport protocol of the endpoint
        protocol: L4Protocol,
        /// Transport port of the endpoint
        port: u16,
    },
    /// An IPv4 multicast group (type 0x14)
    Ipv4Multicast {
        /// Multicast group address
        address: Ipv4Addr,
        /// Transport protocol, UDP in practice
        protocol: L4Protocol,
        /// Transport port
        port: u16,
    },
    /// A unicast IPv6 endpoint (type 0x06)
    Ipv6Endpoint {
        /// Address of the endpoint
        address: Ipv6Addr,
        /// Transport protocol of the endpoint
        protocol: L4Protocol,
        /// Transport port of the endpoint
        port: u16,
    },
    /// An IPv6 multicast group (type 0x16)
    Ipv6Multicast {
        /// Multicast group address
        address: Ipv6Addr,
        /// Transport protocol, UDP in practice
        protocol: L4Protocol,
        /// Transport port
        port: u16,
    },
    /// A configuration record set (type 0x01), kept opaque
    Configuration(Vec<u8>),
    /// An option this implementation does not interpret
    Unknown {
        /// The wire type of the option
        option_type: u8,
        /// The bytes after the type field
        body: Vec<u8>,
    },
}
